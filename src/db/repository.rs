use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::models::{ListingRow, WatchRow};
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::types::{Listing, NewWatch, Watch};

/// SQLite-backed storage for watches and listing catalogs.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (or create) the database file and apply pending migrations.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite:{db_path}?mode=rwc")).await?;
        let repo = Self::from_pool(pool).await?;
        info!("Database ready at {db_path}");
        Ok(repo)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Create a watch. Inverted bands and duplicate URLs are rejected here so the
    /// classifier never sees them.
    pub async fn add_watch(&self, new: NewWatch) -> Result<Watch> {
        let url = new.url.trim().to_string();
        if url.is_empty() {
            return Err(AppError::InvalidWatch("URL must not be empty".to_string()));
        }
        if new.price_low > new.price_high {
            return Err(AppError::InvalidWatch(format!(
                "price_low ({}) must not exceed price_high ({})",
                new.price_low, new.price_high
            )));
        }
        if self.find_watch_by_url(&url).await?.is_some() {
            return Err(AppError::InvalidWatch(format!("watch for {url} already exists")));
        }

        let id = sqlx::query(
            r#"
            INSERT INTO watches (url, search_term, search_type, price_low, price_high, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&url)
        .bind(&new.search_term)
        .bind(&new.search_type)
        .bind(i64::from(new.price_low))
        .bind(i64::from(new.price_high))
        .bind(now_secs())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(watch_id = id, url = %url, "Watch added");
        Ok(Watch {
            id,
            url,
            search_term: new.search_term,
            search_type: new.search_type,
            price_low: new.price_low,
            price_high: new.price_high,
        })
    }

    /// Delete a watch and its listings. Returns false when no such watch exists.
    pub async fn remove_watch(&self, watch_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM listings WHERE watch_id = ?")
            .bind(watch_id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM watches WHERE id = ?")
            .bind(watch_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if removed > 0 {
            info!(watch_id, "Watch removed");
        }
        Ok(removed > 0)
    }

    async fn find_watch_by_url(&self, url: &str) -> Result<Option<Watch>> {
        let row = sqlx::query_as::<_, WatchRow>(
            "SELECT id, url, search_term, search_type, price_low, price_high FROM watches WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Watch::try_from).transpose()
    }

    /// Forget every stored listing. Watches are kept; the next run reports everything as new.
    pub async fn clear_listings(&self) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM listings")
            .execute(&self.pool)
            .await?
            .rows_affected();
        info!(removed, "Listing catalog cleared");
        Ok(removed)
    }

    pub async fn listing_count(&self, watch_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings WHERE watch_id = ?")
            .bind(watch_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn load_watches(&self) -> Result<Vec<Watch>> {
        let rows = sqlx::query_as::<_, WatchRow>(
            "SELECT id, url, search_term, search_type, price_low, price_high FROM watches ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Watch::try_from).collect()
    }

    async fn get_watch(&self, watch_id: i64) -> Result<Option<Watch>> {
        let row = sqlx::query_as::<_, WatchRow>(
            "SELECT id, url, search_term, search_type, price_low, price_high FROM watches WHERE id = ?",
        )
        .bind(watch_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Watch::try_from).transpose()
    }

    async fn load_listings(&self, watch_id: i64) -> Result<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(
            "SELECT watch_id, listing_key, title, raw_price, url FROM listings WHERE watch_id = ?",
        )
        .bind(watch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn upsert_listings(&self, watch_id: i64, listings: &[Listing]) -> Result<()> {
        if listings.is_empty() {
            return Ok(());
        }

        let now = now_secs();
        // Dropping `tx` without commit rolls the whole batch back.
        let mut tx = self.pool.begin().await?;
        for listing in listings {
            sqlx::query(
                r#"
                INSERT INTO listings (watch_id, listing_key, title, raw_price, url, first_seen_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(watch_id, listing_key) DO UPDATE SET
                    title = excluded.title,
                    raw_price = excluded.raw_price,
                    url = excluded.url,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(watch_id)
            .bind(&listing.key)
            .bind(&listing.title)
            .bind(&listing.raw_price)
            .bind(&listing.url)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(watch_id, rows = listings.len(), "Listings upserted");
        Ok(())
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
pub(crate) mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    /// Fresh in-memory database. One connection so every query sees the same memory DB.
    pub(crate) async fn memory_repo() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteRepository::from_pool(pool).await.unwrap()
    }

    pub(crate) fn new_watch(url: &str, low: u32, high: u32) -> NewWatch {
        NewWatch {
            url: url.to_string(),
            search_term: "fahrrad".to_string(),
            search_type: "search".to_string(),
            price_low: low,
            price_high: high,
        }
    }

    fn listing(watch_id: i64, id: u32, price: &str) -> Listing {
        Listing::new(watch_id, format!("https://www.example.de/anzeige/{id}"), format!("Item {id}"), price)
    }

    #[tokio::test]
    async fn add_and_load_watch() {
        let repo = memory_repo().await;
        let added = repo.add_watch(new_watch("https://feed.example/a", 50, 100)).await.unwrap();

        let watches = repo.load_watches().await.unwrap();
        assert_eq!(watches, vec![added.clone()]);
        assert_eq!(repo.get_watch(added.id).await.unwrap(), Some(added));
    }

    #[tokio::test]
    async fn inverted_band_is_rejected() {
        let repo = memory_repo().await;
        let err = repo.add_watch(new_watch("https://feed.example/a", 100, 50)).await;
        assert!(matches!(err, Err(AppError::InvalidWatch(_))));
        assert!(repo.load_watches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_url_is_rejected() {
        let repo = memory_repo().await;
        repo.add_watch(new_watch("https://feed.example/a", 1, 2)).await.unwrap();
        let err = repo.add_watch(new_watch(" https://feed.example/a ", 1, 2)).await;
        assert!(matches!(err, Err(AppError::InvalidWatch(_))));
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates_price() {
        let repo = memory_repo().await;
        let w = repo.add_watch(new_watch("https://feed.example/a", 50, 100)).await.unwrap();

        repo.upsert_listings(w.id, &[listing(w.id, 1, "90 €"), listing(w.id, 2, "60 €")])
            .await
            .unwrap();
        repo.upsert_listings(w.id, &[listing(w.id, 1, "80 €")]).await.unwrap();

        let mut stored = repo.load_listings(w.id).await.unwrap();
        stored.sort_by(|a, b| a.key.cmp(&b.key));
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].raw_price, "80 €");
        assert_eq!(stored[1].raw_price, "60 €");
    }

    #[tokio::test]
    async fn failing_row_rolls_back_whole_batch() {
        let repo = memory_repo().await;
        let w = repo.add_watch(new_watch("https://feed.example/a", 50, 100)).await.unwrap();
        repo.upsert_listings(w.id, &[listing(w.id, 1, "90 €")]).await.unwrap();

        let mut bad = listing(w.id, 3, "70 €");
        bad.key.clear();
        let batch = vec![listing(w.id, 1, "10 €"), listing(w.id, 2, "20 €"), bad];

        assert!(repo.upsert_listings(w.id, &batch).await.is_err());

        let stored = repo.load_listings(w.id).await.unwrap();
        assert_eq!(stored, vec![listing(w.id, 1, "90 €")]);
    }

    #[tokio::test]
    async fn listings_are_scoped_per_watch() {
        let repo = memory_repo().await;
        let a = repo.add_watch(new_watch("https://feed.example/a", 1, 2)).await.unwrap();
        let b = repo.add_watch(new_watch("https://feed.example/b", 1, 2)).await.unwrap();

        repo.upsert_listings(a.id, &[listing(a.id, 1, "1 €")]).await.unwrap();

        assert_eq!(repo.listing_count(a.id).await.unwrap(), 1);
        assert!(repo.load_listings(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_watch_drops_its_listings() {
        let repo = memory_repo().await;
        let w = repo.add_watch(new_watch("https://feed.example/a", 1, 2)).await.unwrap();
        repo.upsert_listings(w.id, &[listing(w.id, 1, "1 €")]).await.unwrap();

        assert!(repo.remove_watch(w.id).await.unwrap());
        assert!(!repo.remove_watch(w.id).await.unwrap());
        assert_eq!(repo.listing_count(w.id).await.unwrap(), 0);
        assert!(repo.get_watch(w.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_keeps_watches() {
        let repo = memory_repo().await;
        let w = repo.add_watch(new_watch("https://feed.example/a", 1, 2)).await.unwrap();
        repo.upsert_listings(w.id, &[listing(w.id, 1, "1 €"), listing(w.id, 2, "2 €")])
            .await
            .unwrap();

        assert_eq!(repo.clear_listings().await.unwrap(), 2);
        assert_eq!(repo.load_watches().await.unwrap().len(), 1);
        assert!(repo.load_listings(w.id).await.unwrap().is_empty());
    }
}
