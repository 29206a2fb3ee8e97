//! Database row types matching `migrations/`.
//! Used by sqlx for typed queries.

use crate::error::AppError;
use crate::types::{Listing, Watch};

#[derive(Debug, sqlx::FromRow)]
pub struct WatchRow {
    pub id: i64,
    pub url: String,
    pub search_term: String,
    pub search_type: String,
    pub price_low: i64,
    pub price_high: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ListingRow {
    pub watch_id: i64,
    pub listing_key: String,
    pub title: String,
    pub raw_price: String,
    pub url: String,
}

impl TryFrom<WatchRow> for Watch {
    type Error = AppError;

    fn try_from(row: WatchRow) -> Result<Self, Self::Error> {
        let price_low = u32::try_from(row.price_low)
            .map_err(|_| AppError::InvalidWatch(format!("watch {}: price_low {} out of range", row.id, row.price_low)))?;
        let price_high = u32::try_from(row.price_high)
            .map_err(|_| AppError::InvalidWatch(format!("watch {}: price_high {} out of range", row.id, row.price_high)))?;
        Ok(Watch {
            id: row.id,
            url: row.url,
            search_term: row.search_term,
            search_type: row.search_type,
            price_low,
            price_high,
        })
    }
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        Listing {
            key: row.listing_key,
            watch_id: row.watch_id,
            title: row.title,
            raw_price: row.raw_price,
            url: row.url,
        }
    }
}
