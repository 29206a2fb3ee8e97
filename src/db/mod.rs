pub mod models;
pub mod repository;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Listing, Watch};

pub use repository::SqliteRepository;

/// Storage of watches and their listing catalogs, as seen by a run.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn load_watches(&self) -> Result<Vec<Watch>>;

    async fn get_watch(&self, watch_id: i64) -> Result<Option<Watch>>;

    async fn load_listings(&self, watch_id: i64) -> Result<Vec<Listing>>;

    /// Insert or update `listings` for one watch. All rows commit together or not at all.
    async fn upsert_listings(&self, watch_id: i64, listings: &[Listing]) -> Result<()>;
}
