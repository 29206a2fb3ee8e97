use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::types::{Listing, Watch};

/// Produces the current listings of a watch. Either the complete result page or an
/// error; never a partial page.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, watch: &Watch) -> Result<Vec<Listing>>;
}

/// Fetches a JSON listing feed from `watch.url`.
///
/// Accepted shapes: a bare array of listing objects, or an object carrying that array
/// under `listings`. Each object needs `url`; `title` and `price` are optional and
/// `price` may be a string or a number.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, watch: &Watch) -> Result<Vec<Listing>> {
        let resp: serde_json::Value = self
            .client
            .get(&watch.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let listings = parse_feed(watch.id, &resp);
        debug!(watch_id = watch.id, count = listings.len(), "Feed fetched");
        Ok(listings)
    }
}

/// Parse a feed document into listings of `watch_id`. Unusable entries are skipped.
pub fn parse_feed(watch_id: i64, v: &serde_json::Value) -> Vec<Listing> {
    let items = match v.as_array().or_else(|| v.get("listings").and_then(|l| l.as_array())) {
        Some(items) => items,
        None => {
            warn!(watch_id, "Feed response has no listing array");
            return Vec::new();
        }
    };

    let mut skipped = 0usize;
    let listings: Vec<Listing> = items
        .iter()
        .filter_map(|item| {
            let parsed = parse_listing(watch_id, item);
            if parsed.is_none() {
                skipped += 1;
            }
            parsed
        })
        .collect();

    if skipped > 0 {
        debug!(watch_id, skipped, "Feed entries without url skipped");
    }
    listings
}

fn parse_listing(watch_id: i64, v: &serde_json::Value) -> Option<Listing> {
    let url = v.get("url")?.as_str()?.trim();
    if url.is_empty() {
        return None;
    }

    let title = v
        .get("title")
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    let raw_price = match v.get("price") {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    Some(Listing::new(watch_id, url, title, raw_price))
}
