use std::sync::Arc;

use tracing::debug;

use crate::alerts::Notifier;
use crate::error::Result;
use crate::types::{ChangeKind, ListingChange, PriceClassification, Watch};

/// Formats classified listings and hands them to the notifier.
///
/// There is no deduplication here: each call sends exactly one message, so
/// "alert once" depends on being fed the diff's delta only.
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn dispatch(
        &self,
        watch: &Watch,
        change: &ListingChange,
        outcome: &PriceClassification,
    ) -> Result<()> {
        let message = format_alert(watch, change, outcome);
        self.notifier.send(&message).await?;
        debug!(
            watch_id = watch.id,
            key = %change.listing.key,
            kind = %change.kind,
            position = %outcome.position,
            "Alert sent"
        );
        Ok(())
    }
}

/// One plain-text message per listing.
pub fn format_alert(watch: &Watch, change: &ListingChange, outcome: &PriceClassification) -> String {
    let listing = &change.listing;
    let mut lines = Vec::with_capacity(6);

    if !watch.search_term.is_empty() {
        lines.push(format!("🔍 {}", watch.search_term));
    }
    lines.push(listing.title.clone());

    let mut price_line = format!("💰 {}", listing.raw_price);
    if let Some(hint) = outcome.price_hint {
        price_line.push_str(&format!(" ({hint})"));
    }
    lines.push(price_line);

    if let ChangeKind::PriceChanged { previous_price } = &change.kind {
        lines.push(format!("Price changed, was {previous_price}"));
    }
    if let Some(range) = &outcome.price_range {
        lines.push(range.clone());
    }
    lines.push(listing.url.clone());

    lines.join("\n")
}
