use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::types::{ChangeKind, Listing, ListingChange};

/// Result of comparing a fresh fetch against the stored catalog of one watch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogDelta {
    /// Listings to write back (new identities and price changes).
    pub to_upsert: Vec<Listing>,
    /// New or price-changed listings, in fetch order.
    pub delta: Vec<ListingChange>,
}

impl CatalogDelta {
    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }

    pub fn new_count(&self) -> usize {
        self.delta.iter().filter(|c| c.kind == ChangeKind::New).count()
    }

    pub fn changed_count(&self) -> usize {
        self.delta.len() - self.new_count()
    }
}

/// Split a fresh fetch into new/changed listings.
///
/// Listings are matched by identity key. Stored listings missing from `fresh` are
/// never reported: an empty or partial fetch cannot delete anything.
pub fn diff(watch_id: i64, stored: &[Listing], fresh: &[Listing]) -> CatalogDelta {
    if fresh.is_empty() {
        return CatalogDelta::default();
    }

    let known: HashMap<&str, &Listing> = stored.iter().map(|l| (l.key.as_str(), l)).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(fresh.len());
    let mut out = CatalogDelta::default();

    for listing in fresh {
        if listing.watch_id != watch_id {
            warn!(
                watch_id,
                listing_watch_id = listing.watch_id,
                key = %listing.key,
                "Ignoring listing fetched for another watch"
            );
            continue;
        }
        // Same item listed twice on one page: first occurrence wins.
        if !seen.insert(listing.key.as_str()) {
            continue;
        }

        let kind = match known.get(listing.key.as_str()) {
            None => ChangeKind::New,
            Some(prev) if prev.raw_price != listing.raw_price => ChangeKind::PriceChanged {
                previous_price: prev.raw_price.clone(),
            },
            Some(_) => continue,
        };

        out.to_upsert.push(listing.clone());
        out.delta.push(ListingChange { listing: listing.clone(), kind });
    }

    debug!(
        watch_id,
        stored = stored.len(),
        fresh = fresh.len(),
        new = out.new_count(),
        changed = out.changed_count(),
        "Catalog diff complete"
    );

    out
}
