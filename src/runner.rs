use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::alerts::AlertDispatcher;
use crate::catalog::diff;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::fetcher::Fetcher;
use crate::pricing::classify;
use crate::types::Watch;

/// Outcome of processing one watch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatchReport {
    pub fetched: usize,
    pub new: usize,
    pub changed: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    /// Delta listings classified as not worth a message.
    pub alerts_skipped: usize,
    pub fetch_failed: bool,
}

/// Totals of one full pass over all watches.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub watches: usize,
    pub failed_watches: usize,
    pub fetch_failures: usize,
    pub fetched: usize,
    pub new: usize,
    pub changed: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub alerts_skipped: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &WatchReport) {
        if report.fetch_failed {
            self.fetch_failures += 1;
        }
        self.fetched += report.fetched;
        self.new += report.new;
        self.changed += report.changed;
        self.alerts_sent += report.alerts_sent;
        self.alerts_failed += report.alerts_failed;
        self.alerts_skipped += report.alerts_skipped;
    }
}

/// Runs fetch → diff → persist → classify → dispatch for every watch.
///
/// Collaborators are injected; nothing here holds global state. Watches are processed
/// through a bounded pool of `concurrency` in-flight watches (1 = sequential).
pub struct Runner {
    fetcher: Arc<dyn Fetcher>,
    repo: Arc<dyn Repository>,
    dispatcher: AlertDispatcher,
    concurrency: usize,
}

impl Runner {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        repo: Arc<dyn Repository>,
        dispatcher: AlertDispatcher,
        concurrency: usize,
    ) -> Self {
        Self { fetcher, repo, dispatcher, concurrency: concurrency.max(1) }
    }

    /// One full pass. With `notify == false` the catalog is updated silently
    /// (used to seed storage for new watches).
    pub async fn run(&self, notify: bool) -> Result<RunSummary> {
        let watches = self.repo.load_watches().await?;
        let mut summary = RunSummary { watches: watches.len(), ..Default::default() };

        let results: Vec<(i64, Result<WatchReport>)> = stream::iter(watches.iter())
            .map(|watch| async move { (watch.id, self.process_watch(watch, notify).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (watch_id, result) in results {
            match result {
                Ok(report) => summary.absorb(&report),
                Err(e) => {
                    // Upsert is transactional, so the watch's catalog is still at its pre-run state.
                    error!(watch_id, "Watch processing failed: {e}");
                    summary.failed_watches += 1;
                }
            }
        }

        info!(
            watches = summary.watches,
            failed = summary.failed_watches,
            fetch_failures = summary.fetch_failures,
            fetched = summary.fetched,
            new = summary.new,
            changed = summary.changed,
            sent = summary.alerts_sent,
            send_failed = summary.alerts_failed,
            skipped = summary.alerts_skipped,
            "Run complete: {} watches, +{} new, ~{} changed, {} alerts sent",
            summary.watches,
            summary.new,
            summary.changed,
            summary.alerts_sent,
        );
        Ok(summary)
    }

    /// Process the single watch `watch_id`, e.g. to seed a freshly added watch.
    pub async fn run_watch(&self, watch_id: i64, notify: bool) -> Result<WatchReport> {
        let watch = self
            .repo
            .get_watch(watch_id)
            .await?
            .ok_or_else(|| AppError::InvalidWatch(format!("no watch with id {watch_id}")))?;
        self.process_watch(&watch, notify).await
    }

    pub async fn process_watch(&self, watch: &Watch, notify: bool) -> Result<WatchReport> {
        info!(
            watch_id = watch.id,
            "Processing watch {} --- searching {} '{}', price range {} - {}",
            watch.id,
            watch.search_type,
            watch.search_term,
            watch.price_low,
            watch.price_high,
        );

        let mut report = WatchReport::default();

        let fresh = match self.fetcher.fetch(watch).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(watch_id = watch.id, "Fetch failed, treating as empty: {e}");
                report.fetch_failed = true;
                return Ok(report);
            }
        };
        report.fetched = fresh.len();
        if fresh.is_empty() {
            return Ok(report);
        }

        let stored = self.repo.load_listings(watch.id).await?;
        let delta = diff(watch.id, &stored, &fresh);
        report.new = delta.new_count();
        report.changed = delta.changed_count();
        if delta.is_empty() {
            return Ok(report);
        }

        // Persist before alerting: a failed write aborts the watch with nothing sent.
        self.repo.upsert_listings(watch.id, &delta.to_upsert).await?;

        if !notify {
            return Ok(report);
        }

        for change in &delta.delta {
            let outcome = classify(&change.listing.raw_price, watch.price_low, watch.price_high);
            if !outcome.worth_messaging {
                report.alerts_skipped += 1;
                continue;
            }
            match self.dispatcher.dispatch(watch, change, &outcome).await {
                Ok(()) => report.alerts_sent += 1,
                Err(e) => {
                    warn!(watch_id = watch.id, key = %change.listing.key, "Alert delivery failed: {e}");
                    report.alerts_failed += 1;
                }
            }
        }

        Ok(report)
    }
}
