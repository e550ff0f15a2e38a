use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use imenik_common::Entry;

use crate::cache::ResultCache;
use crate::progress::ProgressTracker;
use crate::session::NameScraper;
use crate::stats::RunStats;
use crate::store::OutputWriter;

/// Entries and stats from one `scrape_by_names` call.
#[derive(Debug)]
pub struct RunOutcome {
    pub entries: Vec<Entry>,
    pub stats: RunStats,
}

/// Runs names through [`NameScraper`] in fixed-size concurrent batches,
/// checkpointing the output after every batch.
#[derive(Clone, TypedBuilder)]
pub struct Orchestrator {
    scraper: Arc<NameScraper>,
    progress: Arc<ProgressTracker>,
    output: OutputWriter,
    /// Names per batch, and the number of sessions in flight at once.
    #[builder(default = 10)]
    batch_size: usize,
}

impl Orchestrator {
    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Scrape every name not already in `cache`.
    ///
    /// `names` must already be deduplicated. With `bypass_cache` set, cached
    /// terms are scraped again and the cache is left untouched.
    pub async fn scrape_by_names(
        &self,
        names: &[String],
        cache: &mut ResultCache,
        bypass_cache: bool,
    ) -> RunOutcome {
        let use_cache = !bypass_cache;
        let mut stats = RunStats {
            terms_total: names.len() as u32,
            ..RunStats::default()
        };

        for name in names {
            self.progress.set_pending(name);
        }

        // Cache hits are resolved up front and never reach a batch.
        let mut accumulated: Vec<Entry> = Vec::new();
        let mut misses: Vec<&str> = Vec::new();
        for name in names {
            match cache.get(name).filter(|_| use_cache) {
                Some(cached) => {
                    self.progress.complete_from_cache(name);
                    accumulated.extend_from_slice(cached);
                    stats.terms_cached += 1;
                }
                None => misses.push(name),
            }
        }

        let batch_size = self.batch_size.max(1);
        let total_batches = misses.len().div_ceil(batch_size);
        info!(
            names = names.len(),
            cached = stats.terms_cached,
            to_scrape = misses.len(),
            batch_size,
            total_batches,
            "Starting scrape"
        );

        for (index, batch) in misses.chunks(batch_size).enumerate() {
            info!(batch = index + 1, total_batches, names = batch.len(), "Starting batch");

            let results = self.run_batch(batch, batch_size).await;

            for (name, result) in results {
                match result {
                    Some(entries) => {
                        stats.terms_scraped += 1;
                        if use_cache && !entries.is_empty() {
                            cache.insert(name, entries.clone());
                        }
                        accumulated.extend(entries);
                    }
                    None => stats.terms_failed += 1,
                }
            }
            stats.batches += 1;

            self.checkpoint(&accumulated).await;
            info!(
                batch = index + 1,
                total_batches,
                entries = accumulated.len(),
                "Batch complete"
            );
        }

        // Also covers runs where every name came from the cache.
        self.checkpoint(&accumulated).await;

        stats.entries_saved = accumulated.len() as u32;
        RunOutcome {
            entries: accumulated,
            stats,
        }
    }

    /// Run one batch's sessions concurrently. Results come back in batch order;
    /// a failed name yields `None` and is marked completed.
    async fn run_batch<'a>(
        &self,
        batch: &[&'a str],
        concurrency: usize,
    ) -> Vec<(&'a str, Option<Vec<Entry>>)> {
        stream::iter(batch.iter().copied().map(|name| async move {
            match self.scraper.scrape_by_name(name, &self.progress).await {
                Ok(entries) => (name, Some(entries)),
                Err(e) => {
                    warn!(name, error = %e, "Scrape failed, continuing with empty result");
                    self.progress.complete(name);
                    (name, None)
                }
            }
        }))
        .buffered(concurrency)
        .collect()
        .await
    }

    async fn checkpoint(&self, entries: &[Entry]) {
        if let Err(e) = self.output.write(entries).await {
            warn!(
                path = %self.output.path().display(),
                error = %e,
                "Failed to write output checkpoint"
            );
        }
    }
}
