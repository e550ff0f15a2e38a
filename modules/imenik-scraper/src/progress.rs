//! Per-term progress, owned by the run and published as snapshots.

use std::collections::BTreeMap;

use tokio::sync::watch;

use imenik_common::{NameStatus, ScrapeStatus};

pub type ProgressSnapshot = BTreeMap<String, NameStatus>;

/// Shared progress state. Writers mutate through `&self`; readers either take a
/// [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe) to changes.
pub struct ProgressTracker {
    tx: watch::Sender<ProgressSnapshot>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::new());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }

    pub fn get(&self, name: &str) -> Option<NameStatus> {
        self.tx.borrow().get(name).copied()
    }

    fn update(&self, name: &str, f: impl FnOnce(&mut NameStatus)) {
        self.tx.send_modify(|map| f(map.entry(name.to_string()).or_default()));
    }

    pub fn set_pending(&self, name: &str) {
        self.tx.send_modify(|map| {
            map.insert(name.to_string(), NameStatus::default());
        });
    }

    pub fn start(&self, name: &str) {
        self.update(name, |s| s.status = ScrapeStatus::Processing);
    }

    pub fn set_total_pages(&self, name: &str, total_pages: u32) {
        self.update(name, |s| s.total_pages = total_pages.max(1));
    }

    pub fn set_current_page(&self, name: &str, page: u32) {
        self.update(name, |s| s.current_page = page);
    }

    pub fn advance_page(&self, name: &str) {
        self.update(name, |s| s.current_page += 1);
    }

    pub fn complete(&self, name: &str) {
        self.update(name, |s| s.status = ScrapeStatus::Completed);
    }

    /// Resolved without a session: completed with the cursor at the last page.
    pub fn complete_from_cache(&self, name: &str) {
        self.update(name, |s| {
            s.current_page = s.total_pages;
            s.status = ScrapeStatus::Completed;
        });
    }

    /// `(completed, total)` over every tracked term.
    pub fn counts(&self) -> (usize, usize) {
        counts(&self.tx.borrow())
    }
}

pub fn counts(snapshot: &ProgressSnapshot) -> (usize, usize) {
    let done = snapshot
        .values()
        .filter(|s| s.status == ScrapeStatus::Completed)
        .count();
    (done, snapshot.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imenik_common::DEFAULT_TOTAL_PAGES;

    #[test]
    fn lifecycle_moves_pending_processing_completed() {
        let tracker = ProgressTracker::new();
        tracker.set_pending("Ivan");
        assert_eq!(tracker.get("Ivan").unwrap().status, ScrapeStatus::Pending);

        tracker.start("Ivan");
        tracker.set_current_page("Ivan", 1);
        tracker.set_total_pages("Ivan", 3);
        tracker.advance_page("Ivan");
        assert_eq!(
            tracker.get("Ivan").unwrap(),
            NameStatus {
                current_page: 2,
                total_pages: 3,
                status: ScrapeStatus::Processing,
            }
        );

        tracker.complete("Ivan");
        assert_eq!(tracker.get("Ivan").unwrap().status, ScrapeStatus::Completed);
    }

    #[test]
    fn cache_completion_puts_cursor_on_last_page() {
        let tracker = ProgressTracker::new();
        tracker.set_pending("Ana");
        tracker.complete_from_cache("Ana");

        let status = tracker.get("Ana").unwrap();
        assert_eq!(status.current_page, DEFAULT_TOTAL_PAGES);
        assert_eq!(status.total_pages, DEFAULT_TOTAL_PAGES);
        assert_eq!(status.status, ScrapeStatus::Completed);
    }

    #[test]
    fn subscribers_see_updates() {
        let tracker = ProgressTracker::new();
        let mut rx = tracker.subscribe();
        tracker.set_pending("Ivan");

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().contains_key("Ivan"));
    }

    #[test]
    fn counts_completed_over_total() {
        let tracker = ProgressTracker::new();
        tracker.set_pending("a");
        tracker.set_pending("b");
        tracker.complete("a");
        assert_eq!(tracker.counts(), (1, 2));
    }
}
