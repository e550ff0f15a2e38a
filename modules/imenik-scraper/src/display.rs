//! Console status line rendered from progress snapshots.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use imenik_common::ScrapeStatus;

use crate::progress::{counts, ProgressSnapshot};

/// `[done/total] Name (page/pages), ...` for every term currently in flight.
pub fn render_status(snapshot: &ProgressSnapshot) -> String {
    let (done, total) = counts(snapshot);
    let active: Vec<String> = snapshot
        .iter()
        .filter(|(_, s)| s.status == ScrapeStatus::Processing)
        .map(|(name, s)| format!("{name} ({}/{})", s.current_page, s.total_pages))
        .collect();

    if active.is_empty() {
        format!("[{done}/{total}]")
    } else {
        format!("[{done}/{total}] {}", active.join(", "))
    }
}

/// Log a status line whenever it changes. Ends when the tracker is dropped.
pub fn spawn_progress_reporter(mut rx: watch::Receiver<ProgressSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = String::new();
        while rx.changed().await.is_ok() {
            let line = render_status(&rx.borrow_and_update());
            if line != last {
                info!(target: "imenik::progress", "{line}");
                last = line;
            }
        }
    })
}
