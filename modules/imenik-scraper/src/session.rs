use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use imenik_common::{DirectorySelectors, Entry, ImenikError, Result};

use crate::browser::{Browser, Page};
use crate::extractor::PageExtractor;
use crate::progress::ProgressTracker;

/// Drives a single search term through search and pagination.
pub struct NameScraper {
    browser: Arc<dyn Browser>,
    extractor: PageExtractor,
    base_url: String,
    search_input: String,
}

impl NameScraper {
    pub fn new(
        browser: Arc<dyn Browser>,
        base_url: &str,
        selectors: &DirectorySelectors,
    ) -> Result<Self> {
        Ok(Self {
            browser,
            extractor: PageExtractor::new(selectors)?,
            base_url: base_url.to_string(),
            search_input: selectors.search_input.clone(),
        })
    }

    /// Scrape every result page for `name`.
    ///
    /// All-or-nothing: any navigation or element failure is returned as an
    /// error. The page is closed on every path.
    pub async fn scrape_by_name(&self, name: &str, progress: &ProgressTracker) -> Result<Vec<Entry>> {
        progress.start(name);

        let result = match self.browser.new_page().await {
            Ok(mut page) => {
                let result = self.run(page.as_mut(), name, progress).await;
                if let Err(e) = page.close().await {
                    warn!(name, error = %e, "Failed to close page");
                }
                result
            }
            Err(e) => Err(e),
        };

        progress.complete(name);
        result
    }

    async fn run(&self, page: &mut dyn Page, name: &str, progress: &ProgressTracker) -> Result<Vec<Entry>> {
        page.goto(&self.base_url).await?;
        page.wait_for_selector(&self.search_input).await?;
        page.search(&self.search_input, name).await?;

        let mut entries = self.extractor.extract(page.html());
        progress.set_current_page(name, 1);

        let links = self.extractor.pagination_links(page.html());
        if !links.is_empty() {
            progress.set_total_pages(name, links.len() as u32 + 1);
        }

        let origin = page_origin(page)?;
        for link in &links {
            let url = origin
                .join(link)
                .map_err(|e| ImenikError::Navigation(format!("bad pagination link {link}: {e}")))?;
            page.goto(url.as_str()).await?;
            progress.advance_page(name);
            entries.extend(self.extractor.extract(page.html()));
        }

        info!(name, pages = links.len() + 1, entries = entries.len(), "Name scraped");
        Ok(entries)
    }
}

/// `scheme://host[:port]/` of the page's current URL.
fn page_origin(page: &dyn Page) -> Result<Url> {
    let current = page
        .url()
        .ok_or_else(|| ImenikError::Navigation("page has no URL after search".to_string()))?;
    Url::parse(&current.origin().ascii_serialization())
        .map_err(|e| ImenikError::Navigation(format!("no usable origin for {current}: {e}")))
}
