use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use imenik_common::{ImenikError, Result};

use crate::extractor::parse_selector;

// --- PageFetcher trait ---

/// Renders a URL and returns the resulting DOM as HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// `wait_for` asks the renderer to hold until the selector matches.
    async fn fetch(&self, url: &str, wait_for: Option<&str>) -> Result<String>;
    fn name(&self) -> &str;
}

#[async_trait]
impl PageFetcher for browserless_client::BrowserlessClient {
    async fn fetch(&self, url: &str, wait_for: Option<&str>) -> Result<String> {
        self.content_with(browserless_client::ContentRequest {
            url,
            wait_for_selector: wait_for,
        })
        .await
        .map_err(|e| ImenikError::Navigation(format!("{url}: {e}")))
    }

    fn name(&self) -> &str {
        "browserless"
    }
}

// --- Browser / Page traits ---

/// Process-wide browser handle. Each caller opens its own isolated page.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Page>>;

    /// Best-effort teardown on process exit.
    async fn shutdown(&self) {}
}

#[async_trait]
pub trait Page: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;
    /// Fails with `ElementNotFound` once the wait gives up.
    async fn wait_for_selector(&mut self, selector: &str) -> Result<()>;
    /// Type `text` into the input matching `input_selector`, submit its form and
    /// wait for the resulting navigation to settle.
    async fn search(&mut self, input_selector: &str, text: &str) -> Result<()>;
    fn url(&self) -> Option<&Url>;
    fn html(&self) -> &str;
    async fn close(&mut self) -> Result<()>;
}

// --- Fetcher-backed browser ---

pub struct FetchingBrowser<F> {
    fetcher: Arc<F>,
    open_pages: Arc<AtomicUsize>,
}

impl<F: PageFetcher + 'static> FetchingBrowser<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        info!(fetcher = fetcher.name(), "Browser ready");
        Self {
            fetcher,
            open_pages: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F: PageFetcher + 'static> Browser for FetchingBrowser<F> {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        self.open_pages.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FetchedPage {
            fetcher: self.fetcher.clone(),
            open_pages: self.open_pages.clone(),
            url: None,
            html: String::new(),
            closed: false,
        }))
    }

    async fn shutdown(&self) {
        let open = self.open_pages();
        if open > 0 {
            warn!(open_pages = open, "Shutting down browser with pages still open");
        } else {
            info!("Browser shut down");
        }
    }
}

/// A page whose DOM is the last document returned by the fetcher.
struct FetchedPage<F> {
    fetcher: Arc<F>,
    open_pages: Arc<AtomicUsize>,
    url: Option<Url>,
    html: String,
    closed: bool,
}

impl<F> FetchedPage<F> {
    fn current_url(&self) -> String {
        self.url
            .as_ref()
            .map(Url::to_string)
            .unwrap_or_else(|| "about:blank".to_string())
    }
}

#[async_trait]
impl<F: PageFetcher + 'static> Page for FetchedPage<F> {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|e| ImenikError::Navigation(format!("invalid URL {url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ImenikError::Navigation(format!(
                "only http/https URLs are allowed, got: {}",
                parsed.scheme()
            )));
        }

        debug!(url, "Navigating");
        self.html = self.fetcher.fetch(url, None).await?;
        self.url = Some(parsed);
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str) -> Result<()> {
        if matches_selector(&self.html, selector)? {
            return Ok(());
        }

        // Not in the current DOM yet: re-render and let the browser wait for it.
        if let Some(url) = self.url.clone() {
            self.html = self.fetcher.fetch(url.as_str(), Some(selector)).await?;
            if matches_selector(&self.html, selector)? {
                return Ok(());
            }
        }

        Err(ImenikError::ElementNotFound {
            selector: selector.to_string(),
            url: self.current_url(),
        })
    }

    async fn search(&mut self, input_selector: &str, text: &str) -> Result<()> {
        let Some(page_url) = self.url.as_ref() else {
            return Err(ImenikError::Navigation(
                "cannot submit a search before navigating".to_string(),
            ));
        };
        let target = search_form_target(&self.html, page_url, input_selector, text)?;
        self.goto(target.as_str()).await
    }

    fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    fn html(&self) -> &str {
        &self.html
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.open_pages.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn matches_selector(html: &str, selector: &str) -> Result<bool> {
    let selector = parse_selector(selector)?;
    Ok(Html::parse_document(html).select(&selector).next().is_some())
}

/// Resolve the URL a GET form submission of `term` would navigate to.
///
/// The search input gets `term`; other named fields in the same form (inputs,
/// selects, textareas) keep their current values, minus buttons, unchecked
/// boxes and disabled fields. The search input is named, so the query is never
/// empty.
pub(crate) fn search_form_target(
    html: &str,
    page_url: &Url,
    input_selector: &str,
    term: &str,
) -> Result<Url> {
    let input_sel = parse_selector(input_selector)?;
    let field_sel = parse_selector("input[name], select[name], textarea[name]")?;
    let option_sel = parse_selector("option")?;
    let document = Html::parse_document(html);

    let input = document
        .select(&input_sel)
        .next()
        .ok_or_else(|| ImenikError::ElementNotFound {
            selector: input_selector.to_string(),
            url: page_url.to_string(),
        })?;

    if input.value().attr("name").is_none() {
        return Err(ImenikError::UnsupportedForm(
            "search input has no name attribute".to_string(),
        ));
    }

    let form = input
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "form")
        .ok_or_else(|| ImenikError::UnsupportedForm("search input is not inside a form".to_string()))?;

    let method = form.value().attr("method").unwrap_or("get");
    if !method.eq_ignore_ascii_case("get") {
        return Err(ImenikError::UnsupportedForm(format!(
            "form method {method} is not supported"
        )));
    }

    let mut target = match form.value().attr("action").map(str::trim) {
        Some(action) if !action.is_empty() => page_url
            .join(action)
            .map_err(|e| ImenikError::UnsupportedForm(format!("bad form action {action}: {e}")))?,
        _ => page_url.clone(),
    };
    target.set_fragment(None);

    let mut pairs: Vec<(String, String)> = Vec::new();
    for field in form.select(&field_sel) {
        let Some(name) = field.value().attr("name") else {
            continue;
        };
        if field.id() == input.id() {
            pairs.push((name.to_string(), term.to_string()));
            continue;
        }
        if field.value().attr("disabled").is_some() {
            continue;
        }

        let value = match field.value().name() {
            "select" => selected_option(field, &option_sel),
            "textarea" => Some(field.text().collect()),
            _ => input_value(field),
        };
        if let Some(value) = value {
            pairs.push((name.to_string(), value));
        }
    }

    target.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(target)
}

/// Submitted value of an `<input>`, or `None` when it is not submitted.
fn input_value(field: ElementRef<'_>) -> Option<String> {
    let kind = field
        .value()
        .attr("type")
        .unwrap_or("text")
        .to_ascii_lowercase();
    match kind.as_str() {
        "submit" | "button" | "image" | "reset" | "file" => None,
        "checkbox" | "radio" if field.value().attr("checked").is_none() => None,
        "checkbox" | "radio" => Some(field.value().attr("value").unwrap_or("on").to_string()),
        _ => Some(field.value().attr("value").unwrap_or("").to_string()),
    }
}

/// The selected option's value, falling back to the first option.
fn selected_option(select: ElementRef<'_>, option_sel: &Selector) -> Option<String> {
    let mut options = select.select(option_sel);
    let first = select.select(option_sel).next();
    let option = options
        .find(|o| o.value().attr("selected").is_some())
        .or(first)?;
    Some(match option.value().attr("value") {
        Some(value) => value.to_string(),
        None => option
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "form#search input[name='ime']";

    fn base() -> Url {
        Url::parse("https://imenik.test/").unwrap()
    }

    #[test]
    fn get_form_builds_query_from_term_and_hidden_fields() {
        let html = r#"
            <form id="search" action="/trazi" method="get">
              <input type="hidden" name="tip" value="osobe">
              <input type="text" name="ime" value="stale">
              <input type="checkbox" name="samo_mobiteli">
              <input type="submit" name="go" value="Traži">
            </form>"#;

        let target = search_form_target(html, &base(), INPUT, "Ivan Horvat").unwrap();

        assert_eq!(
            target.as_str(),
            "https://imenik.test/trazi?tip=osobe&ime=Ivan+Horvat"
        );
    }

    #[test]
    fn form_without_action_submits_to_current_page() {
        let html = r#"<form id="search"><input name="ime"></form>"#;
        let page = Url::parse("https://imenik.test/pretraga?stari=1#top").unwrap();

        let target = search_form_target(html, &page, INPUT, "Ana").unwrap();

        assert_eq!(target.as_str(), "https://imenik.test/pretraga?ime=Ana");
    }

    #[test]
    fn missing_input_is_element_not_found() {
        let html = r#"<form id="other"><input name="ime"></form>"#;
        let err = search_form_target(html, &base(), INPUT, "Ana").unwrap_err();
        assert!(matches!(err, ImenikError::ElementNotFound { .. }));
    }

    #[test]
    fn select_and_textarea_fields_are_submitted() {
        let html = r#"
            <form id="search" action="/trazi">
              <input name="ime">
              <select name="zupanija">
                <option value="">Sve</option>
                <option value="21" selected>Splitsko-dalmatinska</option>
              </select>
              <select name="vrsta"><option>osobe</option><option>tvrtke</option></select>
              <textarea name="napomena">x</textarea>
              <input name="stari" value="1" disabled>
            </form>"#;

        let target = search_form_target(html, &base(), INPUT, "Ana").unwrap();

        assert_eq!(
            target.as_str(),
            "https://imenik.test/trazi?ime=Ana&zupanija=21&vrsta=osobe&napomena=x"
        );
    }

    #[test]
    fn action_query_is_replaced_by_form_fields() {
        let html = r#"<form id="search" action="/trazi?stari=1"><input name="ime"></form>"#;
        let target = search_form_target(html, &base(), INPUT, "Ana").unwrap();
        assert_eq!(target.as_str(), "https://imenik.test/trazi?ime=Ana");
    }

    #[test]
    fn post_form_is_unsupported() {
        let html = r#"<form id="search" method="POST"><input name="ime"></form>"#;
        let err = search_form_target(html, &base(), INPUT, "Ana").unwrap_err();
        assert!(matches!(err, ImenikError::UnsupportedForm(_)));
    }

    #[test]
    fn matches_selector_reports_presence() {
        let html = r#"<form id="search"><input name="ime"></form>"#;
        assert!(matches_selector(html, INPUT).unwrap());
        assert!(!matches_selector("<p>loading</p>", INPUT).unwrap());
    }
}
