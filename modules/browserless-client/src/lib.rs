pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::Serialize;

/// Navigation is considered settled once the network has been idle
/// (at most two open connections) for 500ms.
const WAIT_UNTIL: &str = "networkidle2";

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    navigation_timeout: Option<Duration>,
    wait_timeout: Option<Duration>,
}

/// Options for a single `/content` render.
#[derive(Debug, Clone, Default)]
pub struct ContentRequest<'a> {
    pub url: &'a str,
    /// Block inside the browser until this CSS selector matches.
    pub wait_for_selector: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentBody<'a> {
    url: &'a str,
    goto_options: GotoOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for_selector: Option<WaitForSelector<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions {
    wait_until: &'static str,
    /// Milliseconds; 0 disables the browser-side timeout.
    timeout: u64,
}

#[derive(Serialize)]
struct WaitForSelector<'a> {
    selector: &'a str,
    timeout: u64,
}

impl BrowserlessClient {
    /// Build a client. `None` timeouts mean wait forever, both in the browser
    /// and on the HTTP request itself.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        navigation_timeout: Option<Duration>,
        wait_timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request_timeout(navigation_timeout, wait_timeout) {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BrowserlessError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            navigation_timeout,
            wait_timeout,
        })
    }

    /// Render a page, optionally waiting for a selector before the DOM is dumped.
    pub async fn content_with(&self, request: ContentRequest<'_>) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = ContentBody {
            url: request.url,
            goto_options: GotoOptions {
                wait_until: WAIT_UNTIL,
                timeout: millis(self.navigation_timeout),
            },
            wait_for_selector: request.wait_for_selector.map(|selector| WaitForSelector {
                selector,
                timeout: millis(self.wait_timeout),
            }),
        };

        tracing::debug!(
            url = request.url,
            wait_for = request.wait_for_selector.unwrap_or(""),
            "Browserless content request"
        );

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

/// The HTTP call covers navigation plus the selector wait, so it is bounded
/// only when both are.
fn request_timeout(navigation: Option<Duration>, wait: Option<Duration>) -> Option<Duration> {
    Some(navigation? + wait?)
}

fn millis(timeout: Option<Duration>) -> u64 {
    timeout.map(|d| d.as_millis() as u64).unwrap_or(0)
}
