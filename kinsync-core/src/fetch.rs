//! Feed retrieval.
//!
//! The scheduler only needs "give me the text behind this URL". Keeping that
//! behind a trait lets tests and embedding applications supply their own
//! transport.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::FetchError;
use crate::validate::{check_public_host, fetch_url};

const MAX_REDIRECTS: usize = 10;

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError>;
}

/// HTTPS fetcher backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::custom(|attempt| {
                match check_redirect(attempt.url(), attempt.previous().len()) {
                    Ok(()) => attempt.follow(),
                    Err(reason) => attempt.error(reason),
                }
            }))
            .timeout(timeout)
            .user_agent(concat!("kinsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(HttpFetcher { client, timeout })
    }
}

/// Redirects are held to the same rules as the feed URL itself. `previous`
/// counts every URL already requested, the original included.
fn check_redirect(next: &Url, previous: usize) -> Result<(), String> {
    if previous > MAX_REDIRECTS {
        return Err(format!("gave up after {} redirects", MAX_REDIRECTS));
    }
    if next.scheme() != "https" {
        return Err(format!("refused redirect to a {} URL", next.scheme()));
    }
    check_public_host(next).map_err(|e| format!("refused redirect: {}", e))
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(fetch_url(url))
            .header("Accept", "text/calendar, text/plain;q=0.9, */*;q=0.5")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.timeout.as_secs())
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}
