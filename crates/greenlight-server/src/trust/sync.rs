//! Authority feed client
//!
//! The remote authority publishes three feeds:
//! - status: JSON array of currently-valid key ids
//! - update: one certificate per response, paginated with the
//!   `X-RESUME-TOKEN` header and tagged with `X-KID`; any status other
//!   than `200 OK` terminates pagination
//! - settings: JSON array of `{name, type, value}` records
//!
//! [`AuthorityFeed`] is the seam the refresh logic runs against; tests
//! substitute a scripted implementation. [`HttpFeed`] is the production
//! client, with bounded timeouts and bounded retries with backoff for
//! transient transport failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::policy::SettingEntry;

/// Pagination header carrying the resume cursor
const RESUME_TOKEN_HEADER: &str = "X-RESUME-TOKEN";

/// Header tagging the returned certificate with its key id
const KID_HEADER: &str = "X-KID";

/// Initial backoff delay between retry attempts; doubles per attempt
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// Errors from the authority feeds
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("authority request failed: {0}")]
    Transport(String),

    /// Unexpected HTTP status from a non-paginated feed
    #[error("authority returned status {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    /// Response violates the feed contract
    #[error("malformed feed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

/// One step of certificate-feed pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedPage {
    /// A certificate plus the cursor for the next request
    Certificate {
        kid: String,
        body: String,
        next_cursor: String,
    },
    /// Non-success status: pagination is complete
    Done,
}

/// The remote authority's feed surface
#[async_trait]
pub trait AuthorityFeed: Send + Sync {
    /// Fetch the list of currently-valid key ids.
    async fn valid_kids(&self) -> Result<Vec<String>, SyncError>;

    /// Fetch one certificate, resuming from `cursor` (empty on the first
    /// call).
    async fn next_certificate(&self, cursor: &str) -> Result<FeedPage, SyncError>;

    /// Fetch the settings table wholesale.
    async fn settings(&self) -> Result<Vec<SettingEntry>, SyncError>;
}

/// Production feed client over the DGC gateway HTTP API
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HttpFeed {
    /// Build a client with a per-request timeout and bounded retries.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET with retry on transport errors only; HTTP statuses are
    /// semantic (pagination termination, feed errors) and never retried.
    async fn get_with_retry(
        &self,
        url: &str,
        cursor: Option<&str>,
    ) -> Result<reqwest::Response, SyncError> {
        let mut delay = INITIAL_BACKOFF;
        let mut attempt = 0;

        loop {
            let mut request = self.client.get(url);
            if let Some(cursor) = cursor {
                if !cursor.is_empty() {
                    request = request.header(RESUME_TOKEN_HEADER, cursor);
                }
            }

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < self.max_retries => {
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        error = %err,
                        "authority fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[async_trait]
impl AuthorityFeed for HttpFeed {
    async fn valid_kids(&self) -> Result<Vec<String>, SyncError> {
        let url = self.url("/v1/dgc/signercertificate/status");
        let response = self.get_with_retry(&url, None).await?;

        if !response.status().is_success() {
            return Err(SyncError::Status {
                endpoint: url,
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    async fn next_certificate(&self, cursor: &str) -> Result<FeedPage, SyncError> {
        let url = self.url("/v1/dgc/signercertificate/update");
        let response = self.get_with_retry(&url, Some(cursor)).await?;

        // Only 200 continues pagination; the gateway signals end-of-feed
        // with 204 and anything else is equally terminal.
        if response.status() != StatusCode::OK {
            debug!(status = %response.status(), "certificate pagination complete");
            return Ok(FeedPage::Done);
        }

        let header = |name: &str| -> Result<String, SyncError> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| SyncError::Malformed(format!("missing {name} header")))
        };

        let kid = header(KID_HEADER)?;
        let next_cursor = header(RESUME_TOKEN_HEADER)?;

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(SyncError::Malformed("empty certificate body".into()));
        }

        Ok(FeedPage::Certificate {
            kid,
            body,
            next_cursor,
        })
    }

    async fn settings(&self) -> Result<Vec<SettingEntry>, SyncError> {
        let url = self.url("/v1/dgc/settings");
        let response = self.get_with_retry(&url, None).await?;

        if !response.status().is_success() {
            return Err(SyncError::Status {
                endpoint: url,
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}
