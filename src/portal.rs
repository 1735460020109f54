//! Access to the bid portal: listing pages and document downloads.
//!
//! [`BidPortal`] is the seam between the pipeline and the network. The
//! production implementation is [`HttpPortal`]; tests substitute in-memory
//! fakes so retry behaviour, sentinel stops, and cleanup invariants can be
//! exercised without a server.
//!
//! Retry logic deliberately lives *above* this trait (in
//! [`crate::pipeline::fetch`] and [`crate::pipeline::download`]): a portal
//! performs exactly one attempt per call, so fakes observe every attempt.

use crate::config::ScrapeConfig;
use crate::error::{FetchError, HarvestError};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// One-attempt access to the bid portal.
#[async_trait]
pub trait BidPortal: Send + Sync {
    /// Fetch one listing page (1-indexed) and return the raw JSON body.
    async fn fetch_page(&self, page: u32) -> Result<serde_json::Value, FetchError>;

    /// Fetch one document and return its raw bytes.
    async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// reqwest-backed portal client.
///
/// Two separate clients carry the two timeout regimes: the listing endpoint
/// is slow under load (90 s default) while document downloads are expected
/// to complete faster (60 s default).
pub struct HttpPortal {
    api_client: reqwest::Client,
    doc_client: reqwest::Client,
    api_base: String,
    csrf_token: String,
    session_cookie: String,
    search_term: String,
    api_timeout_secs: u64,
    download_timeout_secs: u64,
}

impl HttpPortal {
    /// Build a portal client from run configuration.
    pub fn new(config: &ScrapeConfig) -> Result<Self, HarvestError> {
        let api_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| HarvestError::Internal(format!("HTTP client: {e}")))?;
        let doc_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .map_err(|e| HarvestError::Internal(format!("HTTP client: {e}")))?;

        Ok(HttpPortal {
            api_client,
            doc_client,
            api_base: config.api_base.clone(),
            csrf_token: config.csrf_token.clone(),
            session_cookie: config.session_cookie.clone(),
            search_term: config.search_term.clone(),
            api_timeout_secs: config.api_timeout_secs,
            download_timeout_secs: config.download_timeout_secs,
        })
    }

    /// The JSON `payload` form field the listing endpoint expects.
    fn listing_payload(&self, page: u32) -> String {
        json!({
            "page": page,
            "param": {
                "searchBid": self.search_term,
                "searchType": "fullText",
            },
            "filter": {
                "bidStatusType": "ongoing_bids",
                "byType": "all",
                "sort": "Bid-Start-Date-Latest",
            },
        })
        .to_string()
    }

    fn cookie_header(&self) -> String {
        format!(
            "csrf_gem_cookie={}; ci_session={}",
            self.csrf_token, self.session_cookie
        )
    }
}

#[async_trait]
impl BidPortal for HttpPortal {
    async fn fetch_page(&self, page: u32) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}/all-bids-data", self.api_base);
        debug!(page, %url, "fetching listing page");

        let response = self
            .api_client
            .post(&url)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Cookie", self.cookie_header())
            .form(&[
                ("payload", self.listing_payload(page)),
                ("csrf_bd_gem_nk", self.csrf_token.clone()),
            ])
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, self.api_timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| FetchError::Malformed {
            detail: e.to_string(),
        })
    }

    async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(%url, "fetching document");

        let response = self
            .doc_client
            .get(url)
            .header("Cookie", self.cookie_header())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, self.download_timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(e, self.download_timeout_secs))?;
        Ok(bytes.to_vec())
    }
}

/// Map a reqwest error onto the retry taxonomy.
fn classify_reqwest_error(e: reqwest::Error, timeout_secs: u64) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { secs: timeout_secs }
    } else if e.is_connect() {
        FetchError::Connect {
            detail: e.to_string(),
        }
    } else if let Some(status) = e.status() {
        FetchError::Status {
            status: status.as_u16(),
        }
    } else if e.is_decode() {
        FetchError::Malformed {
            detail: e.to_string(),
        }
    } else {
        FetchError::Other {
            detail: e.to_string(),
        }
    }
}
