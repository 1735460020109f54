//! Configuration types for a bid acquisition run.
//!
//! All run behaviour is controlled through [`ScrapeConfig`], built via its
//! [`ScrapeConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across tasks, log them, and diff two runs to understand
//! why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest. `build()` is the single place where
//! required session tokens are validated, so a misconfigured run aborts
//! before any network call or output write.

use crate::error::HarvestError;
use crate::progress::ScrapeProgress;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default base URL of the bid portal.
pub const DEFAULT_API_BASE: &str = "https://bidplus.gem.gov.in";

/// Configuration for one acquisition run.
///
/// Built via [`ScrapeConfig::builder()`]. There is deliberately no
/// `Default`: the CSRF token and session cookie have no sensible defaults
/// and must be supplied.
///
/// # Example
/// ```rust
/// use bidharvest::ScrapeConfig;
///
/// let config = ScrapeConfig::builder()
///     .csrf_token("deadbeef")
///     .session_cookie("abc123")
///     .target_bid_count(50)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ScrapeConfig {
    /// Base URL of the bid portal. Default: [`DEFAULT_API_BASE`].
    pub api_base: String,

    /// CSRF token sent both as a form field and expected by the portal's
    /// cookie check. Required; `build()` rejects an empty value.
    pub csrf_token: String,

    /// `ci_session` cookie value identifying an authenticated browser
    /// session. Required; `build()` rejects an empty value.
    pub session_cookie: String,

    /// Stop after this many bids have been fully enriched. Default: 20.
    pub target_bid_count: usize,

    /// Stop immediately when a bid with this portal-internal id is seen.
    /// The matching bid itself is not processed.
    pub stop_bid_id: Option<String>,

    /// Stop immediately when a bid with this display number is seen.
    pub stop_bid_number: Option<String>,

    /// Maximum retry attempts for transient network failures. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 2000.
    ///
    /// Doubles after each attempt: 2 s → 4 s → 8 s, each with a small random
    /// jitter so repeated runs don't hammer the portal in lockstep.
    pub initial_backoff_ms: u64,

    /// Timeout for listing API requests in seconds. Default: 90.
    ///
    /// The listing endpoint is slow under load; 90 s matches what the portal
    /// itself tolerates before dropping the connection.
    pub api_timeout_secs: u64,

    /// Timeout for document downloads in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Randomised pause between successful listing pages, in milliseconds
    /// (inclusive min, inclusive max). Default: (1000, 3000).
    ///
    /// Paging as fast as possible gets sessions throttled. Tests set this to
    /// (0, 0).
    pub page_delay_ms: (u64, u64),

    /// Reference district list, one name per line. When `None`, district
    /// resolution is skipped and records carry the list-unavailable sentinel.
    pub district_file: Option<PathBuf>,

    /// Directory for per-bid temporary PDF downloads. Default: "pdfs".
    /// Created on demand; every file placed here is deleted before the next
    /// bid is processed.
    pub work_dir: PathBuf,

    /// Full-text search term for the listing API. Default: empty (all bids).
    pub search_term: String,

    /// Optional per-bid progress callback.
    pub progress_callback: Option<Arc<dyn ScrapeProgress>>,
}

impl fmt::Debug for ScrapeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeConfig")
            .field("api_base", &self.api_base)
            .field("csrf_token", &"<redacted>")
            .field("session_cookie", &"<redacted>")
            .field("target_bid_count", &self.target_bid_count)
            .field("stop_bid_id", &self.stop_bid_id)
            .field("stop_bid_number", &self.stop_bid_number)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("page_delay_ms", &self.page_delay_ms)
            .field("district_file", &self.district_file)
            .field("work_dir", &self.work_dir)
            .field("search_term", &self.search_term)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ScrapeProgress>"),
            )
            .finish()
    }
}

impl ScrapeConfig {
    /// Create a new builder for `ScrapeConfig`.
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder {
            config: ScrapeConfig {
                api_base: DEFAULT_API_BASE.to_string(),
                csrf_token: String::new(),
                session_cookie: String::new(),
                target_bid_count: 20,
                stop_bid_id: None,
                stop_bid_number: None,
                max_retries: 3,
                initial_backoff_ms: 2000,
                api_timeout_secs: 90,
                download_timeout_secs: 60,
                page_delay_ms: (1000, 3000),
                district_file: None,
                work_dir: PathBuf::from("pdfs"),
                search_term: String::new(),
                progress_callback: None,
            },
        }
    }
}

/// Builder for [`ScrapeConfig`].
#[derive(Debug)]
pub struct ScrapeConfigBuilder {
    config: ScrapeConfig,
}

impl ScrapeConfigBuilder {
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.config.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn csrf_token(mut self, token: impl Into<String>) -> Self {
        self.config.csrf_token = token.into();
        self
    }

    pub fn session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.config.session_cookie = cookie.into();
        self
    }

    pub fn target_bid_count(mut self, n: usize) -> Self {
        self.config.target_bid_count = n.max(1);
        self
    }

    pub fn stop_bid_id(mut self, id: impl Into<String>) -> Self {
        self.config.stop_bid_id = Some(id.into());
        self
    }

    pub fn stop_bid_number(mut self, number: impl Into<String>) -> Self {
        self.config.stop_bid_number = Some(number.into());
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.max(1);
        self
    }

    pub fn initial_backoff_ms(mut self, ms: u64) -> Self {
        self.config.initial_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn page_delay_ms(mut self, min: u64, max: u64) -> Self {
        self.config.page_delay_ms = (min.min(max), min.max(max));
        self
    }

    pub fn district_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.district_file = Some(path.into());
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn search_term(mut self, term: impl Into<String>) -> Self {
        self.config.search_term = term.into();
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ScrapeProgress>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating required fields.
    pub fn build(self) -> Result<ScrapeConfig, HarvestError> {
        let c = &self.config;
        if c.csrf_token.trim().is_empty() {
            return Err(HarvestError::InvalidConfig(
                "CSRF token is required and cannot be empty".into(),
            ));
        }
        if c.session_cookie.trim().is_empty() {
            return Err(HarvestError::InvalidConfig(
                "session cookie is required and cannot be empty".into(),
            ));
        }
        if c.api_base.is_empty() {
            return Err(HarvestError::InvalidConfig("API base URL cannot be empty".into()));
        }
        Ok(self.config)
    }
}
