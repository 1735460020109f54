//! Error types for the bidharvest library.
//!
//! Two tiers of error reflect two tiers of failure:
//!
//! * [`HarvestError`] — **Fatal**: the run cannot proceed or cannot persist
//!   its output (invalid configuration, the very first listing page is
//!   unreachable, the output file cannot be written). Returned as
//!   `Err(HarvestError)` from the top-level `scrape*` functions.
//!
//! * [`FetchError`], [`DownloadError`], [`ParseError`] — **Step-level**: a
//!   single network call, document download, or PDF parse failed. The
//!   orchestrator degrades these to sentinel text on the affected bid and
//!   keeps going, so one broken document never discards a whole run.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the bidharvest library.
///
/// Per-bid failures use the step-level error types and are recorded as
/// sentinel strings in [`crate::records::DistrictMatch`] rather than
/// propagated here.
#[derive(Debug, Error)]
pub enum HarvestError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Acquisition errors ────────────────────────────────────────────────
    /// The first listing page could not be fetched; there is nothing to
    /// persist and the session tokens are probably wrong or expired.
    #[error("First listing page unavailable: {source}\nCheck the CSRF token and session cookie.")]
    FirstPageUnavailable {
        #[source]
        source: FetchError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failure of one HTTP request against the bid portal.
///
/// [`FetchError::is_transient`] decides whether the retry loop may attempt
/// the request again.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request exceeded its configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// TCP/TLS connection could not be established.
    #[error("connection failed: {detail}")]
    Connect { detail: String },

    /// The server answered with a non-success HTTP status.
    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    /// The response body was not the expected JSON shape.
    #[error("malformed response body: {detail}")]
    Malformed { detail: String },

    /// Any other request failure.
    #[error("request failed: {detail}")]
    Other { detail: String },
}

impl FetchError {
    /// Transient failures are worth retrying with backoff; a definitive
    /// server answer (an HTTP status, a malformed body) is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout { .. } | FetchError::Connect { .. })
    }
}

/// A failure while downloading one bid document to disk.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The record carries no document URL; no request was made.
    #[error("no document URL for this bid")]
    EmptyUrl,

    /// All attempts were exhausted or a non-retryable fetch error occurred.
    #[error("download of '{url}' failed after {attempts} attempt(s): {source}")]
    Fetch {
        url: String,
        attempts: u32,
        #[source]
        source: FetchError,
    },

    /// The bytes arrived but could not be written locally.
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A failure while extracting structure from a downloaded PDF.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be opened or recognised as a PDF.
    #[error("failed to open '{path}': {detail}")]
    Open { path: PathBuf, detail: String },

    /// The blocking parse task was cancelled or panicked.
    #[error("parse task failed: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_unavailable_display() {
        let e = HarvestError::FirstPageUnavailable {
            source: FetchError::Timeout { secs: 90 },
        };
        let msg = e.to_string();
        assert!(msg.contains("First listing page"), "got: {msg}");
        assert!(msg.contains("CSRF"), "got: {msg}");
    }

    #[test]
    fn timeout_and_connect_are_transient() {
        assert!(FetchError::Timeout { secs: 60 }.is_transient());
        assert!(FetchError::Connect {
            detail: "refused".into()
        }
        .is_transient());
    }

    #[test]
    fn status_and_malformed_are_not_transient() {
        assert!(!FetchError::Status { status: 404 }.is_transient());
        assert!(!FetchError::Malformed {
            detail: "not json".into()
        }
        .is_transient());
    }

    #[test]
    fn download_fetch_display_names_url_and_attempts() {
        let e = DownloadError::Fetch {
            url: "https://example.test/doc/1".into(),
            attempts: 3,
            source: FetchError::Timeout { secs: 60 },
        };
        let msg = e.to_string();
        assert!(msg.contains("example.test"), "got: {msg}");
        assert!(msg.contains("3 attempt"), "got: {msg}");
    }

    #[test]
    fn parse_open_display_names_path() {
        let e = ParseError::Open {
            path: PathBuf::from("/tmp/primary_1_0.pdf"),
            detail: "bad xref".into(),
        };
        assert!(e.to_string().contains("primary_1_0.pdf"));
    }
}
