//! Download one bid document to a local path.
//!
//! The invariant callers rely on: after a `download_document` call, the
//! destination path either holds the complete document (on `Ok`) or does
//! not exist at all (on `Err`). Partial files are removed before the error
//! is returned, so the parser never sees a truncated PDF.

use crate::error::{DownloadError, FetchError};
use crate::pipeline::retry::RetryPolicy;
use crate::portal::BidPortal;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fetch `url` into `dest`, retrying transient failures per `policy`.
///
/// An empty URL fails immediately without touching the network. On success
/// returns `dest`; the caller owns deleting the file when done with it.
pub async fn download_document(
    portal: &dyn BidPortal,
    url: &str,
    dest: &Path,
    policy: &RetryPolicy,
) -> Result<PathBuf, DownloadError> {
    if url.is_empty() {
        return Err(DownloadError::EmptyUrl);
    }

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let mut last_err: Option<FetchError> = None;
    let mut attempts = 0u32;

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            warn!(%url, attempt, max = policy.max_attempts, "retrying document download");
            policy.wait(attempt - 1).await;
        }
        attempts = attempt;

        match portal.fetch_document(url).await {
            Ok(bytes) => {
                debug!(%url, bytes = bytes.len(), dest = %dest.display(), "document downloaded");
                if let Err(e) = tokio::fs::write(dest, &bytes).await {
                    remove_partial(dest).await;
                    return Err(DownloadError::Io {
                        path: dest.to_path_buf(),
                        source: e,
                    });
                }
                return Ok(dest.to_path_buf());
            }
            Err(e) if e.is_transient() => {
                warn!(%url, attempt, error = %e, "document fetch failed");
                last_err = Some(e);
            }
            Err(e) => {
                remove_partial(dest).await;
                return Err(DownloadError::Fetch {
                    url: url.to_string(),
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }

    remove_partial(dest).await;
    Err(DownloadError::Fetch {
        url: url.to_string(),
        attempts,
        source: last_err.unwrap_or(FetchError::Other {
            detail: "no attempt was made".into(),
        }),
    })
}

/// Best-effort removal of a possibly-partial file.
async fn remove_partial(dest: &Path) {
    if tokio::fs::try_exists(dest).await.unwrap_or(false) {
        if let Err(e) = tokio::fs::remove_file(dest).await {
            warn!(path = %dest.display(), error = %e, "failed to remove partial download");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct ScriptedPortal {
        calls: AtomicU32,
        fail_first: u32,
        transient: bool,
        body: Vec<u8>,
    }

    #[async_trait]
    impl BidPortal for ScriptedPortal {
        async fn fetch_page(&self, _page: u32) -> Result<serde_json::Value, FetchError> {
            unreachable!("download tests never fetch listing pages")
        }

        async fn fetch_document(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                if self.transient {
                    Err(FetchError::Connect {
                        detail: "refused".into(),
                    })
                } else {
                    Err(FetchError::Status { status: 404 })
                }
            } else {
                Ok(self.body.clone())
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[tokio::test]
    async fn empty_url_makes_zero_fetch_calls() {
        let portal = ScriptedPortal {
            calls: AtomicU32::new(0),
            fail_first: 0,
            transient: true,
            body: b"%PDF-1.5".to_vec(),
        };
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("doc.pdf");

        let err = download_document(&portal, "", &dest, &fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::EmptyUrl));
        assert_eq!(portal.calls.load(Ordering::SeqCst), 0);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn writes_document_and_creates_parent_dir() {
        let portal = ScriptedPortal {
            calls: AtomicU32::new(0),
            fail_first: 0,
            transient: true,
            body: b"%PDF-1.5 sample".to_vec(),
        };
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("primary_1_0.pdf");

        let written = download_document(&portal, "https://portal.test/doc/1", &dest, &fast_policy())
            .await
            .unwrap();
        assert_eq!(written, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.5 sample");
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let portal = ScriptedPortal {
            calls: AtomicU32::new(0),
            fail_first: 2,
            transient: true,
            body: b"%PDF-1.5".to_vec(),
        };
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("doc.pdf");

        download_document(&portal, "https://portal.test/doc/2", &dest, &fast_policy())
            .await
            .unwrap();
        assert_eq!(portal.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_leave_no_file() {
        let portal = ScriptedPortal {
            calls: AtomicU32::new(0),
            fail_first: 10,
            transient: true,
            body: Vec::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("doc.pdf");

        let err = download_document(&portal, "https://portal.test/doc/3", &dest, &fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Fetch { attempts: 3, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn http_error_status_aborts_without_retry() {
        let portal = ScriptedPortal {
            calls: AtomicU32::new(0),
            fail_first: 10,
            transient: false,
            body: Vec::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("doc.pdf");

        let err = download_document(&portal, "https://portal.test/doc/4", &dest, &fast_policy())
            .await
            .unwrap_err();
        match err {
            DownloadError::Fetch { attempts, source, .. } => {
                assert_eq!(attempts, 1);
                assert!(matches!(source, FetchError::Status { status: 404 }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(portal.calls.load(Ordering::SeqCst), 1);
        assert!(!dest.exists());
    }
}
