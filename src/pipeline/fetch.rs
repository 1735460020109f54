//! Listing-page fetch with retry.
//!
//! Only transient failures (timeouts, connection errors) consume retry
//! budget. A definitive server answer — an HTTP error status or a body that
//! isn't the expected JSON — will not improve on retry and aborts
//! immediately.

use crate::error::FetchError;
use crate::pipeline::retry::RetryPolicy;
use crate::portal::BidPortal;
use tracing::warn;

/// Fetch one listing page, retrying transient failures per `policy`.
pub async fn fetch_page_with_retries(
    portal: &dyn BidPortal,
    page: u32,
    policy: &RetryPolicy,
) -> Result<serde_json::Value, FetchError> {
    let mut last_err: Option<FetchError> = None;

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            warn!(
                page,
                attempt,
                max = policy.max_attempts,
                "retrying listing page after transient failure"
            );
            policy.wait(attempt - 1).await;
        }

        match portal.fetch_page(page).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_transient() => {
                warn!(page, attempt, error = %e, "listing fetch failed");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or(FetchError::Other {
        detail: "no attempt was made".into(),
    }))
}
