//! Bounded retry for geocoding requests.
//!
//! Only transport failures (timeouts, connection errors), HTTP 429 and HTTP
//! 5xx are retried. Everything else, including unparseable bodies, fails on
//! the first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::LookupError;

pub const DEFAULT_ATTEMPTS: u32 = 2;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Runs `op` up to `attempts` times, doubling `backoff` between tries.
///
/// # Errors
///
/// Returns the last error once the attempt budget is spent, or the first
/// non-transient error.
pub async fn with_retry<T, F, Fut>(
    attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, LookupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LookupError>>,
{
    let attempts = attempts.max(1);
    let mut delay = backoff;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && is_transient(&e) => {
                warn!(attempt, attempts, error = %e, ?delay, "Transient geocoding failure, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!("retry loop always returns within the attempt budget")
}

/// Returns `true` if the error is likely transient and worth retrying.
pub fn is_transient(e: &LookupError) -> bool {
    match e {
        LookupError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        LookupError::Status(code) => *code == 429 || *code >= 500,
        LookupError::Response(_) | LookupError::Centroid { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(2, Duration::ZERO, || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LookupError::Status(503))
            } else {
                Ok("Wuhan")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "Wuhan");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(2, Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LookupError::Status(500))
        })
        .await;

        assert!(matches!(result, Err(LookupError::Status(500))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bad_response_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(3, Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LookupError::Response("missing formatted_address".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_client_errors_are_permanent() {
        assert!(!is_transient(&LookupError::Status(404)));
        assert!(is_transient(&LookupError::Status(429)));
        assert!(is_transient(&LookupError::Status(502)));
    }
}
