//! Retry logic for transiently locked store files
//!
//! Only "file busy" conditions are retried. Every other I/O error is returned
//! immediately. This covers OS-level lock contention on one write; logical
//! serialization of writers is the job of the store's write lock.

use std::future::Future;
use std::io;
use std::time::Duration;

/// Fixed-delay retry policy for store replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(500),
        }
    }
}

/// Outcome of an exhausted or non-retryable operation
#[derive(Debug)]
pub struct RetryFailure {
    /// Attempts made, including the first
    pub attempts: u32,
    pub source: io::Error,
}

/// True for errors that mean "another process holds the file right now"
pub fn is_busy(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::ResourceBusy {
        return true;
    }

    #[cfg(unix)]
    {
        // EBUSY
        if err.raw_os_error() == Some(16) {
            return true;
        }
    }

    #[cfg(windows)]
    {
        // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
        if matches!(err.raw_os_error(), Some(32) | Some(33)) {
            return true;
        }
    }

    false
}

/// Run `operation`, retrying busy errors per `policy`
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If busy and retries remain: log WARN, sleep `policy.delay`, retry
/// 4. Otherwise return the error with the attempt count
pub async fn retry_on_busy<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        "Store operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if is_busy(&err) && attempt <= policy.max_retries => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = policy.delay.as_millis() as u64,
                    "Store file busy, will retry"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => {
                if is_busy(&err) {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        "Store file still busy, retries exhausted"
                    );
                }
                return Err(RetryFailure {
                    attempts: attempt,
                    source: err,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 5,
            delay: Duration::from_millis(1),
        }
    }

    fn busy() -> io::Error {
        io::Error::new(io::ErrorKind::ResourceBusy, "file in use")
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let result = retry_on_busy("test_op", fast_policy(), || async { Ok::<_, io::Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_succeeds_after_busy_errors() {
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result = retry_on_busy("test_op", fast_policy(), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(busy())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_five_retries() {
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result = retry_on_busy("test_op", fast_policy(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(busy()) }
        })
        .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.attempts, 6);
        assert_eq!(attempts.load(Ordering::SeqCst), 6);
        assert!(is_busy(&failure.source));
    }

    #[tokio::test]
    async fn test_other_errors_fail_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result = retry_on_busy("test_op", fast_policy(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(io::Error::new(io::ErrorKind::PermissionDenied, "denied")) }
        })
        .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
