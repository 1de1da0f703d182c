//! Async retry with a fixed delay between attempts

use std::future::Future;
use std::time::Duration;

/// Retry an async operation up to `max_attempts` times, sleeping `delay`
/// between failures.
///
/// Returns `Ok((value, attempts))` on success, or `Err((last_error, attempts))`
/// once the attempts are used up. `max_attempts` of 0 is treated as 1.
pub async fn retry_fixed_async<T, E, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    mut operation: F,
) -> Result<(T, u32), (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok((value, attempts)),
            Err(e) => {
                if attempts >= max_attempts {
                    return Err((e, attempts));
                }
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_success_on_first_try() {
        let result = retry_fixed_async(3, Duration::from_millis(10), || async {
            Ok::<_, &str>(7)
        })
        .await;
        assert_eq!(result, Ok((7, 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_retry() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result = retry_fixed_async(3, Duration::from_secs(2), || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call < 3 {
                    Err("transient error")
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result, Ok((3, 3)));
        // Two fixed delays, no growth
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_max_attempts() {
        let result = retry_fixed_async(3, Duration::from_secs(2), || async {
            Err::<(), _>("persistent error")
        })
        .await;
        assert_eq!(result, Err(("persistent error", 3)));
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let calls = AtomicU32::new(0);
        let result = retry_fixed_async(0, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("nope") }
        })
        .await;
        assert_eq!(result, Err(("nope", 1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
