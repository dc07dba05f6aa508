use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("check timed out after {}s", .0.as_secs())]
pub struct TimedOut(pub Duration);

/// Awaits `fut` for at most `limit`.
///
/// Expiry drops the future at its current await point. Work that never yields (a blocking
/// call, a busy loop) is not interrupted by this; callers that need it stopped must abort it
/// through other means.
pub async fn run_with_timeout<F>(fut: F, limit: Duration) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TimedOut(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_in_time() {
        let value = run_with_timeout(async { 42 }, Duration::from_secs(1)).await;
        assert_eq!(value, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let slow = tokio::time::sleep(Duration::from_secs(60));
        let result = run_with_timeout(slow, Duration::from_secs(2)).await;
        assert_eq!(result, Err(TimedOut(Duration::from_secs(2))));
        assert_eq!(
            result.unwrap_err().to_string(),
            "check timed out after 2s"
        );
    }
}
