//! Exponential backoff for retriable provider failures.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{GuardrailError, Result};

/// Runs `attempt` up to `config.max_tries` times, retrying only on
/// [`GuardrailError::is_retryable`] failures with exponential backoff
/// starting at `config.base_ms` and multiplying by `config.factor` each
/// time.
///
/// `compose` is explicitly never run through this helper once tokens have
/// started streaming (`spec` §5) — callers that need that distinction
/// retry the pre-stream setup only.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay_ms = config.base_ms;
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && tries < config.max_tries => {
                tracing::warn!(%err, tries, "retrying after provider failure");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms *= u64::from(config.factor);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_retryable_failures_until_success() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            base_ms: 10,
            factor: 2,
            max_tries: 3,
        };
        let result = with_retry(&config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GuardrailError::ProviderUnavailable("down".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_tries() {
        let config = RetryConfig {
            base_ms: 10,
            factor: 2,
            max_tries: 2,
        };
        let result: Result<()> =
            with_retry(&config, || async { Err(GuardrailError::ProviderUnavailable("down".into())) }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn never_retries_non_retryable_failures() {
        let config = RetryConfig::default();
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GuardrailError::GroundingFailure("nope".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
