//! Turn deadlines and cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// A point in time by which a turn must produce a result, or be cancelled.
/// `Duration::ZERO` produces a deadline that has already elapsed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    /// A deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    /// Whether the deadline has already passed.
    #[must_use]
    pub fn has_elapsed(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Races `fut` against the deadline. Returns `None` if the deadline
    /// elapses first; the losing branch is dropped, per `spec` §5's "an
    /// aborted turn releases its fan-out workers" requirement.
    pub async fn race<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            result = fut => Some(result),
            () = tokio::time::sleep_until(self.0) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_duration_deadline_has_elapsed_immediately() {
        let deadline = Deadline::after(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(deadline.has_elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn race_returns_none_when_deadline_wins() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let result = deadline
            .race(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                42
            })
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn race_returns_some_when_future_wins_first() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let result = deadline.race(async { 42 }).await;
        assert_eq!(result, Some(42));
    }
}
