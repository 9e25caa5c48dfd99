// ABOUTME: Deadline budget shared by every stage of a multi-step operation.
// ABOUTME: Later stages size their own timeouts from the time that is left.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// The overall budget ran out before a stage could start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {}s exceeded", total.as_secs())]
pub struct DeadlineExceeded {
    pub total: Duration,
}

/// A fixed total duration measured from the moment the operation started.
///
/// A `Deadline` is created once per operation and passed by reference to each
/// stage. It is never reset, so the sum of the stage durations can never exceed
/// the configured total and a stage that starts late inherits a shorter timeout.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    total: Duration,
}

impl Deadline {
    /// Start a new budget now.
    pub fn new(total: Duration) -> Self {
        Self {
            start: Instant::now(),
            total,
        }
    }

    /// The configured total budget.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Time spent since the budget started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left until the deadline. Never negative.
    pub fn remaining(&self) -> Duration {
        (self.start + self.total).saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Run `future` to completion unless the deadline passes first.
    ///
    /// A future that is already ready completes even on a spent budget.
    pub async fn bound<F: Future>(&self, future: F) -> Result<F::Output, DeadlineExceeded> {
        tokio::time::timeout_at(self.start + self.total, future)
            .await
            .map_err(|_| DeadlineExceeded { total: self.total })
    }

    /// Remaining time, or `DeadlineExceeded` once nothing is left.
    pub fn budget(&self) -> Result<Duration, DeadlineExceeded> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            Err(DeadlineExceeded { total: self.total })
        } else {
            Ok(remaining)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn remaining_shrinks_with_time() {
        let deadline = Deadline::new(Duration::from_secs(60));
        assert_eq!(deadline.remaining(), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(25)).await;
        assert_eq!(deadline.remaining(), Duration::from_secs(35));
        assert_eq!(deadline.elapsed(), Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn bound_abandons_calls_that_outlive_the_budget() {
        let deadline = Deadline::new(Duration::from_secs(30));
        let hung = deadline
            .bound(tokio::time::sleep(Duration::from_secs(86_400)))
            .await;

        assert_eq!(hung, Err(DeadlineExceeded { total: Duration::from_secs(30) }));
        assert!(deadline.elapsed() >= Duration::from_secs(30));
        assert!(deadline.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn bound_lets_ready_calls_through_on_a_spent_budget() {
        let deadline = Deadline::new(Duration::ZERO);
        assert_eq!(deadline.bound(async { 7 }).await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_saturates_at_zero() {
        let deadline = Deadline::new(Duration::from_secs(5));
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(deadline.remaining(), Duration::ZERO);
        assert!(deadline.is_expired());
        assert_eq!(
            deadline.budget(),
            Err(DeadlineExceeded {
                total: Duration::from_secs(5)
            })
        );
    }

    #[test]
    fn deadline_exceeded_display() {
        let err = DeadlineExceeded {
            total: Duration::from_secs(90),
        };
        assert_eq!(err.to_string(), "deadline of 90s exceeded");
    }
}
