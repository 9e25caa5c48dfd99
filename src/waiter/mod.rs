// ABOUTME: Generic status poller for remote resources with externally driven transitions.
// ABOUTME: Waits until a fetched status settles on a target, disappears, or time runs out.

mod error;

pub use error::WaitError;

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::WaitSettings;

/// A snapshot that reports the status string it was observed in.
pub trait Observed {
    fn status(&self) -> &str;
}

/// Parameters of one wait. Built per wait point and never mutated while waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    pending: Vec<String>,
    target: Vec<String>,
    poll_interval: Duration,
    delay: Duration,
    continuous_target_occurrence: u32,
    not_found_checks: u32,
    timeout: Duration,
}

impl WaitSpec {
    /// A spec with the default tuning and no time budget yet.
    ///
    /// An empty `target` (or one containing `""`) waits for the resource to disappear.
    pub fn new(pending: &[&str], target: &[&str]) -> Self {
        let defaults = WaitSettings::default();
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            poll_interval: defaults.poll_interval,
            delay: defaults.delay,
            continuous_target_occurrence: defaults.continuous_target_occurrence,
            not_found_checks: defaults.not_found_checks,
            timeout: Duration::ZERO,
        }
    }

    /// Apply poll interval, settle delay and anti-flap counts from settings.
    pub fn tuned(self, settings: &WaitSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval,
            delay: settings.delay,
            continuous_target_occurrence: settings.continuous_target_occurrence,
            not_found_checks: settings.not_found_checks,
            ..self
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn continuous_target_occurrence(mut self, count: u32) -> Self {
        self.continuous_target_occurrence = count;
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_value(&self) -> Duration {
        self.timeout
    }

    pub fn delay_value(&self) -> Duration {
        self.delay
    }

    /// Whether the wait succeeds once the resource is gone.
    pub fn waits_for_disappearance(&self) -> bool {
        self.target.is_empty() || self.target.iter().any(String::is_empty)
    }

    fn overlap(&self) -> Option<&str> {
        self.pending
            .iter()
            .find(|s| self.target.contains(s))
            .map(String::as_str)
    }

    fn is_target(&self, status: &str) -> bool {
        self.target.iter().any(|s| s == status)
    }

    fn is_pending(&self, status: &str) -> bool {
        self.pending.iter().any(|s| s == status)
    }

    fn wanted(&self) -> String {
        self.target.join(", ")
    }
}

/// Poll `fetch` until the observed status settles on a target status.
///
/// `fetch` returns `Ok(None)` when the resource does not exist. Fetch errors
/// are returned immediately; retrying the underlying call is the caller's job.
/// A fetch still running when the timeout elapses is abandoned.
///
/// Returns the last observation on success, or `None` when the wait was for
/// the resource to disappear.
pub async fn wait_for_state<T, E, F, Fut>(
    spec: &WaitSpec,
    mut fetch: F,
) -> Result<Option<T>, WaitError<T, E>>
where
    T: Observed,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    if let Some(status) = spec.overlap() {
        return Err(WaitError::InvalidSpec {
            status: status.to_string(),
        });
    }
    if spec.timeout.is_zero() {
        return Err(WaitError::DeadlineExceeded);
    }

    let deadline = Instant::now() + spec.timeout;
    let required = spec.continuous_target_occurrence.max(1);
    let disappearance = spec.waits_for_disappearance();

    if !spec.delay.is_zero() {
        tokio::time::sleep_until(deadline.min(Instant::now() + spec.delay)).await;
    }

    let mut hits = 0u32;
    let mut not_found = 0u32;
    let mut last: Option<T> = None;
    let mut last_status = String::new();

    loop {
        if Instant::now() >= deadline {
            return Err(WaitError::Timeout {
                last_status,
                wanted: spec.wanted(),
                last,
                timeout: spec.timeout,
            });
        }

        let fetched = match tokio::time::timeout_at(deadline, fetch()).await {
            Ok(fetched) => fetched.map_err(WaitError::Fetch)?,
            Err(_) => {
                tracing::debug!(last_status = %last_status, "status fetch outlived the wait");
                return Err(WaitError::Timeout {
                    last_status,
                    wanted: spec.wanted(),
                    last,
                    timeout: spec.timeout,
                });
            }
        };

        match fetched {
            None => {
                last = None;
                last_status.clear();

                if disappearance {
                    hits += 1;
                    if hits >= required {
                        return Ok(None);
                    }
                } else {
                    hits = 0;
                    not_found += 1;
                    if not_found > spec.not_found_checks {
                        return Err(WaitError::NotFound { checks: not_found });
                    }
                }
            }
            Some(observation) => {
                not_found = 0;
                let status = observation.status().to_string();

                if spec.is_target(&status) {
                    hits += 1;
                    if hits >= required {
                        return Ok(Some(observation));
                    }
                } else if spec.is_pending(&status) {
                    hits = 0;
                } else {
                    return Err(WaitError::Unexpected {
                        status,
                        wanted: spec.wanted(),
                        observation,
                    });
                }

                tracing::trace!(status = %status, hits, "waiting");
                last_status = status;
                last = Some(observation);
            }
        }

        tokio::time::sleep_until(deadline.min(Instant::now() + spec.poll_interval)).await;
    }
}
