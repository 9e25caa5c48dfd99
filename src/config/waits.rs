// ABOUTME: Polling and retry tuning shared by every waiter of an operation.
// ABOUTME: Defines intervals, settle delay, and anti-flap counts with sensible defaults.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WaitSettings {
    /// Time between two status polls.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Grace period before the first poll after a mutating call.
    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,

    /// Consecutive target observations required before a wait succeeds.
    #[serde(default = "default_continuous_target_occurrence")]
    pub continuous_target_occurrence: u32,

    /// Consecutive not-found polls tolerated while waiting for a resource to appear.
    #[serde(default = "default_not_found_checks")]
    pub not_found_checks: u32,

    /// Pause between two attempts of a retried remote call.
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_continuous_target_occurrence() -> u32 {
    3
}

fn default_not_found_checks() -> u32 {
    20
}

fn default_retry_backoff() -> Duration {
    Duration::from_millis(500)
}

impl WaitSettings {
    /// Settings for simulated control planes that settle almost instantly.
    pub fn rehearsal() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            delay: Duration::ZERO,
            retry_backoff: Duration::from_millis(20),
            ..Self::default()
        }
    }

    /// Same settings without the settle delay.
    pub fn without_delay(&self) -> Self {
        Self {
            delay: Duration::ZERO,
            ..self.clone()
        }
    }
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            delay: default_delay(),
            continuous_target_occurrence: default_continuous_target_occurrence(),
            not_found_checks: default_not_found_checks(),
            retry_backoff: default_retry_backoff(),
        }
    }
}
