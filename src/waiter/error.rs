// ABOUTME: Error outcomes of a status wait.
// ABOUTME: Separates "ran out of time while pending" from "landed on a foreign status".

use std::time::Duration;

/// Why a wait did not reach its target.
///
/// `T` is the observed snapshot type, `E` the error type of the status fetch.
#[derive(Debug, thiserror::Error)]
pub enum WaitError<T, E> {
    /// A status appears in both the pending and the target set.
    #[error("status {status:?} is both pending and target")]
    InvalidSpec { status: String },

    /// The wait was handed no time at all.
    #[error("no time left to wait")]
    DeadlineExceeded,

    /// The resource reported a status outside both sets.
    #[error("unexpected state '{status}', wanted target '{wanted}'")]
    Unexpected {
        status: String,
        wanted: String,
        observation: T,
    },

    /// The timeout elapsed while the resource was still pending.
    #[error(
        "timeout while waiting for state to become '{wanted}' (last state: '{last_status}', timeout: {}s)",
        timeout.as_secs()
    )]
    Timeout {
        last_status: String,
        wanted: String,
        last: Option<T>,
        timeout: Duration,
    },

    /// The resource kept disappearing while it was expected to exist.
    #[error("couldn't find resource ({checks} consecutive checks)")]
    NotFound { checks: u32 },

    /// The status fetch itself failed.
    #[error(transparent)]
    Fetch(E),
}

impl<T, E> WaitError<T, E> {
    /// The last snapshot seen before the wait failed, if any.
    pub fn last_observation(&self) -> Option<&T> {
        match self {
            WaitError::Unexpected { observation, .. } => Some(observation),
            WaitError::Timeout { last, .. } => last.as_ref(),
            _ => None,
        }
    }

    /// Status that made the wait fail, for unexpected-state outcomes.
    pub fn unexpected_status(&self) -> Option<&str> {
        match self {
            WaitError::Unexpected { status, .. } => Some(status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. } | WaitError::DeadlineExceeded)
    }
}
