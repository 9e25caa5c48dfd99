// ABOUTME: Stage-decorated errors of a blue/green cutover.
// ABOUTME: Uses SNAFU context selectors and exposes an ErrorKind for programmatic handling.

use snafu::Snafu;

use crate::control_plane::{ApiError, DeploymentWaitError, InstanceWaitError};
use crate::deadline::DeadlineExceeded;
use crate::lifecycle::ModifyError;
use crate::retry::RetryError;
use crate::types::{ArnError, DeploymentId, InstanceId};
use crate::waiter::WaitError;

/// Why a cutover cannot even start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("engine {engine:?} does not support blue/green updates (supported: {})", supported.join(", "))]
    UnsupportedEngine {
        engine: String,
        supported: &'static [&'static str],
    },

    #[error("read replicas cannot be updated with a blue/green deployment (replicating from {source_db})")]
    ReplicaSource { source_db: String },
}

/// A failed cutover stage.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CutoverError {
    #[snafu(display("{source}"))]
    Precondition { source: PreconditionError },

    #[snafu(display("{stage}: {source}"))]
    Deadline {
        stage: &'static str,
        source: DeadlineExceeded,
    },

    #[snafu(display("reading DB instance ({instance}): {source}"))]
    DescribeSource {
        instance: InstanceId,
        source: ApiError,
    },

    #[snafu(display("creating Blue/Green Deployment: {source}"))]
    CreateDeployment { source: RetryError<ApiError> },

    #[snafu(display("waiting for Blue/Green Deployment ({id}) to become available: {source}"))]
    WaitCreated {
        id: DeploymentId,
        source: DeploymentWaitError,
    },

    #[snafu(display("reading Blue/Green Deployment ({id}) {role}: {source}"))]
    DeploymentArn {
        id: DeploymentId,
        role: &'static str,
        source: ArnError,
    },

    #[snafu(display("creating Blue/Green Deployment: waiting for Green environment ({instance}): {source}"))]
    WaitTarget {
        instance: InstanceId,
        source: InstanceWaitError,
    },

    #[snafu(display("updating Green environment ({instance}): {source}"))]
    ModifyTarget {
        instance: InstanceId,
        source: ModifyError,
    },

    #[snafu(display("switching over Blue/Green Deployment ({id}): {source}"))]
    Switchover {
        id: DeploymentId,
        source: RetryError<ApiError>,
    },

    #[snafu(display("waiting for Blue/Green Deployment ({id}) switchover: {source}"))]
    WaitSwitchover {
        id: DeploymentId,
        source: DeploymentWaitError,
    },

    /// The switchover ended in a failure status; `details` carries the control plane's explanation.
    #[snafu(display("switching over Blue/Green Deployment ({id}): {details}"))]
    SwitchoverRejected {
        id: DeploymentId,
        status: String,
        details: String,
    },
}

/// Error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-correctable configuration conflict; nothing was touched.
    Precondition,
    /// A retryable failure persisted until the budget ran out.
    Transient,
    /// A non-retryable remote failure.
    Terminal,
    /// A watched resource reported a status outside the expected sets.
    UnexpectedState,
    /// Still pending when the wait ran out of time.
    Timeout,
    /// A resource disappeared while it was expected to exist.
    NotFound,
    /// The overall budget was used up before a stage started or while a call was in flight.
    DeadlineExceeded,
}

impl ErrorKind {
    pub(crate) fn of_retry(err: &RetryError<ApiError>) -> Self {
        match err {
            RetryError::BudgetExhausted { .. } => ErrorKind::Transient,
            RetryError::Terminal { error, .. } if error.is_not_found() => ErrorKind::NotFound,
            RetryError::Terminal { .. } => ErrorKind::Terminal,
            RetryError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
        }
    }

    pub(crate) fn of_wait<T>(err: &WaitError<T, ApiError>) -> Self {
        match err {
            WaitError::InvalidSpec { .. } => ErrorKind::Terminal,
            WaitError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            WaitError::Unexpected { .. } => ErrorKind::UnexpectedState,
            WaitError::Timeout { .. } => ErrorKind::Timeout,
            WaitError::NotFound { .. } => ErrorKind::NotFound,
            WaitError::Fetch(e) if e.is_not_found() => ErrorKind::NotFound,
            WaitError::Fetch(_) => ErrorKind::Terminal,
        }
    }

    pub(crate) fn of_modify(err: &ModifyError) -> Self {
        match err {
            ModifyError::Request(e) => ErrorKind::of_retry(e),
            ModifyError::Wait(e) => ErrorKind::of_wait(e),
        }
    }
}

impl CutoverError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CutoverError::Precondition { .. } => ErrorKind::Precondition,
            CutoverError::Deadline { .. } => ErrorKind::DeadlineExceeded,
            CutoverError::DescribeSource { source, .. } if source.is_not_found() => {
                ErrorKind::NotFound
            }
            CutoverError::DescribeSource { .. } => ErrorKind::Terminal,
            CutoverError::CreateDeployment { source } | CutoverError::Switchover { source, .. } => {
                ErrorKind::of_retry(source)
            }
            CutoverError::WaitCreated { source, .. }
            | CutoverError::WaitSwitchover { source, .. } => ErrorKind::of_wait(source),
            CutoverError::WaitTarget { source, .. } => ErrorKind::of_wait(source),
            CutoverError::DeploymentArn { .. } => ErrorKind::Terminal,
            CutoverError::ModifyTarget { source, .. } => ErrorKind::of_modify(source),
            CutoverError::SwitchoverRejected { .. } => ErrorKind::UnexpectedState,
        }
    }

    /// Status details reported with a failed switchover.
    pub fn switchover_details(&self) -> Option<&str> {
        match self {
            CutoverError::SwitchoverRejected { details, .. } => Some(details),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::ApiErrorKind;

    #[test]
    fn budget_exhaustion_is_transient() {
        let err = RetryError::BudgetExhausted {
            error: ApiError::new(ApiErrorKind::InvalidClusterState, "busy"),
            attempts: 12,
        };
        assert_eq!(ErrorKind::of_retry(&err), ErrorKind::Transient);
    }

    #[test]
    fn abandoned_calls_map_to_deadline_exceeded() {
        let err: RetryError<ApiError> = RetryError::DeadlineExceeded {
            last: None,
            attempts: 1,
        };
        assert_eq!(ErrorKind::of_retry(&err), ErrorKind::DeadlineExceeded);
    }

    #[test]
    fn rejected_switchover_displays_details() {
        let err = CutoverError::SwitchoverRejected {
            id: DeploymentId::new("bgd-1"),
            status: "SWITCHOVER_FAILED".to_string(),
            details: "replication lag exceeded".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::UnexpectedState);
        assert!(err.to_string().ends_with(": replication lag exceeded"));
        assert_eq!(err.switchover_details(), Some("replication lag exceeded"));
    }

    #[test]
    fn precondition_messages() {
        let err = PreconditionError::UnsupportedEngine {
            engine: "postgres".to_string(),
            supported: &["mariadb", "mysql"],
        };
        assert_eq!(
            err.to_string(),
            "engine \"postgres\" does not support blue/green updates (supported: mariadb, mysql)"
        );
    }
}
