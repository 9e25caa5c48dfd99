// ABOUTME: Errors of the provision, update and delete flows with SNAFU context.
// ABOUTME: Maps every failure onto the shared ErrorKind taxonomy.

use snafu::Snafu;

use super::instance::ModifyError;
use crate::control_plane::{ApiError, InstanceWaitError};
use crate::cutover::ErrorKind;
use crate::deadline::DeadlineExceeded;
use crate::retry::RetryError;
use crate::types::InstanceId;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LifecycleError {
    #[snafu(display("{stage} DB instance ({instance}): {source}"))]
    Deadline {
        stage: &'static str,
        instance: InstanceId,
        source: DeadlineExceeded,
    },

    #[snafu(display("creating DB instance ({instance}): \"{key}\": required field is not set"))]
    MissingCreateSetting {
        instance: InstanceId,
        key: &'static str,
    },

    #[snafu(display("creating DB instance ({instance}): {source}"))]
    Create {
        instance: InstanceId,
        source: RetryError<ApiError>,
    },

    #[snafu(display("waiting for DB instance ({instance}) create: {source}"))]
    WaitCreated {
        instance: InstanceId,
        source: InstanceWaitError,
    },

    #[snafu(display("updating DB instance ({instance}): {source}"))]
    Modify {
        instance: InstanceId,
        source: ModifyError,
    },

    #[snafu(display("promoting DB instance ({instance}): {source}"))]
    Promote {
        instance: InstanceId,
        source: RetryError<ApiError>,
    },

    #[snafu(display("promoting DB instance ({instance}): waiting for completion: {source}"))]
    WaitPromoted {
        instance: InstanceId,
        source: InstanceWaitError,
    },

    #[snafu(display("cannot elect new source database for replication ({source_db})"))]
    NewReplicationSource {
        instance: InstanceId,
        source_db: String,
    },

    #[snafu(display(
        "deleting DB instance ({instance}): final_snapshot_identifier is required when skip_final_snapshot is false"
    ))]
    FinalSnapshotRequired { instance: InstanceId },

    #[snafu(display("deleting DB instance ({instance}): disabling deletion protection: {source}"))]
    DisableProtection {
        instance: InstanceId,
        source: ModifyError,
    },

    #[snafu(display("deleting DB instance ({instance}): {source}"))]
    Delete {
        instance: InstanceId,
        source: ApiError,
    },

    #[snafu(display("waiting for DB instance ({instance}) delete: {source}"))]
    WaitDeleted {
        instance: InstanceId,
        source: InstanceWaitError,
    },
}

impl LifecycleError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Deadline { .. } => ErrorKind::DeadlineExceeded,
            LifecycleError::Create { source, .. } | LifecycleError::Promote { source, .. } => {
                ErrorKind::of_retry(source)
            }
            LifecycleError::WaitCreated { source, .. }
            | LifecycleError::WaitPromoted { source, .. }
            | LifecycleError::WaitDeleted { source, .. } => ErrorKind::of_wait(source),
            LifecycleError::Modify { source, .. }
            | LifecycleError::DisableProtection { source, .. } => ErrorKind::of_modify(source),
            LifecycleError::NewReplicationSource { .. }
            | LifecycleError::FinalSnapshotRequired { .. }
            | LifecycleError::MissingCreateSetting { .. } => ErrorKind::Precondition,
            LifecycleError::Delete { .. } => ErrorKind::Terminal,
        }
    }

    /// The instance the failed operation addressed.
    pub fn instance(&self) -> &InstanceId {
        match self {
            LifecycleError::Deadline { instance, .. }
            | LifecycleError::MissingCreateSetting { instance, .. }
            | LifecycleError::Create { instance, .. }
            | LifecycleError::WaitCreated { instance, .. }
            | LifecycleError::Modify { instance, .. }
            | LifecycleError::Promote { instance, .. }
            | LifecycleError::WaitPromoted { instance, .. }
            | LifecycleError::NewReplicationSource { instance, .. }
            | LifecycleError::FinalSnapshotRequired { instance }
            | LifecycleError::DisableProtection { instance, .. }
            | LifecycleError::Delete { instance, .. }
            | LifecycleError::WaitDeleted { instance, .. } => instance,
        }
    }
}
