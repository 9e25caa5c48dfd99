// ABOUTME: Predicates deciding which control-plane failures are worth retrying.
// ABOUTME: Each call site picks its own rule set; nothing is retried implicitly.

use crate::control_plane::{ApiError, ApiErrorKind};

/// A retry rule over a control-plane error.
pub type Classifier = fn(&ApiError) -> bool;

/// A freshly created IAM role has not propagated yet.
pub fn iam_propagation(err: &ApiError) -> bool {
    err.matches(
        ApiErrorKind::InvalidParameterValue,
        "IAM role ARN value is invalid or",
    )
}

/// The enhanced monitoring role is not usable yet.
pub fn monitoring_role_propagation(err: &ApiError) -> bool {
    err.matches(ApiErrorKind::InvalidParameterValue, "ENHANCED_MONITORING")
}

/// The S3 ingestion role cannot read the bucket yet.
pub fn s3_ingestion_pending(err: &ApiError) -> bool {
    [
        "S3_SNAPSHOT_INGESTION",
        "S3 bucket cannot be found",
        "Files from the specified Amazon S3 bucket cannot be downloaded",
    ]
    .iter()
    .any(|needle| err.matches(ApiErrorKind::InvalidParameterValue, needle))
}

/// The custom instance profile role has not propagated yet.
pub fn instance_profile_propagation(err: &ApiError) -> bool {
    err.matches(
        ApiErrorKind::Validation,
        "RDS couldn't fetch the role from instance profile",
    )
}

/// The owning cluster is busy with another change.
pub fn cluster_state_conflict(err: &ApiError) -> bool {
    err.kind == ApiErrorKind::InvalidClusterState
}

/// Deletion protection is still being switched off.
pub fn deletion_protection_pending(err: &ApiError) -> bool {
    err.matches(
        ApiErrorKind::InvalidParameterCombination,
        "disable deletion pro",
    )
}

/// The instance asks the caller to come back later.
pub fn instance_busy(err: &ApiError) -> bool {
    err.matches(ApiErrorKind::InvalidInstanceState, "your request later")
}

/// The deployment is mid-transition.
pub fn deployment_state_conflict(err: &ApiError) -> bool {
    err.kind == ApiErrorKind::InvalidDeploymentState
}

/// Creating an instance.
pub const CREATE: &[Classifier] = &[monitoring_role_propagation];

/// Restoring an instance from a backup in S3.
pub const RESTORE_FROM_S3: &[Classifier] = &[monitoring_role_propagation, s3_ingestion_pending];

/// Restoring an instance to a point in time.
pub const RESTORE_TO_POINT_IN_TIME: &[Classifier] = &[instance_profile_propagation];

/// Modifying an instance.
pub const MODIFY: &[Classifier] = &[iam_propagation, cluster_state_conflict];

/// Turning deletion protection off before a delete.
pub const DISABLE_PROTECTION: &[Classifier] =
    &[iam_propagation, instance_busy, deletion_protection_pending];

/// Deleting the retired source instance.
pub const DELETE_SOURCE: &[Classifier] = &[iam_propagation, deletion_protection_pending];

/// Starting a switchover.
pub const SWITCHOVER: &[Classifier] = &[deployment_state_conflict];

/// Deleting a blue/green deployment.
pub const DELETE_DEPLOYMENT: &[Classifier] = &[deployment_state_conflict];

/// Creating a deployment, promoting a replica, and other calls with no transient conditions.
pub const NONE: &[Classifier] = &[];

/// Whether any rule in `rules` accepts `err`.
pub fn matches_any(rules: &[Classifier], err: &ApiError) -> bool {
    rules.iter().any(|rule| rule(err))
}
