// ABOUTME: Modify-then-wait helper shared by every flow that changes an instance.
// ABOUTME: Retries the modify call per rule set and waits for the instance to settle.

use std::time::Duration;

use crate::config::WaitSettings;
use crate::control_plane::{
    ApiError, DbInstance, InstanceOps, InstanceWaitError, ModifyInstanceRequest,
    wait_instance_available,
};
use crate::deadline::Deadline;
use crate::retry::classify::{self, Classifier};
use crate::retry::{RetryError, retry_when};

/// A modify call or the wait after it failed.
#[derive(Debug, thiserror::Error)]
pub enum ModifyError {
    #[error(transparent)]
    Request(RetryError<ApiError>),

    #[error("waiting for completion: {0}")]
    Wait(InstanceWaitError),
}

/// Modify an instance and wait until it is available again, all within `timeout`.
///
/// # Errors
///
/// Returns `ModifyError::Request` if the call fails for a reason outside `rules`
/// or keeps failing until the budget is spent, and `ModifyError::Wait` if the
/// instance does not settle.
pub async fn modify_and_wait<P: InstanceOps + ?Sized>(
    plane: &P,
    request: &ModifyInstanceRequest,
    rules: &[Classifier],
    timeout: Duration,
    waits: &WaitSettings,
) -> Result<DbInstance, ModifyError> {
    let deadline = Deadline::new(timeout);

    retry_when(
        deadline.remaining(),
        waits.retry_backoff,
        || plane.modify_instance(request),
        |e| classify::matches_any(rules, e),
    )
    .await
    .map_err(ModifyError::Request)?;

    wait_instance_available(plane, &request.identifier, deadline.remaining(), waits)
        .await
        .map_err(ModifyError::Wait)
}
