// ABOUTME: Status waits for instances and blue/green deployments.
// ABOUTME: Binds the generic waiter to the control-plane describe calls and status sets.

use std::time::Duration;

use super::{
    ApiError, BlueGreenDeployment, BlueGreenOps, DbInstance, InstanceOps, find_deployment,
    find_instance,
};
use crate::config::WaitSettings;
use crate::types::status::{deployment, instance};
use crate::types::{DeploymentId, InstanceId};
use crate::waiter::{WaitError, WaitSpec, wait_for_state};

pub type InstanceWaitError = WaitError<DbInstance, ApiError>;
pub type DeploymentWaitError = WaitError<BlueGreenDeployment, ApiError>;

fn present<T, E>(found: Option<T>, checks: u32) -> Result<T, WaitError<T, E>> {
    found.ok_or(WaitError::NotFound { checks })
}

/// Wait until an instance is `available` or `storage-optimization`.
pub async fn wait_instance_available<P: InstanceOps + ?Sized>(
    plane: &P,
    id: &InstanceId,
    timeout: Duration,
    settings: &WaitSettings,
) -> Result<DbInstance, InstanceWaitError> {
    tracing::debug!(instance = %id, "waiting for instance to become available");
    let spec = WaitSpec::new(instance::AVAILABLE_PENDING, instance::AVAILABLE_TARGET)
        .tuned(settings)
        .timeout(timeout);
    let found = wait_for_state(&spec, || find_instance(plane, id)).await?;
    present(found, settings.not_found_checks)
}

/// Wait until an instance no longer exists.
pub async fn wait_instance_deleted<P: InstanceOps + ?Sized>(
    plane: &P,
    id: &InstanceId,
    timeout: Duration,
    settings: &WaitSettings,
) -> Result<(), InstanceWaitError> {
    tracing::debug!(instance = %id, "waiting for instance to be deleted");
    let spec = WaitSpec::new(instance::DELETED_PENDING, &[])
        .tuned(settings)
        .timeout(timeout);
    wait_for_state(&spec, || find_instance(plane, id))
        .await
        .map(|_| ())
}

/// Deployment waits settle on the first target observation.
fn deployment_spec(
    pending: &[&str],
    target: &[&str],
    timeout: Duration,
    settings: &WaitSettings,
) -> WaitSpec {
    WaitSpec::new(pending, target)
        .tuned(settings)
        .continuous_target_occurrence(1)
        .timeout(timeout)
}

/// Wait until a deployment leaves `PROVISIONING` for `AVAILABLE`.
pub async fn wait_deployment_available<P: BlueGreenOps + ?Sized>(
    plane: &P,
    id: &DeploymentId,
    timeout: Duration,
    settings: &WaitSettings,
) -> Result<BlueGreenDeployment, DeploymentWaitError> {
    tracing::debug!(deployment = %id, "waiting for deployment to become available");
    let spec = deployment_spec(
        deployment::AVAILABLE_PENDING,
        deployment::AVAILABLE_TARGET,
        timeout,
        settings,
    );
    let found = wait_for_state(&spec, || find_deployment(plane, id)).await?;
    present(found, settings.not_found_checks)
}

/// Wait until a switchover reports `SWITCHOVER_COMPLETED`.
pub async fn wait_switchover_completed<P: BlueGreenOps + ?Sized>(
    plane: &P,
    id: &DeploymentId,
    timeout: Duration,
    settings: &WaitSettings,
) -> Result<BlueGreenDeployment, DeploymentWaitError> {
    tracing::debug!(deployment = %id, "waiting for switchover to complete");
    let spec = deployment_spec(
        deployment::SWITCHOVER_PENDING,
        deployment::SWITCHOVER_TARGET,
        timeout,
        settings,
    );
    let found = wait_for_state(&spec, || find_deployment(plane, id)).await?;
    present(found, settings.not_found_checks)
}

/// Wait until a deployment no longer exists.
pub async fn wait_deployment_deleted<P: BlueGreenOps + ?Sized>(
    plane: &P,
    id: &DeploymentId,
    timeout: Duration,
    settings: &WaitSettings,
) -> Result<(), DeploymentWaitError> {
    tracing::debug!(deployment = %id, "waiting for deployment to be deleted");
    let spec = deployment_spec(deployment::DELETED_PENDING, &[], timeout, settings);
    wait_for_state(&spec, || find_deployment(plane, id))
        .await
        .map(|_| ())
}
