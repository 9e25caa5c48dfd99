// ABOUTME: Capability traits for the remote database control plane.
// ABOUTME: Defines InstanceOps and BlueGreenOps, their status waits, and an in-memory implementation.

mod error;
mod memory;
mod model;
mod waits;

pub use error::{ApiError, ApiErrorKind};
pub use memory::{MemoryControlPlane, Operation, Phase, RecordedCall, Step};
pub use model::{
    BlueGreenDeployment, CreateDeploymentRequest, CreateInstanceRequest, DbInstance,
    DeleteInstanceRequest, InstanceSource, ModifyInstanceRequest, PromoteReadReplicaRequest,
    RestorePoint, S3Import,
};
pub use waits::{
    DeploymentWaitError, InstanceWaitError, wait_deployment_available, wait_deployment_deleted,
    wait_instance_available, wait_instance_deleted, wait_switchover_completed,
};

use async_trait::async_trait;

use crate::types::{DeploymentId, InstanceId};

/// Database instance lifecycle calls.
#[async_trait]
pub trait InstanceOps: Send + Sync {
    /// Start creating an instance.
    async fn create_instance(&self, request: &CreateInstanceRequest)
    -> Result<DbInstance, ApiError>;

    /// Describe an instance. Fails with `ApiErrorKind::NotFound` for unknown ids.
    async fn describe_instance(&self, id: &InstanceId) -> Result<DbInstance, ApiError>;

    /// Start modifying an instance.
    async fn modify_instance(&self, request: &ModifyInstanceRequest)
    -> Result<DbInstance, ApiError>;

    /// Start deleting an instance.
    async fn delete_instance(&self, request: &DeleteInstanceRequest) -> Result<(), ApiError>;

    /// Turn a read replica into a standalone instance.
    async fn promote_read_replica(
        &self,
        request: &PromoteReadReplicaRequest,
    ) -> Result<DbInstance, ApiError>;
}

/// Blue/green deployment calls.
#[async_trait]
pub trait BlueGreenOps: Send + Sync {
    /// Start provisioning a green environment next to the source instance.
    async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<BlueGreenDeployment, ApiError>;

    /// Describe a deployment. Fails with `ApiErrorKind::NotFound` for unknown ids.
    async fn describe_deployment(&self, id: &DeploymentId)
    -> Result<BlueGreenDeployment, ApiError>;

    /// Start switching production traffic to the green environment.
    async fn switchover(&self, id: &DeploymentId) -> Result<BlueGreenDeployment, ApiError>;

    /// Delete the deployment, optionally together with its green instance.
    async fn delete_deployment(&self, id: &DeploymentId, delete_target: bool)
    -> Result<(), ApiError>;
}

/// Every capability the lifecycle operations need.
///
/// Automatically implemented for any type providing all capabilities.
pub trait ControlPlane: InstanceOps + BlueGreenOps {}

impl<T: InstanceOps + BlueGreenOps> ControlPlane for T {}

/// Describe an instance, mapping not-found to `None`.
pub async fn find_instance<P: InstanceOps + ?Sized>(
    plane: &P,
    id: &InstanceId,
) -> Result<Option<DbInstance>, ApiError> {
    match plane.describe_instance(id).await {
        Ok(instance) => Ok(Some(instance)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Describe a deployment, mapping not-found to `None`.
pub async fn find_deployment<P: BlueGreenOps + ?Sized>(
    plane: &P,
    id: &DeploymentId,
) -> Result<Option<BlueGreenDeployment>, ApiError> {
    match plane.describe_deployment(id).await {
        Ok(deployment) => Ok(Some(deployment)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
