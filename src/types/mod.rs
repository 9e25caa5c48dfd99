// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Instance identifiers, ARNs, control-plane resource ids, and status constants.

mod arn;
mod id;
mod instance_id;
pub mod status;

pub use arn::{ArnError, InstanceArn};
pub use id::{DeploymentId, SnapshotId};
pub use instance_id::{InstanceId, InstanceIdError};
