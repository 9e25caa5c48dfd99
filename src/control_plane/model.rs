// ABOUTME: Snapshots and requests exchanged with the control plane.
// ABOUTME: Instance and blue/green deployment shapes plus mutation inputs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Attributes;
use crate::types::{DeploymentId, InstanceArn, InstanceId, SnapshotId};
use crate::waiter::Observed;

/// Snapshot of a database instance as last described.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbInstance {
    pub identifier: InstanceId,
    pub arn: String,
    pub status: String,
    pub engine: String,
    pub engine_version: Option<String>,
    pub deletion_protection: bool,
    pub attributes: Attributes,
}

impl Observed for DbInstance {
    fn status(&self) -> &str {
        &self.status
    }
}

/// Snapshot of a blue/green deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlueGreenDeployment {
    pub identifier: DeploymentId,
    pub name: String,
    pub status: String,
    /// ARN of the blue (source) instance.
    pub source: String,
    /// ARN of the green (target) instance.
    pub target: String,
    pub status_details: Option<String>,
}

impl BlueGreenDeployment {
    pub fn source_arn(&self) -> Result<InstanceArn, crate::types::ArnError> {
        InstanceArn::parse(&self.source)
    }

    pub fn target_arn(&self) -> Result<InstanceArn, crate::types::ArnError> {
        InstanceArn::parse(&self.target)
    }
}

impl Observed for BlueGreenDeployment {
    fn status(&self) -> &str {
        &self.status
    }
}

/// Where a new instance gets its data from.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceSource {
    /// An empty instance.
    Fresh,
    /// A read replica of another instance.
    ReadReplica { source: String },
    /// A restore of a snapshot.
    Snapshot { snapshot: SnapshotId },
    /// A restore of another instance's automated backups to a moment in time.
    PointInTime { source: String, restore: RestorePoint },
    /// An import of a native database backup stored in an S3 bucket.
    S3Import(S3Import),
}

impl std::fmt::Display for InstanceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceSource::Fresh => f.write_str("fresh"),
            InstanceSource::ReadReplica { source } => write!(f, "replica of {source}"),
            InstanceSource::Snapshot { snapshot } => write!(f, "snapshot {snapshot}"),
            InstanceSource::PointInTime {
                source,
                restore: RestorePoint::At(time),
            } => write!(f, "{source} at {}", time.to_rfc3339()),
            InstanceSource::PointInTime {
                source,
                restore: RestorePoint::Latest,
            } => write!(f, "{source} at latest restorable time"),
            InstanceSource::S3Import(import) => write!(f, "{import}"),
        }
    }
}

/// The moment a point-in-time restore goes back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePoint {
    At(DateTime<Utc>),
    /// The latest time the source's backups can restore to.
    Latest,
}

/// Location and origin of a backup imported from S3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Import {
    pub bucket: String,
    pub prefix: Option<String>,
    /// Role the control plane assumes to read the bucket.
    pub ingestion_role: String,
    pub source_engine: String,
    pub source_engine_version: String,
}

impl std::fmt::Display for S3Import {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/", self.bucket)?;
        if let Some(prefix) = &self.prefix {
            f.write_str(prefix)?;
        }
        write!(f, " ({} {})", self.source_engine, self.source_engine_version)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateInstanceRequest {
    pub identifier: InstanceId,
    pub source: InstanceSource,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifyInstanceRequest {
    pub identifier: InstanceId,
    pub apply_immediately: bool,
    pub allow_major_version_upgrade: bool,
    pub changes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteInstanceRequest {
    pub identifier: InstanceId,
    pub skip_final_snapshot: bool,
    pub final_snapshot_identifier: Option<String>,
    pub delete_automated_backups: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromoteReadReplicaRequest {
    pub identifier: InstanceId,
    pub backup_retention_period: Option<i64>,
    pub backup_window: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateDeploymentRequest {
    pub name: String,
    pub source_arn: String,
    pub target_engine_version: Option<String>,
    pub target_parameter_group: Option<String>,
}
