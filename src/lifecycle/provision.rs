// ABOUTME: Creates a database instance and waits for it to become available.
// ABOUTME: Applies settings a copied instance cannot take at creation afterwards.

use std::time::Duration;

use snafu::ResultExt;

use super::error::{
    CreateSnafu, DeadlineSnafu, LifecycleError, MissingCreateSettingSnafu, ModifySnafu,
    WaitCreatedSnafu,
};
use super::instance::modify_and_wait;
use crate::config::{Attributes, WaitSettings, keys};
use crate::control_plane::{
    ControlPlane, CreateInstanceRequest, InstanceSource, ModifyInstanceRequest,
    wait_instance_available,
};
use crate::cutover::{Outcome, describe_final};
use crate::deadline::Deadline;
use crate::diagnostics::Diagnostics;
use crate::retry::classify::{self, Classifier};
use crate::retry::retry_when;

/// Settings an instance built from a fresh or imported database must be created with.
const REQUIRED_FROM_SCRATCH: &[&str] = &[keys::ALLOCATED_STORAGE, keys::ENGINE];

/// Settings a copied instance only accepts through a later modify.
const POST_CREATE_KEYS: &[&str] = &[
    keys::BACKUP_RETENTION_PERIOD,
    keys::BACKUP_WINDOW,
    keys::PARAMETER_GROUP_NAME,
];

/// Split `request` into what the create call accepts and a follow-up modification.
fn plan_creation(
    request: &CreateInstanceRequest,
    diagnostics: &mut Diagnostics,
) -> Result<(CreateInstanceRequest, Attributes), LifecycleError> {
    let mut create = request.clone();
    let mut follow_up = Attributes::new();

    let origin = match &request.source {
        InstanceSource::Fresh | InstanceSource::S3Import(_) => {
            if let Some(key) = REQUIRED_FROM_SCRATCH
                .iter()
                .find(|key| !request.attributes.contains(key))
            {
                return MissingCreateSettingSnafu {
                    instance: request.identifier.clone(),
                    key: *key,
                }
                .fail();
            }
            return Ok((create, follow_up));
        }
        InstanceSource::ReadReplica { .. } => "a replica inherits the primary's",
        InstanceSource::Snapshot { .. } => "a restored instance inherits the snapshot's",
        InstanceSource::PointInTime { .. } => "a point-in-time restore inherits the source's",
    };

    if create.attributes.remove(keys::ALLOCATED_STORAGE).is_some() {
        diagnostics.warn(format!(
            "\"allocated_storage\" was ignored for DB instance ({}) because {origin} allocated_storage and cannot be changed at creation",
            request.identifier
        ));
    }

    for key in POST_CREATE_KEYS {
        if let Some(value) = create.attributes.remove(key) {
            follow_up.insert(key, value);
        }
    }

    Ok((create, follow_up))
}

fn create_rules(source: &InstanceSource) -> &'static [Classifier] {
    match source {
        InstanceSource::S3Import(_) => classify::RESTORE_FROM_S3,
        InstanceSource::PointInTime { .. } => classify::RESTORE_TO_POINT_IN_TIME,
        InstanceSource::Fresh
        | InstanceSource::ReadReplica { .. }
        | InstanceSource::Snapshot { .. } => classify::CREATE,
    }
}

/// Create an instance and wait until it is available.
pub async fn provision_instance<P: ControlPlane + ?Sized>(
    plane: &P,
    request: &CreateInstanceRequest,
    timeout: Duration,
    waits: &WaitSettings,
) -> Outcome {
    let deadline = Deadline::new(timeout);
    let mut outcome = Outcome::default();

    if let Err(e) = provision(plane, request, &deadline, waits, &mut outcome.diagnostics).await {
        outcome.error_kind = Some(e.kind());
        outcome.diagnostics.error(e.to_string());
        return outcome;
    }

    outcome.diagnostics.info(format!("DB instance ({}) created", request.identifier));
    outcome.snapshot =
        describe_final(plane, &request.identifier, &deadline, &mut outcome.diagnostics).await;
    outcome
}

async fn provision<P: ControlPlane + ?Sized>(
    plane: &P,
    request: &CreateInstanceRequest,
    deadline: &Deadline,
    waits: &WaitSettings,
    diagnostics: &mut Diagnostics,
) -> Result<(), LifecycleError> {
    let instance = &request.identifier;
    let (create, follow_up) = plan_creation(request, diagnostics)?;
    let rules = create_rules(&create.source);

    tracing::debug!(instance = %instance, source = %create.source, "creating DB instance");
    retry_when(
        deadline.remaining(),
        waits.retry_backoff,
        || plane.create_instance(&create),
        |e| classify::matches_any(rules, e),
    )
    .await
    .context(CreateSnafu {
        instance: instance.clone(),
    })?;

    deadline.budget().context(DeadlineSnafu {
        stage: "waiting for",
        instance: instance.clone(),
    })?;
    wait_instance_available(plane, instance, deadline.remaining(), waits)
        .await
        .context(WaitCreatedSnafu {
            instance: instance.clone(),
        })?;

    if follow_up.is_empty() {
        return Ok(());
    }

    tracing::debug!(instance = %instance, changes = follow_up.len(), "applying settings not accepted at creation");
    let modify = ModifyInstanceRequest {
        identifier: instance.clone(),
        apply_immediately: true,
        allow_major_version_upgrade: request.attributes.flag(keys::ALLOW_MAJOR_VERSION_UPGRADE),
        changes: follow_up,
    };
    modify_and_wait(plane, &modify, classify::MODIFY, deadline.remaining(), waits)
        .await
        .context(ModifySnafu {
            instance: instance.clone(),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::{RestorePoint, S3Import};
    use crate::cutover::ErrorKind;
    use crate::diagnostics::Severity;
    use crate::types::InstanceId;

    fn request(source: InstanceSource) -> CreateInstanceRequest {
        CreateInstanceRequest {
            identifier: InstanceId::new("orders-replica").unwrap(),
            source,
            attributes: Attributes::new()
                .with(keys::ENGINE, "mysql")
                .with(keys::ALLOCATED_STORAGE, 100)
                .with(keys::BACKUP_RETENTION_PERIOD, 7),
        }
    }

    #[test]
    fn fresh_instances_take_everything_at_creation() {
        let mut diagnostics = Diagnostics::default();
        let (create, follow_up) =
            plan_creation(&request(InstanceSource::Fresh), &mut diagnostics).unwrap();

        assert_eq!(create.attributes.int(keys::ALLOCATED_STORAGE), Some(100));
        assert!(follow_up.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn replicas_ignore_storage_with_a_warning() {
        let mut diagnostics = Diagnostics::default();
        let source = InstanceSource::ReadReplica {
            source: "orders".to_string(),
        };
        let (create, follow_up) = plan_creation(&request(source), &mut diagnostics).unwrap();

        assert!(!create.attributes.contains(keys::ALLOCATED_STORAGE));
        assert_eq!(follow_up.int(keys::BACKUP_RETENTION_PERIOD), Some(7));
        assert_eq!(diagnostics.max_severity(), Some(Severity::Warning));
    }

    #[test]
    fn snapshot_restores_are_treated_like_replicas() {
        let mut diagnostics = Diagnostics::default();
        let source = InstanceSource::Snapshot {
            snapshot: crate::types::SnapshotId::new("orders-final"),
        };
        let (create, _) = plan_creation(&request(source), &mut diagnostics).unwrap();

        assert!(!create.attributes.contains(keys::ALLOCATED_STORAGE));
        assert_eq!(diagnostics.max_severity(), Some(Severity::Warning));
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn point_in_time_restores_defer_backup_settings() {
        let mut diagnostics = Diagnostics::default();
        let source = InstanceSource::PointInTime {
            source: "orders".to_string(),
            restore: RestorePoint::Latest,
        };
        let (create, follow_up) = plan_creation(&request(source), &mut diagnostics).unwrap();

        assert!(!create.attributes.contains(keys::ALLOCATED_STORAGE));
        assert!(!create.attributes.contains(keys::BACKUP_RETENTION_PERIOD));
        assert_eq!(follow_up.int(keys::BACKUP_RETENTION_PERIOD), Some(7));
        assert!(diagnostics.entries()[0].message.contains("point-in-time restore"));
    }

    #[test]
    fn s3_imports_need_storage_up_front() {
        let mut diagnostics = Diagnostics::default();
        let mut import = request(InstanceSource::S3Import(S3Import {
            bucket: "orders-backups".to_string(),
            prefix: None,
            ingestion_role: "arn:aws:iam::123456789012:role/ingest".to_string(),
            source_engine: "mysql".to_string(),
            source_engine_version: "8.0.35".to_string(),
        }));
        let (create, follow_up) = plan_creation(&import, &mut diagnostics).unwrap();
        assert_eq!(create.attributes.int(keys::ALLOCATED_STORAGE), Some(100));
        assert!(follow_up.is_empty());

        import.attributes.remove(keys::ALLOCATED_STORAGE);
        let err = plan_creation(&import, &mut diagnostics).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.to_string().ends_with("\"allocated_storage\": required field is not set"));
    }

    #[test]
    fn each_source_retries_its_own_propagation_errors() {
        use crate::control_plane::{ApiError, ApiErrorKind};

        let profile = ApiError::new(
            ApiErrorKind::Validation,
            "RDS couldn't fetch the role from instance profile",
        );
        let restore = InstanceSource::PointInTime {
            source: "orders".to_string(),
            restore: RestorePoint::Latest,
        };
        assert!(classify::matches_any(create_rules(&restore), &profile));
        assert!(!classify::matches_any(create_rules(&InstanceSource::Fresh), &profile));
    }
}
