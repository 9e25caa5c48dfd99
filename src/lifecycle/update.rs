// ABOUTME: Applies a desired configuration to an existing instance.
// ABOUTME: Promotes replicas, then updates in place or through a blue/green cutover.

use std::time::Duration;

use snafu::ResultExt;

use super::error::{
    LifecycleError, ModifySnafu, NewReplicationSourceSnafu, PromoteSnafu, WaitPromotedSnafu,
};
use super::instance::modify_and_wait;
use crate::config::{Attributes, ChangeSet, WaitSettings, keys};
use crate::control_plane::{
    ControlPlane, ModifyInstanceRequest, PromoteReadReplicaRequest, wait_instance_available,
};
use crate::cutover::{Outcome, cutover_within, describe_final};
use crate::deadline::Deadline;
use crate::diagnostics::Diagnostics;
use crate::retry::{classify, retry_when};
use crate::types::InstanceId;

/// Update `instance` from `current` to `desired` within one `timeout` budget.
///
/// Only bookkeeping attributes changing leaves the instance untouched. With
/// `blue_green_update.enabled` the change goes through a blue/green cutover,
/// otherwise the instance is modified in place.
pub async fn update_instance<P: ControlPlane + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    current: &Attributes,
    desired: &Attributes,
    timeout: Duration,
    waits: &WaitSettings,
) -> Outcome {
    let deadline = Deadline::new(timeout);
    let changes = ChangeSet::between(current, desired);
    let mut outcome = Outcome::default();

    if changes.has_change(keys::REPLICATE_SOURCE_DB)
        && let Err(e) = promote(plane, instance, desired, &deadline, waits).await
    {
        outcome.error_kind = Some(e.kind());
        outcome.diagnostics.error(e.to_string());
        return outcome;
    }

    if !changes.has_changes_except(keys::BOOKKEEPING) {
        outcome
            .diagnostics
            .info(format!("DB instance ({instance}) has no changes requiring modification"));
    } else if desired.flag(keys::BLUE_GREEN_ENABLED) {
        if let Err(kind) = cutover_within(
            plane,
            instance,
            &changes,
            desired,
            &deadline,
            waits,
            &mut outcome.diagnostics,
        )
        .await
        {
            outcome.error_kind = Some(kind);
            return outcome;
        }
    } else if let Err(e) = modify_in_place(
        plane,
        instance,
        &changes,
        desired,
        &deadline,
        waits,
        &mut outcome.diagnostics,
    )
    .await
    {
        outcome.error_kind = Some(e.kind());
        outcome.diagnostics.error(e.to_string());
        return outcome;
    }

    outcome.snapshot = describe_final(plane, instance, &deadline, &mut outcome.diagnostics).await;
    outcome
}

/// Turn a read replica into a standalone instance when its source was cleared.
async fn promote<P: ControlPlane + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    desired: &Attributes,
    deadline: &Deadline,
    waits: &WaitSettings,
) -> Result<(), LifecycleError> {
    if let Some(source_db) = desired.text(keys::REPLICATE_SOURCE_DB) {
        return NewReplicationSourceSnafu {
            instance: instance.clone(),
            source_db,
        }
        .fail();
    }

    let request = PromoteReadReplicaRequest {
        identifier: instance.clone(),
        backup_retention_period: desired.int(keys::BACKUP_RETENTION_PERIOD),
        backup_window: desired.text(keys::BACKUP_WINDOW).map(str::to_string),
    };

    tracing::info!(instance = %instance, "promoting read replica");
    retry_when(
        deadline.remaining(),
        waits.retry_backoff,
        || plane.promote_read_replica(&request),
        |e| classify::matches_any(classify::NONE, e),
    )
    .await
    .context(PromoteSnafu {
        instance: instance.clone(),
    })?;

    wait_instance_available(plane, instance, deadline.remaining(), waits)
        .await
        .context(WaitPromotedSnafu {
            instance: instance.clone(),
        })?;
    Ok(())
}

/// The modification an in-place update sends.
fn in_place_request(
    instance: &InstanceId,
    changes: &ChangeSet,
    desired: &Attributes,
) -> ModifyInstanceRequest {
    let ignored: Vec<&str> = keys::BOOKKEEPING
        .iter()
        .chain(keys::DIRECTIVES)
        .copied()
        .collect();
    let mut attrs = changes.desired_except(&ignored);
    attrs.insert(
        keys::DELETION_PROTECTION,
        desired.flag(keys::DELETION_PROTECTION),
    );

    ModifyInstanceRequest {
        identifier: instance.clone(),
        apply_immediately: desired.flag(keys::APPLY_IMMEDIATELY),
        allow_major_version_upgrade: changes.has_change(keys::ENGINE_VERSION)
            && desired.flag(keys::ALLOW_MAJOR_VERSION_UPGRADE),
        changes: attrs,
    }
}

async fn modify_in_place<P: ControlPlane + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    changes: &ChangeSet,
    desired: &Attributes,
    deadline: &Deadline,
    waits: &WaitSettings,
    diagnostics: &mut Diagnostics,
) -> Result<(), LifecycleError> {
    let request = in_place_request(instance, changes, desired);
    if !request.apply_immediately {
        diagnostics.info(format!(
            "DB instance ({instance}) changes will be applied in the next maintenance window"
        ));
    }

    modify_and_wait(
        plane,
        &request,
        classify::MODIFY,
        deadline.remaining(),
        waits,
    )
    .await
    .context(ModifySnafu {
        instance: instance.clone(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_place_request_drops_bookkeeping_and_directives() {
        let instance = InstanceId::new("orders").unwrap();
        let current = Attributes::new()
            .with(keys::INSTANCE_CLASS, "db.t3.micro")
            .with(keys::TAGS, "team=a");
        let desired = Attributes::new()
            .with(keys::INSTANCE_CLASS, "db.t3.small")
            .with(keys::TAGS, "team=b")
            .with(keys::APPLY_IMMEDIATELY, true);

        let request = in_place_request(&instance, &ChangeSet::between(&current, &desired), &desired);

        assert!(request.apply_immediately);
        assert!(!request.allow_major_version_upgrade);
        assert_eq!(request.changes.text(keys::INSTANCE_CLASS), Some("db.t3.small"));
        assert!(!request.changes.contains(keys::TAGS));
        assert!(!request.changes.contains(keys::APPLY_IMMEDIATELY));
        assert!(request.changes.contains(keys::DELETION_PROTECTION));
    }

    #[test]
    fn major_upgrades_need_an_engine_version_change() {
        let instance = InstanceId::new("orders").unwrap();
        let current = Attributes::new().with(keys::ENGINE_VERSION, "5.7.44");
        let desired = Attributes::new()
            .with(keys::ENGINE_VERSION, "8.0.36")
            .with(keys::ALLOW_MAJOR_VERSION_UPGRADE, true);

        let request = in_place_request(&instance, &ChangeSet::between(&current, &desired), &desired);
        assert!(request.allow_major_version_upgrade);
        assert_eq!(request.changes.text(keys::ENGINE_VERSION), Some("8.0.36"));
    }
}
