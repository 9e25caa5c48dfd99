// ABOUTME: Deletes a database instance and waits for it to disappear.
// ABOUTME: Lifts deletion protection first when the configuration no longer asks for it.

use std::time::Duration;

use snafu::ResultExt;

use super::error::{
    DeadlineSnafu, DeleteSnafu, DisableProtectionSnafu, FinalSnapshotRequiredSnafu,
    LifecycleError, WaitDeletedSnafu,
};
use super::instance::modify_and_wait;
use crate::config::{AttributeValue, Attributes, WaitSettings, keys};
use crate::control_plane::{
    ApiError, ApiErrorKind, DeleteInstanceRequest, InstanceOps, ModifyInstanceRequest,
    wait_instance_deleted,
};
use crate::cutover::Outcome;
use crate::deadline::Deadline;
use crate::diagnostics::Diagnostics;
use crate::retry::classify;
use crate::types::InstanceId;

/// What the delete call reported.
#[derive(Debug, PartialEq, Eq)]
enum Deletion {
    Started,
    AlreadyGone,
}

fn delete_request(
    instance: &InstanceId,
    config: &Attributes,
) -> Result<DeleteInstanceRequest, LifecycleError> {
    let skip_final_snapshot = config.flag(keys::SKIP_FINAL_SNAPSHOT);
    let final_snapshot_identifier = config
        .text(keys::FINAL_SNAPSHOT_IDENTIFIER)
        .map(str::to_string);

    if !skip_final_snapshot && final_snapshot_identifier.is_none() {
        return FinalSnapshotRequiredSnafu {
            instance: instance.clone(),
        }
        .fail();
    }

    Ok(DeleteInstanceRequest {
        identifier: instance.clone(),
        skip_final_snapshot,
        final_snapshot_identifier,
        // Automated backups go with the instance unless explicitly kept.
        delete_automated_backups: !matches!(
            config.get(keys::DELETE_AUTOMATED_BACKUPS),
            Some(AttributeValue::Bool(false))
        ),
    })
}

/// Protection may only be lifted when the configuration dropped it and changes apply now.
fn may_disable_protection(config: &Attributes) -> bool {
    !config.flag(keys::DELETION_PROTECTION) && config.flag(keys::APPLY_IMMEDIATELY)
}

async fn send_delete<P: InstanceOps + ?Sized>(
    plane: &P,
    request: &DeleteInstanceRequest,
) -> Result<Deletion, ApiError> {
    match plane.delete_instance(request).await {
        Ok(()) => Ok(Deletion::Started),
        Err(e) if e.is_not_found() => Ok(Deletion::AlreadyGone),
        Err(e) if e.matches(ApiErrorKind::InvalidInstanceState, "is already being deleted") => {
            tracing::debug!(instance = %request.identifier, "delete already in progress");
            Ok(Deletion::Started)
        }
        Err(e) => Err(e),
    }
}

/// Delete an instance per `config` and wait until it is gone, all within `timeout`.
///
/// A missing instance counts as deleted.
pub async fn delete_instance<P: InstanceOps + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    config: &Attributes,
    timeout: Duration,
    waits: &WaitSettings,
) -> Outcome {
    let deadline = Deadline::new(timeout);
    let mut outcome = Outcome::default();

    if let Err(e) = delete(plane, instance, config, &deadline, waits, &mut outcome.diagnostics).await
    {
        outcome.error_kind = Some(e.kind());
        outcome.diagnostics.error(e.to_string());
    }
    outcome
}

async fn delete<P: InstanceOps + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    config: &Attributes,
    deadline: &Deadline,
    waits: &WaitSettings,
    diagnostics: &mut Diagnostics,
) -> Result<(), LifecycleError> {
    let request = delete_request(instance, config)?;

    tracing::debug!(instance = %instance, skip_final_snapshot = request.skip_final_snapshot, "deleting DB instance");
    let sent = deadline
        .bound(send_delete(plane, &request))
        .await
        .context(DeadlineSnafu {
            stage: "deleting",
            instance: instance.clone(),
        })?;
    let deletion = match sent {
        Err(e) if classify::deletion_protection_pending(&e) && may_disable_protection(config) => {
            tracing::info!(instance = %instance, "disabling deletion protection before delete");
            let disable = ModifyInstanceRequest {
                identifier: instance.clone(),
                apply_immediately: true,
                allow_major_version_upgrade: false,
                changes: Attributes::new().with(keys::DELETION_PROTECTION, false),
            };
            modify_and_wait(
                plane,
                &disable,
                classify::DISABLE_PROTECTION,
                deadline.remaining(),
                waits,
            )
            .await
            .context(DisableProtectionSnafu {
                instance: instance.clone(),
            })?;

            deadline
                .bound(send_delete(plane, &request))
                .await
                .context(DeadlineSnafu {
                    stage: "deleting",
                    instance: instance.clone(),
                })?
        }
        other => other,
    }
    .context(DeleteSnafu {
        instance: instance.clone(),
    })?;

    if deletion == Deletion::AlreadyGone {
        diagnostics.info(format!("DB instance ({instance}) was already deleted"));
        return Ok(());
    }

    wait_instance_deleted(plane, instance, deadline.remaining(), waits)
        .await
        .context(WaitDeletedSnafu {
            instance: instance.clone(),
        })?;

    diagnostics.info(format!("DB instance ({instance}) deleted"));
    Ok(())
}
