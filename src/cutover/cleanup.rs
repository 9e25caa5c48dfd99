// ABOUTME: Deferred cleanup commands registered while a cutover acquires resources.
// ABOUTME: Drained in reverse order exactly once, reporting failures as diagnostics.

use crate::config::{Attributes, WaitSettings, keys};
use crate::control_plane::{
    ApiError, ControlPlane, DeleteInstanceRequest, InstanceOps, ModifyInstanceRequest, find_instance,
    wait_deployment_deleted, wait_instance_deleted,
};
use crate::deadline::Deadline;
use crate::diagnostics::Diagnostics;
use crate::lifecycle::modify_and_wait;
use crate::retry::{classify, retry_when};
use crate::types::{DeploymentId, InstanceId};

/// A deferred teardown step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupCommand {
    /// Delete the deployment. The green instance goes with it unless the switchover completed.
    DeleteDeployment {
        id: DeploymentId,
        switched_over: bool,
    },
    /// Remove the retired blue instance after a completed switchover.
    RetireSource { instance: InstanceId },
}

impl CleanupCommand {
    pub fn describe(&self) -> String {
        match self {
            CleanupCommand::DeleteDeployment { id, .. } => {
                format!("deleting Blue/Green Deployment ({id})")
            }
            CleanupCommand::RetireSource { instance } => {
                format!("deleting Blue/Green Deployment source ({instance})")
            }
        }
    }
}

/// Cleanup commands in acquisition order.
#[derive(Debug, Default)]
pub struct CleanupStack {
    commands: Vec<CleanupCommand>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: CleanupCommand) {
        tracing::debug!(command = %command.describe(), "registered cleanup");
        self.commands.push(command);
    }

    /// Record that the deployment reached `SWITCHOVER_COMPLETED`.
    pub fn mark_switched_over(&mut self, deployment: &DeploymentId) {
        for command in &mut self.commands {
            if let CleanupCommand::DeleteDeployment { id, switched_over } = command
                && id == deployment
            {
                *switched_over = true;
            }
        }
    }

    pub fn commands(&self) -> &[CleanupCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Take every command, most recently registered first. Leaves the stack empty.
    pub fn drain(&mut self) -> std::iter::Rev<std::vec::IntoIter<CleanupCommand>> {
        std::mem::take(&mut self.commands).into_iter().rev()
    }
}

/// Run every registered command in reverse order.
///
/// The first command waits with the configured settle delay; later ones skip it.
/// Failures are recorded as error diagnostics and never stop the remaining commands.
pub async fn run_cleanup<P: ControlPlane + ?Sized>(
    plane: &P,
    owner: &InstanceId,
    stack: &mut CleanupStack,
    deadline: &Deadline,
    waits: &WaitSettings,
    diagnostics: &mut Diagnostics,
) {
    let undelayed = waits.without_delay();

    for (position, command) in stack.drain().enumerate() {
        let settings = if position == 0 { waits } else { &undelayed };
        tracing::debug!(instance = %owner, "updating DB instance: {}", command.describe());

        let result = match &command {
            CleanupCommand::DeleteDeployment { id, switched_over } => {
                delete_deployment(plane, id, !*switched_over, deadline, settings, diagnostics)
                    .await
            }
            CleanupCommand::RetireSource { instance } => {
                retire_source(plane, instance, deadline, settings).await
            }
        };

        if let Err(message) = result {
            diagnostics.error(format!(
                "updating DB instance ({owner}): {}: {message}",
                command.describe()
            ));
        }
    }
}

async fn delete_deployment<P: ControlPlane + ?Sized>(
    plane: &P,
    id: &DeploymentId,
    delete_target: bool,
    deadline: &Deadline,
    settings: &WaitSettings,
    diagnostics: &mut Diagnostics,
) -> Result<(), String> {
    let deleted = retry_when(
        deadline.remaining(),
        settings.retry_backoff,
        || plane.delete_deployment(id, delete_target),
        |e| classify::matches_any(classify::DELETE_DEPLOYMENT, e),
    )
    .await;

    match deleted {
        Ok(()) => {}
        Err(e) if e.last_error().is_some_and(ApiError::is_not_found) => {
            diagnostics.info(format!("Blue/Green Deployment ({id}) already deleted"));
            return Ok(());
        }
        Err(e) => return Err(e.to_string()),
    }

    wait_deployment_deleted(plane, id, deadline.remaining(), settings)
        .await
        .map_err(|e| format!("waiting for completion: {e}"))
}

async fn retire_source<P: ControlPlane + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    deadline: &Deadline,
    settings: &WaitSettings,
) -> Result<(), String> {
    let snapshot = deadline
        .bound(find_instance(plane, instance))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    let Some(snapshot) = snapshot else {
        tracing::debug!(instance = %instance, "retired source already gone");
        return Ok(());
    };

    if snapshot.deletion_protection {
        let request = ModifyInstanceRequest {
            identifier: instance.clone(),
            apply_immediately: true,
            allow_major_version_upgrade: false,
            changes: Attributes::new().with(keys::DELETION_PROTECTION, false),
        };
        modify_and_wait(
            plane,
            &request,
            classify::DISABLE_PROTECTION,
            deadline.remaining(),
            settings,
        )
        .await
        .map_err(|e| format!("disabling deletion protection: {e}"))?;
    }

    delete_source(plane, instance, deadline, settings).await?;

    wait_instance_deleted(plane, instance, deadline.remaining(), settings)
        .await
        .map_err(|e| format!("waiting for completion: {e}"))
}

async fn delete_source<P: InstanceOps + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    deadline: &Deadline,
    settings: &WaitSettings,
) -> Result<(), String> {
    let request = DeleteInstanceRequest {
        identifier: instance.clone(),
        skip_final_snapshot: true,
        final_snapshot_identifier: None,
        delete_automated_backups: true,
    };

    retry_when(
        deadline.remaining(),
        settings.retry_backoff,
        || plane.delete_instance(&request),
        |e| classify::matches_any(classify::DELETE_SOURCE, e),
    )
    .await
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(id: &str) -> CleanupCommand {
        CleanupCommand::DeleteDeployment {
            id: DeploymentId::new(id),
            switched_over: false,
        }
    }

    #[test]
    fn drains_in_reverse_order_once() {
        let mut stack = CleanupStack::new();
        stack.push(deployment("a"));
        stack.push(deployment("b"));
        stack.push(deployment("c"));

        let order: Vec<_> = stack.drain().collect();
        assert_eq!(order, vec![deployment("c"), deployment("b"), deployment("a")]);
        assert!(stack.is_empty());
        assert_eq!(stack.drain().count(), 0);
    }

    #[test]
    fn mark_switched_over_only_touches_matching_deployment() {
        let mut stack = CleanupStack::new();
        stack.push(deployment("a"));
        stack.push(deployment("b"));

        stack.mark_switched_over(&DeploymentId::new("b"));

        assert_eq!(
            stack.commands(),
            &[
                deployment("a"),
                CleanupCommand::DeleteDeployment {
                    id: DeploymentId::new("b"),
                    switched_over: true,
                },
            ]
        );
    }
}
