// ABOUTME: State transition methods for blue/green deployments.
// ABOUTME: Each transition consumes self and returns the next state or a stage error.

use chrono::Utc;
use snafu::ResultExt;

use super::cleanup::{CleanupCommand, CleanupStack};
use super::error::{
    CreateDeploymentSnafu, CutoverError, DeadlineSnafu, DeploymentArnSnafu, ModifyTargetSnafu,
    SwitchoverSnafu, WaitCreatedSnafu, WaitTargetSnafu,
};
use super::state::{Available, BlueGreen, Provisioning, SwitchedOver};
use crate::config::{Attributes, ChangeSet, WaitSettings, keys};
use crate::control_plane::{
    BlueGreenDeployment, ControlPlane, CreateDeploymentRequest, DbInstance, ModifyInstanceRequest,
    wait_deployment_available, wait_instance_available, wait_switchover_completed,
};
use crate::deadline::Deadline;
use crate::lifecycle::modify_and_wait;
use crate::retry::{classify, retry_when};
use crate::types::InstanceId;
use crate::types::status::deployment;
use crate::waiter::WaitError;

/// Result of a state transition.
pub type TransitionResult<T> = Result<BlueGreen<T>, CutoverError>;

/// Keys applied when the deployment is created rather than by modifying the green instance.
const CREATION_KEYS: &[&str] = &[keys::ENGINE_VERSION, keys::PARAMETER_GROUP_NAME];

fn deployment_request(
    source: &DbInstance,
    changes: &ChangeSet,
    desired: &Attributes,
) -> CreateDeploymentRequest {
    let changed_text = |key: &str| {
        changes
            .has_change(key)
            .then(|| desired.text(key).map(str::to_string))
            .flatten()
    };

    CreateDeploymentRequest {
        name: format!(
            "{}-{}",
            source.identifier,
            Utc::now().format("%Y%m%d%H%M%S")
        ),
        source_arn: source.arn.clone(),
        target_engine_version: changed_text(keys::ENGINE_VERSION),
        target_parameter_group: changed_text(keys::PARAMETER_GROUP_NAME),
    }
}

/// Attributes to apply to the green instance, or `None` when nothing needs modifying.
fn target_changes(changes: &ChangeSet, desired: &Attributes) -> Option<Attributes> {
    let ignored: Vec<&str> = keys::BOOKKEEPING
        .iter()
        .chain(keys::DIRECTIVES)
        .chain(CREATION_KEYS)
        .copied()
        .collect();

    let mut attrs = changes.desired_except(&ignored);
    if attrs.is_empty() {
        return None;
    }

    // Always sent, otherwise the green instance keeps the blue flag.
    attrs.insert(
        keys::DELETION_PROTECTION,
        desired.flag(keys::DELETION_PROTECTION),
    );
    Some(attrs)
}

// =============================================================================
// Provisioning
// =============================================================================

impl BlueGreen<Provisioning> {
    /// Create the deployment and register its deletion before anything else.
    ///
    /// # Errors
    ///
    /// Returns an error if the budget is spent or the create call fails.
    pub async fn create<P: ControlPlane + ?Sized>(
        plane: &P,
        source: &DbInstance,
        changes: &ChangeSet,
        desired: &Attributes,
        deadline: &Deadline,
        waits: &WaitSettings,
        cleanup: &mut CleanupStack,
    ) -> TransitionResult<Provisioning> {
        deadline.budget().context(DeadlineSnafu {
            stage: "creating Blue/Green Deployment",
        })?;

        let request = deployment_request(source, changes, desired);
        tracing::debug!(instance = %source.identifier, name = %request.name, "creating Blue/Green Deployment");

        let deployment = retry_when(
            deadline.remaining(),
            waits.retry_backoff,
            || plane.create_deployment(&request),
            |e| classify::matches_any(classify::NONE, e),
        )
        .await
        .context(CreateDeploymentSnafu)?;

        cleanup.push(CleanupCommand::DeleteDeployment {
            id: deployment.identifier.clone(),
            switched_over: false,
        });

        Ok(BlueGreen {
            instance: source.identifier.clone(),
            deployment,
            state: Provisioning,
        })
    }

    /// Wait for the deployment to leave `PROVISIONING`.
    #[must_use = "deployment state must be used"]
    pub async fn wait_available<P: ControlPlane + ?Sized>(
        self,
        plane: &P,
        deadline: &Deadline,
        waits: &WaitSettings,
    ) -> TransitionResult<Available> {
        let id = self.deployment.identifier.clone();
        deadline.budget().context(DeadlineSnafu {
            stage: "waiting for Blue/Green Deployment",
        })?;

        let deployment = wait_deployment_available(plane, &id, deadline.remaining(), waits)
            .await
            .context(WaitCreatedSnafu { id })?;
        Ok(self.transition(deployment))
    }
}

// =============================================================================
// Available
// =============================================================================

impl BlueGreen<Available> {
    /// Identifier of the green instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the deployment's target is not an instance ARN.
    pub fn target(&self) -> Result<InstanceId, CutoverError> {
        self.deployment
            .target_arn()
            .map(|arn| arn.identifier().clone())
            .context(DeploymentArnSnafu {
                id: self.deployment.identifier.clone(),
                role: "target",
            })
    }

    /// Wait for the green instance itself to become available.
    #[must_use = "deployment state must be used"]
    pub async fn wait_target_ready<P: ControlPlane + ?Sized>(
        self,
        plane: &P,
        deadline: &Deadline,
        waits: &WaitSettings,
    ) -> TransitionResult<Available> {
        let target = self.target()?;
        deadline.budget().context(DeadlineSnafu {
            stage: "waiting for Green environment",
        })?;

        wait_instance_available(plane, &target, deadline.remaining(), waits)
            .await
            .context(WaitTargetSnafu { instance: target })?;
        Ok(self)
    }

    /// Apply the requested changes to the green instance only.
    #[must_use = "deployment state must be used"]
    pub async fn modify_target<P: ControlPlane + ?Sized>(
        self,
        plane: &P,
        changes: &ChangeSet,
        desired: &Attributes,
        deadline: &Deadline,
        waits: &WaitSettings,
    ) -> TransitionResult<Available> {
        let target = self.target()?;
        let Some(attrs) = target_changes(changes, desired) else {
            tracing::debug!(instance = %target, "no changes to apply to Green environment");
            return Ok(self);
        };

        deadline.budget().context(DeadlineSnafu {
            stage: "updating Green environment",
        })?;

        let request = ModifyInstanceRequest {
            identifier: target.clone(),
            apply_immediately: true,
            allow_major_version_upgrade: desired.flag(keys::ALLOW_MAJOR_VERSION_UPGRADE),
            changes: attrs,
        };
        tracing::debug!(instance = %target, changes = request.changes.len(), "updating Green environment");

        modify_and_wait(
            plane,
            &request,
            classify::MODIFY,
            deadline.remaining(),
            waits,
        )
        .await
        .context(ModifyTargetSnafu { instance: target })?;
        Ok(self)
    }

    /// Switch production traffic to the green instance.
    ///
    /// A switchover that ends in `SWITCHOVER_FAILED` or `INVALID_CONFIGURATION`
    /// fails with the deployment's status details as its message.
    #[must_use = "deployment state must be used"]
    pub async fn switchover<P: ControlPlane + ?Sized>(
        self,
        plane: &P,
        deadline: &Deadline,
        waits: &WaitSettings,
        cleanup: &mut CleanupStack,
    ) -> TransitionResult<SwitchedOver> {
        let id = self.deployment.identifier.clone();
        deadline.budget().context(DeadlineSnafu {
            stage: "switching over Blue/Green Deployment",
        })?;

        tracing::debug!(instance = %self.instance, deployment = %id, "switching over Blue/Green Deployment");
        retry_when(
            deadline.remaining(),
            waits.retry_backoff,
            || plane.switchover(&id),
            |e| classify::matches_any(classify::SWITCHOVER, e),
        )
        .await
        .context(SwitchoverSnafu { id: id.clone() })?;

        match wait_switchover_completed(plane, &id, deadline.remaining(), waits).await {
            Ok(deployment) => {
                cleanup.mark_switched_over(&id);
                Ok(self.transition(deployment))
            }
            Err(WaitError::Unexpected {
                status,
                observation,
                ..
            }) if deployment::is_switchover_failure(&status) => {
                let details = observation
                    .status_details
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| status.clone());
                Err(CutoverError::SwitchoverRejected {
                    id,
                    status,
                    details,
                })
            }
            Err(source) => Err(CutoverError::WaitSwitchover { id, source }),
        }
    }
}

// =============================================================================
// SwitchedOver
// =============================================================================

impl BlueGreen<SwitchedOver> {
    /// Register removal of the retired blue instance and finish the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the deployment's source is not an instance ARN.
    pub fn retire_source(
        self,
        cleanup: &mut CleanupStack,
    ) -> Result<BlueGreenDeployment, CutoverError> {
        let retired = self
            .deployment
            .source_arn()
            .context(DeploymentArnSnafu {
                id: self.deployment.identifier.clone(),
                role: "source",
            })?
            .identifier()
            .clone();

        tracing::debug!(instance = %self.instance, retired = %retired, "deleting Blue/Green Deployment source");
        cleanup.push(CleanupCommand::RetireSource { instance: retired });
        Ok(self.deployment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> DbInstance {
        let id = InstanceId::new("orders").unwrap();
        DbInstance {
            identifier: id.clone(),
            arn: "arn:aws:rds:us-east-1:123456789012:db:orders".to_string(),
            status: "available".to_string(),
            engine: "mysql".to_string(),
            engine_version: Some("8.0.35".to_string()),
            deletion_protection: false,
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn engine_version_goes_into_the_deployment_request() {
        let current = Attributes::new()
            .with(keys::ENGINE_VERSION, "8.0.35")
            .with(keys::PARAMETER_GROUP_NAME, "default.mysql8.0");
        let desired = Attributes::new()
            .with(keys::ENGINE_VERSION, "8.0.36")
            .with(keys::PARAMETER_GROUP_NAME, "default.mysql8.0");
        let changes = ChangeSet::between(&current, &desired);

        let request = deployment_request(&source(), &changes, &desired);
        assert!(request.name.starts_with("orders-"));
        assert_eq!(request.target_engine_version.as_deref(), Some("8.0.36"));
        assert_eq!(request.target_parameter_group, None);
    }

    #[test]
    fn creation_only_changes_skip_the_target_modify() {
        let current = Attributes::new().with(keys::ENGINE_VERSION, "8.0.35");
        let desired = Attributes::new()
            .with(keys::ENGINE_VERSION, "8.0.36")
            .with(keys::TAGS, "team=db");
        let changes = ChangeSet::between(&current, &desired);

        assert_eq!(target_changes(&changes, &desired), None);
    }

    #[test]
    fn target_modify_always_carries_deletion_protection() {
        let current = Attributes::new()
            .with(keys::INSTANCE_CLASS, "db.t3.micro")
            .with(keys::DELETION_PROTECTION, true);
        let desired = Attributes::new()
            .with(keys::INSTANCE_CLASS, "db.t3.small")
            .with(keys::DELETION_PROTECTION, true)
            .with(keys::APPLY_IMMEDIATELY, true);
        let changes = ChangeSet::between(&current, &desired);

        let attrs = target_changes(&changes, &desired).unwrap();
        assert_eq!(attrs.text(keys::INSTANCE_CLASS), Some("db.t3.small"));
        assert!(attrs.flag(keys::DELETION_PROTECTION));
        assert!(!attrs.contains(keys::APPLY_IMMEDIATELY));
    }
}
