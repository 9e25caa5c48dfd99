// ABOUTME: Blue/green cutover orchestration using the type state pattern.
// ABOUTME: Sequences create, wait, modify, switchover and retire with guaranteed cleanup.

mod cleanup;
mod error;
mod precondition;
mod state;
mod transitions;

pub use cleanup::{CleanupCommand, CleanupStack, run_cleanup};
pub use error::{CutoverError, ErrorKind, PreconditionError};
pub use precondition::{SUPPORTED_ENGINES, check as check_precondition};
pub use state::{Available, BlueGreen, Provisioning, SwitchedOver};
pub use transitions::TransitionResult;

use std::time::Duration;

use snafu::ResultExt;

use crate::config::{Attributes, ChangeSet, WaitSettings, keys};
use crate::control_plane::{
    BlueGreenDeployment, ControlPlane, DbInstance, InstanceOps, find_instance,
};
use crate::deadline::Deadline;
use crate::diagnostics::Diagnostics;
use crate::types::InstanceId;

use error::{DeadlineSnafu, DescribeSourceSnafu, PreconditionSnafu};

/// What a lifecycle operation produced.
#[derive(Debug, Default)]
pub struct Outcome {
    /// The instance as described after the operation, if it still exists.
    pub snapshot: Option<DbInstance>,
    /// Every note, warning and error in the order it was produced.
    pub diagnostics: Diagnostics,
    /// Category of the failure, set whenever an error diagnostic was recorded.
    ///
    /// A change that landed but left a cleanup step failing is `Terminal`.
    pub error_kind: Option<ErrorKind>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Update `instance` from `current` to `desired` through a blue/green deployment.
///
/// The whole run, cleanup included, shares one `total_timeout` budget. Nothing is
/// touched when only bookkeeping attributes changed.
pub async fn run_cutover<P: ControlPlane + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    current: &Attributes,
    desired: &Attributes,
    total_timeout: Duration,
    waits: &WaitSettings,
) -> Outcome {
    let deadline = Deadline::new(total_timeout);
    let mut outcome = Outcome::default();

    let changes = ChangeSet::between(current, desired);
    if !changes.has_changes_except(keys::BOOKKEEPING) {
        outcome
            .diagnostics
            .info(format!("DB instance ({instance}) has no changes to apply"));
        return outcome;
    }

    outcome.error_kind = cutover_within(
        plane,
        instance,
        &changes,
        desired,
        &deadline,
        waits,
        &mut outcome.diagnostics,
    )
    .await
    .err();

    outcome.snapshot =
        describe_final(plane, instance, &deadline, &mut outcome.diagnostics).await;
    outcome
}

/// Run one cutover inside an existing budget, draining cleanup on every exit path.
///
/// A failed cleanup after a completed switchover still fails the run.
pub(crate) async fn cutover_within<P: ControlPlane + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    changes: &ChangeSet,
    desired: &Attributes,
    deadline: &Deadline,
    waits: &WaitSettings,
    diagnostics: &mut Diagnostics,
) -> Result<(), ErrorKind> {
    let mut cleanup = CleanupStack::new();
    let errors_before = diagnostics.errors().count();
    let result = drive(
        plane,
        instance,
        changes,
        desired,
        deadline,
        waits,
        &mut cleanup,
    )
    .await;

    match &result {
        Ok(deployment) => diagnostics.info(format!(
            "DB instance ({instance}) switched over using Blue/Green Deployment ({})",
            deployment.identifier
        )),
        Err(err) => diagnostics.error(format!("updating DB instance ({instance}): {err}")),
    }

    run_cleanup(plane, instance, &mut cleanup, deadline, waits, diagnostics).await;

    match result {
        Err(err) => Err(err.kind()),
        Ok(_) if diagnostics.errors().count() > errors_before => Err(ErrorKind::Terminal),
        Ok(_) => Ok(()),
    }
}

async fn drive<P: ControlPlane + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    changes: &ChangeSet,
    desired: &Attributes,
    deadline: &Deadline,
    waits: &WaitSettings,
    cleanup: &mut CleanupStack,
) -> Result<BlueGreenDeployment, CutoverError> {
    precondition::check(desired).context(PreconditionSnafu)?;

    let source = deadline
        .bound(plane.describe_instance(instance))
        .await
        .context(DeadlineSnafu {
            stage: "reading source DB instance",
        })?
        .context(DescribeSourceSnafu {
            instance: instance.clone(),
        })?;

    let switched = BlueGreen::create(plane, &source, changes, desired, deadline, waits, cleanup)
        .await?
        .wait_available(plane, deadline, waits)
        .await?
        .wait_target_ready(plane, deadline, waits)
        .await?
        .modify_target(plane, changes, desired, deadline, waits)
        .await?
        .switchover(plane, deadline, waits, cleanup)
        .await?;

    switched.retire_source(cleanup)
}

pub(crate) async fn describe_final<P: InstanceOps + ?Sized>(
    plane: &P,
    instance: &InstanceId,
    deadline: &Deadline,
    diagnostics: &mut Diagnostics,
) -> Option<DbInstance> {
    let found = match deadline.bound(find_instance(plane, instance)).await {
        Ok(found) => found.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match found {
        Ok(snapshot) => snapshot,
        Err(message) => {
            diagnostics.error(format!("reading DB instance ({instance}): {message}"));
            None
        }
    }
}
