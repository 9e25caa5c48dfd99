// ABOUTME: Integration tests for the deferred cleanup runner.
// ABOUTME: Verifies reverse execution order, failure isolation, and source retirement.

mod support;

use std::time::Duration;

use dbcutover::config::{Attributes, WaitSettings, keys};
use dbcutover::control_plane::{
    ApiError, ApiErrorKind, BlueGreenOps, CreateDeploymentRequest, MemoryControlPlane, Operation,
};
use dbcutover::cutover::{CleanupCommand, CleanupStack, run_cleanup};
use dbcutover::deadline::Deadline;
use dbcutover::diagnostics::{Diagnostics, Severity};
use dbcutover::types::{DeploymentId, InstanceId};

async fn create_deployments(plane: &MemoryControlPlane, count: usize) -> Vec<DeploymentId> {
    let mut ids = Vec::new();
    for n in 0..count {
        let deployment = plane
            .create_deployment(&CreateDeploymentRequest {
                name: format!("orders-{n}"),
                source_arn: MemoryControlPlane::arn_for(&support::orders()),
                target_engine_version: None,
                target_parameter_group: None,
            })
            .await
            .unwrap();
        ids.push(deployment.identifier);
    }
    ids
}

fn stack_of(ids: &[DeploymentId]) -> CleanupStack {
    let mut stack = CleanupStack::new();
    for id in ids {
        stack.push(CleanupCommand::DeleteDeployment {
            id: id.clone(),
            switched_over: false,
        });
    }
    stack
}

fn deleted_deployments(plane: &MemoryControlPlane) -> Vec<String> {
    plane
        .mutations()
        .into_iter()
        .filter(|c| c.operation == Operation::DeleteDeployment)
        .map(|c| c.target)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn commands_run_in_reverse_registration_order() {
    support::init_tracing();
    let plane = support::seeded_plane();
    let ids = create_deployments(&plane, 3).await;
    let mut stack = stack_of(&ids);
    let mut diagnostics = Diagnostics::default();

    run_cleanup(
        &plane,
        &support::orders(),
        &mut stack,
        &Deadline::new(Duration::from_secs(3600)),
        &WaitSettings::default(),
        &mut diagnostics,
    )
    .await;

    assert_eq!(
        deleted_deployments(&plane),
        vec!["bgd-000003", "bgd-000002", "bgd-000001"]
    );
    assert!(stack.is_empty());
    assert!(!diagnostics.has_errors());
    assert!(plane.deployments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn only_the_first_command_waits_out_the_settle_delay() {
    let plane = support::seeded_plane();
    let ids = create_deployments(&plane, 3).await;
    let mut stack = stack_of(&ids);
    let mut diagnostics = Diagnostics::default();
    let waits = WaitSettings::default();
    let started = tokio::time::Instant::now();

    run_cleanup(
        &plane,
        &support::orders(),
        &mut stack,
        &Deadline::new(Duration::from_secs(3600)),
        &waits,
        &mut diagnostics,
    )
    .await;

    // Each deletion is seen as DELETING once, then gone one poll later.
    let expected = waits.delay + 3 * waits.poll_interval;
    let elapsed = started.elapsed();
    assert!(elapsed >= expected, "{elapsed:?}");
    assert!(elapsed < expected + Duration::from_secs(1), "{elapsed:?}");
    assert!(elapsed < 2 * waits.delay);
    assert!(!diagnostics.has_errors());
}

#[tokio::test(start_paused = true)]
async fn a_failing_command_does_not_stop_the_rest() {
    let plane = support::seeded_plane();
    let ids = create_deployments(&plane, 3).await;
    let mut stack = stack_of(&ids);
    let mut diagnostics = Diagnostics::default();
    plane.fail_next(
        Operation::DeleteDeployment,
        ApiError::new(ApiErrorKind::Internal, "boom"),
    );

    run_cleanup(
        &plane,
        &support::orders(),
        &mut stack,
        &Deadline::new(Duration::from_secs(3600)),
        &WaitSettings::default(),
        &mut diagnostics,
    )
    .await;

    assert_eq!(
        deleted_deployments(&plane),
        vec!["bgd-000003", "bgd-000002", "bgd-000001"]
    );
    let errors: Vec<_> = diagnostics.errors().map(|d| d.message.clone()).collect();
    assert_eq!(
        errors,
        vec![
            "updating DB instance (orders): deleting Blue/Green Deployment (bgd-000003): InternalFailure: boom"
        ]
    );
    assert_eq!(plane.deployments().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deployments_deleted_elsewhere_are_noted_not_failed() {
    let plane = support::seeded_plane();
    let mut stack = stack_of(&[DeploymentId::new("bgd-gone")]);
    let mut diagnostics = Diagnostics::default();

    run_cleanup(
        &plane,
        &support::orders(),
        &mut stack,
        &Deadline::new(Duration::from_secs(600)),
        &WaitSettings::default(),
        &mut diagnostics,
    )
    .await;

    assert_eq!(diagnostics.max_severity(), Some(Severity::Info));
    assert!(diagnostics.entries()[0].message.contains("already deleted"));
}

#[tokio::test(start_paused = true)]
async fn retiring_a_protected_source_lifts_protection_first() {
    let plane = MemoryControlPlane::new();
    let retired = InstanceId::new("orders-old1").unwrap();
    plane.seed_instance(
        &retired,
        &Attributes::new()
            .with(keys::ENGINE, "mysql")
            .with(keys::DELETION_PROTECTION, true),
    );
    let mut stack = CleanupStack::new();
    stack.push(CleanupCommand::RetireSource {
        instance: retired.clone(),
    });
    let mut diagnostics = Diagnostics::default();

    run_cleanup(
        &plane,
        &support::orders(),
        &mut stack,
        &Deadline::new(Duration::from_secs(3600)),
        &WaitSettings::default(),
        &mut diagnostics,
    )
    .await;

    let operations: Vec<_> = plane.mutations().into_iter().map(|c| c.operation).collect();
    assert_eq!(
        operations,
        vec![Operation::ModifyInstance, Operation::DeleteInstance]
    );
    assert!(plane.instance("orders-old1").is_none());
    assert!(diagnostics.is_empty());
}
