// ABOUTME: End-to-end tests of the blue/green cutover against the in-memory control plane.
// ABOUTME: Covers the happy path, rejected switchovers, transient retirement failures, and cleanup.

mod support;

use std::time::Duration;

use dbcutover::config::{WaitSettings, keys};
use dbcutover::control_plane::{ApiError, ApiErrorKind, Operation, Phase, Step};
use dbcutover::cutover::{ErrorKind, run_cutover};
use dbcutover::diagnostics::Severity;
use dbcutover::types::status::deployment;

const BUDGET: Duration = Duration::from_secs(80 * 60);

fn operations(plane: &dbcutover::control_plane::MemoryControlPlane) -> Vec<Operation> {
    plane.mutations().into_iter().map(|c| c.operation).collect()
}

fn delete_deployment_detail(plane: &dbcutover::control_plane::MemoryControlPlane) -> Option<String> {
    plane
        .mutations()
        .into_iter()
        .find(|c| c.operation == Operation::DeleteDeployment)
        .and_then(|c| c.detail)
}

#[tokio::test(start_paused = true)]
async fn successful_cutover_swaps_in_the_green_instance() {
    support::init_tracing();
    let plane = support::seeded_plane();
    plane.script(
        Phase::DeploymentCreated,
        Step::sequence(&[
            deployment::PROVISIONING,
            deployment::PROVISIONING,
            deployment::AVAILABLE,
        ]),
    );
    plane.script(
        Phase::SwitchoverStarted,
        Step::sequence(&[
            deployment::SWITCHOVER_IN_PROGRESS,
            deployment::SWITCHOVER_COMPLETED,
        ]),
    );

    let outcome = run_cutover(
        &plane,
        &support::orders(),
        &support::current(),
        &support::resized(),
        BUDGET,
        &WaitSettings::default(),
    )
    .await;

    assert!(outcome.is_success(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.error_kind, None);
    assert_eq!(outcome.diagnostics.max_severity(), Some(Severity::Info));

    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.identifier, support::orders());
    assert_eq!(snapshot.attributes.text(keys::INSTANCE_CLASS), Some("db.t3.small"));

    assert_eq!(
        operations(&plane),
        vec![
            Operation::CreateDeployment,
            Operation::ModifyInstance,
            Operation::Switchover,
            Operation::DeleteInstance,
            Operation::DeleteDeployment,
        ]
    );
    assert_eq!(
        delete_deployment_detail(&plane).as_deref(),
        Some("delete_target=false")
    );
    assert!(plane.instance("orders-old1").is_none());
    assert!(plane.deployments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_switchover_reports_details_and_deletes_the_green_environment() {
    let plane = support::seeded_plane();
    plane.script(
        Phase::SwitchoverStarted,
        vec![
            Step::status(deployment::SWITCHOVER_IN_PROGRESS),
            Step::with_details(deployment::SWITCHOVER_FAILED, "replication lag exceeded"),
        ],
    );

    let outcome = run_cutover(
        &plane,
        &support::orders(),
        &support::current(),
        &support::resized(),
        BUDGET,
        &WaitSettings::default(),
    )
    .await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.error_kind, Some(ErrorKind::UnexpectedState));
    let errors: Vec<_> = outcome.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("replication lag exceeded"));

    assert_eq!(
        delete_deployment_detail(&plane).as_deref(),
        Some("delete_target=true")
    );
    assert_eq!(plane.count(Operation::DeleteInstance), 0);

    // production keeps running on the untouched blue instance
    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.attributes.text(keys::INSTANCE_CLASS), Some("db.t3.micro"));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retiring_the_source_are_retried() {
    let plane = support::seeded_plane();
    for _ in 0..2 {
        plane.fail_next(
            Operation::DeleteInstance,
            ApiError::new(
                ApiErrorKind::InvalidParameterValue,
                "IAM role ARN value is invalid or does not include the required permissions",
            ),
        );
    }

    let outcome = run_cutover(
        &plane,
        &support::orders(),
        &support::current(),
        &support::resized(),
        BUDGET,
        &WaitSettings::default(),
    )
    .await;

    assert!(outcome.is_success(), "{:?}", outcome.diagnostics);
    assert_eq!(plane.count(Operation::DeleteInstance), 3);
    assert!(plane.instance("orders-old1").is_none());
}

#[tokio::test(start_paused = true)]
async fn failure_modifying_the_green_instance_still_cleans_up() {
    let plane = support::seeded_plane();
    plane.fail_next(
        Operation::ModifyInstance,
        ApiError::new(
            ApiErrorKind::InvalidParameterCombination,
            "RDS does not support creating a DB instance with the following combination",
        ),
    );

    let outcome = run_cutover(
        &plane,
        &support::orders(),
        &support::current(),
        &support::resized(),
        BUDGET,
        &WaitSettings::default(),
    )
    .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::Terminal));
    assert!(
        outcome.diagnostics.errors().next().unwrap().message.contains("updating Green environment (orders-green-1)")
    );
    assert_eq!(plane.count(Operation::Switchover), 0);
    assert_eq!(
        delete_deployment_detail(&plane).as_deref(),
        Some("delete_target=true")
    );
    assert!(plane.deployments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unsupported_engines_touch_nothing() {
    let plane = support::seeded_plane();
    let mut desired = support::resized();
    desired.insert(keys::ENGINE, "postgres");

    let outcome = run_cutover(
        &plane,
        &support::orders(),
        &support::current(),
        &desired,
        BUDGET,
        &WaitSettings::default(),
    )
    .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::Precondition));
    assert!(plane.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn bookkeeping_changes_need_no_deployment() {
    let plane = support::seeded_plane();
    let mut desired = support::current();
    desired.insert(keys::TAGS, "team=payments");

    let outcome = run_cutover(
        &plane,
        &support::orders(),
        &support::current(),
        &desired,
        BUDGET,
        &WaitSettings::default(),
    )
    .await;

    assert!(outcome.is_success());
    assert!(plane.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn a_short_budget_times_out_and_still_runs_cleanup() {
    let plane = support::seeded_plane();

    let outcome = run_cutover(
        &plane,
        &support::orders(),
        &support::current(),
        &support::resized(),
        Duration::from_secs(30),
        &WaitSettings::default(),
    )
    .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::Timeout));
    let errors: Vec<_> = outcome.diagnostics.errors().collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].message.contains("waiting for Blue/Green Deployment (bgd-000001)"));
    assert!(errors[1].message.contains("deleting Blue/Green Deployment (bgd-000001)"));
    assert_eq!(plane.count(Operation::DeleteDeployment), 1);
}

#[tokio::test(start_paused = true)]
async fn a_switchover_call_that_never_answers_ends_at_the_budget() {
    let plane = support::seeded_plane();
    plane.stall_next(Operation::Switchover);
    let budget = Duration::from_secs(45 * 60);
    let started = tokio::time::Instant::now();

    let outcome = run_cutover(
        &plane,
        &support::orders(),
        &support::current(),
        &support::resized(),
        budget,
        &WaitSettings::default(),
    )
    .await;

    assert!(started.elapsed() >= budget);
    assert!(started.elapsed() < budget + Duration::from_secs(1));
    assert_eq!(outcome.error_kind, Some(ErrorKind::DeadlineExceeded));
    let errors: Vec<_> = outcome.diagnostics.errors().collect();
    assert!(
        errors[0]
            .message
            .contains("did not complete within its time budget")
    );
    assert_eq!(plane.count(Operation::DeleteDeployment), 1);
    assert_eq!(
        delete_deployment_detail(&plane).as_deref(),
        Some("delete_target=true")
    );
}
