// ABOUTME: In-memory control plane that simulates status progressions.
// ABOUTME: Scripts statuses, injects failures, and records calls for tests and rehearsals.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::model::{
    BlueGreenDeployment, CreateDeploymentRequest, CreateInstanceRequest, DbInstance,
    DeleteInstanceRequest, InstanceSource, ModifyInstanceRequest, PromoteReadReplicaRequest,
};
use super::{ApiError, ApiErrorKind, BlueGreenOps, InstanceOps};
use crate::config::{Attributes, AttributeValue, keys};
use crate::types::status::{deployment, instance};
use crate::types::{DeploymentId, InstanceArn, InstanceId};

const PARTITION: &str = "aws";
const REGION: &str = "us-east-1";
const ACCOUNT: &str = "123456789012";

/// One status observation a simulated resource reports on its next describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Status {
        status: String,
        details: Option<String>,
    },
    /// The resource no longer exists.
    Gone,
}

impl Step {
    pub fn status(status: &str) -> Self {
        Step::Status {
            status: status.to_string(),
            details: None,
        }
    }

    /// A status carrying status details, e.g. a failed switchover.
    pub fn with_details(status: &str, details: &str) -> Self {
        Step::Status {
            status: status.to_string(),
            details: Some(details.to_string()),
        }
    }

    pub fn sequence(statuses: &[&str]) -> Vec<Step> {
        statuses.iter().map(|s| Step::status(s)).collect()
    }
}

/// Control-plane calls, as recorded and as targeted by failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateInstance,
    DescribeInstance,
    ModifyInstance,
    DeleteInstance,
    PromoteReadReplica,
    CreateDeployment,
    DescribeDeployment,
    Switchover,
    DeleteDeployment,
}

impl Operation {
    pub fn is_describe(&self) -> bool {
        matches!(
            self,
            Operation::DescribeInstance | Operation::DescribeDeployment
        )
    }
}

/// Points at which a simulated resource starts a new status progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    InstanceCreated,
    InstanceModified,
    InstanceDeleted,
    ReplicaPromoted,
    DeploymentCreated,
    /// The green instance created alongside a deployment.
    GreenCreated,
    SwitchoverStarted,
    DeploymentDeleted,
}

impl Phase {
    fn default_script(&self) -> Vec<Step> {
        match self {
            Phase::InstanceCreated | Phase::GreenCreated => {
                Step::sequence(&[instance::CREATING, instance::AVAILABLE])
            }
            Phase::InstanceModified | Phase::ReplicaPromoted => {
                Step::sequence(&[instance::MODIFYING, instance::AVAILABLE])
            }
            Phase::InstanceDeleted => vec![Step::status(instance::DELETING), Step::Gone],
            Phase::DeploymentCreated => {
                Step::sequence(&[deployment::PROVISIONING, deployment::AVAILABLE])
            }
            Phase::SwitchoverStarted => Step::sequence(&[
                deployment::SWITCHOVER_IN_PROGRESS,
                deployment::SWITCHOVER_COMPLETED,
            ]),
            Phase::DeploymentDeleted => vec![Step::status(deployment::DELETING), Step::Gone],
        }
    }
}

/// A call the control plane received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: Operation,
    pub target: String,
    pub detail: Option<String>,
}

struct Tracked<T> {
    current: Option<T>,
    script: VecDeque<Step>,
}

impl<T> Tracked<T> {
    fn new(value: T, script: VecDeque<Step>) -> Self {
        Self {
            current: Some(value),
            script,
        }
    }
}

#[derive(Default)]
struct State {
    instances: BTreeMap<String, Tracked<DbInstance>>,
    deployments: BTreeMap<String, Tracked<BlueGreenDeployment>>,
    switched: HashSet<String>,
    failures: HashMap<Operation, VecDeque<ApiError>>,
    stalls: HashMap<Operation, u32>,
    scripts: HashMap<Phase, VecDeque<Vec<Step>>>,
    calls: Vec<RecordedCall>,
    sequence: u32,
}

/// A control plane living entirely in memory.
///
/// Every mutation starts a scripted status progression which advances by one
/// step per describe call; the last status sticks. Scripts can be overridden
/// per [`Phase`] and failures injected per [`Operation`].
#[derive(Default)]
pub struct MemoryControlPlane {
    state: Mutex<State>,
}

impl std::fmt::Debug for MemoryControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryControlPlane")
            .field("instances", &state.instances.len())
            .field("deployments", &state.deployments.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl MemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// ARN the simulated control plane assigns to an instance.
    pub fn arn_for(id: &InstanceId) -> String {
        InstanceArn::new(PARTITION, REGION, ACCOUNT, id.clone()).to_string()
    }

    /// Build an `available` instance snapshot from configuration attributes.
    pub fn available_instance(id: &InstanceId, attributes: &Attributes) -> DbInstance {
        DbInstance {
            identifier: id.clone(),
            arn: Self::arn_for(id),
            status: instance::AVAILABLE.to_string(),
            engine: attributes.text(keys::ENGINE).unwrap_or("mysql").to_string(),
            engine_version: attributes.text(keys::ENGINE_VERSION).map(str::to_string),
            deletion_protection: attributes.flag(keys::DELETION_PROTECTION),
            attributes: attributes.clone(),
        }
    }

    /// Add an existing instance.
    pub fn insert_instance(&self, snapshot: DbInstance) {
        let mut state = self.state.lock();
        state.instances.insert(
            snapshot.identifier.to_string(),
            Tracked::new(snapshot, VecDeque::new()),
        );
    }

    /// Add an `available` instance built from configuration attributes.
    pub fn seed_instance(&self, id: &InstanceId, attributes: &Attributes) {
        self.insert_instance(Self::available_instance(id, attributes));
    }

    /// Replace the default progression for the next time `phase` starts.
    pub fn script(&self, phase: Phase, steps: Vec<Step>) {
        self.state
            .lock()
            .scripts
            .entry(phase)
            .or_default()
            .push_back(steps);
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: ApiError) {
        self.state
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Make the next call of `operation` hang without ever answering.
    pub fn stall_next(&self, operation: Operation) {
        *self.state.lock().stalls.entry(operation).or_default() += 1;
    }

    async fn stall_if_scheduled(&self, operation: Operation) {
        let stalled = {
            let mut state = self.state.lock();
            match state.stalls.get_mut(&operation) {
                Some(pending) if *pending > 0 => {
                    *pending -= 1;
                    true
                }
                _ => false,
            }
        };
        if stalled {
            tracing::debug!(?operation, "call stalled");
            std::future::pending::<()>().await;
        }
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Every non-describe call received so far, in order.
    pub fn mutations(&self) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| !c.operation.is_describe())
            .cloned()
            .collect()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Current snapshot of an instance without advancing its progression.
    pub fn instance(&self, id: &str) -> Option<DbInstance> {
        self.state
            .lock()
            .instances
            .get(id)
            .and_then(|t| t.current.clone())
    }

    /// Current snapshot of a deployment without advancing its progression.
    pub fn deployment(&self, id: &str) -> Option<BlueGreenDeployment> {
        self.state
            .lock()
            .deployments
            .get(id)
            .and_then(|t| t.current.clone())
    }

    /// Deployments that still exist.
    pub fn deployments(&self) -> Vec<BlueGreenDeployment> {
        self.state
            .lock()
            .deployments
            .values()
            .filter_map(|t| t.current.clone())
            .collect()
    }
}

impl State {
    fn record(
        &mut self,
        operation: Operation,
        target: &str,
        detail: Option<String>,
    ) -> Result<(), ApiError> {
        self.calls.push(RecordedCall {
            operation,
            target: target.to_string(),
            detail,
        });

        match self.failures.get_mut(&operation).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn script_for(&mut self, phase: Phase) -> VecDeque<Step> {
        self.scripts
            .get_mut(&phase)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| phase.default_script())
            .into()
    }

    fn live_instance(&mut self, id: &str) -> Result<&mut Tracked<DbInstance>, ApiError> {
        match self.instances.get_mut(id) {
            Some(tracked) if tracked.current.is_some() => Ok(tracked),
            _ => Err(instance_not_found(id)),
        }
    }

    fn live_deployment(
        &mut self,
        id: &str,
    ) -> Result<&mut Tracked<BlueGreenDeployment>, ApiError> {
        match self.deployments.get_mut(id) {
            Some(tracked) if tracked.current.is_some() => Ok(tracked),
            _ => Err(deployment_not_found(id)),
        }
    }

    fn start(&mut self, phase: Phase, id: &str, status: &str) -> Result<DbInstance, ApiError> {
        let script = self.script_for(phase);
        let tracked = self.live_instance(id)?;
        tracked.script = script;
        let snapshot = tracked
            .current
            .as_mut()
            .ok_or_else(|| instance_not_found(id))?;
        snapshot.status = status.to_string();
        Ok(snapshot.clone())
    }

    fn advance_instance(&mut self, id: &str) -> Option<DbInstance> {
        let tracked = self.instances.get_mut(id)?;
        match tracked.script.pop_front() {
            Some(Step::Status { status, .. }) => {
                if let Some(snapshot) = tracked.current.as_mut() {
                    snapshot.status = status;
                }
            }
            Some(Step::Gone) => tracked.current = None,
            None => {}
        }
        tracked.current.clone()
    }

    fn advance_deployment(&mut self, id: &str) -> Option<BlueGreenDeployment> {
        let tracked = self.deployments.get_mut(id)?;
        match tracked.script.pop_front() {
            Some(Step::Status { status, details }) => {
                if let Some(snapshot) = tracked.current.as_mut() {
                    snapshot.status = status;
                    snapshot.status_details = details;
                }
            }
            Some(Step::Gone) => tracked.current = None,
            None => {}
        }

        let completed = tracked
            .current
            .as_ref()
            .is_some_and(|d| d.status == deployment::SWITCHOVER_COMPLETED);
        if completed && self.switched.insert(id.to_string()) {
            self.promote_green(id);
        }

        self.deployments.get(id).and_then(|t| t.current.clone())
    }

    /// Swap names once a switchover completes: blue becomes `<id>-old1`, green takes `<id>`.
    fn promote_green(&mut self, deployment_id: &str) {
        let Some(dep) = self
            .deployments
            .get(deployment_id)
            .and_then(|t| t.current.clone())
        else {
            return;
        };
        let (Ok(source), Ok(target)) = (dep.source_arn(), dep.target_arn()) else {
            return;
        };
        let Ok(retired) = InstanceId::new(&format!("{}-old1", source.identifier())) else {
            return;
        };

        if let Some(mut blue) = self.instances.remove(source.identifier().as_str()) {
            if let Some(snapshot) = blue.current.as_mut() {
                snapshot.identifier = retired.clone();
                snapshot.arn = MemoryControlPlane::arn_for(&retired);
            }
            self.instances.insert(retired.to_string(), blue);
        }

        if let Some(mut green) = self.instances.remove(target.identifier().as_str()) {
            if let Some(snapshot) = green.current.as_mut() {
                snapshot.identifier = source.identifier().clone();
                snapshot.arn = MemoryControlPlane::arn_for(source.identifier());
            }
            self.instances
                .insert(source.identifier().to_string(), green);
        }

        if let Some(snapshot) = self
            .deployments
            .get_mut(deployment_id)
            .and_then(|t| t.current.as_mut())
        {
            snapshot.source = MemoryControlPlane::arn_for(&retired);
            snapshot.target = MemoryControlPlane::arn_for(source.identifier());
        }
    }

    fn create_instance(&mut self, request: &CreateInstanceRequest) -> Result<DbInstance, ApiError> {
        let id = request.identifier.as_str();
        let detail = match &request.source {
            InstanceSource::Fresh => None,
            source => Some(source.to_string()),
        };
        self.record(Operation::CreateInstance, id, detail)?;

        if self.live_instance(id).is_ok() {
            return Err(ApiError::new(
                ApiErrorKind::AlreadyExists,
                format!("DB instance already exists: {id}"),
            ));
        }

        let mut attributes = match &request.source {
            InstanceSource::PointInTime { source, .. } => {
                let origin = self
                    .instances
                    .get(source.as_str())
                    .and_then(|t| t.current.as_ref())
                    .ok_or_else(|| instance_not_found(source))?;
                let mut inherited = origin.attributes.clone();
                inherited.remove(keys::REPLICATE_SOURCE_DB);
                inherited
            }
            _ => Attributes::new(),
        };
        attributes.merge(&request.attributes);
        match &request.source {
            InstanceSource::ReadReplica { source } => {
                attributes.insert(keys::REPLICATE_SOURCE_DB, source.as_str());
            }
            InstanceSource::S3Import(import) => {
                attributes.insert(keys::ENGINE, import.source_engine.as_str());
            }
            _ => {}
        }

        let mut snapshot = MemoryControlPlane::available_instance(&request.identifier, &attributes);
        snapshot.status = instance::CREATING.to_string();

        let script = self.script_for(Phase::InstanceCreated);
        self.instances
            .insert(id.to_string(), Tracked::new(snapshot.clone(), script));
        Ok(snapshot)
    }

    fn describe_instance(&mut self, id: &InstanceId) -> Result<DbInstance, ApiError> {
        self.record(Operation::DescribeInstance, id.as_str(), None)?;
        self.advance_instance(id.as_str())
            .ok_or_else(|| instance_not_found(id.as_str()))
    }

    fn modify_instance(&mut self, request: &ModifyInstanceRequest) -> Result<DbInstance, ApiError> {
        let id = request.identifier.as_str();
        self.record(Operation::ModifyInstance, id, None)?;

        let tracked = self.live_instance(id)?;
        let snapshot = tracked
            .current
            .as_mut()
            .ok_or_else(|| instance_not_found(id))?;
        if snapshot.status == instance::DELETING {
            return Err(ApiError::new(
                ApiErrorKind::InvalidInstanceState,
                format!("Instance {id} is being deleted."),
            ));
        }

        for (key, value) in request.changes.iter() {
            match (key, value) {
                (keys::DELETION_PROTECTION, AttributeValue::Bool(b)) => {
                    snapshot.deletion_protection = *b
                }
                (keys::ENGINE_VERSION, AttributeValue::Text(v)) => {
                    snapshot.engine_version = Some(v.clone())
                }
                _ => {}
            }
            snapshot.attributes.insert(key, value.clone());
        }

        self.start(Phase::InstanceModified, id, instance::MODIFYING)
    }

    fn delete_instance(&mut self, request: &DeleteInstanceRequest) -> Result<(), ApiError> {
        let id = request.identifier.as_str();
        self.record(Operation::DeleteInstance, id, None)?;

        let snapshot = self
            .live_instance(id)?
            .current
            .as_ref()
            .ok_or_else(|| instance_not_found(id))?;

        if snapshot.status == instance::DELETING {
            return Err(ApiError::new(
                ApiErrorKind::InvalidInstanceState,
                format!("Instance {id} is already being deleted."),
            ));
        }
        if snapshot.deletion_protection {
            return Err(ApiError::new(
                ApiErrorKind::InvalidParameterCombination,
                "Cannot delete protected DB Instance, please disable deletion protection and try again.",
            ));
        }
        if !request.skip_final_snapshot && request.final_snapshot_identifier.is_none() {
            return Err(ApiError::new(
                ApiErrorKind::InvalidParameterCombination,
                "FinalDBSnapshotIdentifier is required unless SkipFinalSnapshot is specified.",
            ));
        }

        self.start(Phase::InstanceDeleted, id, instance::DELETING)
            .map(|_| ())
    }

    fn promote_read_replica(
        &mut self,
        request: &PromoteReadReplicaRequest,
    ) -> Result<DbInstance, ApiError> {
        let id = request.identifier.as_str();
        self.record(Operation::PromoteReadReplica, id, None)?;

        let snapshot = self
            .live_instance(id)?
            .current
            .as_mut()
            .ok_or_else(|| instance_not_found(id))?;
        if snapshot
            .attributes
            .remove(keys::REPLICATE_SOURCE_DB)
            .is_none()
        {
            return Err(ApiError::new(
                ApiErrorKind::InvalidInstanceState,
                format!("DB Instance {id} is not a read replica."),
            ));
        }
        if let Some(days) = request.backup_retention_period {
            snapshot
                .attributes
                .insert(keys::BACKUP_RETENTION_PERIOD, days);
        }
        if let Some(window) = &request.backup_window {
            snapshot
                .attributes
                .insert(keys::BACKUP_WINDOW, window.as_str());
        }

        self.start(Phase::ReplicaPromoted, id, instance::MODIFYING)
    }

    fn create_deployment(
        &mut self,
        request: &CreateDeploymentRequest,
    ) -> Result<BlueGreenDeployment, ApiError> {
        self.record(Operation::CreateDeployment, &request.source_arn, None)?;

        let source = InstanceArn::parse(&request.source_arn)
            .map_err(|e| ApiError::new(ApiErrorKind::InvalidParameterValue, e.to_string()))?;
        let blue = self
            .live_instance(source.identifier().as_str())?
            .current
            .clone()
            .ok_or_else(|| instance_not_found(source.identifier().as_str()))?;

        self.sequence += 1;
        let green_id = InstanceId::new(&format!("{}-green-{}", blue.identifier, self.sequence))
            .map_err(|e| ApiError::new(ApiErrorKind::InvalidParameterValue, e.to_string()))?;

        let mut green = blue.clone();
        green.identifier = green_id.clone();
        green.arn = MemoryControlPlane::arn_for(&green_id);
        green.status = instance::CREATING.to_string();
        if let Some(version) = &request.target_engine_version {
            green.engine_version = Some(version.clone());
            green
                .attributes
                .insert(keys::ENGINE_VERSION, version.as_str());
        }
        if let Some(group) = &request.target_parameter_group {
            green
                .attributes
                .insert(keys::PARAMETER_GROUP_NAME, group.as_str());
        }

        let green_script = self.script_for(Phase::GreenCreated);
        self.instances
            .insert(green_id.to_string(), Tracked::new(green.clone(), green_script));

        let deployment = BlueGreenDeployment {
            identifier: DeploymentId::issued(self.sequence),
            name: request.name.clone(),
            status: deployment::PROVISIONING.to_string(),
            source: blue.arn.clone(),
            target: green.arn.clone(),
            status_details: None,
        };
        let script = self.script_for(Phase::DeploymentCreated);
        self.deployments.insert(
            deployment.identifier.to_string(),
            Tracked::new(deployment.clone(), script),
        );
        Ok(deployment)
    }

    fn describe_deployment(&mut self, id: &DeploymentId) -> Result<BlueGreenDeployment, ApiError> {
        self.record(Operation::DescribeDeployment, id.as_str(), None)?;
        self.advance_deployment(id.as_str())
            .ok_or_else(|| deployment_not_found(id.as_str()))
    }

    fn switchover(&mut self, id: &DeploymentId) -> Result<BlueGreenDeployment, ApiError> {
        self.record(Operation::Switchover, id.as_str(), None)?;

        let script = self.script_for(Phase::SwitchoverStarted);
        let tracked = self.live_deployment(id.as_str())?;
        let snapshot = tracked
            .current
            .as_mut()
            .ok_or_else(|| deployment_not_found(id.as_str()))?;
        if snapshot.status != deployment::AVAILABLE {
            return Err(ApiError::new(
                ApiErrorKind::InvalidDeploymentState,
                format!(
                    "Blue/green deployment {id} is in {} state, not AVAILABLE.",
                    snapshot.status
                ),
            ));
        }
        snapshot.status = deployment::SWITCHOVER_IN_PROGRESS.to_string();
        let snapshot = snapshot.clone();
        tracked.script = script;
        Ok(snapshot)
    }

    fn delete_deployment(&mut self, id: &DeploymentId, delete_target: bool) -> Result<(), ApiError> {
        self.record(
            Operation::DeleteDeployment,
            id.as_str(),
            Some(format!("delete_target={delete_target}")),
        )?;

        let snapshot = self
            .live_deployment(id.as_str())?
            .current
            .clone()
            .ok_or_else(|| deployment_not_found(id.as_str()))?;

        if delete_target
            && let Ok(target) = snapshot.target_arn()
            && let Some(green) = self.instances.get_mut(target.identifier().as_str())
            && let Some(current) = green.current.as_mut()
        {
            current.status = instance::DELETING.to_string();
            green.script = Phase::InstanceDeleted.default_script().into();
        }

        let script = self.script_for(Phase::DeploymentDeleted);
        let tracked = self.live_deployment(id.as_str())?;
        if let Some(current) = tracked.current.as_mut() {
            current.status = deployment::DELETING.to_string();
        }
        tracked.script = script;
        Ok(())
    }
}

fn instance_not_found(id: &str) -> ApiError {
    ApiError::not_found(format!("DBInstance {id} not found."))
}

fn deployment_not_found(id: &str) -> ApiError {
    ApiError::not_found(format!("BlueGreenDeployment {id} not found."))
}

#[async_trait]
impl InstanceOps for MemoryControlPlane {
    async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<DbInstance, ApiError> {
        self.stall_if_scheduled(Operation::CreateInstance).await;
        self.state.lock().create_instance(request)
    }

    async fn describe_instance(&self, id: &InstanceId) -> Result<DbInstance, ApiError> {
        self.stall_if_scheduled(Operation::DescribeInstance).await;
        self.state.lock().describe_instance(id)
    }

    async fn modify_instance(
        &self,
        request: &ModifyInstanceRequest,
    ) -> Result<DbInstance, ApiError> {
        self.stall_if_scheduled(Operation::ModifyInstance).await;
        self.state.lock().modify_instance(request)
    }

    async fn delete_instance(&self, request: &DeleteInstanceRequest) -> Result<(), ApiError> {
        self.stall_if_scheduled(Operation::DeleteInstance).await;
        self.state.lock().delete_instance(request)
    }

    async fn promote_read_replica(
        &self,
        request: &PromoteReadReplicaRequest,
    ) -> Result<DbInstance, ApiError> {
        self.stall_if_scheduled(Operation::PromoteReadReplica).await;
        self.state.lock().promote_read_replica(request)
    }
}

#[async_trait]
impl BlueGreenOps for MemoryControlPlane {
    async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<BlueGreenDeployment, ApiError> {
        self.stall_if_scheduled(Operation::CreateDeployment).await;
        self.state.lock().create_deployment(request)
    }

    async fn describe_deployment(
        &self,
        id: &DeploymentId,
    ) -> Result<BlueGreenDeployment, ApiError> {
        self.stall_if_scheduled(Operation::DescribeDeployment).await;
        self.state.lock().describe_deployment(id)
    }

    async fn switchover(&self, id: &DeploymentId) -> Result<BlueGreenDeployment, ApiError> {
        self.stall_if_scheduled(Operation::Switchover).await;
        self.state.lock().switchover(id)
    }

    async fn delete_deployment(
        &self,
        id: &DeploymentId,
        delete_target: bool,
    ) -> Result<(), ApiError> {
        self.stall_if_scheduled(Operation::DeleteDeployment).await;
        self.state.lock().delete_deployment(id, delete_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> InstanceId {
        InstanceId::new("orders").unwrap()
    }

    fn seeded() -> MemoryControlPlane {
        let plane = MemoryControlPlane::new();
        plane.seed_instance(&orders(), &Attributes::new().with(keys::ENGINE, "mysql"));
        plane
    }

    #[tokio::test]
    async fn describe_advances_one_step_and_keeps_the_last() {
        let plane = seeded();
        plane
            .modify_instance(&ModifyInstanceRequest {
                identifier: orders(),
                apply_immediately: true,
                allow_major_version_upgrade: false,
                changes: Attributes::new().with(keys::INSTANCE_CLASS, "db.t3.small"),
            })
            .await
            .unwrap();

        let statuses: Vec<String> = {
            let mut out = Vec::new();
            for _ in 0..3 {
                out.push(plane.describe_instance(&orders()).await.unwrap().status);
            }
            out
        };
        assert_eq!(statuses, vec!["modifying", "available", "available"]);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_once() {
        let plane = seeded();
        plane.fail_next(
            Operation::DescribeInstance,
            ApiError::new(ApiErrorKind::Throttling, "slow down"),
        );

        assert!(plane.describe_instance(&orders()).await.is_err());
        assert!(plane.describe_instance(&orders()).await.is_ok());
        assert_eq!(plane.count(Operation::DescribeInstance), 2);
    }

    #[tokio::test]
    async fn protected_instances_refuse_deletion() {
        let plane = MemoryControlPlane::new();
        plane.seed_instance(
            &orders(),
            &Attributes::new().with(keys::DELETION_PROTECTION, true),
        );

        let err = plane
            .delete_instance(&DeleteInstanceRequest {
                identifier: orders(),
                skip_final_snapshot: true,
                final_snapshot_identifier: None,
                delete_automated_backups: true,
            })
            .await
            .unwrap_err();
        assert!(err.matches(
            ApiErrorKind::InvalidParameterCombination,
            "disable deletion pro"
        ));
    }

    #[tokio::test]
    async fn completed_switchover_swaps_instance_names() {
        let plane = seeded();
        let dep = plane
            .create_deployment(&CreateDeploymentRequest {
                name: "orders-cutover".to_string(),
                source_arn: MemoryControlPlane::arn_for(&orders()),
                target_engine_version: Some("8.0.36".to_string()),
                target_parameter_group: None,
            })
            .await
            .unwrap();

        for _ in 0..2 {
            plane.describe_deployment(&dep.identifier).await.unwrap();
        }
        plane.switchover(&dep.identifier).await.unwrap();
        let mut last = None;
        for _ in 0..2 {
            last = Some(plane.describe_deployment(&dep.identifier).await.unwrap());
        }
        let last = last.unwrap();

        assert_eq!(last.status, deployment::SWITCHOVER_COMPLETED);
        assert!(last.source.ends_with(":db:orders-old1"));
        assert!(last.target.ends_with(":db:orders"));
        assert_eq!(
            plane.instance("orders").unwrap().engine_version.as_deref(),
            Some("8.0.36")
        );
        assert!(plane.instance("orders-old1").is_some());
    }
}
