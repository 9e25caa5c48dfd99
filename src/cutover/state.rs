// ABOUTME: Blue/green deployment state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce valid cutover transitions at compile time.

use crate::control_plane::BlueGreenDeployment;
use crate::types::InstanceId;

/// Deployment created, green environment still provisioning.
/// Available actions: `wait_available()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Provisioning;

/// Deployment available, green environment ready for changes.
/// Available actions: `wait_target_ready()`, `modify_target()`, `switchover()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Available;

/// Production traffic now served by the former green environment.
/// Available actions: `retire_source()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchedOver;

/// A blue/green deployment in progress, parameterized by its current state.
#[derive(Debug)]
#[must_use = "deployment state must be used"]
pub struct BlueGreen<S> {
    pub(crate) instance: InstanceId,
    pub(crate) deployment: BlueGreenDeployment,
    pub(crate) state: S,
}

impl<S> BlueGreen<S> {
    /// The instance being updated.
    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    /// The deployment as last observed.
    pub fn deployment(&self) -> &BlueGreenDeployment {
        &self.deployment
    }

    pub(crate) fn transition<T: Default>(self, deployment: BlueGreenDeployment) -> BlueGreen<T> {
        BlueGreen {
            instance: self.instance,
            deployment,
            state: T::default(),
        }
    }
}
