// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup and fixtures around the in-memory control plane.

use std::sync::Once;

use dbcutover::config::{Attributes, keys};
use dbcutover::control_plane::MemoryControlPlane;
use dbcutover::types::InstanceId;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("dbcutover=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[allow(dead_code)]
pub fn orders() -> InstanceId {
    InstanceId::new("orders").unwrap()
}

/// A small MySQL instance as it runs today.
#[allow(dead_code)]
pub fn current() -> Attributes {
    Attributes::new()
        .with(keys::ENGINE, "mysql")
        .with(keys::ENGINE_VERSION, "8.0.35")
        .with(keys::INSTANCE_CLASS, "db.t3.micro")
        .with(keys::ALLOCATED_STORAGE, 20)
        .with(keys::DELETION_PROTECTION, false)
        .with(keys::BLUE_GREEN_ENABLED, true)
}

/// `current` with a larger instance class.
#[allow(dead_code)]
pub fn resized() -> Attributes {
    let mut desired = current();
    desired.insert(keys::INSTANCE_CLASS, "db.t3.small");
    desired
}

/// A control plane already hosting `orders` as described by `current()`.
#[allow(dead_code)]
pub fn seeded_plane() -> MemoryControlPlane {
    let plane = MemoryControlPlane::new();
    plane.seed_instance(&orders(), &current());
    plane
}
