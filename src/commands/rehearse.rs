// ABOUTME: Rehearse command implementation.
// ABOUTME: Runs the configured update against an in-memory control plane seeded from the config.

use dbcutover::config::{Config, WaitSettings};
use dbcutover::control_plane::MemoryControlPlane;
use dbcutover::error::{Error, Result};
use dbcutover::lifecycle::update_instance;
use dbcutover::output::Output;

pub async fn rehearse(config: Config, realtime: bool, mut output: Output) -> Result<()> {
    output.start_timer();

    let plane = MemoryControlPlane::new();
    plane.seed_instance(&config.instance, &config.current);

    let waits = if realtime {
        config.waits.clone()
    } else {
        WaitSettings::rehearsal()
    };

    output.progress(&format!(
        "Rehearsing update of DB instance ({})",
        config.instance
    ));
    let outcome = update_instance(
        &plane,
        &config.instance,
        &config.current,
        &config.desired,
        config.timeouts.update,
        &waits,
    )
    .await;

    for call in plane.mutations() {
        output.progress(&format!("  → {:?} {}", call.operation, call.target));
    }
    output.diagnostics(outcome.diagnostics.entries());

    if !outcome.is_success() {
        return Err(Error::OperationFailed(outcome.diagnostics.errors().count()));
    }

    let status = outcome
        .snapshot
        .as_ref()
        .map(|s| s.status.as_str())
        .unwrap_or("gone");
    output.success(&format!(
        "Rehearsal complete: DB instance ({}) is {status}",
        config.instance
    ));
    Ok(())
}
