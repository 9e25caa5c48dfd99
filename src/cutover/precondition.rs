// ABOUTME: Eligibility check run before any blue/green resource is created.
// ABOUTME: Rejects unsupported engines and read replicas.

use super::error::PreconditionError;
use crate::config::{Attributes, keys};

/// Engines that support blue/green deployments.
pub const SUPPORTED_ENGINES: &[&str] = &["mariadb", "mysql"];

/// Check that `desired` can be applied through a blue/green deployment.
pub fn check(desired: &Attributes) -> Result<(), PreconditionError> {
    let engine = desired.text(keys::ENGINE).unwrap_or_default();
    if !SUPPORTED_ENGINES.contains(&engine) {
        return Err(PreconditionError::UnsupportedEngine {
            engine: engine.to_string(),
            supported: SUPPORTED_ENGINES,
        });
    }

    if let Some(source) = desired.text(keys::REPLICATE_SOURCE_DB) {
        return Err(PreconditionError::ReplicaSource {
            source_db: source.to_string(),
        });
    }

    Ok(())
}
