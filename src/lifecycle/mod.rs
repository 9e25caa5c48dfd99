// ABOUTME: Instance lifecycle operations: provision, update and delete.
// ABOUTME: Each runs under one deadline and reports through an Outcome.

mod delete;
mod error;
mod instance;
mod provision;
mod update;

pub use delete::delete_instance;
pub use error::LifecycleError;
pub use instance::{ModifyError, modify_and_wait};
pub use provision::provision_instance;
pub use update::update_instance;
