// ABOUTME: Library root for dbcutover - exposes the lifecycle engine for the CLI and tests.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod control_plane;
pub mod cutover;
pub mod deadline;
pub mod diagnostics;
pub mod error;
pub mod lifecycle;
pub mod output;
pub mod retry;
pub mod types;
pub mod waiter;
