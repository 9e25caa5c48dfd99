// ABOUTME: Command module aggregator for the dbcutover CLI.
// ABOUTME: Re-exports init, plan, and rehearse command handlers.

mod init;
mod plan;
mod rehearse;

pub use init::init;
pub use plan::plan;
pub use rehearse::rehearse;
