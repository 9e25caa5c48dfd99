// ABOUTME: Init command implementation.
// ABOUTME: Scaffolds a dbcutover.yml in the current directory.

use dbcutover::config::{self, CONFIG_FILENAME};
use dbcutover::error::Result;
use dbcutover::output::Output;
use std::env;

pub fn init(instance: Option<&str>, force: bool, output: Output) -> Result<()> {
    let cwd = env::current_dir()?;
    config::init_config(&cwd, instance, force)?;
    output.success(&format!("Created {CONFIG_FILENAME}"));
    Ok(())
}
