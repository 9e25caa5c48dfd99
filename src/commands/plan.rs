// ABOUTME: Plan command implementation.
// ABOUTME: Lists attribute changes and the update strategy without touching anything.

use dbcutover::config::{Config, keys};
use dbcutover::cutover::check_precondition;
use dbcutover::error::{Error, Result};
use dbcutover::output::Output;

/// How an update would reach the desired configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Unchanged,
    BlueGreen,
    InPlace { apply_immediately: bool },
}

impl Strategy {
    pub fn for_config(config: &Config) -> Self {
        let changes = config.changes();
        if !changes.has_changes_except(keys::BOOKKEEPING) {
            Strategy::Unchanged
        } else if config.desired.flag(keys::BLUE_GREEN_ENABLED) {
            Strategy::BlueGreen
        } else {
            Strategy::InPlace {
                apply_immediately: config.desired.flag(keys::APPLY_IMMEDIATELY),
            }
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Strategy::Unchanged => "no modification needed",
            Strategy::BlueGreen => "blue/green cutover",
            Strategy::InPlace {
                apply_immediately: true,
            } => "in-place modification, applied immediately",
            Strategy::InPlace {
                apply_immediately: false,
            } => "in-place modification, applied in the next maintenance window",
        }
    }
}

pub fn plan(config: Config, output: Output) -> Result<()> {
    let changes = config.changes();

    output.progress(&format!(
        "Planning update of DB instance ({}) within {}s",
        config.instance,
        config.timeouts.update.as_secs()
    ));
    for change in changes.iter() {
        output.change(change);
    }

    if changes.has_change(keys::REPLICATE_SOURCE_DB) {
        match config.desired.text(keys::REPLICATE_SOURCE_DB) {
            None => output.progress("  read replica will be promoted first"),
            Some(source) => {
                return Err(Error::InvalidConfig(format!(
                    "cannot elect new source database for replication ({source})"
                )));
            }
        }
    }

    let strategy = Strategy::for_config(&config);
    if strategy == Strategy::BlueGreen {
        check_precondition(&config.desired).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    output.success(&format!(
        "{} change(s): {}",
        changes.len(),
        strategy.describe()
    ));
    Ok(())
}
