// ABOUTME: Total time budgets for each lifecycle operation.
// ABOUTME: Every stage of an operation shares the operation's single budget.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_create", with = "humantime_serde")]
    pub create: Duration,

    #[serde(default = "default_update", with = "humantime_serde")]
    pub update: Duration,

    #[serde(default = "default_delete", with = "humantime_serde")]
    pub delete: Duration,
}

fn default_create() -> Duration {
    Duration::from_secs(40 * 60)
}

fn default_update() -> Duration {
    Duration::from_secs(80 * 60)
}

fn default_delete() -> Duration {
    Duration::from_secs(60 * 60)
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            create: default_create(),
            update: default_update(),
            delete: default_delete(),
        }
    }
}
