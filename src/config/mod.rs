// ABOUTME: Configuration types and parsing for dbcutover.yml.
// ABOUTME: Holds the instance snapshots, operation timeouts, and waiter tuning.

mod attributes;
mod init;
mod timeouts;
mod waits;

pub use attributes::{Attributes, AttributeValue, Change, ChangeSet, keys};
pub use init::init_config;
pub use timeouts::Timeouts;
pub use waits::WaitSettings;

use crate::error::{Error, Result};
use crate::types::InstanceId;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "dbcutover.yml";
pub const CONFIG_FILENAME_ALT: &str = "dbcutover.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dbcutover/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub instance: InstanceId,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub waits: WaitSettings,

    /// Attributes as they are deployed today.
    #[serde(default)]
    pub current: Attributes,

    /// Attributes the instance should end up with.
    #[serde(default)]
    pub desired: Attributes,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Changes between the current and the desired snapshot.
    pub fn changes(&self) -> ChangeSet {
        ChangeSet::between(&self.current, &self.desired)
    }

    /// A starting configuration that changes the instance class through a cutover.
    pub fn template() -> Result<Self> {
        let current = Attributes::new()
            .with(keys::ENGINE, "mysql")
            .with(keys::ENGINE_VERSION, "8.0.35")
            .with(keys::INSTANCE_CLASS, "db.t3.micro")
            .with(keys::ALLOCATED_STORAGE, 20)
            .with(keys::DELETION_PROTECTION, true)
            .with(keys::BLUE_GREEN_ENABLED, true);

        let mut desired = current.clone();
        desired.insert(keys::INSTANCE_CLASS, "db.t3.small");

        Ok(Config {
            instance: InstanceId::new("my-database")
                .map_err(|e| Error::InvalidConfig(e.to_string()))?,
            timeouts: Timeouts::default(),
            waits: WaitSettings::default(),
            current,
            desired,
        })
    }
}
