// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates dbcutover.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::InstanceId;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, instance: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template()?;

    if let Some(id) = instance {
        config.instance = InstanceId::new(id).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    let yaml = generate_template_yaml(&config)?;
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> Result<String> {
    let current = serde_yaml::to_string(&config.current)?;
    let desired = serde_yaml::to_string(&config.desired)?;

    Ok(format!(
        r#"instance: {}

# Total budget per operation; every stage shares it.
timeouts:
  update: 80m

# Polling behaviour while waiting on the control plane.
waits:
  poll_interval: 10s
  delay: 1m
  continuous_target_occurrence: 3

current:
{}
desired:
{}"#,
        config.instance,
        indent(&current),
        indent(&desired),
    ))
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| format!("  {line}\n"))
        .collect()
}
