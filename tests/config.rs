// ABOUTME: Integration tests for configuration parsing and discovery.
// ABOUTME: Tests YAML parsing, duration defaults, and template scaffolding.

use dbcutover::config::*;
use std::fs;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = Config::from_yaml("instance: orders\n").unwrap();

        assert_eq!(config.instance.as_str(), "orders");
        assert_eq!(config.timeouts, Timeouts::default());
        assert_eq!(config.waits, WaitSettings::default());
        assert!(config.changes().is_empty());
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
instance: orders

timeouts:
  create: 30m
  update: 2h
  delete: 45m

waits:
  poll_interval: 15s
  delay: 30s
  continuous_target_occurrence: 5
  not_found_checks: 10
  retry_backoff: 2s

current:
  engine: mysql
  engine_version: "8.0.35"
  instance_class: db.t3.micro
  allocated_storage: 20
  blue_green_update.enabled: true

desired:
  engine: mysql
  engine_version: "8.0.36"
  instance_class: db.t3.micro
  allocated_storage: 20
  blue_green_update.enabled: true
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.timeouts.update, Duration::from_secs(2 * 60 * 60));
        assert_eq!(config.waits.poll_interval, Duration::from_secs(15));
        assert_eq!(config.waits.continuous_target_occurrence, 5);
        assert_eq!(config.waits.retry_backoff, Duration::from_secs(2));
        assert!(config.desired.flag(keys::BLUE_GREEN_ENABLED));
        assert_eq!(config.desired.int(keys::ALLOCATED_STORAGE), Some(20));

        let changes = config.changes();
        assert_eq!(changes.len(), 1);
        assert!(changes.has_change(keys::ENGINE_VERSION));
    }

    #[test]
    fn defaults_follow_the_documented_budgets() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.create, Duration::from_secs(40 * 60));
        assert_eq!(timeouts.update, Duration::from_secs(80 * 60));
        assert_eq!(timeouts.delete, Duration::from_secs(60 * 60));

        let waits = WaitSettings::default();
        assert_eq!(waits.poll_interval, Duration::from_secs(10));
        assert_eq!(waits.delay, Duration::from_secs(60));
        assert_eq!(waits.continuous_target_occurrence, 3);
        assert_eq!(waits.not_found_checks, 20);
        assert_eq!(waits.retry_backoff, Duration::from_millis(500));
    }

    #[test]
    fn invalid_instance_identifiers_are_rejected() {
        assert!(Config::from_yaml("instance: 1orders\n").is_err());
        assert!(Config::from_yaml("instance: orders--primary\n").is_err());
    }

    #[test]
    fn missing_instance_is_an_error() {
        assert!(Config::from_yaml("timeouts:\n  update: 10m\n").is_err());
    }
}

mod discovery {
    use super::*;

    #[test]
    fn finds_the_alternate_file_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".dbcutover")).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME_DIR),
            "instance: orders\n",
        )
        .unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.instance.as_str(), "orders");
    }

    #[test]
    fn reports_a_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(dir.path()).unwrap_err();
        assert!(err.to_string().contains("configuration file not found"));
    }

    #[test]
    fn init_writes_a_parseable_template() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), Some("billing"), false).unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.instance.as_str(), "billing");
        assert!(config.changes().has_change(keys::INSTANCE_CLASS));
        assert!(init_config(dir.path(), None, false).is_err());
        assert!(init_config(dir.path(), None, true).is_ok());
    }
}
