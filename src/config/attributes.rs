// ABOUTME: Flat key/value attribute snapshots of a database instance configuration.
// ABOUTME: Provides change detection between the current and the desired snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute keys the lifecycle operations interpret.
pub mod keys {
    pub const ALLOCATED_STORAGE: &str = "allocated_storage";
    pub const ALLOW_MAJOR_VERSION_UPGRADE: &str = "allow_major_version_upgrade";
    pub const APPLY_IMMEDIATELY: &str = "apply_immediately";
    pub const BACKUP_RETENTION_PERIOD: &str = "backup_retention_period";
    pub const BACKUP_WINDOW: &str = "backup_window";
    pub const BLUE_GREEN_ENABLED: &str = "blue_green_update.enabled";
    pub const DELETE_AUTOMATED_BACKUPS: &str = "delete_automated_backups";
    pub const DELETION_PROTECTION: &str = "deletion_protection";
    pub const ENGINE: &str = "engine";
    pub const ENGINE_VERSION: &str = "engine_version";
    pub const FINAL_SNAPSHOT_IDENTIFIER: &str = "final_snapshot_identifier";
    pub const INSTANCE_CLASS: &str = "instance_class";
    pub const PARAMETER_GROUP_NAME: &str = "parameter_group_name";
    pub const REPLICATE_SOURCE_DB: &str = "replicate_source_db";
    pub const SKIP_FINAL_SNAPSHOT: &str = "skip_final_snapshot";
    pub const TAGS: &str = "tags";
    pub const TAGS_ALL: &str = "tags_all";

    /// Keys whose changes alone never require modifying the instance.
    pub const BOOKKEEPING: &[&str] = &[
        ALLOW_MAJOR_VERSION_UPGRADE,
        BLUE_GREEN_ENABLED,
        DELETE_AUTOMATED_BACKUPS,
        FINAL_SNAPSHOT_IDENTIFIER,
        REPLICATE_SOURCE_DB,
        SKIP_FINAL_SNAPSHOT,
        TAGS,
        TAGS_ALL,
    ];

    /// Keys that only steer the orchestration and are never sent as modifications.
    pub const DIRECTIVES: &[&str] = &[APPLY_IMMEDIATELY];
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// An ordered attribute snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<AttributeValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Boolean attribute; absent or non-boolean reads as `false`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(AttributeValue::Bool(true)))
    }

    /// Non-empty string attribute.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(AttributeValue::Text(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(AttributeValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Copy every attribute of `other` over this snapshot.
    pub fn merge(&mut self, other: &Attributes) {
        for (k, v) in other.iter() {
            self.0.insert(k.to_string(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One attribute that differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub key: String,
    pub old: Option<AttributeValue>,
    pub new: Option<AttributeValue>,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<AttributeValue>| match v {
            Some(v) => v.to_string(),
            None => "(unset)".to_string(),
        };
        write!(f, "{}: {} -> {}", self.key, show(&self.old), show(&self.new))
    }
}

/// The attributes that differ between a current and a desired snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn between(current: &Attributes, desired: &Attributes) -> Self {
        let mut changes = Vec::new();

        for (key, new) in desired.iter() {
            let old = current.get(key);
            if old != Some(new) {
                changes.push(Change {
                    key: key.to_string(),
                    old: old.cloned(),
                    new: Some(new.clone()),
                });
            }
        }

        for (key, old) in current.iter() {
            if !desired.contains(key) {
                changes.push(Change {
                    key: key.to_string(),
                    old: Some(old.clone()),
                    new: None,
                });
            }
        }

        changes.sort_by(|a, b| a.key.cmp(&b.key));
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn has_change(&self, key: &str) -> bool {
        self.changes.iter().any(|c| c.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.key == key)
    }

    /// Whether anything other than the listed keys changed.
    pub fn has_changes_except(&self, ignored: &[&str]) -> bool {
        self.changes.iter().any(|c| !ignored.contains(&c.key.as_str()))
    }

    /// New values of every changed key outside `ignored`. Removed keys are skipped.
    pub fn desired_except(&self, ignored: &[&str]) -> Attributes {
        let mut attrs = Attributes::new();
        for change in &self.changes {
            if ignored.contains(&change.key.as_str()) {
                continue;
            }
            if let Some(new) = &change.new {
                attrs.insert(&change.key, new.clone());
            }
        }
        attrs
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }
}
