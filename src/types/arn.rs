// ABOUTME: Parsing of database instance ARNs reported by blue/green deployments.
// ABOUTME: Extracts the instance identifier from the resource section.

use std::fmt;
use thiserror::Error;

use super::InstanceId;

#[derive(Debug, Error)]
pub enum ArnError {
    #[error("invalid ARN: {0}")]
    Malformed(String),

    #[error("DB Instance ARN: invalid resource section: {0}")]
    InvalidResource(String),
}

/// A parsed `arn:<partition>:rds:<region>:<account>:db:<identifier>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceArn {
    partition: String,
    region: String,
    account: String,
    identifier: InstanceId,
}

impl InstanceArn {
    pub fn parse(input: &str) -> Result<Self, ArnError> {
        let mut parts = input.splitn(6, ':');
        let (Some("arn"), Some(partition), Some(service), Some(region), Some(account), Some(resource)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(ArnError::Malformed(input.to_string()));
        };

        if partition.is_empty() || service.is_empty() {
            return Err(ArnError::Malformed(input.to_string()));
        }

        let identifier = resource
            .strip_prefix("db:")
            .filter(|id| {
                !id.is_empty()
                    && id
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            })
            .and_then(|id| InstanceId::new(id).ok())
            .ok_or_else(|| ArnError::InvalidResource(resource.to_string()))?;

        Ok(Self {
            partition: partition.to_string(),
            region: region.to_string(),
            account: account.to_string(),
            identifier,
        })
    }

    /// Build the ARN of an instance in the given partition, region and account.
    pub fn new(partition: &str, region: &str, account: &str, identifier: InstanceId) -> Self {
        Self {
            partition: partition.to_string(),
            region: region.to_string(),
            account: account.to_string(),
            identifier,
        }
    }

    pub fn identifier(&self) -> &InstanceId {
        &self.identifier
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

impl fmt::Display for InstanceArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:rds:{}:{}:db:{}",
            self.partition, self.region, self.account, self.identifier
        )
    }
}
