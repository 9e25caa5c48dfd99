// ABOUTME: Identifiers the control plane issues for deployments and snapshots.
// ABOUTME: Distinct newtypes so a snapshot id never stands in for a deployment id.

use serde::{Deserialize, Serialize};

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

resource_id!(
    /// Resource id of a blue/green deployment, e.g. `bgd-0a1b2c3d4e5f`.
    ///
    /// Not the deployment name, which is chosen by the caller.
    DeploymentId
);

resource_id!(
    /// Identifier of a DB snapshot to restore from.
    SnapshotId
);

impl DeploymentId {
    /// Prefix of every resource id the control plane issues for a deployment.
    pub const PREFIX: &'static str = "bgd-";

    /// Mint the resource id for the `sequence`-th deployment.
    pub fn issued(sequence: u32) -> Self {
        Self(format!("{}{sequence:06}", Self::PREFIX))
    }
}
