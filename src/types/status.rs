// ABOUTME: Status strings reported by the control plane.
// ABOUTME: Groups instance and deployment statuses into the sets the waiters use.

/// Database instance statuses.
pub mod instance {
    pub const AVAILABLE: &str = "available";
    pub const BACKING_UP: &str = "backing-up";
    pub const CONFIGURING_ENHANCED_MONITORING: &str = "configuring-enhanced-monitoring";
    pub const CONFIGURING_IAM_DATABASE_AUTH: &str = "configuring-iam-database-auth";
    pub const CONFIGURING_LOG_EXPORTS: &str = "configuring-log-exports";
    pub const CREATING: &str = "creating";
    pub const DELETING: &str = "deleting";
    pub const INCOMPATIBLE_PARAMETERS: &str = "incompatible-parameters";
    pub const INCOMPATIBLE_RESTORE: &str = "incompatible-restore";
    pub const MAINTENANCE: &str = "maintenance";
    pub const MODIFYING: &str = "modifying";
    pub const MOVING_TO_VPC: &str = "moving-to-vpc";
    pub const REBOOTING: &str = "rebooting";
    pub const RENAMING: &str = "renaming";
    pub const RESETTING_MASTER_CREDENTIALS: &str = "resetting-master-credentials";
    pub const STARTING: &str = "starting";
    pub const STOPPING: &str = "stopping";
    pub const STORAGE_FULL: &str = "storage-full";
    pub const STORAGE_OPTIMIZATION: &str = "storage-optimization";
    pub const UPGRADING: &str = "upgrading";

    /// Statuses an instance passes through on its way to being usable.
    pub const AVAILABLE_PENDING: &[&str] = &[
        BACKING_UP,
        CONFIGURING_ENHANCED_MONITORING,
        CONFIGURING_IAM_DATABASE_AUTH,
        CONFIGURING_LOG_EXPORTS,
        CREATING,
        MAINTENANCE,
        MODIFYING,
        MOVING_TO_VPC,
        REBOOTING,
        RENAMING,
        RESETTING_MASTER_CREDENTIALS,
        STARTING,
        STOPPING,
        STORAGE_FULL,
        UPGRADING,
    ];

    /// Statuses in which an instance accepts connections and modifications.
    pub const AVAILABLE_TARGET: &[&str] = &[AVAILABLE, STORAGE_OPTIMIZATION];

    /// Statuses an instance may report while it is being deleted.
    pub const DELETED_PENDING: &[&str] = &[
        AVAILABLE,
        BACKING_UP,
        CONFIGURING_ENHANCED_MONITORING,
        CONFIGURING_LOG_EXPORTS,
        CREATING,
        DELETING,
        INCOMPATIBLE_PARAMETERS,
        INCOMPATIBLE_RESTORE,
        MODIFYING,
        STARTING,
        STOPPING,
        STORAGE_FULL,
        STORAGE_OPTIMIZATION,
    ];
}

/// Blue/green deployment statuses.
pub mod deployment {
    pub const PROVISIONING: &str = "PROVISIONING";
    pub const AVAILABLE: &str = "AVAILABLE";
    pub const SWITCHOVER_IN_PROGRESS: &str = "SWITCHOVER_IN_PROGRESS";
    pub const SWITCHOVER_COMPLETED: &str = "SWITCHOVER_COMPLETED";
    pub const INVALID_CONFIGURATION: &str = "INVALID_CONFIGURATION";
    pub const SWITCHOVER_FAILED: &str = "SWITCHOVER_FAILED";
    pub const DELETING: &str = "DELETING";

    pub const AVAILABLE_PENDING: &[&str] = &[PROVISIONING];
    pub const AVAILABLE_TARGET: &[&str] = &[AVAILABLE];

    pub const SWITCHOVER_PENDING: &[&str] = &[AVAILABLE, SWITCHOVER_IN_PROGRESS];
    pub const SWITCHOVER_TARGET: &[&str] = &[SWITCHOVER_COMPLETED];

    /// Every status a deployment can report; any of them may precede its removal.
    pub const DELETED_PENDING: &[&str] = &[
        PROVISIONING,
        AVAILABLE,
        SWITCHOVER_IN_PROGRESS,
        SWITCHOVER_COMPLETED,
        INVALID_CONFIGURATION,
        SWITCHOVER_FAILED,
        DELETING,
    ];

    /// Statuses whose status details explain why a switchover did not happen.
    pub fn is_switchover_failure(status: &str) -> bool {
        status == INVALID_CONFIGURATION || status == SWITCHOVER_FAILED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disjoint(a: &[&str], b: &[&str]) -> bool {
        a.iter().all(|s| !b.contains(s))
    }

    #[test]
    fn waiter_sets_are_disjoint() {
        assert!(disjoint(instance::AVAILABLE_PENDING, instance::AVAILABLE_TARGET));
        assert!(disjoint(
            deployment::AVAILABLE_PENDING,
            deployment::AVAILABLE_TARGET
        ));
        assert!(disjoint(
            deployment::SWITCHOVER_PENDING,
            deployment::SWITCHOVER_TARGET
        ));
    }

    #[test]
    fn switchover_failure_statuses() {
        assert!(deployment::is_switchover_failure("SWITCHOVER_FAILED"));
        assert!(deployment::is_switchover_failure("INVALID_CONFIGURATION"));
        assert!(!deployment::is_switchover_failure("SWITCHOVER_COMPLETED"));
    }
}
