// ABOUTME: Tagged error value returned by every control-plane call.
// ABOUTME: Retry classifiers match on the kind and message instead of concrete types.

use std::fmt;

/// Machine-readable category of a control-plane error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The addressed resource does not exist.
    NotFound,
    /// A resource with the requested identifier already exists.
    AlreadyExists,
    InvalidParameterValue,
    InvalidParameterCombination,
    /// The instance is in a state that does not allow the request.
    InvalidInstanceState,
    /// The owning cluster is in a state that does not allow the request.
    InvalidClusterState,
    /// The blue/green deployment is in a state that does not allow the request.
    InvalidDeploymentState,
    Throttling,
    /// The request failed validation before reaching the resource.
    Validation,
    Internal,
}

impl ApiErrorKind {
    /// The wire error code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorKind::NotFound => "NotFound",
            ApiErrorKind::AlreadyExists => "AlreadyExists",
            ApiErrorKind::InvalidParameterValue => "InvalidParameterValue",
            ApiErrorKind::InvalidParameterCombination => "InvalidParameterCombination",
            ApiErrorKind::InvalidInstanceState => "InvalidDBInstanceState",
            ApiErrorKind::InvalidClusterState => "InvalidDBClusterStateFault",
            ApiErrorKind::InvalidDeploymentState => "InvalidBlueGreenDeploymentStateFault",
            ApiErrorKind::Throttling => "Throttling",
            ApiErrorKind::Validation => "ValidationError",
            ApiErrorKind::Internal => "InternalFailure",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An error reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }

    /// Whether this error has the given kind and its message contains `needle`.
    pub fn matches(&self, kind: ApiErrorKind, needle: &str) -> bool {
        self.kind == kind && self.message.contains(needle)
    }
}
