/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for permission operations
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Result type for directory/override store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Permission errors with serialization support
///
/// Only `Unauthenticated` is meant to reach the caller as something to act on.
/// Every other variant degrades to a denial and is visible through logs or the
/// audit trail.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PermissionError {
    #[error("Not authenticated")]
    #[diagnostic(
        code(permissions::unauthenticated),
        help("No actor is attached to the current session. Sign in again.")
    )]
    Unauthenticated,

    /// Display stays generic so internal detail never reaches the end user
    #[error("Not authorized")]
    #[diagnostic(code(permissions::denied))]
    Denied { resource: String, action: String },

    #[error("Permission store unavailable: {reason}")]
    #[diagnostic(
        code(permissions::store_unavailable),
        help("Overrides are treated as empty until the directory service recovers.")
    )]
    StoreUnavailable { reason: String },

    #[error("Unknown role: {role}")]
    #[diagnostic(
        code(permissions::unknown_role),
        help("Add the role to the policy table; until then it has no permissions.")
    )]
    UnknownRole { role: String },

    #[error("Audit write failed: {reason}")]
    #[diagnostic(code(permissions::audit_write_failure))]
    AuditWriteFailure { reason: String },

    #[error("Invalid permission key '{key}': {reason}")]
    #[diagnostic(
        code(permissions::invalid_key),
        help("Keys look like `resource.action`, `resource.action.qualifier`, `resource.*` or `*`.")
    )]
    InvalidKey { key: String, reason: String },

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(permissions::invalid_config))]
    InvalidConfig { reason: String },
}

impl PermissionError {
    pub fn denied(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Denied {
            resource: resource.into(),
            action: action.into(),
        }
    }

    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the caller is expected to handle this error (redirect, sign-in)
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }
}

/// Directory and override store errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    #[diagnostic(code(store::unavailable))]
    Unavailable(String),

    #[error("Store request timed out after {0}ms")]
    #[diagnostic(code(store::timeout))]
    Timeout(u64),
}

impl From<StoreError> for PermissionError {
    fn from(err: StoreError) -> Self {
        PermissionError::StoreUnavailable {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PermissionError {
    fn from(err: serde_json::Error) -> Self {
        PermissionError::invalid_config(err.to_string())
    }
}

impl From<std::io::Error> for PermissionError {
    fn from(err: std::io::Error) -> Self {
        PermissionError::invalid_config(err.to_string())
    }
}

/// Error returned by `PermissionManager::secure_call`
#[derive(Error, Debug)]
pub enum SecureCallError<E> {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("Data access failed: {0}")]
    Call(E),
}

impl<E> SecureCallError<E> {
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Permission(PermissionError::Denied { .. }))
    }
}
