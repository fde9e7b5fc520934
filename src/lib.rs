/*!
 * Portal Permissions Library
 * Role-based access control for the client portal, exposed as a library
 */

pub mod core;
pub mod monitoring;
pub mod permissions;

// Re-exports
pub use crate::core::{PermissionError, PermissionResult, SecureCallError, StoreError, StoreResult};
pub use monitoring::init_tracing;
pub use permissions::{
    Actor, ActorDirectory, AuditEvent, AuditLogger, AuditResult, AuditSink, DataFilter,
    DecisionReason, DirectorySnapshot, InMemoryDirectory, JsonLinesSink, MemorySink,
    OverrideStore, PermissionCache, PermissionChecker, PermissionKey, PermissionManager,
    PermissionRequest, PermissionResponse, PermissionSet, PermissionsConfig, RecordScope, Role,
    RolePolicyTable, ScopedRecord, SessionProvider, StaticSession, TracingSink,
};
