/*!
 * Permissions Module
 * Role-based permission resolution, record filtering, and audit logging
 *
 * Every data access in the portal goes through this module: a single gate
 * that resolves an actor's merged permissions, decides, audits, and narrows
 * result sets to what the actor may see.
 *
 * ## Features
 * - Role defaults merged with per-actor overrides (overrides win)
 * - Ordered resolver rules with wildcard and own/assigned keys
 * - Time-boxed permission cache with background sweep
 * - Role-based record filtering (owner, assignee, zone)
 * - Non-blocking audit trail with pluggable sinks
 * - Fail-closed on store failures
 *
 * ## Usage
 * ```ignore
 * use portal_permissions::permissions::{PermissionManager, PermissionChecker};
 *
 * let manager = PermissionManager::from_config(&config, directory, store, session, sink);
 *
 * if manager.check("user-1", "projects", "view").await {
 *     // Perform operation
 * }
 *
 * // Gate and filter a data call in one step
 * let projects = manager
 *     .secure_call("projects", "view", || api.list_projects())
 *     .await?;
 * ```
 */

pub mod audit;
pub mod cache;
pub mod config;
pub mod filter;
pub mod manager;
pub mod policy;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used items
pub use audit::{
    AuditEvent, AuditLogger, AuditResult, AuditSeverity, AuditSink, AuditStats, JsonLinesSink,
    MemorySink, TracingSink,
};
pub use cache::{CacheSource, CacheStats, CacheSweeper, PermissionCache, Resolution};
pub use config::PermissionsConfig;
pub use filter::{DataFilter, RecordScope, ScopedRecord};
pub use manager::PermissionManager;
pub use policy::{
    EvaluationContext, Policy, PolicyDecision, PolicyEngine, RequestContext, RolePolicyTable,
};
pub use session::StaticSession;
pub use store::{ActorDirectory, DirectorySnapshot, InMemoryDirectory, OverrideStore};
pub use types::{
    Actor, DecisionReason, PermissionChecker, PermissionKey, PermissionRequest,
    PermissionResponse, PermissionSet, Qualifier, Role, SessionProvider,
};
