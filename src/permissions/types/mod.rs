/*!
 * Permission Types Module
 * Core types and traits for permission system
 */

mod core;
mod traits;

pub use core::{
    Actor, DecisionReason, PermissionKey, PermissionRequest, PermissionResponse, PermissionSet,
    Qualifier, Role,
};
pub use traits::{PermissionChecker, SessionProvider};
