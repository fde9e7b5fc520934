/*!
 * Core Types
 * Common aliases used across the crate
 */

/// Stable actor identifier handed out by the session provider
pub type ActorId = String;

/// Milliseconds, as used by the configuration surface
pub type Millis = u64;
