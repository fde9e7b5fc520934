/*!
 * Limits and Policy Constants
 *
 * Centralized location for cache lifetimes, audit buffer sizes and other
 * tunables. Values that the configuration layer can override are marked
 * with [CONFIG].
 */

use std::time::Duration;

// =============================================================================
// PERMISSION CACHE
// =============================================================================

/// Lifetime of a merged permission set (15 minutes)
/// [CONFIG] `ttl_ms`
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Shortest period between background sweeps
pub const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// Initial capacity of the per-actor cache map
pub const CACHE_INITIAL_CAPACITY: usize = 1_024;

// =============================================================================
// OVERRIDE STORE
// =============================================================================

/// No store timeout unless configured; the caller's own budget applies
/// [CONFIG] `store_timeout_ms`
pub const DEFAULT_STORE_TIMEOUT: Option<Duration> = None;

// =============================================================================
// AUDIT
// =============================================================================

/// Pending audit events between the resolver and the sink
/// [CONFIG] `audit_queue_capacity`
pub const AUDIT_QUEUE_CAPACITY: usize = 4_096;

/// Maximum audit events kept by the in-memory sink
pub const MAX_AUDIT_EVENTS: usize = 10_000;

/// Maximum audit events kept per actor by the in-memory sink
pub const MAX_AUDIT_EVENTS_PER_ACTOR: usize = 100;
