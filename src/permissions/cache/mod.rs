/*!
 * Permission Cache
 * Time-boxed memoization of each actor's merged permission set
 *
 * An entry is (actor, merged set, stored_at). Entries older than the TTL are
 * treated as absent and refetched on the next lookup; `sweep()` drops them so
 * the map does not grow without bound. Sets built while the override store
 * was failing (role defaults only) are stored like any other; the outage is
 * not retried until the entry expires or is invalidated.
 */

mod sweeper;

pub use sweeper::{CacheSweeper, SweeperCommand};

use crate::core::limits::{CACHE_INITIAL_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_STORE_TIMEOUT};
use crate::core::types::ActorId;
use crate::permissions::policy::RolePolicyTable;
use crate::permissions::store::{
    load_overrides_or_empty, with_store_timeout, ActorDirectory, OverrideStore,
};
use crate::permissions::types::{Actor, PermissionSet};
use ahash::RandomState;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Cached merged permissions for one actor
struct CacheEntry {
    actor: Actor,
    permissions: Arc<PermissionSet>,
    stored_at: Instant,
}

/// Where a resolved permission set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Fresh cache entry
    Hit,
    /// Fetched from the directory and stored
    Fetched,
    /// Fetched while the override store failed; role defaults only
    Degraded,
    /// Actor could not be resolved; empty set, not stored
    Unresolved,
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub struct Resolution {
    pub actor: Option<Actor>,
    pub permissions: Arc<PermissionSet>,
    pub source: CacheSource,
}

impl Resolution {
    fn unresolved() -> Self {
        Self {
            actor: None,
            permissions: Arc::new(PermissionSet::new()),
            source: CacheSource::Unresolved,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.source == CacheSource::Hit
    }
}

/// Per-actor permission cache
///
/// # Performance
/// - Cache-line aligned to prevent false sharing of atomic hit/miss counters
#[repr(C, align(64))]
pub struct PermissionCache {
    entries: DashMap<ActorId, CacheEntry, RandomState>,
    roles: ArcSwap<RolePolicyTable>,
    directory: Arc<dyn ActorDirectory>,
    store: Arc<dyn OverrideStore>,
    ttl: Duration,
    store_timeout: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
}

impl PermissionCache {
    /// Create new cache with the builtin role table and default TTL
    pub fn new(directory: Arc<dyn ActorDirectory>, store: Arc<dyn OverrideStore>) -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher(CACHE_INITIAL_CAPACITY, RandomState::new()),
            roles: ArcSwap::from_pointee(RolePolicyTable::builtin()),
            directory,
            store,
            ttl: DEFAULT_CACHE_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_roles(self, roles: RolePolicyTable) -> Self {
        self.roles.store(Arc::new(roles));
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current role table
    pub fn roles(&self) -> Arc<RolePolicyTable> {
        self.roles.load_full()
    }

    /// Swap the role table; every cached set was built from the old one
    pub fn replace_roles(&self, roles: RolePolicyTable) {
        self.roles.store(Arc::new(roles));
        self.clear();
    }

    /// Merged permission set for `actor_id`
    pub async fn get(&self, actor_id: &str) -> Arc<PermissionSet> {
        self.resolve(actor_id).await.permissions
    }

    /// Look up `actor_id`, fetching on miss or staleness
    pub async fn resolve(&self, actor_id: &str) -> Resolution {
        if let Some(entry) = self.entries.get(actor_id) {
            if entry.stored_at.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(actor_id, "Permission cache hit");
                return Resolution {
                    actor: Some(entry.actor.clone()),
                    permissions: Arc::clone(&entry.permissions),
                    source: CacheSource::Hit,
                };
            }
            // Expired, remove it
            drop(entry);
            self.entries
                .remove_if(actor_id, |_, e| e.stored_at.elapsed() >= self.ttl);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(actor_id, "Permission cache miss");
        self.fetch(actor_id).await
    }

    async fn fetch(&self, actor_id: &str) -> Resolution {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let (actor, overrides) = futures::join!(
            with_store_timeout(self.store_timeout, self.directory.find_actor(actor_id)),
            load_overrides_or_empty(self.store.as_ref(), actor_id, self.store_timeout),
        );

        let actor = match actor {
            Ok(Some(actor)) => actor,
            Ok(None) => {
                warn!(actor_id, "Actor not found in directory");
                return Resolution::unresolved();
            }
            Err(e) => {
                warn!(actor_id, error = %e, "Actor lookup failed");
                return Resolution::unresolved();
            }
        };

        let defaults = self.roles.load().policy_for(actor.role);
        let permissions = Arc::new(PermissionSet::merged(&defaults, &overrides.permissions));

        let source = if overrides.is_degraded() {
            warn!(actor_id, "Caching role defaults without overrides");
            CacheSource::Degraded
        } else {
            CacheSource::Fetched
        };

        self.entries.insert(
            actor_id.to_string(),
            CacheEntry {
                actor: actor.clone(),
                permissions: Arc::clone(&permissions),
                stored_at: Instant::now(),
            },
        );

        Resolution {
            actor: Some(actor),
            permissions,
            source,
        }
    }

    /// Drop the entry for `actor_id`; returns whether one existed
    pub fn invalidate(&self, actor_id: &str) -> bool {
        self.entries.remove(actor_id).is_some()
    }

    /// Clear entire cache
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove every entry older than the TTL; returns how many were removed
    pub fn sweep(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let fresh = entry.stored_at.elapsed() < self.ttl;
            if !fresh {
                removed += 1;
            }
            fresh
        });
        if removed > 0 {
            debug!(removed, "Swept stale permission cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            size: self.entries.len(),
            hits,
            misses,
            fetches: self.fetches.load(Ordering::Relaxed),
            hit_rate,
            ttl: self.ttl,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub hit_rate: f64,
    pub ttl: Duration,
}
