/*!
 * Directory Service
 * Interfaces to the external service holding actors and custom grants
 */

use crate::core::errors::{PermissionResult, StoreError, StoreResult};
use crate::core::types::ActorId;
use crate::permissions::types::{Actor, PermissionSet};
use ahash::RandomState;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

/// Looks up actors (and therefore their role) by id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    /// `Ok(None)` when the actor does not exist
    async fn find_actor(&self, actor_id: &str) -> StoreResult<Option<Actor>>;
}

/// Per-actor permission overrides
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn load_overrides(&self, actor_id: &str) -> StoreResult<PermissionSet>;
}

/// Run a store call under an optional deadline
pub async fn with_store_timeout<T, F>(timeout: Option<Duration>, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| Err(StoreError::Timeout(limit.as_millis() as u64))),
        None => fut.await,
    }
}

/// Overrides after the fail-closed collapse
#[derive(Debug, Clone, Default)]
pub struct LoadedOverrides {
    pub permissions: PermissionSet,
    /// Set when the store failed and `permissions` is the empty fallback
    pub failure: Option<StoreError>,
}

impl LoadedOverrides {
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// The one place a store failure turns into "no overrides"
///
/// Role defaults still apply, so the actor keeps the baseline but gains
/// nothing extra.
pub async fn load_overrides_or_empty(
    store: &dyn OverrideStore,
    actor_id: &str,
    timeout: Option<Duration>,
) -> LoadedOverrides {
    match with_store_timeout(timeout, store.load_overrides(actor_id)).await {
        Ok(permissions) => LoadedOverrides {
            permissions,
            failure: None,
        },
        Err(e) => {
            warn!(actor_id, error = %e, "Override store unavailable, using role defaults only");
            LoadedOverrides {
                permissions: PermissionSet::new(),
                failure: Some(e),
            }
        }
    }
}

/// In-process directory, for tests and the `permcheck` binary
#[derive(Default)]
pub struct InMemoryDirectory {
    actors: DashMap<ActorId, Actor, RandomState>,
    overrides: DashMap<ActorId, PermissionSet, RandomState>,
    unavailable: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(self, actor: Actor) -> Self {
        self.insert_actor(actor);
        self
    }

    pub fn with_overrides(self, actor_id: impl Into<ActorId>, overrides: PermissionSet) -> Self {
        self.set_overrides(actor_id, overrides);
        self
    }

    pub fn insert_actor(&self, actor: Actor) {
        self.actors.insert(actor.id.clone(), actor);
    }

    pub fn remove_actor(&self, actor_id: &str) -> Option<Actor> {
        self.actors.remove(actor_id).map(|(_, actor)| actor)
    }

    pub fn set_overrides(&self, actor_id: impl Into<ActorId>, overrides: PermissionSet) {
        self.overrides.insert(actor_id.into(), overrides);
    }

    /// Simulate an outage of the override store
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }
}

/// Serialized directory contents
///
/// ```json
/// {
///   "actors": [{"id": "u1", "role": "client"}],
///   "overrides": {"u1": {"reports.export": true}}
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub overrides: HashMap<ActorId, PermissionSet>,
}

impl DirectorySnapshot {
    pub async fn load(path: impl AsRef<Path>) -> PermissionResult<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl From<DirectorySnapshot> for InMemoryDirectory {
    fn from(snapshot: DirectorySnapshot) -> Self {
        let directory = InMemoryDirectory::new();
        for actor in snapshot.actors {
            directory.insert_actor(actor);
        }
        for (actor_id, overrides) in snapshot.overrides {
            directory.set_overrides(actor_id, overrides);
        }
        directory
    }
}

#[async_trait]
impl ActorDirectory for InMemoryDirectory {
    async fn find_actor(&self, actor_id: &str) -> StoreResult<Option<Actor>> {
        Ok(self.actors.get(actor_id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl OverrideStore for InMemoryDirectory {
    async fn load_overrides(&self, actor_id: &str) -> StoreResult<PermissionSet> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("directory marked unavailable".into()));
        }
        Ok(self
            .overrides
            .get(actor_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}
