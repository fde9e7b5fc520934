/*!
 * Shared fixtures for permission tests
 */

use async_trait::async_trait;
use portal_permissions::{
    Actor, InMemoryDirectory, MemorySink, OverrideStore, PermissionManager, PermissionSet,
    PermissionsConfig, Role, StaticSession, StoreError, StoreResult,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Override store that counts calls and can be switched to fail
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryDirectory,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with_network_error(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl OverrideStore for CountingStore {
    async fn load_overrides(&self, actor_id: &str) -> StoreResult<PermissionSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("NetworkError".into()));
        }
        self.inner.load_overrides(actor_id).await
    }
}

pub struct Harness {
    pub manager: PermissionManager,
    pub store: Arc<CountingStore>,
    pub session: Arc<StaticSession>,
    pub sink: Arc<MemorySink>,
}

pub fn actors() -> Vec<Actor> {
    vec![
        Actor::new("u1", Role::Client).with_name("Alice"),
        Actor::new("u2", Role::Client),
        Actor::new("u3", Role::Client),
        Actor::new("p1", Role::Prestataire),
        Actor::new("r1", Role::Revendeur).with_zone("north"),
        Actor::new("a1", Role::Admin),
    ]
}

pub fn harness_with(config: PermissionsConfig) -> Harness {
    let directory = Arc::new(InMemoryDirectory::new());
    for actor in actors() {
        directory.insert_actor(actor);
    }
    let store = Arc::new(CountingStore::default());
    let session = Arc::new(StaticSession::new());
    let sink = Arc::new(MemorySink::new());

    let manager = PermissionManager::from_config(
        &config,
        directory,
        store.clone(),
        session.clone(),
        sink.clone(),
    );

    Harness {
        manager,
        store,
        session,
        sink,
    }
}

pub fn harness() -> Harness {
    harness_with(PermissionsConfig::default())
}
