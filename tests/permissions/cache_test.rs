/*!
 * Cache Tests
 * TTL expiry, idempotence, fail-closed stores and the sweeper
 */

use crate::common::{actors, harness, harness_with, CountingStore};
use async_trait::async_trait;
use portal_permissions::{
    AuditResult, InMemoryDirectory, MemorySink, OverrideStore, PermissionCache,
    PermissionChecker, PermissionKey, PermissionManager, PermissionSet, PermissionsConfig,
    StaticSession, StoreResult,
};
use std::sync::Arc;
use std::time::Duration;

fn cache_with_ttl(ttl: Duration) -> (PermissionCache, Arc<CountingStore>) {
    let directory = Arc::new(InMemoryDirectory::new());
    for actor in actors() {
        directory.insert_actor(actor);
    }
    let store = Arc::new(CountingStore::default());
    let cache = PermissionCache::new(directory, store.clone()).with_ttl(ttl);
    (cache, store)
}

#[tokio::test(start_paused = true)]
async fn test_ttl_refetch_timeline() {
    let (cache, store) = cache_with_ttl(Duration::from_millis(900_000));

    cache.get("u1").await;
    assert_eq!(store.calls(), 1);

    tokio::time::advance(Duration::from_millis(500_000)).await;
    cache.get("u1").await;
    assert_eq!(store.calls(), 1);

    tokio::time::advance(Duration::from_millis(401_000)).await;
    cache.get("u1").await;
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn test_get_within_ttl_is_idempotent() {
    let (cache, store) = cache_with_ttl(Duration::from_secs(60));
    store.inner.set_overrides(
        "u1",
        PermissionSet::new().grant(PermissionKey::action("reports", "export")),
    );

    let first = cache.get("u1").await;
    let second = cache.get("u1").await;
    assert_eq!(first, second);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_expired_entry_refetched_even_if_unchanged() {
    let h = harness_with(PermissionsConfig {
        ttl_ms: 1,
        ..PermissionsConfig::default()
    });

    h.manager.check("u1", "projects", "view").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    h.manager.check("u1", "projects", "view").await;

    assert_eq!(h.store.calls(), 2);
}

#[tokio::test]
async fn test_store_failure_denies_and_audits() {
    let h = harness();
    h.store.fail_with_network_error();

    assert!(!h.manager.check("u3", "finances", "view").await);
    h.manager.flush_audit().await;

    let events = h.sink.for_actor("u3", 10);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].result, AuditResult::Denied);
}

#[tokio::test]
async fn test_store_failure_keeps_role_baseline() {
    let h = harness();
    h.store.inner.set_overrides(
        "u1",
        PermissionSet::new().grant(PermissionKey::action("reports", "export")),
    );
    h.store.fail_with_network_error();

    assert!(h.manager.check("u1", "chat", "use").await);
    assert!(!h.manager.check("u1", "reports", "export").await);
    assert_eq!(h.manager.cache().len(), 1);
}

#[tokio::test]
async fn test_failing_store_called_once_within_ttl() {
    let (cache, store) = cache_with_ttl(Duration::from_secs(900));
    store.fail_with_network_error();

    let first = cache.get("u1").await;
    for _ in 0..4 {
        assert_eq!(cache.get("u1").await, first);
    }
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_degraded_entry_recovers_after_invalidate() {
    let h = harness();
    h.store.inner.set_overrides(
        "u1",
        PermissionSet::new().grant(PermissionKey::action("reports", "export")),
    );
    h.store.fail_with_network_error();
    assert!(!h.manager.check("u1", "reports", "export").await);

    h.store.recover();
    assert!(!h.manager.check("u1", "reports", "export").await);
    h.manager.refresh("u1").await;
    assert!(h.manager.check("u1", "reports", "export").await);
}

struct HangingStore;

#[async_trait]
impl OverrideStore for HangingStore {
    async fn load_overrides(&self, _actor_id: &str) -> StoreResult<PermissionSet> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_hanging_store_times_out_closed() {
    let directory = Arc::new(InMemoryDirectory::new());
    for actor in actors() {
        directory.insert_actor(actor);
    }
    let config = PermissionsConfig {
        store_timeout_ms: Some(50),
        ..PermissionsConfig::default()
    };
    let manager = PermissionManager::from_config(
        &config,
        directory,
        Arc::new(HangingStore),
        Arc::new(StaticSession::new()),
        Arc::new(MemorySink::new()),
    );

    assert!(manager.check("u1", "projects", "view").await);
    assert!(!manager.check("u1", "reports", "export").await);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_drops_stale_entries() {
    let h = harness_with(PermissionsConfig {
        ttl_ms: 30_000,
        ..PermissionsConfig::default()
    });
    let sweeper = h.manager.spawn_sweeper();

    h.manager.check("u1", "projects", "view").await;
    h.manager.check("u2", "projects", "view").await;
    assert_eq!(h.manager.cache_stats().size, 2);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(h.manager.cache_stats().size, 0);

    sweeper.shutdown().await;
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let h = harness();
    h.manager.check("u1", "projects", "view").await;
    assert!(h.manager.invalidate("u1"));
    assert!(!h.manager.invalidate("u1"));

    h.manager.check("u1", "projects", "view").await;
    assert_eq!(h.store.calls(), 2);
}
