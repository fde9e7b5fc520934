/*!
 * Audit Tests
 * One event per check, context propagation and sinks
 */

use crate::common::{actors, harness};
use portal_permissions::permissions::{AuditSeverity, RequestContext};
use portal_permissions::{
    AuditEvent, AuditResult, InMemoryDirectory, JsonLinesSink, PermissionChecker,
    PermissionManager, PermissionRequest, PermissionsConfig, StaticSession,
};
use std::sync::Arc;

#[tokio::test]
async fn test_one_event_per_check_matching_result() {
    let h = harness();
    let checks = [
        ("u1", "projects", "view"),
        ("u1", "finances", "delete"),
        ("a1", "anything", "delete"),
        ("nobody", "projects", "view"),
        ("r1", "leads", "create"),
    ];

    let mut outcomes = Vec::new();
    for (actor, resource, action) in checks {
        outcomes.push(h.manager.check(actor, resource, action).await);
    }
    h.manager.flush_audit().await;

    let mut events = h.sink.recent(100);
    events.reverse();
    assert_eq!(events.len(), checks.len());
    for ((event, allowed), (actor, resource, action)) in
        events.iter().zip(&outcomes).zip(checks)
    {
        assert_eq!(event.actor_id, actor);
        assert_eq!(event.resource, resource);
        assert_eq!(event.action, action);
        assert_eq!(event.result, AuditResult::from(*allowed));
    }

    let stats = h.manager.audit_stats();
    assert_eq!(stats.written, checks.len() as u64);
    assert_eq!(stats.dropped, 0);
}

#[tokio::test]
async fn test_event_carries_actor_name_and_context() {
    let h = harness();
    let context = RequestContext::new()
        .with_ip("10.0.0.7")
        .with_detail("count", 3);

    h.manager
        .check_request(PermissionRequest::new("u1", "projects", "view").with_context(context))
        .await;
    h.manager.flush_audit().await;

    let event = &h.sink.for_actor("u1", 1)[0];
    assert_eq!(event.actor_name.as_deref(), Some("Alice"));
    assert_eq!(event.context.ip.as_deref(), Some("10.0.0.7"));
    assert_eq!(event.context.details["count"], 3);
}

#[tokio::test]
async fn test_unknown_actor_is_critical() {
    let h = harness();
    h.manager.check("ghost", "finances", "view").await;
    h.manager.flush_audit().await;

    let event = &h.sink.for_actor("ghost", 1)[0];
    assert_eq!(event.result, AuditResult::Denied);
    assert_eq!(event.severity, AuditSeverity::Critical);
    assert_eq!(h.sink.actors_with_denials(), vec![("ghost".to_string(), 1)]);
}

#[tokio::test]
async fn test_json_lines_sink_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    let directory = Arc::new(InMemoryDirectory::new());
    for actor in actors() {
        directory.insert_actor(actor);
    }
    let sink = Arc::new(JsonLinesSink::open(&path).await.unwrap());
    let manager = PermissionManager::from_config(
        &PermissionsConfig::default(),
        directory.clone(),
        directory,
        Arc::new(StaticSession::new()),
        sink,
    );

    assert!(manager.check("u1", "chat", "use").await);
    assert!(!manager.check("u1", "leads", "delete").await);
    manager.shutdown().await;

    let contents = std::fs::read_to_string(&path).unwrap();
    let events: Vec<AuditEvent> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].result, AuditResult::Granted);
    assert_eq!(events[1].result, AuditResult::Denied);
}
