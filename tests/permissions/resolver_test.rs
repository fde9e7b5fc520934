/*!
 * Resolver Tests
 * Decision order, overrides and own/assigned records
 */

use crate::common::harness;
use portal_permissions::{
    DecisionReason, PermissionChecker, PermissionKey, PermissionRequest, PermissionSet,
    RecordScope, Role, RolePolicyTable,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_own_record_granted_only_to_owner() {
    let h = harness();

    let mine = json!({"id": "d1", "ownerId": "u1"});
    let theirs = json!({"id": "d2", "ownerId": "u2"});

    let granted = h
        .manager
        .check_request(PermissionRequest::new("u1", "documents", "view.own").with_record(&mine))
        .await;
    assert!(granted.is_allowed());
    assert_eq!(
        granted.reason(),
        &DecisionReason::RecordMatch("own".to_string())
    );

    let refused = h
        .manager
        .check_request(PermissionRequest::new("u1", "documents", "view.own").with_record(&theirs))
        .await;
    assert!(!refused.is_allowed());
    assert_eq!(
        refused.reason(),
        &DecisionReason::RecordMismatch("own".to_string())
    );
}

#[tokio::test]
async fn test_admin_allowed_anything() {
    let h = harness();
    assert!(h.manager.check("a1", "anything", "delete").await);
    assert!(h.manager.check("a1", "finances", "export").await);
}

#[tokio::test]
async fn test_admin_ignores_explicit_denials() {
    let h = harness();
    h.store.inner.set_overrides(
        "a1",
        PermissionSet::new()
            .deny(PermissionKey::All)
            .deny(PermissionKey::action("finances", "view")),
    );
    assert!(h.manager.check("a1", "finances", "view").await);
}

#[tokio::test]
async fn test_override_beats_role_default_for_one_actor() {
    let h = harness();
    h.store.inner.set_overrides(
        "u1",
        PermissionSet::new().deny(PermissionKey::action("projects", "view")),
    );

    assert!(!h.manager.check("u1", "projects", "view").await);
    assert!(h.manager.check("u2", "projects", "view").await);
}

#[tokio::test]
async fn test_resource_wildcard() {
    let h = harness();
    h.store.inner.set_overrides(
        "u1",
        PermissionSet::new().grant(PermissionKey::resource_wildcard("reports")),
    );

    assert!(h.manager.check("u1", "reports", "export").await);
    assert!(h.manager.check("u1", "reports", "delete").await);
    assert!(!h.manager.check("u1", "leads", "view").await);
}

#[tokio::test]
async fn test_exact_denial_beats_resource_wildcard() {
    let h = harness();
    h.store.inner.set_overrides(
        "u1",
        PermissionSet::new()
            .grant(PermissionKey::resource_wildcard("reports"))
            .deny(PermissionKey::action("reports", "delete")),
    );

    let resp = h
        .manager
        .check_request(PermissionRequest::new("u1", "reports", "delete"))
        .await;
    assert!(!resp.is_allowed());
    assert_eq!(resp.reason(), &DecisionReason::ExplicitDeny);
}

#[tokio::test]
async fn test_unlisted_key_denied() {
    let h = harness();
    let resp = h
        .manager
        .check_request(PermissionRequest::new("u1", "leads", "view"))
        .await;
    assert!(!resp.is_allowed());
    assert_eq!(resp.reason(), &DecisionReason::NoMatch);
}

#[tokio::test]
async fn test_malformed_action_denied() {
    let h = harness();
    let resp = h
        .manager
        .check_request(PermissionRequest::new("u1", "projects", "view..own"))
        .await;
    assert!(!resp.is_allowed());
    assert_eq!(resp.reason(), &DecisionReason::InvalidKey);
}

#[tokio::test]
async fn test_assigned_mission_for_provider() {
    let h = harness();
    let assigned = RecordScope::assigned_to("p1");
    let elsewhere = RecordScope::assigned_to("p2");

    let ok = h
        .manager
        .check_request(
            PermissionRequest::new("p1", "missions", "view.assigned").with_record(&assigned),
        )
        .await;
    let ko = h
        .manager
        .check_request(
            PermissionRequest::new("p1", "missions", "view.assigned").with_record(&elsewhere),
        )
        .await;
    assert!(ok.is_allowed());
    assert!(!ko.is_allowed());
}

#[tokio::test]
async fn test_partial_key_without_record_denied() {
    let h = harness();
    let resp = h
        .manager
        .check_request(PermissionRequest::new("u1", "documents", "view.own"))
        .await;
    assert!(!resp.is_allowed());
    assert!(matches!(resp.reason(), DecisionReason::MissingRecord(_)));
}

#[tokio::test]
async fn test_role_with_empty_defaults_fails_closed() {
    let h = harness();
    h.manager
        .reload_roles(RolePolicyTable::builtin().with_role(Role::Client, PermissionSet::new()));

    assert!(!h.manager.check("u1", "projects", "view").await);
    assert!(h.manager.check("p1", "calendar", "view").await);
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let h = harness();
    let responses = h
        .manager
        .check_batch(vec![
            PermissionRequest::new("u1", "projects", "view"),
            PermissionRequest::new("u1", "leads", "view"),
            PermissionRequest::new("r1", "leads", "view.all"),
        ])
        .await;

    let allowed: Vec<bool> = responses.iter().map(|r| r.is_allowed()).collect();
    assert_eq!(allowed, vec![true, false, true]);
}
