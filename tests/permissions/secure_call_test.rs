/*!
 * Secure Call Tests
 * Session-gated data access with role filtering
 */

use crate::common::harness;
use portal_permissions::{Actor, PermissionError, Role, SecureCallError};
use serde_json::{json, Value};

fn missions() -> Vec<Value> {
    vec![
        json!({"id": "m1", "assignedTo": "p1"}),
        json!({"id": "m2", "prestataireId": "p2"}),
        json!({"id": "m3", "assignedUsers": ["p2", "p1"]}),
        json!({"id": "m4"}),
    ]
}

fn ids(records: &[Value]) -> Vec<&str> {
    records.iter().filter_map(|r| r["id"].as_str()).collect()
}

#[tokio::test]
async fn test_unauthenticated_call_never_runs() {
    let h = harness();
    let mut ran = false;

    let err = h
        .manager
        .secure_call("projects", "view", || {
            ran = true;
            async { Ok::<Vec<Value>, std::io::Error>(Vec::new()) }
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SecureCallError::Permission(PermissionError::Unauthenticated)
    ));
    assert!(!ran);
}

#[tokio::test]
async fn test_denied_call_is_generic() {
    let h = harness();
    h.session.sign_in(Actor::new("u1", Role::Client));

    let err = h
        .manager
        .secure_call("missions", "view", || async {
            Ok::<_, std::io::Error>(missions())
        })
        .await
        .unwrap_err();

    assert!(err.is_denied());
    assert_eq!(err.to_string(), "Not authorized");
}

#[tokio::test]
async fn test_provider_sees_assigned_missions() {
    let h = harness();
    h.session.sign_in(Actor::new("p1", Role::Prestataire));

    // view.assigned alone does not open the coarse gate
    assert!(h
        .manager
        .secure_call("missions", "view.assigned", || async {
            Ok::<_, std::io::Error>(missions())
        })
        .await
        .is_err());

    let visible = h
        .manager
        .secure_call("calendar", "view", || async {
            Ok::<_, std::io::Error>(missions())
        })
        .await
        .unwrap();
    assert_eq!(ids(&visible), vec!["m1", "m3"]);
}

#[tokio::test]
async fn test_reseller_zone_filter() {
    let h = harness();
    h.session
        .sign_in(Actor::new("r1", Role::Revendeur).with_zone("north"));

    let clients = h
        .manager
        .secure_call("clients", "create", || async {
            Ok::<_, std::io::Error>(vec![
                json!({"id": "c1", "zone": "north"}),
                json!({"id": "c2", "zone": "south"}),
                json!({"id": "c3"}),
                json!({"id": "c4", "zones": ["south", "north"]}),
            ])
        })
        .await
        .unwrap();
    assert_eq!(ids(&clients), vec!["c1", "c3", "c4"]);
}

#[tokio::test]
async fn test_admin_sees_everything() {
    let h = harness();
    h.session.sign_in(Actor::new("a1", Role::Admin));

    let all = h
        .manager
        .secure_call("missions", "view", || async {
            Ok::<_, std::io::Error>(missions())
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_single_record_filtered() {
    let h = harness();
    h.session.sign_in(Actor::new("u1", Role::Client));

    let mine = h
        .manager
        .secure_call_one("projects", "view", || async {
            Ok::<_, std::io::Error>(Some(json!({"id": "x", "clientId": "u1"})))
        })
        .await
        .unwrap();
    assert!(mine.is_some());

    let theirs = h
        .manager
        .secure_call_one("projects", "view", || async {
            Ok::<_, std::io::Error>(Some(json!({"id": "y", "clientId": "u2"})))
        })
        .await
        .unwrap();
    assert!(theirs.is_none());
}

#[tokio::test]
async fn test_sign_out_revokes_access() {
    let h = harness();
    h.session.sign_in(Actor::new("u1", Role::Client));
    assert!(h.manager.require_permission("chat", "use").await.is_ok());

    h.session.sign_out();
    assert_eq!(
        h.manager.require_permission("chat", "use").await.unwrap_err(),
        PermissionError::Unauthenticated
    );
}
