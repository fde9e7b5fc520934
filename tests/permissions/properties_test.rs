/*!
 * Property Tests
 * Resolver and filter invariants over generated inputs
 */

use crate::common::harness;
use portal_permissions::permissions::{EvaluationContext, PolicyEngine};
use portal_permissions::{
    Actor, DataFilter, PermissionChecker, PermissionKey, PermissionRequest, PermissionSet,
    RecordScope, Role,
};
use proptest::prelude::*;
use std::sync::Arc;

fn segment() -> impl Strategy<Value = String> {
    "[a-z]{1,10}"
}

fn permission_set() -> impl Strategy<Value = PermissionSet> {
    prop::collection::vec((segment(), segment(), any::<bool>()), 0..16).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(resource, action, value)| (PermissionKey::action(resource, action), value))
            .collect()
    })
}

fn record_scope() -> impl Strategy<Value = RecordScope> {
    let ids = prop::collection::vec(prop::sample::select(vec!["u1", "u2", "p1", "p2"]), 0..3);
    (ids.clone(), ids).prop_map(|(owners, assignees)| RecordScope {
        owners: owners.into_iter().map(String::from).collect(),
        assignees: assignees.into_iter().map(String::from).collect(),
        ..RecordScope::default()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn admin_allowed_regardless_of_set(
        permissions in permission_set(),
        resource in segment(),
        action in segment(),
    ) {
        let engine = PolicyEngine::new();
        let context = EvaluationContext::new(Actor::new("a1", Role::Admin), Arc::new(permissions));
        let response = engine.evaluate(&PermissionRequest::new("a1", resource, action), &context);
        prop_assert!(response.is_allowed());
    }

    #[test]
    fn uncovered_key_denied(
        permissions in permission_set(),
        resource in segment(),
        action in segment(),
    ) {
        let key = PermissionKey::action(resource.clone(), action.clone());
        prop_assume!(permissions.get(&key).is_none());

        let engine = PolicyEngine::new();
        let context = EvaluationContext::new(Actor::new("u1", Role::Client), Arc::new(permissions));
        let response = engine.evaluate(&PermissionRequest::new("u1", resource, action), &context);
        prop_assert!(!response.is_allowed());
    }

    #[test]
    fn exact_key_value_is_returned(
        permissions in permission_set(),
        resource in segment(),
        action in segment(),
        value in any::<bool>(),
    ) {
        let mut permissions = permissions;
        permissions.insert(PermissionKey::action(resource.clone(), action.clone()), value);

        let engine = PolicyEngine::new();
        let context = EvaluationContext::new(Actor::new("u1", Role::Client), Arc::new(permissions));
        let response = engine.evaluate(&PermissionRequest::new("u1", resource, action), &context);
        prop_assert_eq!(response.is_allowed(), value);
    }

    #[test]
    fn filter_never_leaks_for_client_and_provider(
        records in prop::collection::vec(record_scope(), 0..20),
        as_provider in any::<bool>(),
    ) {
        let actor = if as_provider {
            Actor::new("p1", Role::Prestataire)
        } else {
            Actor::new("u1", Role::Client)
        };

        for record in DataFilter::filter_by_role(records, &actor) {
            if as_provider {
                prop_assert!(record.assignees.iter().any(|id| id == "p1"));
            } else {
                prop_assert!(record.owners.iter().any(|id| id == "u1"));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn override_wins_for_one_actor_only(value in any::<bool>()) {
        tokio_test::block_on(async {
            let h = harness();
            h.store.inner.set_overrides(
                "u1",
                [(PermissionKey::action("projects", "view"), value)]
                    .into_iter()
                    .collect::<PermissionSet>(),
            );

            prop_assert_eq!(h.manager.check("u1", "projects", "view").await, value);
            prop_assert!(h.manager.check("u2", "projects", "view").await);
            Ok(())
        })?;
    }
}
