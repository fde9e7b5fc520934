/*!
 * Policy Engine
 * Evaluates permission requests against the actor's merged permission set
 *
 * Rules run in order and the first decisive one wins:
 * 1. admin role or `*` → allow
 * 2. exact `resource.action[.qualifier]` → its value (a partial `own`/`assigned`
 *    grant is confirmed by rule 4)
 * 3. `resource.*` → allow
 * 4. partial grant → allow only if the supplied record names the actor as
 *    owner/assignee; no record means deny
 * 5. anything else → deny
 */

use super::context::EvaluationContext;
use crate::permissions::filter::ScopedRecord;
use crate::permissions::types::{
    DecisionReason, PermissionKey, PermissionRequest, PermissionResponse, Qualifier,
};
use tracing::debug;

/// Policy decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow(DecisionReason),
    Deny(DecisionReason),
    Abstain,
}

/// Policy that can evaluate permission requests
pub trait Policy: Send + Sync {
    /// Evaluate a request key
    fn evaluate(&self, key: &PermissionKey, context: &EvaluationContext) -> PolicyDecision;

    /// Policy name
    fn name(&self) -> &str;
}

/// Admin role or global wildcard
pub struct SuperuserRule;

impl Policy for SuperuserRule {
    fn evaluate(&self, _key: &PermissionKey, context: &EvaluationContext) -> PolicyDecision {
        if context.actor.is_admin() || context.permissions.is_superuser() {
            PolicyDecision::Allow(DecisionReason::Superuser)
        } else {
            PolicyDecision::Abstain
        }
    }

    fn name(&self) -> &str {
        "superuser"
    }
}

/// Exact key lookup
pub struct ExactKeyRule;

impl Policy for ExactKeyRule {
    fn evaluate(&self, key: &PermissionKey, context: &EvaluationContext) -> PolicyDecision {
        match context.permissions.get(key) {
            Some(false) => PolicyDecision::Deny(DecisionReason::ExplicitDeny),
            // Partial grants need the record check
            Some(true) if key.qualifier().is_some_and(Qualifier::is_partial) => {
                PolicyDecision::Abstain
            }
            Some(true) => PolicyDecision::Allow(DecisionReason::ExactKey),
            None => PolicyDecision::Abstain,
        }
    }

    fn name(&self) -> &str {
        "exact_key"
    }
}

/// `resource.*`
pub struct ResourceWildcardRule;

impl Policy for ResourceWildcardRule {
    fn evaluate(&self, key: &PermissionKey, context: &EvaluationContext) -> PolicyDecision {
        match key.resource() {
            Some(resource)
                if context
                    .permissions
                    .allows(&PermissionKey::resource_wildcard(resource)) =>
            {
                PolicyDecision::Allow(DecisionReason::ResourceWildcard)
            }
            _ => PolicyDecision::Abstain,
        }
    }

    fn name(&self) -> &str {
        "resource_wildcard"
    }
}

/// `own`/`assigned` grants confirmed against the targeted record
///
/// Ownership is checked against the actor being evaluated, never against
/// whoever is signed in.
pub struct RecordRule;

impl Policy for RecordRule {
    fn evaluate(&self, key: &PermissionKey, context: &EvaluationContext) -> PolicyDecision {
        let qualifier = match key.qualifier() {
            Some(q) if q.is_partial() && context.permissions.allows(key) => q,
            _ => return PolicyDecision::Abstain,
        };
        let label = qualifier.as_str().to_string();

        let Some(record) = context.record.as_ref() else {
            return PolicyDecision::Deny(DecisionReason::MissingRecord(label));
        };

        let confirmed = match qualifier {
            Qualifier::Own => record.is_owned_by(context.actor_id()),
            Qualifier::Assigned => record.is_assigned_to(context.actor_id()),
            _ => false,
        };

        if confirmed {
            PolicyDecision::Allow(DecisionReason::RecordMatch(label))
        } else {
            PolicyDecision::Deny(DecisionReason::RecordMismatch(label))
        }
    }

    fn name(&self) -> &str {
        "record"
    }
}

/// Policy engine that evaluates requests through ordered rules
pub struct PolicyEngine {
    policies: Vec<Box<dyn Policy>>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            policies: vec![
                Box::new(SuperuserRule),
                Box::new(ExactKeyRule),
                Box::new(ResourceWildcardRule),
                Box::new(RecordRule),
            ],
        }
    }

    /// Append a policy; it runs after the built-in rules
    pub fn add_policy(&mut self, policy: Box<dyn Policy>) {
        self.policies.push(policy);
    }

    /// Decide a parsed key
    pub fn decide(&self, key: &PermissionKey, context: &EvaluationContext) -> PolicyDecision {
        for policy in &self.policies {
            match policy.evaluate(key, context) {
                PolicyDecision::Abstain => continue,
                decision => {
                    debug!(policy = policy.name(), key = %key, ?decision, "Policy decided");
                    return decision;
                }
            }
        }

        PolicyDecision::Deny(DecisionReason::NoMatch)
    }

    /// Evaluate a request through all policies
    pub fn evaluate(
        &self,
        request: &PermissionRequest,
        context: &EvaluationContext,
    ) -> PermissionResponse {
        debug!(
            actor_id = %request.actor_id,
            resource = %request.resource,
            action = %request.action,
            "Evaluating permission request"
        );

        let key = match request.key() {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "Rejecting malformed permission key");
                return PermissionResponse::deny(request.clone(), DecisionReason::InvalidKey);
            }
        };

        match self.decide(&key, context) {
            PolicyDecision::Allow(reason) => PermissionResponse::allow(request.clone(), reason),
            PolicyDecision::Deny(reason) => PermissionResponse::deny(request.clone(), reason),
            PolicyDecision::Abstain => {
                PermissionResponse::deny(request.clone(), DecisionReason::NoMatch)
            }
        }
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}
