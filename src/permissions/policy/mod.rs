/*!
 * Policy Module
 * Role policy table, resolver rules and evaluation context
 */

mod context;
mod engine;
mod roles;

pub use context::{EvaluationContext, RequestContext};
pub use engine::{
    ExactKeyRule, Policy, PolicyDecision, PolicyEngine, RecordRule, ResourceWildcardRule,
    SuperuserRule,
};
pub use roles::RolePolicyTable;
