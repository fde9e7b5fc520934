/*!
 * Permission Evaluation Context
 * Provides contextual information for permission decisions
 */

use crate::permissions::filter::RecordScope;
use crate::permissions::types::{Actor, PermissionSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Caller-supplied context recorded with every audit event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Free-form details (counts, error messages)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Evaluation context containing all information needed for a decision
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// Actor being checked
    pub actor: Actor,
    /// Merged role + override permissions
    pub permissions: Arc<PermissionSet>,
    /// Record the action targets, if the caller supplied one
    pub record: Option<RecordScope>,
}

impl EvaluationContext {
    pub fn new(actor: Actor, permissions: Arc<PermissionSet>) -> Self {
        Self {
            actor,
            permissions,
            record: None,
        }
    }

    pub fn with_record(mut self, record: Option<RecordScope>) -> Self {
        self.record = record;
        self
    }

    pub fn actor_id(&self) -> &str {
        &self.actor.id
    }
}
