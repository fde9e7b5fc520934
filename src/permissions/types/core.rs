/*!
 * Permission Types
 * Core types for role-based permission checking
 */

use crate::core::errors::{PermissionError, PermissionResult};
use crate::core::types::ActorId;
use crate::permissions::filter::{RecordScope, ScopedRecord};
use crate::permissions::policy::RequestContext;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DeserializeFromStr, SerializeDisplay, TimestampMilliSeconds};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// Actor role, a closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    #[serde(alias = "provider")]
    Prestataire,
    #[serde(alias = "reseller")]
    Revendeur,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Client, Role::Prestataire, Role::Revendeur, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Prestataire => "prestataire",
            Role::Revendeur => "revendeur",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "prestataire" | "provider" => Ok(Role::Prestataire),
            "revendeur" | "reseller" => Ok(Role::Revendeur),
            "admin" => Ok(Role::Admin),
            other => Err(PermissionError::UnknownRole {
                role: other.to_string(),
            }),
        }
    }
}

/// Authenticated actor, immutable for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: None,
            role,
            zone: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Name for audit records, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Trailing qualifier of a permission key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qualifier {
    /// Actor must own the record
    Own,
    /// Actor must be assigned to the record
    Assigned,
    /// `*`
    Any,
    /// Free-form scope such as `all` or `project`, matched literally
    Named(String),
}

impl Qualifier {
    pub fn as_str(&self) -> &str {
        match self {
            Qualifier::Own => "own",
            Qualifier::Assigned => "assigned",
            Qualifier::Any => "*",
            Qualifier::Named(name) => name,
        }
    }

    /// Qualifiers whose grant depends on the record being accessed
    pub fn is_partial(&self) -> bool {
        matches!(self, Qualifier::Own | Qualifier::Assigned)
    }

    fn parse(segment: &str) -> Self {
        match segment {
            "own" => Qualifier::Own,
            "assigned" => Qualifier::Assigned,
            "*" => Qualifier::Any,
            other => Qualifier::Named(other.to_string()),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission key: `*`, `resource.*`, `resource.action` or
/// `resource.action.qualifier`
///
/// Serialized as its canonical dotted string, which is also what the
/// permission set is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub enum PermissionKey {
    /// Global wildcard `*`
    All,
    /// Resource wildcard `resource.*`
    Resource(String),
    /// `resource.action[.qualifier]`
    Action {
        resource: String,
        action: String,
        qualifier: Option<Qualifier>,
    },
}

impl PermissionKey {
    pub fn action(resource: impl Into<String>, action: impl Into<String>) -> Self {
        PermissionKey::Action {
            resource: resource.into(),
            action: action.into(),
            qualifier: None,
        }
    }

    pub fn qualified(
        resource: impl Into<String>,
        action: impl Into<String>,
        qualifier: Qualifier,
    ) -> Self {
        PermissionKey::Action {
            resource: resource.into(),
            action: action.into(),
            qualifier: Some(qualifier),
        }
    }

    pub fn resource_wildcard(resource: impl Into<String>) -> Self {
        PermissionKey::Resource(resource.into())
    }

    /// Build the key checked for `resource` + `action`, where `action` may
    /// carry a qualifier (`view.own`)
    pub fn for_request(resource: &str, action: &str) -> PermissionResult<Self> {
        let raw = format!("{}.{}", resource, action);
        match raw.parse::<PermissionKey>()? {
            key @ PermissionKey::Action { .. } => Ok(key),
            _ => Err(PermissionError::invalid_key(
                raw,
                "a request must name a concrete action",
            )),
        }
    }

    /// Resource segment, `None` for the global wildcard
    pub fn resource(&self) -> Option<&str> {
        match self {
            PermissionKey::All => None,
            PermissionKey::Resource(resource) => Some(resource),
            PermissionKey::Action { resource, .. } => Some(resource),
        }
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        match self {
            PermissionKey::Action { qualifier, .. } => qualifier.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKey::All => f.write_str("*"),
            PermissionKey::Resource(resource) => write!(f, "{}.*", resource),
            PermissionKey::Action {
                resource,
                action,
                qualifier: None,
            } => write!(f, "{}.{}", resource, action),
            PermissionKey::Action {
                resource,
                action,
                qualifier: Some(qualifier),
            } => write!(f, "{}.{}.{}", resource, action, qualifier),
        }
    }
}

impl FromStr for PermissionKey {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(PermissionKey::All);
        }

        let segments: Vec<&str> = s.split('.').collect();
        if let Some(bad) = segments
            .iter()
            .find(|seg| seg.is_empty() || seg.chars().any(char::is_whitespace))
        {
            return Err(PermissionError::invalid_key(
                s,
                format!("invalid segment '{}'", bad),
            ));
        }
        if segments[0] == "*" {
            return Err(PermissionError::invalid_key(
                s,
                "resource segment cannot be a wildcard",
            ));
        }

        match segments.as_slice() {
            [resource, "*"] => Ok(PermissionKey::Resource(resource.to_string())),
            [resource, action] => Ok(PermissionKey::action(*resource, *action)),
            [_, "*", _] => Err(PermissionError::invalid_key(
                s,
                "a wildcard action cannot be qualified",
            )),
            [resource, action, qualifier] => Ok(PermissionKey::qualified(
                *resource,
                *action,
                Qualifier::parse(qualifier),
            )),
            _ => Err(PermissionError::invalid_key(
                s,
                "expected at most three segments",
            )),
        }
    }
}

/// Flat mapping from permission key to grant/deny
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    entries: BTreeMap<PermissionKey, bool>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The admin escape hatch: `{"*": true}`
    pub fn superuser() -> Self {
        let mut set = Self::new();
        set.insert(PermissionKey::All, true);
        set
    }

    /// Build from dotted string keys
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, bool)>,
    ) -> PermissionResult<Self> {
        let mut set = Self::new();
        for (key, value) in pairs {
            set.insert(key.parse()?, value);
        }
        Ok(set)
    }

    pub fn insert(&mut self, key: PermissionKey, value: bool) -> Option<bool> {
        self.entries.insert(key, value)
    }

    pub fn grant(mut self, key: PermissionKey) -> Self {
        self.insert(key, true);
        self
    }

    pub fn deny(mut self, key: PermissionKey) -> Self {
        self.insert(key, false);
        self
    }

    pub fn get(&self, key: &PermissionKey) -> Option<bool> {
        self.entries.get(key).copied()
    }

    /// Whether `key` is present and set to true
    pub fn allows(&self, key: &PermissionKey) -> bool {
        self.get(key) == Some(true)
    }

    pub fn is_superuser(&self) -> bool {
        self.allows(&PermissionKey::All)
    }

    pub fn remove(&mut self, key: &PermissionKey) -> Option<bool> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PermissionKey, bool)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    /// Apply `overrides` on top of this set; overrides win on collision
    pub fn merge(&mut self, overrides: &PermissionSet) {
        for (key, value) in overrides.iter() {
            self.entries.insert(key.clone(), value);
        }
    }

    /// Role defaults merged with per-actor overrides
    pub fn merged(role_defaults: &PermissionSet, overrides: &PermissionSet) -> Self {
        let mut set = role_defaults.clone();
        set.merge(overrides);
        set
    }
}

impl FromIterator<(PermissionKey, bool)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (PermissionKey, bool)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Permission request
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PermissionRequest {
    /// Actor making the request
    pub actor_id: ActorId,
    /// Resource being accessed (`projects`)
    pub resource: String,
    /// Action, optionally qualified (`view`, `edit.own`)
    pub action: String,
    /// Ownership/assignment snapshot of the record being accessed, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordScope>,
    /// Caller-supplied audit context
    #[serde(default)]
    pub context: RequestContext,
    /// When the request was made
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
}

impl PermissionRequest {
    /// Create a new permission request
    pub fn new(
        actor_id: impl Into<ActorId>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            resource: resource.into(),
            action: action.into(),
            record: None,
            context: RequestContext::default(),
            timestamp: SystemTime::now(),
        }
    }

    /// Attach the record the action targets
    pub fn with_record<R: ScopedRecord + ?Sized>(mut self, record: &R) -> Self {
        self.record = Some(RecordScope::capture(record));
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Parse the key this request is checked against
    pub fn key(&self) -> PermissionResult<PermissionKey> {
        PermissionKey::for_request(&self.resource, &self.action)
    }
}

/// Why a decision was reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "detail")]
pub enum DecisionReason {
    /// Admin role or `*` entry
    Superuser,
    /// Exact key present and true
    ExactKey,
    /// Exact key present and false
    ExplicitDeny,
    /// `resource.*` entry
    ResourceWildcard,
    /// Partial key granted and the record confirmed ownership/assignment
    RecordMatch(String),
    /// Partial key granted but no record was supplied to confirm it
    MissingRecord(String),
    /// Partial key granted but the actor is not owner/assignee
    RecordMismatch(String),
    /// Nothing in the set covers the request
    NoMatch,
    /// The request did not name a valid key
    InvalidKey,
    /// The actor could not be resolved
    UnknownActor,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Superuser => f.write_str("superuser"),
            DecisionReason::ExactKey => f.write_str("exact key granted"),
            DecisionReason::ExplicitDeny => f.write_str("exact key denied"),
            DecisionReason::ResourceWildcard => f.write_str("resource wildcard"),
            DecisionReason::RecordMatch(q) => write!(f, "record confirms '{}'", q),
            DecisionReason::MissingRecord(q) => write!(f, "no record to confirm '{}'", q),
            DecisionReason::RecordMismatch(q) => write!(f, "record does not confirm '{}'", q),
            DecisionReason::NoMatch => f.write_str("no matching permission"),
            DecisionReason::InvalidKey => f.write_str("invalid permission key"),
            DecisionReason::UnknownActor => f.write_str("unknown actor"),
        }
    }
}

/// Permission response/decision
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PermissionResponse {
    /// Request that was evaluated
    pub request: PermissionRequest,
    /// Whether permission is granted
    pub allowed: bool,
    /// Rule that decided
    pub reason: DecisionReason,
    /// Decision time
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub decided_at: SystemTime,
    /// Whether the permission set came from the cache
    #[serde(default)]
    pub cached: bool,
}

impl PermissionResponse {
    /// Create allowed response
    pub fn allow(request: PermissionRequest, reason: DecisionReason) -> Self {
        Self {
            request,
            allowed: true,
            reason,
            decided_at: SystemTime::now(),
            cached: false,
        }
    }

    /// Create denied response
    pub fn deny(request: PermissionRequest, reason: DecisionReason) -> Self {
        Self {
            request,
            allowed: false,
            reason,
            decided_at: SystemTime::now(),
            cached: false,
        }
    }

    /// Mark as cached
    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    /// Check if allowed
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn reason(&self) -> &DecisionReason {
        &self.reason
    }
}
