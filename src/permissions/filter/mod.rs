/*!
 * Data Filter
 * Narrows already-granted result sets to the records an actor may see
 *
 * The filter is a pure transform applied after the resolver grants access.
 * It never replaces the resolver: a denied request never reaches it.
 *
 * - `admin`: everything
 * - `client`: records the actor owns (`ownerId`, `userId`, `clientId`, `createdBy`)
 * - `prestataire`: records assigned to the actor (`assignedTo`, `prestataireId`,
 *   `assignedUsers`)
 * - `revendeur`: records without a `zone` tag, records whose `zone` is the
 *   actor's, or whose `zones` list contains it; a reseller without a zone
 *   sees everything
 */

use crate::permissions::types::{Actor, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ownership fields, camelCase first then snake_case
const OWNER_FIELDS: [&str; 8] = [
    "ownerId",
    "userId",
    "clientId",
    "createdBy",
    "owner_id",
    "user_id",
    "client_id",
    "created_by",
];
const ASSIGNEE_FIELDS: [&str; 4] = ["assignedTo", "prestataireId", "assigned_to", "prestataire_id"];
const ASSIGNEE_LIST_FIELDS: [&str; 2] = ["assignedUsers", "assigned_users"];
const ZONE_FIELDS: [&str; 1] = ["zone"];
const ZONE_LIST_FIELDS: [&str; 1] = ["zones"];

/// A record that carries ownership, assignment or zone information
pub trait ScopedRecord {
    /// Ids of actors owning the record
    fn owner_ids(&self) -> Vec<&str>;

    /// Ids of actors assigned to the record
    fn assignee_ids(&self) -> Vec<&str>;

    /// Primary zone tag; `None` means the record is not zoned
    fn zone(&self) -> Option<&str>;

    /// Additional zones the record is shared with
    fn zones(&self) -> Vec<&str> {
        Vec::new()
    }

    fn is_owned_by(&self, actor_id: &str) -> bool {
        self.owner_ids().into_iter().any(|id| id == actor_id)
    }

    fn is_assigned_to(&self, actor_id: &str) -> bool {
        self.assignee_ids().into_iter().any(|id| id == actor_id)
    }

    fn visible_in_zone(&self, zone: &str) -> bool {
        match self.zone() {
            None => true,
            Some(tag) => tag == zone || self.zones().contains(&zone),
        }
    }
}

/// Owned snapshot of a record's scope, carried by permission requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RecordScope {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

impl RecordScope {
    pub fn capture<R: ScopedRecord + ?Sized>(record: &R) -> Self {
        Self {
            owners: record.owner_ids().into_iter().map(String::from).collect(),
            assignees: record.assignee_ids().into_iter().map(String::from).collect(),
            zone: record.zone().map(String::from),
            zones: record.zones().into_iter().map(String::from).collect(),
        }
    }

    pub fn owned_by(actor_id: impl Into<String>) -> Self {
        Self::default().with_owner(actor_id)
    }

    pub fn assigned_to(actor_id: impl Into<String>) -> Self {
        Self::default().with_assignee(actor_id)
    }

    pub fn with_owner(mut self, actor_id: impl Into<String>) -> Self {
        self.owners.push(actor_id.into());
        self
    }

    pub fn with_assignee(mut self, actor_id: impl Into<String>) -> Self {
        self.assignees.push(actor_id.into());
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn shared_with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zones.push(zone.into());
        self
    }
}

impl ScopedRecord for RecordScope {
    fn owner_ids(&self) -> Vec<&str> {
        self.owners.iter().map(String::as_str).collect()
    }

    fn assignee_ids(&self) -> Vec<&str> {
        self.assignees.iter().map(String::as_str).collect()
    }

    fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    fn zones(&self) -> Vec<&str> {
        self.zones.iter().map(String::as_str).collect()
    }
}

/// Generic JSON objects from data-access calls; non-objects have no scope
impl ScopedRecord for Value {
    fn owner_ids(&self) -> Vec<&str> {
        string_fields(self, &OWNER_FIELDS)
    }

    fn assignee_ids(&self) -> Vec<&str> {
        let mut ids = string_fields(self, &ASSIGNEE_FIELDS);
        ids.extend(list_fields(self, &ASSIGNEE_LIST_FIELDS));
        ids
    }

    fn zone(&self) -> Option<&str> {
        string_fields(self, &ZONE_FIELDS).into_iter().next()
    }

    fn zones(&self) -> Vec<&str> {
        list_fields(self, &ZONE_LIST_FIELDS)
    }
}

fn string_fields<'a>(value: &'a Value, fields: &[&str]) -> Vec<&'a str> {
    fields
        .iter()
        .filter_map(|field| value.get(field).and_then(Value::as_str))
        .collect()
}

fn list_fields<'a>(value: &'a Value, fields: &[&str]) -> Vec<&'a str> {
    fields
        .iter()
        .filter_map(|field| value.get(field).and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .collect()
}

/// Role-based result filtering
pub struct DataFilter;

impl DataFilter {
    /// Whether `actor` may see `record`
    pub fn is_visible<R: ScopedRecord + ?Sized>(record: &R, actor: &Actor) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Client => record.is_owned_by(&actor.id),
            Role::Prestataire => record.is_assigned_to(&actor.id),
            Role::Revendeur => match actor.zone.as_deref() {
                Some(zone) => record.visible_in_zone(zone),
                None => true,
            },
        }
    }

    /// Keep the records visible to `actor`
    pub fn filter_by_role<R: ScopedRecord>(records: Vec<R>, actor: &Actor) -> Vec<R> {
        if actor.is_admin() {
            return records;
        }
        records
            .into_iter()
            .filter(|record| Self::is_visible(record, actor))
            .collect()
    }

    /// Single-record variant; `None` when the record is hidden
    pub fn filter_one<R: ScopedRecord>(record: R, actor: &Actor) -> Option<R> {
        Self::is_visible(&record, actor).then_some(record)
    }
}
