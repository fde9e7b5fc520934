/*!
 * Role Policy Table
 * Static mapping from role to its default permission set
 */

use crate::permissions::types::{PermissionKey, PermissionSet, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

const CLIENT_DEFAULTS: &[&str] = &[
    "projects.view",
    "projects.create",
    "projects.edit.own",
    "documents.view.own",
    "documents.upload.own",
    "finances.view.own",
    "chat.use",
    "profile.edit.own",
];

const PRESTATAIRE_DEFAULTS: &[&str] = &[
    "missions.view.assigned",
    "missions.update.assigned",
    "tasks.view.assigned",
    "tasks.complete",
    "documents.view.project",
    "documents.upload.project",
    "rewards.view.own",
    "calendar.view",
    "calendar.edit.own",
    "chat.use",
    "timetracking.use",
    "profile.edit.own",
];

const REVENDEUR_DEFAULTS: &[&str] = &[
    "dashboard.view.all",
    "pipeline.view.all",
    "pipeline.edit.all",
    "leads.view.all",
    "leads.create",
    "leads.edit.all",
    "clients.view.all",
    "clients.create",
    "clients.edit.all",
    "commissions.view.own",
    "reports.view.all",
    "reports.create",
    "marketing.view",
    "marketing.download",
    "chat.use",
    "profile.edit.own",
];

fn granted(keys: &[&str]) -> PermissionSet {
    keys.iter()
        .filter_map(|key| key.parse::<PermissionKey>().ok())
        .map(|key| (key, true))
        .collect()
}

/// Role → default permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolePolicyTable {
    roles: HashMap<Role, PermissionSet>,
}

impl RolePolicyTable {
    /// Table with no roles; every lookup yields an empty set
    pub fn empty() -> Self {
        Self {
            roles: HashMap::new(),
        }
    }

    /// Portal defaults for client, prestataire, revendeur and admin
    pub fn builtin() -> Self {
        Self::empty()
            .with_role(Role::Client, granted(CLIENT_DEFAULTS))
            .with_role(Role::Prestataire, granted(PRESTATAIRE_DEFAULTS))
            .with_role(Role::Revendeur, granted(REVENDEUR_DEFAULTS))
            .with_role(Role::Admin, PermissionSet::superuser())
    }

    pub fn with_role(mut self, role: Role, permissions: PermissionSet) -> Self {
        self.roles.insert(role, permissions);
        self
    }

    pub fn set_role(&mut self, role: Role, permissions: PermissionSet) {
        self.roles.insert(role, permissions);
    }

    /// Default permissions for `role`; a role missing from the table gets
    /// nothing
    pub fn policy_for(&self, role: Role) -> PermissionSet {
        match self.roles.get(&role) {
            Some(set) => set.clone(),
            None => {
                warn!(role = %role, "Role missing from policy table, granting nothing");
                PermissionSet::new()
            }
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        self.roles.contains_key(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.keys().copied()
    }
}

impl Default for RolePolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}
