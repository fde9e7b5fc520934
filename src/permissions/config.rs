/*!
 * Permission Configuration
 *
 * Recognized options: `ttlMs`, `roles`, `storeTimeoutMs`,
 * `auditQueueCapacity` and `failClosed`, which must be `true`.
 *
 * Environment variables:
 * - PERMISSIONS_CONFIG: JSON file to load (default: built-in values)
 * - PERMISSIONS_TTL_MS: cache lifetime override
 * - PERMISSIONS_STORE_TIMEOUT_MS: override store deadline
 */

use crate::core::errors::{PermissionError, PermissionResult};
use crate::core::limits::{AUDIT_QUEUE_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_STORE_TIMEOUT};
use crate::core::types::Millis;
use crate::permissions::policy::RolePolicyTable;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

fn default_ttl_ms() -> Millis {
    DEFAULT_CACHE_TTL.as_millis() as Millis
}

fn default_store_timeout_ms() -> Option<Millis> {
    DEFAULT_STORE_TIMEOUT.map(|d| d.as_millis() as Millis)
}

fn default_audit_queue_capacity() -> usize {
    AUDIT_QUEUE_CAPACITY
}

fn default_fail_closed() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsConfig {
    /// Permission cache lifetime
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: Millis,
    /// Role → default permissions
    #[serde(default)]
    pub roles: RolePolicyTable,
    /// Deadline for directory and override fetches
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: Option<Millis>,
    #[serde(default = "default_audit_queue_capacity")]
    pub audit_queue_capacity: usize,
    /// Accepted for compatibility; only `true` is valid
    #[serde(default = "default_fail_closed")]
    pub fail_closed: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            roles: RolePolicyTable::builtin(),
            store_timeout_ms: default_store_timeout_ms(),
            audit_queue_capacity: default_audit_queue_capacity(),
            fail_closed: true,
        }
    }
}

impl PermissionsConfig {
    pub fn from_json(json: &str) -> PermissionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> PermissionResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Load from `PERMISSIONS_CONFIG` if set, then apply env overrides
    pub fn from_env() -> PermissionResult<Self> {
        let mut config = match std::env::var("PERMISSIONS_CONFIG") {
            Ok(path) => {
                info!(path = %path, "Loading permissions configuration");
                Self::from_file(path)?
            }
            Err(_) => Self::default(),
        };

        if let Some(ttl) = env_millis("PERMISSIONS_TTL_MS")? {
            config.ttl_ms = ttl;
        }
        if let Some(timeout) = env_millis("PERMISSIONS_STORE_TIMEOUT_MS")? {
            config.store_timeout_ms = Some(timeout);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PermissionResult<()> {
        if !self.fail_closed {
            return Err(PermissionError::invalid_config(
                "failClosed cannot be disabled",
            ));
        }
        if self.ttl_ms == 0 {
            return Err(PermissionError::invalid_config("ttlMs must be positive"));
        }
        if self.audit_queue_capacity == 0 {
            return Err(PermissionError::invalid_config(
                "auditQueueCapacity must be positive",
            ));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_ms.map(Duration::from_millis)
    }
}

fn env_millis(name: &str) -> PermissionResult<Option<Millis>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<Millis>()
            .map(Some)
            .map_err(|e| PermissionError::invalid_config(format!("{}: {}", name, e))),
        Err(_) => Ok(None),
    }
}
