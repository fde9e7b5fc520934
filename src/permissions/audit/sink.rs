/*!
 * Audit Sinks
 * Append-only destinations for audit events
 */

use super::AuditEvent;
use crate::core::errors::{PermissionError, PermissionResult};
use crate::core::limits::{MAX_AUDIT_EVENTS, MAX_AUDIT_EVENTS_PER_ACTOR};
use crate::core::types::ActorId;
use ahash::RandomState;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Durable, append-only audit destination
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one event
    async fn append(&self, event: &AuditEvent) -> PermissionResult<()>;

    /// Push buffered events to durable storage
    async fn flush(&self) -> PermissionResult<()> {
        Ok(())
    }

    /// Sink name for operational logs
    fn name(&self) -> &str;
}

/// In-memory ring buffer with per-actor history and denial counters
pub struct MemorySink {
    /// Global event log (ring buffer)
    events: RwLock<VecDeque<AuditEvent>>,
    /// Per-actor event logs
    actor_events: DashMap<ActorId, VecDeque<AuditEvent>, RandomState>,
    /// Denial counters for monitoring
    denial_counts: DashMap<ActorId, u64, RandomState>,
    capacity: usize,
    per_actor_capacity: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(MAX_AUDIT_EVENTS, MAX_AUDIT_EVENTS_PER_ACTOR)
    }

    pub fn with_capacity(capacity: usize, per_actor_capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity.min(1_024))),
            actor_events: DashMap::with_hasher(RandomState::new()),
            denial_counts: DashMap::with_hasher(RandomState::new()),
            capacity: capacity.max(1),
            per_actor_capacity: per_actor_capacity.max(1),
        }
    }

    fn record(&self, event: &AuditEvent) {
        {
            let mut events = self.events.write();
            if events.len() >= self.capacity {
                events.pop_front();
            }
            events.push_back(event.clone());
        }

        {
            let mut history = self
                .actor_events
                .entry(event.actor_id.clone())
                .or_insert_with(VecDeque::new);
            if history.len() >= self.per_actor_capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        if event.is_denied() {
            self.denial_counts
                .entry(event.actor_id.clone())
                .and_modify(|count| *count += 1)
                .or_insert(1);
        }
    }

    /// Most recent events, newest first
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.read();
        events.iter().rev().take(limit).cloned().collect()
    }

    /// Events for one actor, newest first
    pub fn for_actor(&self, actor_id: &str, limit: usize) -> Vec<AuditEvent> {
        self.actor_events
            .get(actor_id)
            .map(|entry| entry.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn denial_count(&self, actor_id: &str) -> u64 {
        self.denial_counts.get(actor_id).map(|e| *e).unwrap_or(0)
    }

    /// Every actor with at least one denial
    pub fn actors_with_denials(&self) -> Vec<(ActorId, u64)> {
        self.denial_counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn clear_actor(&self, actor_id: &str) {
        self.actor_events.remove(actor_id);
        self.denial_counts.remove(actor_id);
    }

    pub fn clear_all(&self) {
        self.events.write().clear();
        self.actor_events.clear();
        self.denial_counts.clear();
    }

    pub fn stats(&self) -> MemorySinkStats {
        MemorySinkStats {
            total_events: self.events.read().len(),
            total_denials: self.denial_counts.iter().map(|e| *e.value()).sum(),
            actors_tracked: self.actor_events.len(),
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn append(&self, event: &AuditEvent) -> PermissionResult<()> {
        self.record(event);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// In-memory sink statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySinkStats {
    pub total_events: usize,
    pub total_denials: u64,
    pub actors_tracked: usize,
}

/// One JSON object per line, appended to a file
pub struct JsonLinesSink {
    path: PathBuf,
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl JsonLinesSink {
    /// Open (or create) `path` for appending
    pub async fn open(path: impl AsRef<Path>) -> PermissionResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| write_failure(&path, e))?;

        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_failure(path: &Path, err: impl std::fmt::Display) -> PermissionError {
    PermissionError::AuditWriteFailure {
        reason: format!("{}: {}", path.display(), err),
    }
}

#[async_trait]
impl AuditSink for JsonLinesSink {
    async fn append(&self, event: &AuditEvent) -> PermissionResult<()> {
        let mut line = serde_json::to_vec(event).map_err(|e| write_failure(&self.path, e))?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line)
            .await
            .map_err(|e| write_failure(&self.path, e))
    }

    async fn flush(&self) -> PermissionResult<()> {
        let mut file = self.file.lock().await;
        file.flush().await.map_err(|e| write_failure(&self.path, e))?;
        file.sync_data().await.map_err(|e| write_failure(&self.path, e))
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// Emits events on the `audit` tracing target for log pipelines
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl AuditSink for TracingSink {
    async fn append(&self, event: &AuditEvent) -> PermissionResult<()> {
        info!(
            target: "audit",
            event_id = %event.id,
            actor_id = %event.actor_id,
            actor_name = event.actor_name.as_deref().unwrap_or(""),
            resource = %event.resource,
            action = %event.action,
            result = ?event.result,
            reason = %event.reason,
            ip = event.context.ip.as_deref().unwrap_or(""),
            "permission check"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
