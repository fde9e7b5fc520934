/*!
 * Permission Audit Trail
 * Records every permission check, granted or denied
 *
 * `AuditLogger::log` is best effort and never blocks the caller: events go
 * onto a bounded queue drained by a background task into an `AuditSink`. A
 * full queue drops the event (counted and logged); a failing sink is logged
 * on the operational channel. Neither ever changes a decision.
 */

mod sink;

pub use sink::{AuditSink, JsonLinesSink, MemorySink, MemorySinkStats, TracingSink};

use crate::core::limits::AUDIT_QUEUE_CAPACITY;
use crate::core::types::ActorId;
use crate::permissions::policy::RequestContext;
use crate::permissions::types::{Actor, DecisionReason, PermissionResponse};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampMilliSeconds};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

/// Outcome recorded for a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Granted,
    Denied,
}

impl From<bool> for AuditResult {
    fn from(allowed: bool) -> Self {
        if allowed {
            AuditResult::Granted
        } else {
            AuditResult::Denied
        }
    }
}

/// Audit event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

/// Permission audit event, immutable once built
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditEvent {
    pub id: Uuid,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
    pub actor_id: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    pub action: String,
    pub resource: String,
    pub result: AuditResult,
    pub reason: DecisionReason,
    pub severity: AuditSeverity,
    #[serde(default)]
    pub context: RequestContext,
}

impl AuditEvent {
    /// Build the event for a decided request; `actor` is `None` when the
    /// actor could not be resolved
    pub fn from_response(actor: Option<&Actor>, response: &PermissionResponse) -> Self {
        let request = &response.request;
        let result = AuditResult::from(response.is_allowed());
        let severity = match (result, &response.reason) {
            (AuditResult::Granted, _) => AuditSeverity::Info,
            // Unknown actors and foreign records look like probing
            (AuditResult::Denied, DecisionReason::UnknownActor)
            | (AuditResult::Denied, DecisionReason::RecordMismatch(_)) => AuditSeverity::Critical,
            (AuditResult::Denied, _) => AuditSeverity::Warning,
        };

        Self {
            id: Uuid::new_v4(),
            timestamp: response.decided_at,
            actor_id: request.actor_id.clone(),
            actor_name: actor.map(|a| a.display_name().to_string()),
            action: request.action.clone(),
            resource: request.resource.clone(),
            result,
            reason: response.reason.clone(),
            severity,
            context: request.context.clone(),
        }
    }

    pub fn is_denied(&self) -> bool {
        self.result == AuditResult::Denied
    }
}

enum AuditCommand {
    Record(Box<AuditEvent>),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

#[derive(Default)]
struct AuditCounters {
    queued: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Non-blocking audit logger backed by a drain task
///
/// Dropping the logger closes the queue; the drain task still writes what
/// was already queued before exiting.
pub struct AuditLogger {
    tx: flume::Sender<AuditCommand>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    counters: Arc<AuditCounters>,
}

impl AuditLogger {
    /// Spawn the drain task with the default queue capacity
    pub fn spawn(sink: Arc<dyn AuditSink>) -> Self {
        Self::with_capacity(sink, AUDIT_QUEUE_CAPACITY)
    }

    /// Spawn the drain task with a bounded queue of `capacity` events
    pub fn with_capacity(sink: Arc<dyn AuditSink>, capacity: usize) -> Self {
        let (tx, rx) = flume::bounded(capacity.max(1));
        let counters = Arc::new(AuditCounters::default());

        let drain_counters = Arc::clone(&counters);
        let handle = tokio::spawn(async move {
            run_drain_loop(sink, rx, drain_counters).await;
        });

        debug!(capacity, "Audit drain task spawned");

        Self {
            tx,
            handle: Mutex::new(Some(handle)),
            counters,
        }
    }

    /// Queue an event; never blocks, never fails the caller
    pub fn log(&self, event: AuditEvent) {
        match self.tx.try_send(AuditCommand::Record(Box::new(event))) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(flume::TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Audit queue full, dropping event");
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Audit drain task stopped, dropping event");
            }
        }
    }

    /// Wait until every event queued before this call reached the sink
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send_async(AuditCommand::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Drain what is queued, flush the sink, then stop the task
    pub async fn shutdown(&self) {
        let _ = self.tx.send_async(AuditCommand::Shutdown).await;
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Audit drain task shutdown error");
            }
        }
    }

    /// Get statistics
    pub fn stats(&self) -> AuditStats {
        AuditStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            written: self.counters.written.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            pending: self.tx.len(),
        }
    }
}

async fn run_drain_loop(
    sink: Arc<dyn AuditSink>,
    rx: flume::Receiver<AuditCommand>,
    counters: Arc<AuditCounters>,
) {
    while let Ok(command) = rx.recv_async().await {
        match command {
            AuditCommand::Record(event) => match sink.append(&event).await {
                Ok(()) => {
                    counters.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(sink = sink.name(), event_id = %event.id, error = %e, "Audit write failed");
                }
            },
            AuditCommand::Flush(ack) => {
                if let Err(e) = sink.flush().await {
                    warn!(sink = sink.name(), error = %e, "Audit sink flush failed");
                }
                let _ = ack.send(());
            }
            AuditCommand::Shutdown => {
                if let Err(e) = sink.flush().await {
                    warn!(sink = sink.name(), error = %e, "Audit sink flush failed");
                }
                break;
            }
        }
    }
    debug!("Audit drain task exiting");
}

/// Audit statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub queued: u64,
    pub written: u64,
    pub dropped: u64,
    pub failed: u64,
    pub pending: usize,
}
