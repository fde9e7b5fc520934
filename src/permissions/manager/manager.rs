/*!
 * Permission Manager
 * Central gate for every data access: resolve, decide, audit, filter
 */

use crate::core::errors::{PermissionError, PermissionResult, SecureCallError};
use crate::permissions::audit::{AuditEvent, AuditLogger, AuditSink, AuditStats};
use crate::permissions::cache::{CacheStats, CacheSweeper, PermissionCache};
use crate::permissions::config::PermissionsConfig;
use crate::permissions::filter::{DataFilter, ScopedRecord};
use crate::permissions::policy::{EvaluationContext, PolicyEngine, RequestContext, RolePolicyTable};
use crate::permissions::store::{ActorDirectory, OverrideStore};
use crate::permissions::types::{
    Actor, DecisionReason, PermissionChecker, PermissionRequest, PermissionResponse,
    PermissionSet, Role, SessionProvider,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Central permission manager
#[derive(Clone)]
pub struct PermissionManager {
    /// Per-actor merged permission sets
    cache: Arc<PermissionCache>,
    /// Ordered resolver rules
    policy: Arc<PolicyEngine>,
    /// Audit trail
    audit: Arc<AuditLogger>,
    /// Currently signed-in actor
    session: Arc<dyn SessionProvider>,
}

impl PermissionManager {
    /// Create from parts
    pub fn new(
        cache: PermissionCache,
        audit: AuditLogger,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        debug!("Initializing permission manager");
        Self {
            cache: Arc::new(cache),
            policy: Arc::new(PolicyEngine::new()),
            audit: Arc::new(audit),
            session,
        }
    }

    /// Create from configuration; spawns the audit drain task
    pub fn from_config(
        config: &PermissionsConfig,
        directory: Arc<dyn ActorDirectory>,
        store: Arc<dyn OverrideStore>,
        session: Arc<dyn SessionProvider>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        let cache = PermissionCache::new(directory, store)
            .with_ttl(config.ttl())
            .with_store_timeout(config.store_timeout())
            .with_roles(config.roles.clone());
        let audit = AuditLogger::with_capacity(sink, config.audit_queue_capacity);

        info!(
            ttl_ms = config.ttl_ms,
            store_timeout_ms = ?config.store_timeout_ms,
            "Permission manager configured"
        );
        Self::new(cache, audit, session)
    }

    /// Get policy engine (for adding custom policies)
    ///
    /// Returns None if the policy Arc has other strong references (shared state)
    pub fn policy_mut(&mut self) -> Option<&mut PolicyEngine> {
        Arc::get_mut(&mut self.policy)
    }

    pub fn cache(&self) -> &Arc<PermissionCache> {
        &self.cache
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Start the periodic cache sweep
    pub fn spawn_sweeper(&self) -> CacheSweeper {
        CacheSweeper::spawn(Arc::clone(&self.cache))
    }

    /// Evaluate a request and record exactly one audit event for it
    #[instrument(
        level = "debug",
        skip_all,
        fields(actor_id = %request.actor_id, resource = %request.resource, action = %request.action)
    )]
    async fn decide_and_audit(&self, request: PermissionRequest) -> PermissionResponse {
        let resolution = self.cache.resolve(&request.actor_id).await;
        let cached = resolution.is_cached();

        let response = match resolution.actor.as_ref() {
            Some(actor) => {
                let context =
                    EvaluationContext::new(actor.clone(), Arc::clone(&resolution.permissions))
                        .with_record(request.record.clone());
                self.policy.evaluate(&request, &context)
            }
            None => PermissionResponse::deny(request, DecisionReason::UnknownActor),
        }
        .with_cached(cached);

        debug!(allowed = response.allowed, reason = %response.reason, cached, "Permission decided");

        // Decision first, then its audit record
        self.audit
            .log(AuditEvent::from_response(resolution.actor.as_ref(), &response));

        response
    }

    /// Drop the cached set for `actor_id` (after a permission-affecting change)
    pub fn invalidate(&self, actor_id: &str) -> bool {
        self.cache.invalidate(actor_id)
    }

    /// Invalidate and reload `actor_id`'s permissions
    pub async fn refresh(&self, actor_id: &str) -> Arc<PermissionSet> {
        self.cache.invalidate(actor_id);
        self.cache.get(actor_id).await
    }

    /// Replace the role table; cached sets are discarded
    pub fn reload_roles(&self, roles: RolePolicyTable) {
        info!("Reloading role policy table");
        self.cache.replace_roles(roles);
    }

    fn current_actor(&self) -> PermissionResult<Actor> {
        self.session
            .current_actor()
            .ok_or(PermissionError::Unauthenticated)
    }

    /// Require the signed-in actor to hold `resource.action`
    pub async fn require_permission(&self, resource: &str, action: &str) -> PermissionResult<Actor> {
        self.require_with_context(resource, action, RequestContext::default())
            .await
    }

    /// `require_permission` with audit context (ip, user agent, details)
    pub async fn require_with_context(
        &self,
        resource: &str,
        action: &str,
        context: RequestContext,
    ) -> PermissionResult<Actor> {
        let actor = self.current_actor()?;
        let request = PermissionRequest::new(actor.id.clone(), resource, action).with_context(context);

        if self.decide_and_audit(request).await.is_allowed() {
            Ok(actor)
        } else {
            Err(PermissionError::denied(resource, action))
        }
    }

    /// Gate a data-access call and narrow its result to what the actor may see
    pub async fn secure_call<R, E, F, Fut>(
        &self,
        resource: &str,
        action: &str,
        call: F,
    ) -> Result<Vec<R>, SecureCallError<E>>
    where
        R: ScopedRecord,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<R>, E>>,
    {
        let actor = self.require_permission(resource, action).await?;
        let records = call().await.map_err(SecureCallError::Call)?;
        Ok(DataFilter::filter_by_role(records, &actor))
    }

    /// Single-record variant of `secure_call`
    pub async fn secure_call_one<R, E, F, Fut>(
        &self,
        resource: &str,
        action: &str,
        call: F,
    ) -> Result<Option<R>, SecureCallError<E>>
    where
        R: ScopedRecord,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<R>, E>>,
    {
        let actor = self.require_permission(resource, action).await?;
        let record = call().await.map_err(SecureCallError::Call)?;
        Ok(record.and_then(|r| DataFilter::filter_one(r, &actor)))
    }

    /// Check the signed-in actor against a specific record
    pub async fn check_resource_access<R: ScopedRecord + ?Sized>(
        &self,
        resource: &str,
        action: &str,
        record: Option<&R>,
    ) -> bool {
        let Ok(actor) = self.current_actor() else {
            return false;
        };
        let mut request = PermissionRequest::new(actor.id, resource, action);
        if let Some(record) = record {
            request = request.with_record(record);
        }
        self.decide_and_audit(request).await.is_allowed()
    }

    async fn check_current(&self, resource: &str, action: &str) -> bool {
        match self.current_actor() {
            Ok(actor) => self.check(&actor.id, resource, action).await,
            Err(_) => false,
        }
    }

    pub async fn can_view(&self, resource: &str) -> bool {
        self.check_current(resource, "view").await
    }

    pub async fn can_edit(&self, resource: &str) -> bool {
        self.check_current(resource, "edit").await
    }

    pub async fn can_delete(&self, resource: &str) -> bool {
        self.check_current(resource, "delete").await
    }

    pub async fn can_create(&self, resource: &str) -> bool {
        self.check_current(resource, "create").await
    }

    /// Merged permissions of the signed-in actor; empty when signed out
    pub async fn current_permissions(&self) -> Arc<PermissionSet> {
        match self.current_actor() {
            Ok(actor) => self.cache.get(&actor.id).await,
            Err(_) => Arc::new(PermissionSet::new()),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.session
            .current_actor()
            .is_some_and(|actor| actor.role == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Get audit statistics
    pub fn audit_stats(&self) -> AuditStats {
        self.audit.stats()
    }

    /// Wait for queued audit events to reach the sink
    pub async fn flush_audit(&self) {
        self.audit.flush().await;
    }

    /// Drain the audit queue and stop its task
    pub async fn shutdown(&self) {
        self.audit.shutdown().await;
    }
}

#[async_trait]
impl PermissionChecker for PermissionManager {
    async fn check_request(&self, request: PermissionRequest) -> PermissionResponse {
        self.decide_and_audit(request).await
    }
}
