/*!
 * Permission Traits
 * Interfaces for permission checking and session lookup
 */

use super::core::{Actor, PermissionRequest, PermissionResponse};
use async_trait::async_trait;

/// Core permission checking interface
///
/// Implementations never fail: any internal error becomes a denial.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Evaluate and audit a full request
    async fn check_request(&self, request: PermissionRequest) -> PermissionResponse;

    /// Check if `actor_id` may perform `action` on `resource`
    async fn check(&self, actor_id: &str, resource: &str, action: &str) -> bool {
        self.check_request(PermissionRequest::new(actor_id, resource, action))
            .await
            .is_allowed()
    }

    /// Batch check multiple requests, in order
    async fn check_batch(&self, requests: Vec<PermissionRequest>) -> Vec<PermissionResponse> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(self.check_request(request).await);
        }
        responses
    }
}

/// Source of the currently authenticated actor
pub trait SessionProvider: Send + Sync {
    /// `None` when nobody is signed in
    fn current_actor(&self) -> Option<Actor>;
}
