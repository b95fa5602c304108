//! Admin authorization gate.
//!
//! A single designated admin identity may approve, reject, request
//! changes, and confirm offboarding. A mismatching actor is a silent
//! no-op: no state change and no response, so the existence and state
//! of requests is never leaked to non-admins.

/// Checks acting identities against the configured admin.
#[derive(Debug, Clone)]
pub struct AdminGate {
    admin_id: String,
}

impl AdminGate {
    pub fn new(admin_id: impl Into<String>) -> Self {
        Self {
            admin_id: admin_id.into(),
        }
    }

    /// The admin's chat user id (also used as the admin DM channel).
    pub fn admin_id(&self) -> &str {
        &self.admin_id
    }

    /// Whether `actor_id` is the designated admin.
    ///
    /// Denials are traced at debug level only; callers must not surface
    /// anything to the actor.
    pub fn permits(&self, actor_id: &str) -> bool {
        let allowed = actor_id == self.admin_id;
        if !allowed {
            tracing::debug!(actor = %actor_id, "Ignoring admin action from non-admin");
        }
        allowed
    }
}
