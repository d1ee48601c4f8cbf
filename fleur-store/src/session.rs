//! Session state and identity
//!
//! The storefront keeps at most one authenticated actor per process;
//! before login the caller carries an [`OwnerRef::Anonymous`] token for
//! cart and wishlist ownership.

use parking_lot::RwLock;
use shared::models::{Actor, OwnerRef};
use shared::util::record_id;
use std::sync::Arc;

/// Source of the current actor, abstracted for the service layer
pub trait IdentityProvider: Send + Sync {
    fn current_actor(&self) -> Option<Actor>;
}

/// In-process session holder
#[derive(Clone, Default)]
pub struct SessionManager {
    current: Arc<RwLock<Option<Actor>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh anonymous owner token for a pre-login session.
    pub fn issue_anonymous() -> OwnerRef {
        OwnerRef::Anonymous(record_id())
    }

    pub fn login(&self, actor: Actor) {
        tracing::info!(user_id = %actor.id, role = ?actor.role, "session login");
        *self.current.write() = Some(actor);
    }

    pub fn logout(&self) {
        if let Some(actor) = self.current.write().take() {
            tracing::info!(user_id = %actor.id, "session logout");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }
}

impl IdentityProvider for SessionManager {
    fn current_actor(&self) -> Option<Actor> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Role;

    #[test]
    fn test_login_logout() {
        let session = SessionManager::new();
        assert!(!session.is_authenticated());
        assert!(session.current_actor().is_none());

        session.login(Actor::new("u1", "Ana", Role::Customer));
        assert!(session.is_authenticated());
        assert_eq!(session.current_actor().unwrap().id, "u1");

        session.logout();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_anonymous_tokens_are_unique() {
        let a = SessionManager::issue_anonymous();
        let b = SessionManager::issue_anonymous();
        assert!(a.is_anonymous());
        assert_ne!(a, b);
    }
}
