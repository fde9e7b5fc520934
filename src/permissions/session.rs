/*!
 * Session
 * Holds the actor signed in to the current process
 */

use crate::permissions::types::{Actor, SessionProvider};
use parking_lot::RwLock;

/// Single-slot session: one actor from sign-in until sign-out
#[derive(Debug, Default)]
pub struct StaticSession {
    actor: RwLock<Option<Actor>>,
}

impl StaticSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(actor: Actor) -> Self {
        Self {
            actor: RwLock::new(Some(actor)),
        }
    }

    pub fn sign_in(&self, actor: Actor) {
        *self.actor.write() = Some(actor);
    }

    pub fn sign_out(&self) -> Option<Actor> {
        self.actor.write().take()
    }
}

impl SessionProvider for StaticSession {
    fn current_actor(&self) -> Option<Actor> {
        self.actor.read().clone()
    }
}
