use crate::domain_model::*;
use crate::logger::*;
use tokio::sync::watch;

/// Single source of truth for the authentication state of this process.
///
/// Writers are limited to the crate: the startup verification, the session
/// interceptor and the explicit login/logout actions. Everything else reads
/// through [`SessionStore::get`] or follows changes via
/// [`SessionStore::subscribe`].
pub struct SessionStore {
    tx: watch::Sender<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Session::Anonymous);
        Self { tx }
    }

    pub fn get(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub(crate) fn set_authenticated(&self, user: UserSummary) {
        debug!(user_id = %user.id, username = %user.username, "session authenticated");
        self.tx.send_replace(Session::Authenticated(user));
    }

    pub(crate) fn clear(&self) {
        let previous = self.tx.send_replace(Session::Anonymous);
        if previous.is_authenticated() {
            debug!("session cleared");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
