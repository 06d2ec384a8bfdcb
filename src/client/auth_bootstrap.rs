use crate::application_port::*;
use crate::client::SessionStore;
use crate::domain_model::Session;
use crate::domain_port::SessionCache;
use crate::logger::*;
use std::sync::Arc;
use tokio::sync::{OnceCell, watch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootState {
    /// Verification has not finished; nothing protected may render yet.
    Initializing,
    Ready(Session),
}

impl BootState {
    pub fn is_ready(&self) -> bool {
        matches!(self, BootState::Ready(_))
    }
}

/// Verifies any pre-existing session exactly once per process.
///
/// Verification fails closed: anything other than a positive answer that
/// names a user leaves the session anonymous. Only a definitive negative
/// answer from the server discards the cached artifact; transport failures
/// keep it for the next launch.
pub struct AuthBootstrap {
    auth_api: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
    credentials: Arc<dyn SessionCache>,
    outcome: OnceCell<Session>,
    state: watch::Sender<BootState>,
}

impl AuthBootstrap {
    pub fn new(
        auth_api: Arc<dyn AuthApi>,
        store: Arc<SessionStore>,
        credentials: Arc<dyn SessionCache>,
    ) -> Self {
        let (state, _) = watch::channel(BootState::Initializing);
        Self {
            auth_api,
            store,
            credentials,
            outcome: OnceCell::new(),
            state,
        }
    }

    pub fn state(&self) -> BootState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BootState> {
        self.state.subscribe()
    }

    /// Runs the verification on first call; later and concurrent callers
    /// get the same outcome without another request.
    pub async fn verify(&self) -> Session {
        self.outcome
            .get_or_init(|| self.run_verification())
            .await
            .clone()
    }

    /// Resolves once verification has finished.
    pub async fn ready(&self) -> Session {
        let mut rx = self.state.subscribe();
        loop {
            let ready = match &*rx.borrow_and_update() {
                BootState::Ready(session) => Some(session.clone()),
                BootState::Initializing => None,
            };
            if let Some(session) = ready {
                return session;
            }
            if rx.changed().await.is_err() {
                return Session::Anonymous;
            }
        }
    }

    async fn run_verification(&self) -> Session {
        match self.credentials.load().await {
            Ok(Some(cached)) => debug!(username = %cached.user.username, "cached session found"),
            Ok(None) => debug!("no cached session"),
            Err(e) => warn!("ignoring unreadable cached session: {e}"),
        }

        let verified = match self.auth_api.verify().await {
            Ok(VerifyResponse {
                is_authenticated: true,
                user: Some(user),
            }) => Some(user),
            Ok(VerifyResponse {
                is_authenticated: true,
                user: None,
            }) => {
                warn!("verification reported a session without a user, treating as signed out");
                None
            }
            Ok(_) => {
                info!("no valid session on the server");
                self.discard_cached().await;
                None
            }
            Err(e) if e.is_auth_rejection() => {
                info!("server rejected the cached session: {e}");
                self.discard_cached().await;
                None
            }
            Err(e) => {
                warn!("session verification failed, continuing signed out: {e}");
                None
            }
        };

        match verified {
            Some(user) => {
                info!(username = %user.username, "session verified");
                self.store.set_authenticated(user);
            }
            None => self.store.clear(),
        }

        let session = self.store.get();
        self.state.send_replace(BootState::Ready(session.clone()));
        session
    }

    async fn discard_cached(&self) {
        if let Err(e) = self.credentials.clear().await {
            error!("failed to clear cached session: {e}");
        }
    }
}
