use crate::client::*;
use crate::domain_model::Route;
use crate::domain_port::SessionCache;
use crate::logger::*;
use std::sync::{Arc, Mutex, Weak};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorState {
    Inactive,
    Active(HookId),
}

/// Watches every API response for the server's force-logout marker.
///
/// The hook is registered only while the session is authenticated. A marker
/// seen while active deactivates the interceptor first, so concurrent marked
/// responses produce a single cleanup and a single redirect to sign-in.
pub struct SessionInterceptor {
    store: Arc<SessionStore>,
    registry: Arc<dyn HookRegistry>,
    credentials: Arc<dyn SessionCache>,
    navigator: Arc<dyn Navigator>,
    state: Mutex<InterceptorState>,
}

impl SessionInterceptor {
    pub fn new(
        store: Arc<SessionStore>,
        registry: Arc<dyn HookRegistry>,
        credentials: Arc<dyn SessionCache>,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            registry,
            credentials,
            navigator,
            state: Mutex::new(InterceptorState::Inactive),
        })
    }

    pub fn state(&self) -> InterceptorState {
        self.state
            .lock()
            .map(|lock| *lock)
            .unwrap_or(InterceptorState::Inactive)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), InterceptorState::Active(_))
    }

    /// Registers or ejects the hook to match the observed session.
    pub fn sync(self: &Arc<Self>, authenticated: bool) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match (*state, authenticated) {
            (InterceptorState::Inactive, true) => {
                let hook = Arc::new(ForceLogoutHook {
                    interceptor: Arc::downgrade(self),
                });
                let Some(id) = self.registry.register(hook) else {
                    warn!("hook registry refused the hook, interceptor stays inactive");
                    return;
                };
                *state = InterceptorState::Active(id);
                debug!(%id, "session interceptor activated");
            }
            (InterceptorState::Active(id), false) => {
                self.registry.eject(id);
                *state = InterceptorState::Inactive;
                debug!(%id, "session interceptor deactivated");
            }
            _ => {}
        }
    }

    /// Follows the session store until cancelled, then ejects the hook.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut session_rx = self.store.subscribe();
        loop {
            let authenticated = session_rx.borrow_and_update().is_authenticated();
            self.sync(authenticated);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        self.teardown();
    }

    pub fn teardown(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if let InterceptorState::Active(id) = *state {
            self.registry.eject(id);
            *state = InterceptorState::Inactive;
            debug!(%id, "session interceptor torn down");
        }
    }

    /// Handles a force-logout marker. Returns false when the interceptor was
    /// already inactive and nothing was done.
    pub async fn force_logout(&self) -> bool {
        let id = {
            let Ok(mut state) = self.state.lock() else {
                return false;
            };
            match *state {
                InterceptorState::Active(id) => {
                    *state = InterceptorState::Inactive;
                    id
                }
                InterceptorState::Inactive => return false,
            }
        };

        self.registry.eject(id);
        warn!("session revoked by the server, signing out");
        self.store.clear();
        if let Err(e) = self.credentials.clear().await {
            error!("failed to clear cached session: {e}");
        }
        self.navigator.navigate(Route::SignIn);
        true
    }
}

struct ForceLogoutHook {
    interceptor: Weak<SessionInterceptor>,
}

#[async_trait::async_trait]
impl ResponseHook for ForceLogoutHook {
    async fn on_response(&self, response: &InspectedResponse<'_>) {
        if !response.has_force_logout() {
            return;
        }
        let Some(interceptor) = self.interceptor.upgrade() else {
            return;
        };
        debug!(request_id = response.request_id, status = response.status, "force-logout marker received");
        interceptor.force_logout().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::fake_user;
    use crate::client::testing::{RecordingNavigator, wait_until};
    use crate::domain_model::CachedSession;
    use crate::infra_fs::MemorySessionCache;
    use crate::infra_http::ResponseHooks;

    struct Fixture {
        store: Arc<SessionStore>,
        hooks: Arc<ResponseHooks>,
        cache: Arc<MemorySessionCache>,
        navigator: Arc<RecordingNavigator>,
        interceptor: Arc<SessionInterceptor>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(SessionStore::new());
        let hooks = Arc::new(ResponseHooks::new());
        let cache = Arc::new(MemorySessionCache::with_session(CachedSession::new(
            "token",
            fake_user("ana"),
        )));
        let navigator = Arc::new(RecordingNavigator::default());
        let interceptor = SessionInterceptor::new(
            store.clone(),
            hooks.clone(),
            cache.clone(),
            navigator.clone(),
        );
        Fixture {
            store,
            hooks,
            cache,
            navigator,
            interceptor,
        }
    }

    const MARKED: &[u8] = br#"{"message":"Session revoked","forceLogout":true}"#;

    fn marked(request_id: &str) -> InspectedResponse<'_> {
        InspectedResponse {
            request_id,
            status: 401,
            body: MARKED,
        }
    }

    #[tokio::test]
    async fn hook_registered_only_while_authenticated() {
        let f = fixture();
        let cancel = CancellationToken::new();
        let driver = tokio::spawn(f.interceptor.clone().run(cancel.clone()));

        tokio::task::yield_now().await;
        assert!(!f.interceptor.is_active());
        assert!(f.hooks.is_empty());

        f.store.set_authenticated(fake_user("ana"));
        wait_until(|| f.interceptor.is_active()).await;
        assert_eq!(f.hooks.len(), 1);

        f.store.clear();
        wait_until(|| !f.interceptor.is_active()).await;
        assert!(f.hooks.is_empty());

        f.store.set_authenticated(fake_user("ana"));
        wait_until(|| f.interceptor.is_active()).await;
        cancel.cancel();
        driver.await.unwrap();
        assert!(!f.interceptor.is_active());
        assert!(f.hooks.is_empty());
    }

    #[tokio::test]
    async fn marker_while_inactive_is_ignored() {
        let f = fixture();
        f.hooks.dispatch(&marked("r1")).await;
        assert!(!f.interceptor.force_logout().await);

        assert!(f.navigator.routes().is_empty());
        assert!(f.cache.snapshot().is_some());
    }

    #[tokio::test]
    async fn marker_clears_session_and_redirects() {
        let f = fixture();
        f.store.set_authenticated(fake_user("ana"));
        f.interceptor.sync(true);

        let unmarked = InspectedResponse {
            request_id: "r0",
            status: 200,
            body: br#"{"generationComplete":false}"#,
        };
        f.hooks.dispatch(&unmarked).await;
        assert!(f.store.is_authenticated());

        f.hooks.dispatch(&marked("r1")).await;
        assert!(!f.store.is_authenticated());
        assert!(f.cache.snapshot().is_none());
        assert_eq!(f.navigator.routes(), vec![Route::SignIn]);
        assert!(!f.interceptor.is_active());
        assert!(f.hooks.is_empty());
    }

    #[tokio::test]
    async fn concurrent_markers_redirect_once() {
        let f = fixture();
        f.store.set_authenticated(fake_user("ana"));
        f.interceptor.sync(true);

        let (a, b, c) = (marked("r1"), marked("r2"), marked("r3"));
        tokio::join!(
            f.hooks.dispatch(&a),
            f.hooks.dispatch(&b),
            f.hooks.dispatch(&c)
        );

        assert_eq!(f.navigator.routes(), vec![Route::SignIn]);
        assert!(!f.store.is_authenticated());
        assert!(f.hooks.is_empty());
    }

    struct RefusingRegistry;

    impl HookRegistry for RefusingRegistry {
        fn register(&self, _hook: Arc<dyn ResponseHook>) -> Option<HookId> {
            None
        }

        fn eject(&self, _id: HookId) -> bool {
            panic!("nothing was registered");
        }
    }

    #[tokio::test]
    async fn refused_registration_leaves_interceptor_inactive() {
        let navigator = Arc::new(RecordingNavigator::default());
        let interceptor = SessionInterceptor::new(
            Arc::new(SessionStore::new()),
            Arc::new(RefusingRegistry),
            Arc::new(MemorySessionCache::new()),
            navigator.clone(),
        );

        interceptor.sync(true);
        assert_eq!(interceptor.state(), InterceptorState::Inactive);

        interceptor.sync(false);
        interceptor.teardown();
        assert!(!interceptor.force_logout().await);
        assert!(navigator.routes().is_empty());
    }
}
