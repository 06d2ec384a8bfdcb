use crate::application_port::*;
use crate::client::*;
use crate::domain_model::*;
use crate::domain_port::SessionCache;
use crate::infra_fs::FileSessionCache;
use crate::infra_http::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::Result;
use nanoid::nanoid;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Wires the session and polling components for one process.
pub struct Client {
    run_id: String,
    api_client: Arc<ApiClient>,
    store: Arc<SessionStore>,
    navigator: Arc<RouteNavigator>,
    bootstrap: AuthBootstrap,
    interceptor: Arc<SessionInterceptor>,
    auth: AuthFlow,
    view: RecipeGenerationView,
    poller: Arc<JobPoller>,
    cancel: CancellationToken,
    interceptor_task: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Builds the client, starts the session interceptor and runs the startup
    /// verification before returning.
    pub async fn try_new(settings: &Settings) -> Result<Self> {
        let run_id = nanoid!(8);
        info!(%run_id, base_url = %settings.api.base_url, "starting client");

        let hooks = Arc::new(ResponseHooks::new());
        let api_client = Arc::new(
            ApiClient::builder()
                .base_url(&settings.api.base_url)
                .timeout(Duration::from_millis(settings.api.timeout_ms))
                .hooks(hooks.clone())
                .build()?,
        );
        let credentials: Arc<dyn SessionCache> = Arc::new(CachedCredentials::new(
            api_client.clone(),
            Arc::new(FileSessionCache::new(&settings.session.cache_path)),
        ));
        let auth_api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(api_client.clone()));
        let recipe_api: Arc<dyn RecipeApi> = Arc::new(HttpRecipeApi::new(api_client.clone()));

        let store = Arc::new(SessionStore::new());
        let navigator = Arc::new(RouteNavigator::new(Route::Home));
        let poller = Arc::new(JobPoller::new(PollerConfig {
            degraded_after: settings.poll.degraded_after,
        }));

        let interceptor = SessionInterceptor::new(
            store.clone(),
            hooks,
            credentials.clone(),
            navigator.clone(),
        );
        let cancel = CancellationToken::new();
        let interceptor_task = tokio::spawn(interceptor.clone().run(cancel.child_token()));

        let bootstrap = AuthBootstrap::new(auth_api.clone(), store.clone(), credentials.clone());
        let auth = AuthFlow::new(auth_api, store.clone(), credentials, navigator.clone());
        let view = RecipeGenerationView::new(
            recipe_api,
            poller.clone(),
            store.clone(),
            navigator.clone(),
            Duration::from_millis(settings.poll.interval_ms),
        );

        let client = Self {
            run_id,
            api_client,
            store,
            navigator,
            bootstrap,
            interceptor,
            auth,
            view,
            poller,
            cancel,
            interceptor_task: Mutex::new(Some(interceptor_task)),
        };

        let session = client.bootstrap.verify().await;
        if !session.is_authenticated() {
            client.navigator.navigate(Route::SignIn);
        }
        Ok(client)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn session(&self) -> Session {
        self.store.get()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Arc<RouteNavigator> {
        &self.navigator
    }

    pub fn bootstrap(&self) -> &AuthBootstrap {
        &self.bootstrap
    }

    pub fn interceptor(&self) -> &Arc<SessionInterceptor> {
        &self.interceptor
    }

    pub fn auth(&self) -> &AuthFlow {
        &self.auth
    }

    pub fn view(&self) -> &RecipeGenerationView {
        &self.view
    }

    pub fn api_client(&self) -> &Arc<ApiClient> {
        &self.api_client
    }

    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.poller.stop_all();

        let task = self.interceptor_task.lock().ok().and_then(|mut lock| lock.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("session interceptor task failed: {e}");
            }
        }
        info!(run_id = %self.run_id, "client shut down");
    }
}
