use crate::application_port::*;
use crate::client::*;
use crate::domain_model::*;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Status source bound to one generation job.
pub struct RecipeStatusSource {
    recipe_api: Arc<dyn RecipeApi>,
    job_id: JobId,
}

impl RecipeStatusSource {
    pub fn new(recipe_api: Arc<dyn RecipeApi>, job_id: JobId) -> Self {
        Self { recipe_api, job_id }
    }
}

#[async_trait::async_trait]
impl StatusSource<JobStatus> for RecipeStatusSource {
    async fn fetch_status(&self) -> anyhow::Result<JobStatus> {
        Ok(self.recipe_api.fetch_status(&self.job_id).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("sign in required")]
    SignInRequired,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Poll(#[from] PollError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    Completed(JobStatus),
    /// Navigation left the recipe route; polling was stopped.
    Left(Route),
    Cancelled,
}

/// The recipe screen: starts generation jobs and follows one job until it
/// completes or the user goes elsewhere.
pub struct RecipeGenerationView {
    recipe_api: Arc<dyn RecipeApi>,
    poller: Arc<JobPoller>,
    store: Arc<SessionStore>,
    navigator: Arc<RouteNavigator>,
    interval: Duration,
}

impl RecipeGenerationView {
    pub fn new(
        recipe_api: Arc<dyn RecipeApi>,
        poller: Arc<JobPoller>,
        store: Arc<SessionStore>,
        navigator: Arc<RouteNavigator>,
        interval: Duration,
    ) -> Self {
        Self {
            recipe_api,
            poller,
            store,
            navigator,
            interval,
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<JobId, ViewError> {
        self.require_session()?;
        let job_id = self
            .recipe_api
            .create_recipe(CreateRecipeInput {
                user_prompt: prompt.to_owned(),
            })
            .await?;
        info!(%job_id, "recipe generation started");
        self.navigator.navigate(Route::Recipe(job_id.clone()));
        Ok(job_id)
    }

    /// Polls `job_id` and hands every published snapshot to `render`.
    pub async fn watch<F>(
        &self,
        job_id: &JobId,
        cancel: CancellationToken,
        mut render: F,
    ) -> Result<ViewOutcome, ViewError>
    where
        F: FnMut(&PollSnapshot<JobStatus>),
    {
        self.require_session()?;
        let here = Route::Recipe(job_id.clone());
        if self.navigator.current() != here {
            self.navigator.navigate(here.clone());
        }

        let source: Arc<dyn StatusSource<JobStatus>> = Arc::new(RecipeStatusSource::new(
            self.recipe_api.clone(),
            job_id.clone(),
        ));
        let handle = self.poller.start(PollTarget::new(
            job_id.to_string(),
            source,
            self.interval,
            JobStatus::is_complete,
        ))?;

        let mut updates = handle.subscribe();
        let mut route_rx = self.navigator.subscribe();
        let mut snapshot = updates.borrow_and_update().clone();
        render(&snapshot);

        let outcome = loop {
            if let (PollPhase::Complete, Some(status)) = (snapshot.phase, &snapshot.status) {
                break ViewOutcome::Completed(status.clone());
            }
            tokio::select! {
                _ = cancel.cancelled() => break ViewOutcome::Cancelled,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break ViewOutcome::Cancelled;
                    }
                    snapshot = updates.borrow_and_update().clone();
                    render(&snapshot);
                }
                changed = route_rx.changed() => {
                    if changed.is_err() {
                        break ViewOutcome::Cancelled;
                    }
                    let route = route_rx.borrow_and_update().clone();
                    if route != here {
                        break ViewOutcome::Left(route);
                    }
                }
            }
        };

        self.poller.stop(&handle);
        match &outcome {
            ViewOutcome::Completed(_) => debug!(%job_id, "recipe ready"),
            ViewOutcome::Left(route) => info!(%job_id, %route, "left recipe, polling stopped"),
            ViewOutcome::Cancelled => info!(%job_id, "watch cancelled"),
        }
        Ok(outcome)
    }

    fn require_session(&self) -> Result<(), ViewError> {
        if self.store.is_authenticated() {
            return Ok(());
        }
        self.navigator.navigate(Route::SignIn);
        Err(ViewError::SignInRequired)
    }
}

/// Text shown for a poll snapshot.
pub fn render_snapshot(snapshot: &PollSnapshot<JobStatus>) -> String {
    let mut text = match (snapshot.phase, &snapshot.status) {
        (PollPhase::Complete, Some(status)) => match status.recipe() {
            Some(recipe) => recipe.to_string(),
            None => format!(
                "Recipe ready\n{}",
                serde_json::to_string_pretty(&status.fields).unwrap_or_default()
            ),
        },
        (_, Some(status)) => match status.fields.get("title").and_then(|t| t.as_str()) {
            Some(title) => format!("Generating \"{title}\"..."),
            None => "Generating recipe...".to_owned(),
        },
        (_, None) => "Generating recipe...".to_owned(),
    };
    if snapshot.degraded {
        text.push_str(&format!(
            "\nHaving trouble reaching the server ({} failed attempts), still trying",
            snapshot.consecutive_failures
        ));
    }
    text
}
