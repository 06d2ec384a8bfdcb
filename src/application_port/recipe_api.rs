use crate::application_port::ApiError;
use crate::domain_model::{JobId, JobStatus};

#[derive(Debug, Clone)]
pub struct CreateRecipeInput {
    pub user_prompt: String,
}

#[async_trait::async_trait]
pub trait RecipeApi: Send + Sync {
    /// Starts a generation job and returns its id without waiting for it.
    async fn create_recipe(&self, request: CreateRecipeInput) -> Result<JobId, ApiError>;
    async fn fetch_status(&self, job_id: &JobId) -> Result<JobStatus, ApiError>;
}
