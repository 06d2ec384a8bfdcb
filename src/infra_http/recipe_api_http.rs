use crate::application_port::*;
use crate::domain_model::{JobId, JobStatus};
use crate::infra_http::ApiClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobRequest<'a> {
    user_prompt: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobResponse {
    job_id: JobId,
}

pub struct HttpRecipeApi {
    client: Arc<ApiClient>,
}

impl HttpRecipeApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl RecipeApi for HttpRecipeApi {
    async fn create_recipe(&self, request: CreateRecipeInput) -> Result<JobId, ApiError> {
        let body = CreateJobRequest {
            user_prompt: &request.user_prompt,
        };
        let response: CreateJobResponse = self.client.post_json("/jobs", &body).await?;
        Ok(response.job_id)
    }

    async fn fetch_status(&self, job_id: &JobId) -> Result<JobStatus, ApiError> {
        self.client.get_json(&format!("/jobs/{}", job_id)).await
    }
}
