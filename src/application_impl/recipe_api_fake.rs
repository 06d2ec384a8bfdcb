use crate::application_port::*;
use crate::domain_model::{JobId, JobStatus};
use dashmap::DashMap;
use nanoid::nanoid;
use serde_json::json;

struct FakeJob {
    prompt: String,
    reads: u32,
}

/// In-memory generation service: a job reports complete on its
/// `polls_until_complete`-th status read.
pub struct FakeRecipeApi {
    polls_until_complete: u32,
    jobs: DashMap<JobId, FakeJob>,
}

impl FakeRecipeApi {
    pub fn new(polls_until_complete: u32) -> Self {
        Self {
            polls_until_complete: polls_until_complete.max(1),
            jobs: DashMap::new(),
        }
    }

    pub fn reads(&self, job_id: &JobId) -> u32 {
        self.jobs.get(job_id).map(|job| job.reads).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl RecipeApi for FakeRecipeApi {
    async fn create_recipe(&self, request: CreateRecipeInput) -> Result<JobId, ApiError> {
        let job_id = JobId(nanoid!(10));
        self.jobs.insert(
            job_id.clone(),
            FakeJob {
                prompt: request.user_prompt,
                reads: 0,
            },
        );
        Ok(job_id)
    }

    async fn fetch_status(&self, job_id: &JobId) -> Result<JobStatus, ApiError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ApiError::NotFound(format!("recipe {}", job_id)))?;
        job.reads += 1;
        let complete = job.reads >= self.polls_until_complete;

        let payload = recipe_status_payload(&job.prompt, complete);
        serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Status document served for a job created from `prompt`.
pub fn recipe_status_payload(prompt: &str, complete: bool) -> serde_json::Value {
    if !complete {
        return json!({ "generationComplete": false, "title": prompt });
    }
    json!({
        "generationComplete": true,
        "title": prompt,
        "mainRecipe": {
            "ingredients": [{ "name": "water", "unit": "cups", "amount": 2.0 }],
            "instructions": ["Boil the water"],
            "timeToCook": 10
        },
        "subRecipes": []
    })
}
