use crate::application_port::ApiError;
use crate::domain_model::UserSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_authenticated: bool,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub access_token: String,
    pub user: UserSummary,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub recaptcha: String,
}

#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn verify(&self) -> Result<VerifyResponse, ApiError>;
    async fn login(&self, request: LoginInput) -> Result<LoginResult, ApiError>;
    /// Returns the server's confirmation message.
    async fn register(&self, request: RegisterInput) -> Result<String, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
}
