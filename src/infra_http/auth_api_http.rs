use crate::application_port::*;
use crate::domain_model::UserSummary;
use crate::infra_http::ApiClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    message: Option<String>,
    user: UserSummary,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    recaptcha: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpAuthApi {
    client: Arc<ApiClient>,
}

impl HttpAuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn verify(&self) -> Result<VerifyResponse, ApiError> {
        self.client.get_json("/session/verify").await
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, ApiError> {
        let body = LoginRequest {
            username: &request.username,
            password: &request.password,
        };
        let response: LoginResponse = self.client.post_json("/users/login", &body).await?;
        Ok(LoginResult {
            access_token: response.access_token,
            user: response.user,
            message: response
                .message
                .unwrap_or_else(|| "User logged in successfully".to_owned()),
        })
    }

    async fn register(&self, request: RegisterInput) -> Result<String, ApiError> {
        let body = RegisterRequest {
            username: &request.username,
            email: &request.email,
            password: &request.password,
            recaptcha: &request.recaptcha,
        };
        let response: MessageResponse = self.client.post_json("/users", &body).await?;
        response
            .message
            .ok_or_else(|| ApiError::Decode("registration response without message".to_owned()))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let _: MessageResponse = self
            .client
            .post_json("/users/logout", &serde_json::json!({}))
            .await?;
        Ok(())
    }
}
