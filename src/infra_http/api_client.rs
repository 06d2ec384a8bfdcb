use crate::application_port::ApiError;
use crate::client::InspectedResponse;
use crate::infra_http::ResponseHooks;
use crate::logger::*;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// JSON-over-HTTP client shared by every API adapter.
///
/// Every response is handed to the registered [`ResponseHooks`] before it is
/// decoded. While at least one hook is registered, a body carrying the
/// force-logout marker is reported as [`ApiError::ForceLogout`] whatever its
/// status code; otherwise the status alone decides the error.
pub struct ApiClient {
    base_url: String,
    http_client: Client,
    access_token: RwLock<Option<String>>,
    hooks: Arc<ResponseHooks>,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn hooks(&self) -> Arc<ResponseHooks> {
        self.hooks.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|lock| lock.clone())
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        if let Ok(mut lock) = self.access_token.write() {
            *lock = Some(token.into());
        }
    }

    pub fn clear_access_token(&self) {
        if let Ok(mut lock) = self.access_token.write() {
            *lock = None;
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let request_id = uuid::Uuid::new_v4().to_string();

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(token) = self.access_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        trace!(%request_id, %method, %url, "sending request");
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(%request_id, %method, path, status = status.as_u16(), "response received");

        let inspected = InspectedResponse {
            request_id: &request_id,
            status: status.as_u16(),
            body: bytes.as_ref(),
        };
        let intercepting = !self.hooks.is_empty();
        self.hooks.dispatch(&inspected).await;

        if intercepting && inspected.has_force_logout() {
            warn!(%request_id, status = status.as_u16(), "server forced logout");
            return Err(ApiError::ForceLogout);
        }
        if !status.is_success() {
            return Err(error_from_status(status.as_u16(), bytes.as_ref()));
        }

        serde_json::from_slice::<T>(bytes.as_ref()).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn error_from_status(status: u16, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    match status {
        401 | 403 => ApiError::Unauthorized(message),
        404 => ApiError::NotFound(message),
        _ => ApiError::Status { status, message },
    }
}

pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    hooks: Option<Arc<ResponseHooks>>,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: None,
            hooks: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn hooks(mut self, hooks: Arc<ResponseHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn build(self) -> anyhow::Result<ApiClient> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| "http://127.0.0.1:8080/api/v1".to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout = self.timeout.unwrap_or(Duration::from_secs(30));

        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(ApiClient {
            base_url,
            http_client,
            access_token: RwLock::new(None),
            hooks: self.hooks.unwrap_or_default(),
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
