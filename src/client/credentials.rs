use crate::domain_model::CachedSession;
use crate::domain_port::*;
use crate::infra_http::ApiClient;
use std::sync::Arc;

/// The complete local session artifact: the persisted copy plus the access
/// token the HTTP client attaches to outgoing requests.
///
/// Loading or saving installs the token, clearing removes both.
pub struct CachedCredentials {
    api_client: Arc<ApiClient>,
    persisted: Arc<dyn SessionCache>,
}

impl CachedCredentials {
    pub fn new(api_client: Arc<ApiClient>, persisted: Arc<dyn SessionCache>) -> Self {
        Self {
            api_client,
            persisted,
        }
    }
}

#[async_trait::async_trait]
impl SessionCache for CachedCredentials {
    async fn load(&self) -> Result<Option<CachedSession>, SessionCacheError> {
        let session = self.persisted.load().await?;
        if let Some(session) = &session {
            self.api_client.set_access_token(session.access_token.clone());
        }
        Ok(session)
    }

    async fn save(&self, session: &CachedSession) -> Result<(), SessionCacheError> {
        self.api_client.set_access_token(session.access_token.clone());
        self.persisted.save(session).await
    }

    async fn clear(&self) -> Result<(), SessionCacheError> {
        self.api_client.clear_access_token();
        self.persisted.clear().await
    }
}
