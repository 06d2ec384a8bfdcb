use crate::application_port::*;
use crate::client::{Navigator, SessionStore};
use crate::domain_model::*;
use crate::domain_port::{SessionCache, SessionCacheError};
use crate::logger::*;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AuthFlowError {
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error(transparent)]
    Policy(#[from] PasswordPolicyError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session cache error: {0}")]
    Cache(#[from] SessionCacheError),
}

/// Explicit sign-in, registration and sign-out actions.
pub struct AuthFlow {
    auth_api: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
    credentials: Arc<dyn SessionCache>,
    navigator: Arc<dyn Navigator>,
}

impl AuthFlow {
    pub fn new(
        auth_api: Arc<dyn AuthApi>,
        store: Arc<SessionStore>,
        credentials: Arc<dyn SessionCache>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            auth_api,
            store,
            credentials,
            navigator,
        }
    }

    pub async fn login(&self, input: LoginInput) -> Result<UserSummary, AuthFlowError> {
        let username = input.username.clone();
        let result = self.auth_api.login(input).await.inspect_err(|e| {
            warn!(%username, "login failed: {e}");
        })?;

        let cached = CachedSession::new(result.access_token, result.user.clone());
        if let Err(e) = self.credentials.save(&cached).await {
            // the token is attached in memory; only the next launch loses it
            warn!("failed to persist session: {e}");
        }
        info!(username = %result.user.username, "{}", result.message);
        self.store.set_authenticated(result.user.clone());
        self.navigator.navigate(Route::Home);
        Ok(result.user)
    }

    /// Registers a new account. The session is left untouched.
    pub async fn register(
        &self,
        input: RegisterInput,
        confirm_password: &str,
    ) -> Result<String, AuthFlowError> {
        if input.password != confirm_password {
            return Err(AuthFlowError::PasswordMismatch);
        }
        validate_password(&input.password)?;

        let username = input.username.clone();
        let message = self.auth_api.register(input).await?;
        info!(%username, "registered: {message}");
        self.navigator.navigate(Route::SignIn);
        Ok(message)
    }

    pub async fn logout(&self) -> Result<(), AuthFlowError> {
        if let Err(e) = self.auth_api.logout().await {
            warn!("server logout failed, clearing local session anyway: {e}");
        }
        self.store.clear();
        self.credentials.clear().await?;
        self.navigator.navigate(Route::SignIn);
        Ok(())
    }
}
