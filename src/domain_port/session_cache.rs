use crate::domain_model::CachedSession;

/// Local storage for the session artifact that survives restarts.
#[async_trait::async_trait]
pub trait SessionCache: Send + Sync {
    async fn load(&self) -> Result<Option<CachedSession>, SessionCacheError>;
    async fn save(&self, session: &CachedSession) -> Result<(), SessionCacheError>;
    /// Removing an absent artifact is not an error.
    async fn clear(&self) -> Result<(), SessionCacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionCacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt session artifact: {0}")]
    Corrupt(String),
}
