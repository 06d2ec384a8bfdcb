#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("session was revoked by the server")]
    ForceLogout,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Errors where the server gave a definitive answer about the session.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ApiError::ForceLogout | ApiError::Unauthorized(_))
    }
}
