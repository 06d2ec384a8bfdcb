use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authentication state as seen by this process.
///
/// `Authenticated` always carries the user returned by a successful
/// verification or login, so an authenticated session without a user
/// cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(UserSummary),
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn user(&self) -> Option<&UserSummary> {
        match self {
            Session::Authenticated(user) => Some(user),
            Session::Anonymous => None,
        }
    }
}

/// Session artifact kept on the local machine between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    pub access_token: String,
    pub user: UserSummary,
    pub saved_at: DateTime<Utc>,
}

impl CachedSession {
    pub fn new(access_token: impl Into<String>, user: UserSummary) -> Self {
        Self {
            access_token: access_token.into(),
            user,
            saved_at: Utc::now(),
        }
    }
}
