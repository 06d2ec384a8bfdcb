use crate::domain_model::JobId;
use std::fmt;

/// Navigation targets the client core can request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    SignIn,
    Register,
    Home,
    Recipe(JobId),
}

impl Route {
    /// Routes reachable without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::SignIn | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::SignIn => write!(f, "/signin"),
            Route::Register => write!(f, "/register"),
            Route::Home => write!(f, "/"),
            Route::Recipe(id) => write!(f, "/recipe/{}", id),
        }
    }
}
