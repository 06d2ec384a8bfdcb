use crate::logger::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, reject};

#[derive(Debug, Clone, Error)]
pub enum StubError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Session revoked")]
    Revoked,
    #[error("recipe not found")]
    JobNotFound,
    #[error("{0}")]
    BadRequest(String),
}

impl StubError {
    fn status(&self) -> StatusCode {
        match self {
            StubError::InvalidCredentials
            | StubError::MissingToken
            | StubError::InvalidToken
            | StubError::Revoked => StatusCode::UNAUTHORIZED,
            StubError::UsernameTaken => StatusCode::CONFLICT,
            StubError::JobNotFound => StatusCode::NOT_FOUND,
            StubError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl reject::Reject for StubError {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    force_logout: bool,
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, body) = if let Some(err) = err.find::<StubError>() {
        let force_logout = matches!(err, StubError::Revoked);
        let body = ErrorBody {
            error: err.to_string(),
            message: force_logout.then(|| "Your session was ended, please sign in again".to_owned()),
            force_logout,
        };
        (err.status(), body)
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, plain("Not found"))
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, plain(&e.to_string()))
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, plain("Method not allowed"))
    } else {
        warn!("unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, plain("Internal error"))
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

fn plain(error: &str) -> ErrorBody {
    ErrorBody {
        error: error.to_owned(),
        message: None,
        force_logout: false,
    }
}
