use super::error::*;
use super::handler;
use crate::domain_model::UserSummary;
use crate::stub_service::StubState;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

/// Routes of the stub service, relative to the API base path.
pub fn routes(
    state: Arc<StubState>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let register = warp::post()
        .and(warp::path("users"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(state.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path!("users" / "login"))
        .and(warp::body::json())
        .and(with(state.clone()))
        .and_then(handler::login);

    let verify = warp::get()
        .and(warp::path!("session" / "verify"))
        .and(bearer_token())
        .and(with(state.clone()))
        .and_then(handler::verify);

    let logout = warp::post()
        .and(warp::path!("users" / "logout"))
        .and(required_token())
        .and(with_session(state.clone()))
        .and(with(state.clone()))
        .and_then(handler::logout);

    let create_job = warp::post()
        .and(warp::path("jobs"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_session(state.clone()))
        .and(with(state.clone()))
        .and_then(handler::create_job);

    let job_status = warp::get()
        .and(warp::path!("jobs" / String))
        .and(with_session(state.clone()))
        .and(with(state.clone()))
        .and_then(handler::job_status);

    let revoke = warp::post()
        .and(warp::path!("stub" / "revoke" / String))
        .and(with(state.clone()))
        .and_then(handler::revoke);

    register
        .or(login)
        .or(verify)
        .or(logout)
        .or(create_job)
        .or(job_status)
        .or(revoke)
}

fn with<T>(value: Arc<T>) -> impl Filter<Extract = (Arc<T>,), Error = Infallible> + Clone
where
    T: Send + Sync + ?Sized,
{
    warp::any().map(move || value.clone())
}

fn bearer_token() -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str()).map(
        |header: Option<String>| {
            header.and_then(|value| value.strip_prefix("Bearer ").map(str::to_owned))
        },
    )
}

fn required_token() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    bearer_token().and_then(|token: Option<String>| async move {
        token.ok_or_else(|| reject::custom(StubError::MissingToken))
    })
}

fn with_session(
    state: Arc<StubState>,
) -> impl Filter<Extract = (UserSummary,), Error = warp::Rejection> + Clone {
    required_token().and_then(move |token: String| {
        let state = state.clone();
        async move { state.authenticate(&token).map_err(reject::custom) }
    })
}
