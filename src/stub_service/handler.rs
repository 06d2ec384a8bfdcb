use crate::domain_model::*;
use crate::logger::*;
use crate::stub_service::StubState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reject;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub recaptcha: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

pub async fn register(
    body: RegisterRequest,
    state: Arc<StubState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if body.recaptcha.is_empty() {
        debug!(username = %body.username, "registration without recaptcha token");
    }
    state
        .register(&body.username, &body.email, &body.password)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&MessageResponse {
        message: "User signed up successfully".to_owned(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    message: String,
    user: UserSummary,
}

pub async fn login(
    body: LoginRequest,
    state: Arc<StubState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (access_token, user) = state
        .login(&body.username, &body.password)
        .map_err(reject::custom)?;
    info!(username = %user.username, "stub login");

    Ok(warp::reply::json(&LoginResponse {
        access_token,
        message: "User logged in successfully".to_owned(),
        user,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserSummary>,
}

pub async fn verify(
    token: Option<String>,
    state: Arc<StubState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = match token {
        Some(token) => Some(state.authenticate(&token).map_err(reject::custom)?),
        None => None,
    };
    Ok(warp::reply::json(&VerifyResponse {
        is_authenticated: user.is_some(),
        user,
    }))
}

pub async fn logout(
    token: String,
    _user: UserSummary,
    state: Arc<StubState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    state.logout(&token);
    Ok(warp::reply::json(&MessageResponse {
        message: "User logged out successfully".to_owned(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub user_prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobResponse {
    job_id: JobId,
}

pub async fn create_job(
    body: CreateJobRequest,
    user: UserSummary,
    state: Arc<StubState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let job_id = state
        .create_job(&user, &body.user_prompt)
        .map_err(reject::custom)?;
    Ok(warp::reply::json(&CreateJobResponse { job_id }))
}

pub async fn job_status(
    job_id: String,
    user: UserSummary,
    state: Arc<StubState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let status = state
        .read_job(&user, &JobId(job_id))
        .map_err(reject::custom)?;
    Ok(warp::reply::json(&status))
}

#[derive(Debug, Serialize)]
struct RevokeResponse {
    revoked: usize,
}

pub async fn revoke(
    username: String,
    state: Arc<StubState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let revoked = state.revoke(&username);
    Ok(warp::reply::json(&RevokeResponse { revoked }))
}
