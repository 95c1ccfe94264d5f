//! Request handlers and their JSON shapes.
//!
//! Handlers only decode the request, call the matching [`ReviewService`]
//! operation and wrap the result in its response envelope.

use super::error::ApiErr;
use crate::error::AppError;
use crate::models::{PullRequest, PullRequestShort, Team, TeamMember, User};
use crate::service::ReviewService;
use crate::store::Store;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state for the API routes.
pub type ApiState<S> = Arc<ReviewService<S>>;

// ── Extractors ───────────────────────────────────────────────────────────────

/// JSON request body decoded regardless of the `Content-Type` header.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiErr;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            log::debug!("[http] Unreadable request body: {}", e);
            ApiErr(AppError::invalid_input("Invalid request body"))
        })?;

        serde_json::from_slice(&bytes).map(JsonBody).map_err(|e| {
            log::debug!("[http] Invalid JSON body: {}", e);
            ApiErr(AppError::invalid_input("Invalid request body"))
        })
    }
}

/// Query parameters must be present and non-blank.
fn require_param(value: &str, field: &str) -> Result<(), ApiErr> {
    if value.trim().is_empty() {
        return Err(ApiErr(AppError::invalid_input_field(
            format!("{} is required", field),
            field,
        )));
    }
    Ok(())
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub team_name: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    #[serde(default)]
    pub team_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetIsActiveRequest {
    pub user_id: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePrRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PrIdRequest {
    #[serde(default)]
    pub pull_request_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub pull_request_id: String,
    pub old_user_id: String,
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub team: Team,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct PrResponse {
    pub pr: PullRequest,
}

#[derive(Debug, Serialize)]
pub struct ReassignResponse {
    pub pr: PullRequest,
    pub replaced_by: String,
}

#[derive(Debug, Serialize)]
pub struct UserReviewsResponse {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestShort>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// POST /team/add
pub async fn create_team<S: Store>(
    State(service): State<ApiState<S>>,
    JsonBody(req): JsonBody<CreateTeamRequest>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiErr> {
    let team = service.create_team(&req.team_name, &req.members).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// GET /team/get?team_name=
pub async fn get_team<S: Store>(
    State(service): State<ApiState<S>>,
    query: Result<Query<TeamQuery>, QueryRejection>,
) -> Result<Json<Team>, ApiErr> {
    let Query(query) = query?;
    require_param(&query.team_name, "team_name")?;
    let team = service.get_team(&query.team_name).await?;
    Ok(Json(team))
}

/// POST /users/setIsActive
pub async fn set_is_active<S: Store>(
    State(service): State<ApiState<S>>,
    JsonBody(req): JsonBody<SetIsActiveRequest>,
) -> Result<Json<UserResponse>, ApiErr> {
    let user = service.set_user_active(&req.user_id, req.is_active).await?;
    Ok(Json(UserResponse { user }))
}

/// GET /users/getReview?user_id=
pub async fn get_user_reviews<S: Store>(
    State(service): State<ApiState<S>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<UserReviewsResponse>, ApiErr> {
    let Query(query) = query?;
    require_param(&query.user_id, "user_id")?;
    let pull_requests = service.get_user_reviews(&query.user_id).await?;
    Ok(Json(UserReviewsResponse {
        user_id: query.user_id,
        pull_requests,
    }))
}

/// POST /pullRequest/create
pub async fn create_pr<S: Store>(
    State(service): State<ApiState<S>>,
    JsonBody(req): JsonBody<CreatePrRequest>,
) -> Result<(StatusCode, Json<PrResponse>), ApiErr> {
    let pr = service
        .create_pr(&req.pull_request_id, &req.pull_request_name, &req.author_id)
        .await?;
    Ok((StatusCode::CREATED, Json(PrResponse { pr })))
}

/// POST /pullRequest/merge
pub async fn merge_pr<S: Store>(
    State(service): State<ApiState<S>>,
    JsonBody(req): JsonBody<PrIdRequest>,
) -> Result<Json<PrResponse>, ApiErr> {
    let pr = service.merge_pr(&req.pull_request_id).await?;
    Ok(Json(PrResponse { pr }))
}

/// POST /pullRequest/reassign
pub async fn reassign_reviewer<S: Store>(
    State(service): State<ApiState<S>>,
    JsonBody(req): JsonBody<ReassignRequest>,
) -> Result<Json<ReassignResponse>, ApiErr> {
    let result = service
        .reassign_reviewer(&req.pull_request_id, &req.old_user_id)
        .await?;
    Ok(Json(ReassignResponse {
        pr: result.pr,
        replaced_by: result.replaced_by,
    }))
}

/// GET /pullRequest/get?pull_request_id=
pub async fn get_pr<S: Store>(
    State(service): State<ApiState<S>>,
    query: Result<Query<PrIdRequest>, QueryRejection>,
) -> Result<Json<PrResponse>, ApiErr> {
    let Query(query) = query?;
    require_param(&query.pull_request_id, "pull_request_id")?;
    let pr = service.get_pr(&query.pull_request_id).await?;
    Ok(Json(PrResponse { pr }))
}
