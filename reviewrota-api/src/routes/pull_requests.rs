/// Pull request endpoints
///
/// # Endpoints
///
/// - `POST /pullRequest/create` - Open a PR and assign up to two reviewers
/// - `POST /pullRequest/merge` - Merge a PR (idempotent)
/// - `POST /pullRequest/reassign` - Swap one reviewer for another teammate

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use reviewrota_shared::models::PullRequest;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePrRequest {
    #[validate(length(min = 1, message = "pull_request_id is required"))]
    pub pull_request_id: String,

    #[validate(length(min = 1, message = "pull_request_name is required"))]
    pub pull_request_name: String,

    #[validate(length(min = 1, message = "author_id is required"))]
    pub author_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MergePrRequest {
    #[validate(length(min = 1, message = "pull_request_id is required"))]
    pub pull_request_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReassignRequest {
    #[validate(length(min = 1, message = "pull_request_id is required"))]
    pub pull_request_id: String,

    #[serde(alias = "old_reviewer_id")]
    #[validate(length(min = 1, message = "old_user_id is required"))]
    pub old_user_id: String,
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

/// Create pull request
///
/// # Endpoint
///
/// ```text
/// POST /pullRequest/create
/// Content-Type: application/json
///
/// {
///   "pull_request_id": "pr-1001",
///   "pull_request_name": "Add search",
///   "author_id": "u1"
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: unknown author
/// - `409 Conflict`: `PR_EXISTS`
pub async fn create_pr(
    State(state): State<AppState>,
    payload: Result<Json<CreatePrRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PrResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let pr = state
        .engine
        .create_pr(&req.pull_request_id, &req.pull_request_name, &req.author_id)
        .await?;

    Ok((StatusCode::CREATED, Json(PrResponse { pr })))
}

/// Merge pull request
///
/// Merging twice returns the first merge's state.
///
/// # Errors
///
/// - `404 Not Found`: unknown pull request
/// - `409 Conflict`: `CONCURRENT_UPDATE`
pub async fn merge_pr(
    State(state): State<AppState>,
    payload: Result<Json<MergePrRequest>, JsonRejection>,
) -> ApiResult<Json<PrResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let pr = state.engine.merge_pr(&req.pull_request_id).await?;
    Ok(Json(PrResponse { pr }))
}

/// Reassign reviewer
///
/// # Endpoint
///
/// ```text
/// POST /pullRequest/reassign
/// Content-Type: application/json
///
/// { "pull_request_id": "pr-1001", "old_user_id": "u2" }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: unknown pull request or user
/// - `409 Conflict`: `PR_MERGED`, `NOT_ASSIGNED`, `NO_CANDIDATE`
pub async fn reassign_reviewer(
    State(state): State<AppState>,
    payload: Result<Json<ReassignRequest>, JsonRejection>,
) -> ApiResult<Json<ReassignResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let outcome = state
        .engine
        .reassign_reviewer(&req.pull_request_id, &req.old_user_id)
        .await?;

    Ok(Json(ReassignResponse {
        pr: outcome.pull_request,
        replaced_by: outcome.replaced_by,
    }))
}
