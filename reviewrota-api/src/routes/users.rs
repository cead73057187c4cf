/// User endpoints
///
/// # Endpoints
///
/// - `POST /users/setIsActive` - Toggle whether a user can be picked as reviewer
/// - `GET /users/getReview?user_id=` - Pull requests the user reviews

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use reviewrota_shared::models::{PullRequestShort, User};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SetIsActiveRequest {
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,

    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserQuery {
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestShort>,
}

/// Set user activity
///
/// Inactive users are never picked as reviewers. Existing assignments
/// are kept until the team is rebalanced.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body
/// - `404 Not Found`: unknown user
pub async fn set_is_active(
    State(state): State<AppState>,
    payload: Result<Json<SetIsActiveRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let user = state.teams.set_is_active(&req.user_id, req.is_active).await?;
    Ok(Json(UserResponse { user }))
}

/// List pull requests reviewed by a user
///
/// Includes merged pull requests.
///
/// # Errors
///
/// - `400 Bad Request`: Missing `user_id`
/// - `404 Not Found`: unknown user
pub async fn get_review(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<ReviewListResponse>> {
    let Query(query) = query?;
    query.validate()?;

    let prs = state.engine.get_prs_by_reviewer(&query.user_id).await?;

    Ok(Json(ReviewListResponse {
        user_id: query.user_id,
        pull_requests: prs.iter().map(PullRequestShort::from).collect(),
    }))
}
