/// Team endpoints
///
/// # Endpoints
///
/// - `POST /team/add` - Create a team and upsert its members
/// - `GET /team/get?team_name=` - Get a team with current member state
/// - `POST /team/rebalance` - Regenerate reviewers of the team's open PRs

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use reviewrota_shared::{
    assignment::RebalanceReport,
    models::{Team, TeamMember},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

/// Team member as submitted by clients
#[derive(Debug, Deserialize)]
pub struct TeamMemberRequest {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// Create team request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, message = "team_name is required"))]
    pub team_name: String,

    #[serde(default)]
    pub members: Vec<TeamMemberRequest>,
}

impl CreateTeamRequest {
    /// Member-level checks: non-empty IDs, no duplicates
    fn validate_members(&self) -> Result<(), ApiError> {
        let mut seen = HashSet::new();
        let mut errors = Vec::new();

        for (index, member) in self.members.iter().enumerate() {
            if member.user_id.trim().is_empty() {
                errors.push(ValidationErrorDetail {
                    field: format!("members[{}].user_id", index),
                    message: "user_id is required".to_string(),
                });
            } else if !seen.insert(member.user_id.as_str()) {
                errors.push(ValidationErrorDetail {
                    field: format!("members[{}].user_id", index),
                    message: format!("duplicate user_id '{}'", member.user_id),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(errors))
        }
    }

    fn into_team(self) -> Team {
        let members = self
            .members
            .into_iter()
            .map(|m| TeamMember {
                user_id: m.user_id,
                username: m.username,
                is_active: m.is_active,
            })
            .collect();
        Team::new(self.team_name, members)
    }
}

/// Team lookup query
#[derive(Debug, Deserialize, Validate)]
pub struct TeamQuery {
    #[validate(length(min = 1, message = "team_name is required"))]
    pub team_name: String,
}

/// Rebalance request
#[derive(Debug, Deserialize, Validate)]
pub struct RebalanceRequest {
    #[validate(length(min = 1, message = "team_name is required"))]
    pub team_name: String,
}

/// Team response envelope
#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub team: Team,
}

/// Create team
///
/// # Endpoint
///
/// ```text
/// POST /team/add
/// Content-Type: application/json
///
/// {
///   "team_name": "backend",
///   "members": [
///     { "user_id": "u1", "username": "Alice", "is_active": true },
///     { "user_id": "u2", "username": "Bob", "is_active": true }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or validation failed
/// - `409 Conflict`: `TEAM_EXISTS`
pub async fn add_team(
    State(state): State<AppState>,
    payload: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TeamResponse>)> {
    let Json(req) = payload?;
    req.validate()?;
    req.validate_members()?;

    let team = req.into_team();
    state.teams.create_team(&team).await?;

    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// Get team
///
/// Member names and activity flags reflect the current user records.
///
/// # Errors
///
/// - `400 Bad Request`: Missing `team_name`
/// - `404 Not Found`: `NOT_FOUND`
pub async fn get_team(
    State(state): State<AppState>,
    query: Result<Query<TeamQuery>, QueryRejection>,
) -> ApiResult<Json<TeamResponse>> {
    let Query(query) = query?;
    query.validate()?;

    let team = state.teams.get_team(&query.team_name).await?;
    Ok(Json(TeamResponse { team }))
}

/// Rebalance team
///
/// Best effort: the response lists reassigned and skipped pull requests.
///
/// # Response
///
/// ```json
/// {
///   "team_name": "backend",
///   "reassigned": [
///     { "pull_request_id": "pr-1", "previous_reviewers": ["u2"], "assigned_reviewers": ["u3"] }
///   ],
///   "skipped": [],
///   "failed_lookups": []
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: unknown team
pub async fn rebalance_team(
    State(state): State<AppState>,
    payload: Result<Json<RebalanceRequest>, JsonRejection>,
) -> ApiResult<Json<RebalanceReport>> {
    let Json(req) = payload?;
    req.validate()?;

    let report = state.engine.reassign_open_prs_for_team(&req.team_name).await?;
    Ok(Json(report))
}
