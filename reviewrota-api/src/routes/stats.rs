/// Statistics endpoint
///
/// ```text
/// GET /stats/user?user_id=u1
/// ```
///
/// ```json
/// { "user_id": "u1", "assigned_count": 3, "open_pr_count": 2, "merged_pr_count": 1 }
/// ```

use crate::{app::AppState, error::ApiResult, routes::users::UserQuery};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use reviewrota_shared::assignment::UserStats;
use validator::Validate;

/// Review counts for one user
pub async fn user_stats(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<UserStats>> {
    let Query(query) = query?;
    query.validate()?;

    let stats = state.stats.get_user_stats(&query.user_id).await?;
    Ok(Json(stats))
}
