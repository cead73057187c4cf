/// PostgreSQL implementation of the storage contracts.
///
/// Queries live on the model types; this adapter maps their results onto
/// the repository semantics (duplicate keys, conditional updates).

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{PullRequestStore, StoreError, StoreResult, TeamStore, UserStore};
use crate::models::{PullRequest, Team, User};

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// sqlx-backed store implementing all three repositories
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps unique violations to `Duplicate`, everything else to `Database`
fn classify_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Duplicate;
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl PullRequestStore for PgStore {
    async fn create(&self, pr: &PullRequest) -> StoreResult<()> {
        PullRequest::insert(&self.pool, pr)
            .await
            .map_err(classify_insert_error)
    }

    async fn get_by_id(&self, pull_request_id: &str) -> StoreResult<Option<PullRequest>> {
        Ok(PullRequest::find_by_id(&self.pool, pull_request_id).await?)
    }

    async fn update(&self, pr: &PullRequest) -> StoreResult<PullRequest> {
        match PullRequest::update_if_version(&self.pool, pr).await? {
            Some(version) => Ok(PullRequest {
                version,
                ..pr.clone()
            }),
            None => {
                if PullRequest::exists(&self.pool, &pr.pull_request_id).await? {
                    Err(StoreError::VersionConflict {
                        expected: pr.version,
                    })
                } else {
                    debug!(pr_id = %pr.pull_request_id, "Update skipped, pull request does not exist");
                    Ok(pr.clone())
                }
            }
        }
    }

    async fn exists(&self, pull_request_id: &str) -> StoreResult<bool> {
        Ok(PullRequest::exists(&self.pool, pull_request_id).await?)
    }

    async fn get_by_reviewer(&self, user_id: &str) -> StoreResult<Vec<PullRequest>> {
        Ok(PullRequest::list_by_reviewer(&self.pool, user_id).await?)
    }

    async fn get_open_by_team(&self, _team_name: &str) -> StoreResult<Vec<PullRequest>> {
        Ok(PullRequest::list_open(&self.pool).await?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_or_update(&self, user: &User) -> StoreResult<()> {
        Ok(User::upsert(&self.pool, user).await?)
    }

    async fn get_by_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, user_id).await?)
    }

    async fn get_active_by_team(&self, team_name: &str) -> StoreResult<Vec<User>> {
        Ok(User::list_active_by_team(&self.pool, team_name).await?)
    }

    async fn update_is_active(&self, user_id: &str, is_active: bool) -> StoreResult<bool> {
        Ok(User::update_is_active(&self.pool, user_id, is_active).await?)
    }

    async fn get_by_team(&self, team_name: &str) -> StoreResult<Vec<User>> {
        Ok(User::list_by_team(&self.pool, team_name).await?)
    }
}

#[async_trait]
impl TeamStore for PgStore {
    async fn create(&self, team: &Team) -> StoreResult<()> {
        Team::insert(&self.pool, team)
            .await
            .map_err(classify_insert_error)
    }

    async fn get_by_name(&self, team_name: &str) -> StoreResult<Option<Team>> {
        Ok(Team::find_by_name(&self.pool, team_name).await?)
    }

    async fn exists(&self, team_name: &str) -> StoreResult<bool> {
        Ok(Team::exists(&self.pool, team_name).await?)
    }
}
