/// Storage contracts consumed by the assignment engine.
///
/// Three repositories abstract the durable record store: pull requests,
/// users and teams. Two backends implement them:
///
/// - [`PgStore`]: PostgreSQL via sqlx, the production backend
/// - [`InMemoryStore`]: `RwLock<HashMap>` tables, for tests and local runs
///
/// Every call made by the services goes through a [`CallGuard`], which
/// bounds it with a timeout and aborts it once the shared cancellation
/// token fires.

mod guard;
mod memory;
mod postgres;

pub use guard::CallGuard;
pub use memory::InMemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{PullRequest, Team, User};

/// Storage error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique key violation (team name or pull request ID)
    #[error("record with this key already exists")]
    Duplicate,

    /// Conditional update lost against a concurrent writer
    #[error("record was modified concurrently (expected version {expected})")]
    VersionConflict { expected: i64 },

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Call exceeded its deadline
    #[error("storage call timed out")]
    TimedOut,

    /// Call was abandoned because the operation was cancelled
    #[error("storage call cancelled")]
    Cancelled,
}

/// Storage result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Pull request repository
#[async_trait]
pub trait PullRequestStore: Send + Sync {
    /// Insert a new pull request; fails with `Duplicate` on an existing ID.
    async fn create(&self, pr: &PullRequest) -> StoreResult<()>;

    /// Get a pull request by ID, `None` if absent.
    async fn get_by_id(&self, pull_request_id: &str) -> StoreResult<Option<PullRequest>>;

    /// Write `pr` if the stored version equals `pr.version`.
    ///
    /// Returns the stored record with its bumped version. Fails with
    /// `VersionConflict` when the row carries another version. Updating an
    /// ID that does not exist is a no-op and returns `pr` unchanged.
    async fn update(&self, pr: &PullRequest) -> StoreResult<PullRequest>;

    /// Whether a pull request with this ID exists.
    async fn exists(&self, pull_request_id: &str) -> StoreResult<bool>;

    /// All pull requests (any status) listing `user_id` as a reviewer.
    async fn get_by_reviewer(&self, user_id: &str) -> StoreResult<Vec<PullRequest>>;

    /// All OPEN pull requests.
    ///
    /// Pull requests carry no team, so `team_name` is not applied here and
    /// callers must check authorship themselves.
    async fn get_open_by_team(&self, team_name: &str) -> StoreResult<Vec<PullRequest>>;
}

/// User repository
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert or overwrite a user keyed by `user_id`.
    async fn create_or_update(&self, user: &User) -> StoreResult<()>;

    /// Get a user by ID, `None` if absent.
    async fn get_by_id(&self, user_id: &str) -> StoreResult<Option<User>>;

    /// Active users whose `team_name` matches.
    async fn get_active_by_team(&self, team_name: &str) -> StoreResult<Vec<User>>;

    /// Set the activity flag; returns false if no user matched.
    async fn update_is_active(&self, user_id: &str, is_active: bool) -> StoreResult<bool>;

    /// All users of a team regardless of activity.
    async fn get_by_team(&self, team_name: &str) -> StoreResult<Vec<User>>;
}

/// Team repository
#[async_trait]
pub trait TeamStore: Send + Sync {
    /// Insert a team; fails with `Duplicate` on an existing name.
    async fn create(&self, team: &Team) -> StoreResult<()>;

    /// Get a team by name, `None` if absent.
    async fn get_by_name(&self, team_name: &str) -> StoreResult<Option<Team>>;

    /// Whether a team with this name exists.
    async fn exists(&self, team_name: &str) -> StoreResult<bool>;
}

/// The three repositories handed to the services
#[derive(Clone)]
pub struct Stores {
    pub pull_requests: Arc<dyn PullRequestStore>,
    pub users: Arc<dyn UserStore>,
    pub teams: Arc<dyn TeamStore>,
}

impl Stores {
    /// All repositories backed by one PostgreSQL pool
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            pull_requests: store.clone(),
            users: store.clone(),
            teams: store,
        }
    }

    /// All repositories backed by one in-memory store
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            pull_requests: store.clone(),
            users: store.clone(),
            teams: store,
        }
    }
}
