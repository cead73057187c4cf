/// Pull request model and database operations
///
/// # State Machine
///
/// ```text
/// OPEN → MERGED
/// ```
///
/// A pull request is created OPEN with zero to two reviewers. Reviewers may
/// be swapped while it is OPEN. The transition to MERGED happens once and
/// freezes both the status and the reviewer list.
///
/// # Optimistic concurrency
///
/// Every row carries a `version` counter. Updates are conditioned on the
/// version that was read, so two writers racing on the same pull request
/// cannot silently overwrite each other: the loser sees zero affected rows
/// and must re-read.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE pr_status AS ENUM ('OPEN', 'MERGED');
///
/// CREATE TABLE pull_requests (
///     pull_request_id VARCHAR(255) PRIMARY KEY,
///     pull_request_name VARCHAR(512) NOT NULL,
///     author_id VARCHAR(255) NOT NULL,
///     status pr_status NOT NULL DEFAULT 'OPEN',
///     assigned_reviewers TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     merged_at TIMESTAMPTZ,
///     version BIGINT NOT NULL DEFAULT 0
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Pull request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "pr_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    /// Under review, reviewers may change
    Open,

    /// Merged, immutable
    Merged,
}

impl PrStatus {
    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: PrStatus) -> bool {
        matches!((self, target), (PrStatus::Open, PrStatus::Merged))
    }
}

/// Pull request record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PullRequest {
    /// Unique pull request ID
    pub pull_request_id: String,

    /// Human-readable title
    pub pull_request_name: String,

    /// User who opened the pull request
    pub author_id: String,

    /// Lifecycle status
    pub status: PrStatus,

    /// Reviewer user IDs, in assignment order
    pub assigned_reviewers: Vec<String>,

    /// When the pull request was created
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// When the pull request was merged; set iff status is MERGED
    #[serde(rename = "mergedAt", default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency counter
    #[serde(default, skip_serializing)]
    pub version: i64,
}

/// Reduced view used when listing a reviewer's pull requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestShort {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PrStatus,
}

impl From<&PullRequest> for PullRequestShort {
    fn from(pr: &PullRequest) -> Self {
        Self {
            pull_request_id: pr.pull_request_id.clone(),
            pull_request_name: pr.pull_request_name.clone(),
            author_id: pr.author_id.clone(),
            status: pr.status,
        }
    }
}

impl PullRequest {
    /// Builds a new OPEN pull request at version 0
    pub fn open(
        pull_request_id: impl Into<String>,
        pull_request_name: impl Into<String>,
        author_id: impl Into<String>,
        assigned_reviewers: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            pull_request_id: pull_request_id.into(),
            pull_request_name: pull_request_name.into(),
            author_id: author_id.into(),
            status: PrStatus::Open,
            assigned_reviewers,
            created_at,
            merged_at: None,
            version: 0,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged
    }

    pub fn is_open(&self) -> bool {
        self.status == PrStatus::Open
    }

    /// Checks whether `user_id` is currently assigned as a reviewer
    pub fn is_reviewer(&self, user_id: &str) -> bool {
        self.assigned_reviewers.iter().any(|id| id == user_id)
    }

    /// `merged_at` is set if and only if the status is MERGED
    pub fn has_consistent_merge_state(&self) -> bool {
        self.is_merged() == self.merged_at.is_some()
    }

    /// Moves the pull request to MERGED, stamping `merged_at`
    ///
    /// Returns false (and changes nothing) if it was already merged.
    pub fn mark_merged(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(PrStatus::Merged) {
            return false;
        }
        self.status = PrStatus::Merged;
        self.merged_at = Some(at);
        true
    }

    /// Replaces the first occurrence of `old` with `new`, keeping order
    ///
    /// Returns false if `old` is not assigned.
    pub fn replace_reviewer(&mut self, old: &str, new: impl Into<String>) -> bool {
        match self.assigned_reviewers.iter().position(|id| id == old) {
            Some(slot) => {
                self.assigned_reviewers[slot] = new.into();
                true
            }
            None => false,
        }
    }

    /// Inserts a new pull request
    ///
    /// # Errors
    ///
    /// Returns a database error carrying a unique-violation code when the
    /// ID is already taken.
    pub async fn insert(pool: &PgPool, pr: &PullRequest) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO pull_requests
                (pull_request_id, pull_request_name, author_id, status,
                 assigned_reviewers, created_at, merged_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.pull_request_name)
        .bind(&pr.author_id)
        .bind(pr.status)
        .bind(&pr.assigned_reviewers)
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .bind(pr.version)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Finds a pull request by ID
    pub async fn find_by_id(
        pool: &PgPool,
        pull_request_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let pr = sqlx::query_as::<_, PullRequest>(
            r#"
            SELECT pull_request_id, pull_request_name, author_id, status,
                   assigned_reviewers, created_at, merged_at, version
            FROM pull_requests
            WHERE pull_request_id = $1
            "#,
        )
        .bind(pull_request_id)
        .fetch_optional(pool)
        .await?;

        Ok(pr)
    }

    /// Checks whether a pull request ID is taken
    pub async fn exists(pool: &PgPool, pull_request_id: &str) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pull_requests WHERE pull_request_id = $1)",
        )
        .bind(pull_request_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Writes the mutable fields if the stored version still equals `pr.version`
    ///
    /// # Returns
    ///
    /// The new version on success, `None` if no row matched the ID and version
    pub async fn update_if_version(
        pool: &PgPool,
        pr: &PullRequest,
    ) -> Result<Option<i64>, sqlx::Error> {
        let version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE pull_requests
            SET pull_request_name = $3,
                author_id = $4,
                status = $5,
                assigned_reviewers = $6,
                merged_at = $7,
                version = version + 1
            WHERE pull_request_id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(pr.version)
        .bind(&pr.pull_request_name)
        .bind(&pr.author_id)
        .bind(pr.status)
        .bind(&pr.assigned_reviewers)
        .bind(pr.merged_at)
        .fetch_optional(pool)
        .await?;

        Ok(version)
    }

    /// Lists pull requests (any status) where `user_id` is a reviewer
    pub async fn list_by_reviewer(pool: &PgPool, user_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        let prs = sqlx::query_as::<_, PullRequest>(
            r#"
            SELECT pull_request_id, pull_request_name, author_id, status,
                   assigned_reviewers, created_at, merged_at, version
            FROM pull_requests
            WHERE $1 = ANY(assigned_reviewers)
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(prs)
    }

    /// Lists every OPEN pull request
    ///
    /// There is no team column on pull requests, so callers must cross-check
    /// authorship against a roster themselves.
    pub async fn list_open(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let prs = sqlx::query_as::<_, PullRequest>(
            r#"
            SELECT pull_request_id, pull_request_name, author_id, status,
                   assigned_reviewers, created_at, merged_at, version
            FROM pull_requests
            WHERE status = 'OPEN'
            ORDER BY created_at
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(prs)
    }
}
