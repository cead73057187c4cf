/// User model and database operations
///
/// Users are created or refreshed (upsert by `user_id`) when a team is
/// created, and their `is_active` flag is toggled through the user API.
/// Users are never hard-deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     user_id VARCHAR(255) PRIMARY KEY,
///     username VARCHAR(255) NOT NULL,
///     team_name VARCHAR(255) NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use reviewrota_shared::models::user::User;
/// use reviewrota_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::new("u1", "Alice", "backend", true);
/// User::upsert(&pool, &user).await?;
///
/// let active = User::list_active_by_team(&pool, "backend").await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Canonical user record
///
/// `is_active` on this record is authoritative; the copy kept inside a
/// team's member list is only a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub user_id: String,

    /// Display name
    pub username: String,

    /// Team the user currently belongs to
    pub team_name: String,

    /// Whether the user may be picked as a reviewer
    pub is_active: bool,
}

impl User {
    /// Builds a user record
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        team_name: impl Into<String>,
        is_active: bool,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            team_name: team_name.into(),
            is_active,
        }
    }

    /// Inserts the user or overwrites the existing record with the same ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn upsert(pool: &PgPool, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, team_name, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET username = EXCLUDED.username,
                team_name = EXCLUDED.team_name,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.username)
        .bind(&user.team_name)
        .bind(user.is_active)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, user_id: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Lists active users of a team
    pub async fn list_active_by_team(
        pool: &PgPool,
        team_name: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE team_name = $1 AND is_active = TRUE
            ORDER BY user_id
            "#,
        )
        .bind(team_name)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Lists every user of a team regardless of activity
    pub async fn list_by_team(pool: &PgPool, team_name: &str) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE team_name = $1
            ORDER BY user_id
            "#,
        )
        .bind(team_name)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Sets the activity flag of a user
    ///
    /// # Returns
    ///
    /// True if a user was found and updated, false otherwise
    pub async fn update_is_active(
        pool: &PgPool,
        user_id: &str,
        is_active: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = $2, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(is_active)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
