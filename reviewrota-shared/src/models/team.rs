/// Team model and database operations
///
/// A team is identified by its unique name and carries an ordered member
/// list. The member list is a snapshot taken at creation time: activity
/// flags and usernames may go stale, and readers that care about the
/// current state reconcile it against the `users` table.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     team_name VARCHAR(255) PRIMARY KEY,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE team_members (
///     team_name VARCHAR(255) NOT NULL REFERENCES teams(team_name) ON DELETE CASCADE,
///     position INTEGER NOT NULL,
///     user_id VARCHAR(255) NOT NULL,
///     username VARCHAR(255) NOT NULL,
///     is_active BOOLEAN NOT NULL,
///     PRIMARY KEY (team_name, user_id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::user::User;

/// Member entry stored with a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

impl TeamMember {
    /// Turns the snapshot into a user record affiliated with `team_name`
    pub fn to_user(&self, team_name: &str) -> User {
        User::new(&self.user_id, &self.username, team_name, self.is_active)
    }

    /// Snapshot of a canonical user record
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            is_active: user.is_active,
        }
    }
}

/// Team with its member snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team name
    pub team_name: String,

    /// Members in the order they were supplied
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

impl Team {
    pub fn new(team_name: impl Into<String>, members: Vec<TeamMember>) -> Self {
        Self {
            team_name: team_name.into(),
            members,
        }
    }

    /// Inserts the team and its member snapshot in one transaction
    ///
    /// # Errors
    ///
    /// Returns a database error carrying a unique-violation code when the
    /// team name is already taken.
    pub async fn insert(pool: &PgPool, team: &Team) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("INSERT INTO teams (team_name) VALUES ($1)")
            .bind(&team.team_name)
            .execute(&mut *tx)
            .await?;

        for (position, member) in team.members.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO team_members (team_name, position, user_id, username, is_active)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (team_name, user_id) DO NOTHING
                "#,
            )
            .bind(&team.team_name)
            .bind(position as i32)
            .bind(&member.user_id)
            .bind(&member.username)
            .bind(member.is_active)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Finds a team and its members by name
    pub async fn find_by_name(pool: &PgPool, team_name: &str) -> Result<Option<Self>, sqlx::Error> {
        let exists = Self::exists(pool, team_name).await?;
        if !exists {
            return Ok(None);
        }

        let members = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT user_id, username, is_active
            FROM team_members
            WHERE team_name = $1
            ORDER BY position
            "#,
        )
        .bind(team_name)
        .fetch_all(pool)
        .await?;

        Ok(Some(Team::new(team_name, members)))
    }

    /// Checks whether a team name is taken
    pub async fn exists(pool: &PgPool, team_name: &str) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE team_name = $1)")
                .bind(team_name)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }
}
