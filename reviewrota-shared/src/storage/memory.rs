/// In-memory implementation of the storage contracts.
///
/// Holds every table behind a `tokio::sync::RwLock`. All state is lost on
/// restart. Pull requests keep insertion order so reviewer listings are
/// stable, and roster listings are sorted by user ID like the SQL backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PullRequestStore, StoreError, StoreResult, TeamStore, UserStore};
use crate::models::{PrStatus, PullRequest, Team, User};

/// In-memory store implementing all three repositories
#[derive(Debug, Default)]
pub struct InMemoryStore {
    pull_requests: RwLock<Vec<PullRequest>>,
    users: RwLock<HashMap<String, User>>,
    teams: RwLock<HashMap<String, Team>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut users: Vec<User>) -> Vec<User> {
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        users
    }
}

#[async_trait]
impl PullRequestStore for InMemoryStore {
    async fn create(&self, pr: &PullRequest) -> StoreResult<()> {
        let mut prs = self.pull_requests.write().await;
        if prs.iter().any(|p| p.pull_request_id == pr.pull_request_id) {
            return Err(StoreError::Duplicate);
        }
        prs.push(pr.clone());
        Ok(())
    }

    async fn get_by_id(&self, pull_request_id: &str) -> StoreResult<Option<PullRequest>> {
        let prs = self.pull_requests.read().await;
        Ok(prs
            .iter()
            .find(|p| p.pull_request_id == pull_request_id)
            .cloned())
    }

    async fn update(&self, pr: &PullRequest) -> StoreResult<PullRequest> {
        let mut prs = self.pull_requests.write().await;
        let Some(stored) = prs
            .iter_mut()
            .find(|p| p.pull_request_id == pr.pull_request_id)
        else {
            return Ok(pr.clone());
        };

        if stored.version != pr.version {
            return Err(StoreError::VersionConflict {
                expected: pr.version,
            });
        }

        *stored = PullRequest {
            version: pr.version + 1,
            // creation time is fixed at insert
            created_at: stored.created_at,
            ..pr.clone()
        };
        Ok(stored.clone())
    }

    async fn exists(&self, pull_request_id: &str) -> StoreResult<bool> {
        let prs = self.pull_requests.read().await;
        Ok(prs.iter().any(|p| p.pull_request_id == pull_request_id))
    }

    async fn get_by_reviewer(&self, user_id: &str) -> StoreResult<Vec<PullRequest>> {
        let prs = self.pull_requests.read().await;
        Ok(prs.iter().filter(|p| p.is_reviewer(user_id)).cloned().collect())
    }

    async fn get_open_by_team(&self, _team_name: &str) -> StoreResult<Vec<PullRequest>> {
        let prs = self.pull_requests.read().await;
        Ok(prs
            .iter()
            .filter(|p| p.status == PrStatus::Open)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_or_update(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_by_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn get_active_by_team(&self, team_name: &str) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(Self::sorted(
            users
                .values()
                .filter(|u| u.team_name == team_name && u.is_active)
                .cloned()
                .collect(),
        ))
    }

    async fn update_is_active(&self, user_id: &str, is_active: bool) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(user_id) {
            Some(user) => {
                user.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_by_team(&self, team_name: &str) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(Self::sorted(
            users
                .values()
                .filter(|u| u.team_name == team_name)
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait]
impl TeamStore for InMemoryStore {
    async fn create(&self, team: &Team) -> StoreResult<()> {
        let mut teams = self.teams.write().await;
        if teams.contains_key(&team.team_name) {
            return Err(StoreError::Duplicate);
        }
        teams.insert(team.team_name.clone(), team.clone());
        Ok(())
    }

    async fn get_by_name(&self, team_name: &str) -> StoreResult<Option<Team>> {
        let teams = self.teams.read().await;
        Ok(teams.get(team_name).cloned())
    }

    async fn exists(&self, team_name: &str) -> StoreResult<bool> {
        let teams = self.teams.read().await;
        Ok(teams.contains_key(team_name))
    }
}
