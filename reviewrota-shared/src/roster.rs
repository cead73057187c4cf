/// Team and user management
///
/// Teams carry a snapshot of their members; the `users` records are the
/// source of truth for team membership and activity. Creating a team
/// writes both, and reading a team refreshes the snapshot from the users.
///
/// # Example
///
/// ```no_run
/// use reviewrota_shared::models::{Team, TeamMember};
/// use reviewrota_shared::roster::TeamService;
/// use reviewrota_shared::storage::{CallGuard, InMemoryStore, Stores};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stores = Stores::in_memory(Arc::new(InMemoryStore::new()));
/// let teams = TeamService::new(stores, CallGuard::default());
///
/// let team = Team::new(
///     "backend",
///     vec![TeamMember {
///         user_id: "u1".to_string(),
///         username: "Alice".to_string(),
///         is_active: true,
///     }],
/// );
/// teams.create_team(&team).await?;
/// teams.set_is_active("u1", false).await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use tracing::info;

use crate::assignment::error::StoreResultExt;
use crate::assignment::{DomainError, DomainResult};
use crate::models::{Team, TeamMember, User};
use crate::storage::{CallGuard, StoreError, Stores};

/// Team/user management service
#[derive(Clone)]
pub struct TeamService {
    stores: Stores,
    guard: CallGuard,
}

impl TeamService {
    pub fn new(stores: Stores, guard: CallGuard) -> Self {
        Self { stores, guard }
    }

    /// Creates a team and upserts every member as a user of that team
    ///
    /// A member that already exists elsewhere is moved to this team.
    ///
    /// # Errors
    ///
    /// - `TeamExists` if the name is taken (including a concurrent insert)
    pub async fn create_team(&self, team: &Team) -> DomainResult<()> {
        let exists = self
            .guard
            .run(self.stores.teams.exists(&team.team_name))
            .await
            .context("check team existence", &team.team_name)?;
        if exists {
            return Err(DomainError::TeamExists(team.team_name.clone()));
        }

        match self.guard.run(self.stores.teams.create(team)).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => return Err(DomainError::TeamExists(team.team_name.clone())),
            Err(e) => return Err(DomainError::storage("create team", &team.team_name, e)),
        }

        for member in &team.members {
            let user = member.to_user(&team.team_name);
            self.guard
                .run(self.stores.users.create_or_update(&user))
                .await
                .context("upsert team member", &member.user_id)?;
        }

        info!(team_name = %team.team_name, members = team.members.len(), "Team created");
        Ok(())
    }

    /// Gets a team with member names and activity refreshed from user records
    ///
    /// Members without a user record in this team keep their snapshot.
    ///
    /// # Errors
    ///
    /// - `TeamNotFound` if the team does not exist
    pub async fn get_team(&self, team_name: &str) -> DomainResult<Team> {
        let mut team = self
            .guard
            .run(self.stores.teams.get_by_name(team_name))
            .await
            .context("load team", team_name)?
            .ok_or_else(|| DomainError::TeamNotFound(team_name.to_string()))?;

        let users = self
            .guard
            .run(self.stores.users.get_by_team(team_name))
            .await
            .context("load team members", team_name)?;

        team.members = reconcile_members(team.members, &users);
        Ok(team)
    }

    /// Sets a user's activity flag and returns the updated user
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user is unknown
    pub async fn set_is_active(&self, user_id: &str, is_active: bool) -> DomainResult<User> {
        let mut user = self.get_user(user_id).await?;

        let updated = self
            .guard
            .run(self.stores.users.update_is_active(user_id, is_active))
            .await
            .context("update user activity", user_id)?;
        if !updated {
            // removed between the read and the write
            return Err(DomainError::UserNotFound(user_id.to_string()));
        }

        user.is_active = is_active;
        info!(user_id, is_active, "User activity updated");
        Ok(user)
    }

    /// Gets a user by ID
    pub async fn get_user(&self, user_id: &str) -> DomainResult<User> {
        self.guard
            .run(self.stores.users.get_by_id(user_id))
            .await
            .context("load user", user_id)?
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))
    }
}

/// Overlays canonical user data on a member snapshot, keeping member order
fn reconcile_members(members: Vec<TeamMember>, users: &[User]) -> Vec<TeamMember> {
    let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.user_id.as_str(), u)).collect();

    members
        .into_iter()
        .map(|member| match by_id.get(member.user_id.as_str()) {
            Some(user) => TeamMember::from_user(user),
            None => member,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, name: &str, active: bool) -> TeamMember {
        TeamMember {
            user_id: id.to_string(),
            username: name.to_string(),
            is_active: active,
        }
    }

    #[test]
    fn test_reconcile_prefers_user_records() {
        let members = vec![member("u1", "Old", true), member("u2", "Gone", true)];
        let users = vec![User::new("u1", "New", "core", false)];

        let merged = reconcile_members(members, &users);
        assert_eq!(merged[0], member("u1", "New", false));
        // no canonical record, snapshot kept
        assert_eq!(merged[1], member("u2", "Gone", true));
    }
}
