/// Per-user review statistics.

use serde::{Deserialize, Serialize};

use super::error::{DomainError, DomainResult, StoreResultExt};
use crate::models::{PrStatus, PullRequest};
use crate::storage::{CallGuard, Stores};

/// Review load of a single user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,

    /// Pull requests of any status with this user as reviewer
    pub assigned_count: usize,

    pub open_pr_count: usize,
    pub merged_pr_count: usize,
}

impl UserStats {
    /// Buckets pull requests by status in a single pass
    pub fn tally<'a>(user_id: &str, prs: impl IntoIterator<Item = &'a PullRequest>) -> Self {
        let mut stats = Self {
            user_id: user_id.to_string(),
            ..Self::default()
        };

        for pr in prs {
            stats.assigned_count += 1;
            match pr.status {
                PrStatus::Open => stats.open_pr_count += 1,
                PrStatus::Merged => stats.merged_pr_count += 1,
            }
        }

        stats
    }
}

/// Read-only statistics over the pull request store
#[derive(Clone)]
pub struct StatsAggregator {
    stores: Stores,
    guard: CallGuard,
}

impl StatsAggregator {
    pub fn new(stores: Stores, guard: CallGuard) -> Self {
        Self { stores, guard }
    }

    /// Counts the reviews assigned to `user_id`
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user is unknown
    pub async fn get_user_stats(&self, user_id: &str) -> DomainResult<UserStats> {
        self.guard
            .run(self.stores.users.get_by_id(user_id))
            .await
            .context("load user", user_id)?
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))?;

        let prs = self
            .guard
            .run(self.stores.pull_requests.get_by_reviewer(user_id))
            .await
            .context("list pull requests by reviewer", user_id)?;

        Ok(UserStats::tally(user_id, &prs))
    }
}
