/// Assignment engine
///
/// Owns every pull request state transition: creation with initial
/// reviewers, merge, and single-slot reviewer reassignment. All state lives
/// in the stores; the only in-process state is the injected random source.
///
/// # Lifecycle rules
///
/// ```text
/// create_pr          → OPEN, 0..=2 reviewers, never the author
/// merge_pr           → MERGED (idempotent, first merged_at wins)
/// reassign_reviewer  → OPEN only, swaps one reviewer in place
/// ```
///
/// # Concurrency
///
/// Writes are conditioned on the pull request version that was read. When
/// a concurrent writer wins, the operation re-reads and re-evaluates from
/// scratch, up to [`MAX_WRITE_ATTEMPTS`] times.
///
/// # Example
///
/// ```no_run
/// use reviewrota_shared::assignment::AssignmentEngine;
/// use reviewrota_shared::storage::{CallGuard, InMemoryStore, Stores};
/// use rand::{rngs::StdRng, SeedableRng};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stores = Stores::in_memory(Arc::new(InMemoryStore::new()));
/// let engine = AssignmentEngine::new(stores, CallGuard::default())
///     .with_rng(StdRng::seed_from_u64(7));
///
/// let pr = engine.create_pr("pr-1", "Add search", "alice").await?;
/// let merged = engine.merge_pr(&pr.pull_request_id).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::{DomainError, DomainResult, StoreResultExt};
use super::selector::{self, MAX_REVIEWERS};
use crate::models::{PullRequest, User};
use crate::storage::{CallGuard, StoreError, Stores};

/// Attempts for a conditional write before giving up with `ConcurrentUpdate`
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Result of a successful reviewer swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    /// Pull request after the swap
    pub pull_request: PullRequest,

    /// ID of the reviewer who took the freed slot
    pub replaced_by: String,
}

/// Orchestrates pull request creation, merge and reviewer reassignment
pub struct AssignmentEngine {
    pub(crate) stores: Stores,
    pub(crate) guard: CallGuard,
    rng: Mutex<StdRng>,
}

impl AssignmentEngine {
    /// Creates an engine with an entropy-seeded random source
    pub fn new(stores: Stores, guard: CallGuard) -> Self {
        Self {
            stores,
            guard,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replaces the random source, e.g. with a seeded one for reproducibility
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Opens a pull request and assigns up to two reviewers from the author's team
    ///
    /// An empty reviewer list is a valid outcome (e.g. a one-person team).
    ///
    /// # Errors
    ///
    /// - `PrExists` if the ID is taken (including a concurrent insert)
    /// - `UserNotFound` if the author is unknown
    pub async fn create_pr(
        &self,
        pull_request_id: &str,
        pull_request_name: &str,
        author_id: &str,
    ) -> DomainResult<PullRequest> {
        let exists = self
            .guard
            .run(self.stores.pull_requests.exists(pull_request_id))
            .await
            .context("check pull request existence", pull_request_id)?;
        if exists {
            return Err(DomainError::PrExists(pull_request_id.to_string()));
        }

        let author = self.load_user(author_id).await?;
        let roster = self.load_active_roster(&author.team_name).await?;

        let candidates = selector::eligible_candidates(&roster, &author.team_name, &[author_id]);
        let reviewers = self.pick_reviewers(&candidates, MAX_REVIEWERS);

        let pr = PullRequest::open(
            pull_request_id,
            pull_request_name,
            author_id,
            reviewers,
            Utc::now(),
        );

        match self.guard.run(self.stores.pull_requests.create(&pr)).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => {
                return Err(DomainError::PrExists(pull_request_id.to_string()))
            }
            Err(e) => return Err(DomainError::storage("create pull request", pull_request_id, e)),
        }

        info!(
            pr_id = %pr.pull_request_id,
            author_id = %pr.author_id,
            reviewers = ?pr.assigned_reviewers,
            "Pull request created"
        );
        Ok(pr)
    }

    /// Merges a pull request
    ///
    /// Idempotent: merging an already merged pull request returns its stored
    /// state without writing, so `merged_at` keeps the first merge's time.
    ///
    /// # Errors
    ///
    /// - `PrNotFound` if the pull request does not exist
    pub async fn merge_pr(&self, pull_request_id: &str) -> DomainResult<PullRequest> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut pr = self.load_pr(pull_request_id).await?;

            if !pr.mark_merged(Utc::now()) {
                debug!(pr_id = pull_request_id, "Pull request already merged");
                return Ok(pr);
            }

            match self.guard.run(self.stores.pull_requests.update(&pr)).await {
                Ok(stored) => {
                    info!(pr_id = pull_request_id, "Pull request merged");
                    return Ok(stored);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    warn!(pr_id = pull_request_id, attempt, "Merge lost a concurrent write, retrying");
                }
                Err(e) => return Err(DomainError::storage("merge pull request", pull_request_id, e)),
            }
        }

        Err(DomainError::ConcurrentUpdate(pull_request_id.to_string()))
    }

    /// Replaces one reviewer with a random eligible member of their team
    ///
    /// The replacement takes the slot of the first occurrence of
    /// `old_reviewer_id`; the rest of the list keeps its order.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// 1. `PrNotFound`
    /// 2. `PrMerged`
    /// 3. `NotAssigned`
    /// 4. `UserNotFound` for the old reviewer
    ///
    /// then `NoCandidate` if nobody is eligible.
    pub async fn reassign_reviewer(
        &self,
        pull_request_id: &str,
        old_reviewer_id: &str,
    ) -> DomainResult<Reassignment> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut pr = self.load_pr(pull_request_id).await?;

            if pr.is_merged() {
                return Err(DomainError::PrMerged(pull_request_id.to_string()));
            }
            if !pr.is_reviewer(old_reviewer_id) {
                return Err(DomainError::NotAssigned {
                    pull_request_id: pull_request_id.to_string(),
                    user_id: old_reviewer_id.to_string(),
                });
            }

            let old_reviewer = self.load_user(old_reviewer_id).await?;
            let roster = self.load_active_roster(&old_reviewer.team_name).await?;

            let mut excluded = vec![pr.author_id.as_str(), old_reviewer_id];
            excluded.extend(pr.assigned_reviewers.iter().map(String::as_str));
            let candidates =
                selector::eligible_candidates(&roster, &old_reviewer.team_name, &excluded);

            let Some(replacement) = self.pick_one(&candidates) else {
                return Err(DomainError::NoCandidate(pull_request_id.to_string()));
            };

            pr.replace_reviewer(old_reviewer_id, replacement.clone());

            match self.guard.run(self.stores.pull_requests.update(&pr)).await {
                Ok(stored) => {
                    info!(
                        pr_id = pull_request_id,
                        old_reviewer_id,
                        new_reviewer_id = %replacement,
                        "Reviewer reassigned"
                    );
                    return Ok(Reassignment {
                        pull_request: stored,
                        replaced_by: replacement,
                    });
                }
                Err(StoreError::VersionConflict { .. }) => {
                    warn!(
                        pr_id = pull_request_id,
                        attempt, "Reassignment lost a concurrent write, retrying"
                    );
                }
                Err(e) => {
                    return Err(DomainError::storage("reassign reviewer", pull_request_id, e))
                }
            }
        }

        Err(DomainError::ConcurrentUpdate(pull_request_id.to_string()))
    }

    /// Lists every pull request (any status) where `user_id` is a reviewer
    ///
    /// Order is whatever the store returns.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user is unknown
    pub async fn get_prs_by_reviewer(&self, user_id: &str) -> DomainResult<Vec<PullRequest>> {
        self.load_user(user_id).await?;

        self.guard
            .run(self.stores.pull_requests.get_by_reviewer(user_id))
            .await
            .context("list pull requests by reviewer", user_id)
    }

    pub(crate) async fn load_pr(&self, pull_request_id: &str) -> DomainResult<PullRequest> {
        self.guard
            .run(self.stores.pull_requests.get_by_id(pull_request_id))
            .await
            .context("load pull request", pull_request_id)?
            .ok_or_else(|| DomainError::PrNotFound(pull_request_id.to_string()))
    }

    pub(crate) async fn load_user(&self, user_id: &str) -> DomainResult<User> {
        self.guard
            .run(self.stores.users.get_by_id(user_id))
            .await
            .context("load user", user_id)?
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))
    }

    async fn load_active_roster(&self, team_name: &str) -> DomainResult<Vec<User>> {
        self.guard
            .run(self.stores.users.get_active_by_team(team_name))
            .await
            .context("load active team members", team_name)
    }

    pub(crate) fn pick_reviewers(&self, candidates: &[&User], max_count: usize) -> Vec<String> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        selector::select_reviewers(&mut *rng, candidates, max_count)
    }

    fn pick_one(&self, candidates: &[&User]) -> Option<String> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        selector::select_one(&mut *rng, candidates).map(|u| u.user_id.clone())
    }
}
