//! Shared fixtures for service-level tests
//!
//! Everything runs against `InMemoryStore` with a seeded random source.
//! Pull request and team storage are wrapped in [`FaultyPullRequests`] and
//! [`FaultyTeams`] so tests can inject version conflicts and storage failures.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reviewrota_shared::assignment::{AssignmentEngine, StatsAggregator};
use reviewrota_shared::models::{PullRequest, Team, TeamMember};
use reviewrota_shared::roster::TeamService;
use reviewrota_shared::storage::{
    CallGuard, InMemoryStore, PullRequestStore, StoreError, StoreResult, Stores, TeamStore,
    UserStore,
};
use tokio_util::sync::CancellationToken;

/// Pull request store that can be told to misbehave
#[derive(Default)]
pub struct FaultyPullRequests {
    inner: Arc<InMemoryStore>,
    conflicts_remaining: AtomicU32,
    failing_reviewers: Mutex<HashSet<String>>,
    failing_updates: Mutex<HashSet<String>>,
    update_calls: AtomicUsize,
    hide_existing: AtomicBool,
    relocate_on_lookup: Mutex<Option<(String, String)>>,
}

impl FaultyPullRequests {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// The next `n` updates fail with a version conflict
    pub fn inject_conflicts(&self, n: u32) {
        self.conflicts_remaining.store(n, Ordering::SeqCst);
    }

    /// `get_by_reviewer(user_id)` fails with a database error
    pub fn fail_reviewer_lookup(&self, user_id: &str) {
        self.failing_reviewers
            .lock()
            .unwrap()
            .insert(user_id.to_string());
    }

    /// `update` of this pull request fails with a database error
    pub fn fail_update(&self, pull_request_id: &str) {
        self.failing_updates
            .lock()
            .unwrap()
            .insert(pull_request_id.to_string());
    }

    /// `exists` answers false, as if a concurrent insert had not landed yet
    pub fn hide_existing(&self) {
        self.hide_existing.store(true, Ordering::SeqCst);
    }

    /// The first `get_by_reviewer` call moves `user_id` into `team_name`
    pub fn relocate_on_lookup(&self, user_id: &str, team_name: &str) {
        *self.relocate_on_lookup.lock().unwrap() =
            Some((user_id.to_string(), team_name.to_string()));
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PullRequestStore for FaultyPullRequests {
    async fn create(&self, pr: &PullRequest) -> StoreResult<()> {
        PullRequestStore::create(self.inner.as_ref(), pr).await
    }

    async fn get_by_id(&self, pull_request_id: &str) -> StoreResult<Option<PullRequest>> {
        PullRequestStore::get_by_id(self.inner.as_ref(), pull_request_id).await
    }

    async fn update(&self, pr: &PullRequest) -> StoreResult<PullRequest> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_updates.lock().unwrap().contains(&pr.pull_request_id) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let remaining = self.conflicts_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::VersionConflict {
                expected: pr.version,
            });
        }

        self.inner.update(pr).await
    }

    async fn exists(&self, pull_request_id: &str) -> StoreResult<bool> {
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(false);
        }
        PullRequestStore::exists(self.inner.as_ref(), pull_request_id).await
    }

    async fn get_by_reviewer(&self, user_id: &str) -> StoreResult<Vec<PullRequest>> {
        if self.failing_reviewers.lock().unwrap().contains(user_id) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let relocation = self.relocate_on_lookup.lock().unwrap().take();
        if let Some((moved_id, team_name)) = relocation {
            if let Some(mut user) = UserStore::get_by_id(self.inner.as_ref(), &moved_id).await? {
                user.team_name = team_name;
                self.inner.create_or_update(&user).await?;
            }
        }

        self.inner.get_by_reviewer(user_id).await
    }

    async fn get_open_by_team(&self, team_name: &str) -> StoreResult<Vec<PullRequest>> {
        self.inner.get_open_by_team(team_name).await
    }
}

/// Team store whose existence check can be told to miss
#[derive(Default)]
pub struct FaultyTeams {
    inner: Arc<InMemoryStore>,
    hide_existing: AtomicBool,
}

impl FaultyTeams {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// `exists` answers false, as if a concurrent insert had not landed yet
    pub fn hide_existing(&self) {
        self.hide_existing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TeamStore for FaultyTeams {
    async fn create(&self, team: &Team) -> StoreResult<()> {
        TeamStore::create(self.inner.as_ref(), team).await
    }

    async fn get_by_name(&self, team_name: &str) -> StoreResult<Option<Team>> {
        self.inner.get_by_name(team_name).await
    }

    async fn exists(&self, team_name: &str) -> StoreResult<bool> {
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(false);
        }
        TeamStore::exists(self.inner.as_ref(), team_name).await
    }
}

pub struct Fixture {
    pub memory: Arc<InMemoryStore>,
    pub pull_requests: Arc<FaultyPullRequests>,
    pub team_store: Arc<FaultyTeams>,
    pub cancel: CancellationToken,
    pub engine: AssignmentEngine,
    pub teams: TeamService,
    pub stats: StatsAggregator,
}

impl Fixture {
    pub fn new(seed: u64) -> Self {
        let memory = Arc::new(InMemoryStore::new());
        let pull_requests = Arc::new(FaultyPullRequests::new(memory.clone()));
        let team_store = Arc::new(FaultyTeams::new(memory.clone()));
        let stores = Stores {
            pull_requests: pull_requests.clone(),
            users: memory.clone(),
            teams: team_store.clone(),
        };

        let cancel = CancellationToken::new();
        let guard = CallGuard::new(Duration::from_secs(5), cancel.clone());

        Self {
            engine: AssignmentEngine::new(stores.clone(), guard.clone())
                .with_rng(StdRng::seed_from_u64(seed)),
            teams: TeamService::new(stores.clone(), guard.clone()),
            stats: StatsAggregator::new(stores, guard),
            memory,
            pull_requests,
            team_store,
            cancel,
        }
    }

    /// Creates a team from `(user_id, is_active)` pairs
    pub async fn team(&self, team_name: &str, members: &[(&str, bool)]) {
        let members = members
            .iter()
            .map(|(id, active)| TeamMember {
                user_id: id.to_string(),
                username: format!("User {id}"),
                is_active: *active,
            })
            .collect();

        self.teams
            .create_team(&Team::new(team_name, members))
            .await
            .unwrap();
    }

    /// Stores a pull request with a fixed reviewer list, bypassing selection
    pub async fn seed_pr(&self, id: &str, author: &str, reviewers: &[&str]) -> PullRequest {
        let pr = PullRequest::open(
            id,
            format!("PR {id}"),
            author,
            reviewers.iter().map(|r| r.to_string()).collect(),
            Utc::now(),
        );
        PullRequestStore::create(self.memory.as_ref(), &pr)
            .await
            .unwrap();
        pr
    }

    pub async fn stored_pr(&self, id: &str) -> PullRequest {
        PullRequestStore::get_by_id(self.memory.as_ref(), id)
            .await
            .unwrap()
            .unwrap()
    }
}
