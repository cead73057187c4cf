/// Team rebalancer.
///
/// Regenerates the reviewer list of every open pull request that is internal
/// to a team (author and at least one reviewer are current members). The
/// sweep is best effort: a bad record is recorded in the report and the
/// sweep moves on. Only a failed roster load or cancellation fails the call.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use super::engine::AssignmentEngine;
use super::error::{DomainError, DomainResult, StoreResultExt};
use super::selector::{self, MAX_REVIEWERS};
use crate::models::PullRequest;
use crate::storage::StoreError;

/// Outcome of one rebalance sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebalanceReport {
    pub team_name: String,

    /// Pull requests whose reviewer list was rewritten
    pub reassigned: Vec<RebalancedPr>,

    /// Pull requests left untouched, with the reason
    pub skipped: Vec<SkippedPr>,

    /// Members whose review list could not be loaded
    pub failed_lookups: Vec<FailedLookup>,
}

impl RebalanceReport {
    fn new(team_name: &str) -> Self {
        Self {
            team_name: team_name.to_string(),
            ..Self::default()
        }
    }

    /// True when every reachable pull request was processed
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed_lookups.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebalancedPr {
    pub pull_request_id: String,
    pub previous_reviewers: Vec<String>,
    pub assigned_reviewers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPr {
    pub pull_request_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLookup {
    pub user_id: String,
    pub reason: SkipReason,
}

/// Why a pull request or member was not processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The author record is gone
    AuthorNotFound { author_id: String },

    /// The pull request changed between read and write
    ConcurrentUpdate,

    /// A storage call exceeded its deadline
    Timeout,

    /// Any other storage failure
    Storage { message: String },
}

impl SkipReason {
    /// Classifies a per-item failure; cancellation is not skippable
    fn from_error(err: DomainError) -> DomainResult<Self> {
        match err {
            DomainError::Cancelled => Err(DomainError::Cancelled),
            DomainError::UserNotFound(author_id) => Ok(SkipReason::AuthorNotFound { author_id }),
            DomainError::ConcurrentUpdate(_) => Ok(SkipReason::ConcurrentUpdate),
            DomainError::Timeout(_) => Ok(SkipReason::Timeout),
            other => Ok(SkipReason::Storage {
                message: other.to_string(),
            }),
        }
    }
}

impl AssignmentEngine {
    /// Rebuilds reviewer lists for all open pull requests internal to a team
    ///
    /// For each qualifying pull request the new list holds up to two active
    /// members, excluding the author and everyone currently assigned, and
    /// replaces the old list entirely.
    ///
    /// # Errors
    ///
    /// - `TeamNotFound` if the team does not exist
    /// - `Cancelled` if the sweep was cancelled part way
    /// - storage errors from the initial roster load
    pub async fn reassign_open_prs_for_team(&self, team_name: &str) -> DomainResult<RebalanceReport> {
        let exists = self
            .guard
            .run(self.stores.teams.exists(team_name))
            .await
            .context("check team existence", team_name)?;
        if !exists {
            return Err(DomainError::TeamNotFound(team_name.to_string()));
        }

        let members = self
            .guard
            .run(self.stores.users.get_by_team(team_name))
            .await
            .context("load team members", team_name)?;
        let member_ids: HashSet<&str> = members.iter().map(|u| u.user_id.as_str()).collect();

        let mut report = RebalanceReport::new(team_name);
        let mut seen = HashSet::new();
        let mut queue = Vec::new();

        for member in &members {
            let prs = match self
                .guard
                .run(self.stores.pull_requests.get_by_reviewer(&member.user_id))
                .await
            {
                Ok(prs) => prs,
                Err(StoreError::Cancelled) => return Err(DomainError::Cancelled),
                Err(e) => {
                    let err = DomainError::storage("list pull requests by reviewer", &member.user_id, e);
                    warn!(team_name, user_id = %member.user_id, error = %err, "Skipping member during rebalance");
                    report.failed_lookups.push(FailedLookup {
                        user_id: member.user_id.clone(),
                        reason: SkipReason::from_error(err)?,
                    });
                    continue;
                }
            };

            for pr in prs {
                if pr.is_open()
                    && member_ids.contains(pr.author_id.as_str())
                    && seen.insert(pr.pull_request_id.clone())
                {
                    queue.push(pr);
                }
            }
        }

        for pr in queue {
            let pull_request_id = pr.pull_request_id.clone();
            match self.rebalance_one(pr).await {
                Ok(entry) => report.reassigned.push(entry),
                Err(err) => {
                    let reason = SkipReason::from_error(err)?;
                    warn!(team_name, pr_id = %pull_request_id, ?reason, "Skipping pull request during rebalance");
                    report.skipped.push(SkippedPr {
                        pull_request_id,
                        reason,
                    });
                }
            }
        }

        info!(
            team_name,
            reassigned = report.reassigned.len(),
            skipped = report.skipped.len(),
            failed_lookups = report.failed_lookups.len(),
            "Rebalance finished"
        );
        Ok(report)
    }

    async fn rebalance_one(&self, mut pr: PullRequest) -> DomainResult<RebalancedPr> {
        let author = self.load_user(&pr.author_id).await?;

        let roster = self
            .guard
            .run(self.stores.users.get_active_by_team(&author.team_name))
            .await
            .context("load active team members", &author.team_name)?;

        let mut excluded = vec![author.user_id.as_str()];
        excluded.extend(pr.assigned_reviewers.iter().map(String::as_str));
        let candidates = selector::eligible_candidates(&roster, &author.team_name, &excluded);
        let reviewers = self.pick_reviewers(&candidates, MAX_REVIEWERS);

        let previous_reviewers = std::mem::replace(&mut pr.assigned_reviewers, reviewers);

        let result = self.guard.run(self.stores.pull_requests.update(&pr)).await;
        let stored = match result {
            Ok(stored) => stored,
            Err(StoreError::VersionConflict { .. }) => {
                return Err(DomainError::ConcurrentUpdate(pr.pull_request_id))
            }
            Err(e) => return Err(DomainError::storage("rebalance pull request", &pr.pull_request_id, e)),
        };

        Ok(RebalancedPr {
            pull_request_id: stored.pull_request_id,
            previous_reviewers,
            assigned_reviewers: stored.assigned_reviewers,
        })
    }
}
