/// Reviewer assignment
///
/// Business rules for pull request review: who may review, how reviewers
/// are chosen, and how pull requests move through their lifecycle.
///
/// # Components
///
/// - `selector`: eligibility rules and random picks over a roster
/// - `engine`: create, merge, reassign, list by reviewer
/// - `rebalance`: best-effort sweep regenerating a team's open reviews
/// - `stats`: per-user review counts
/// - `error`: domain errors and their stable codes

pub mod engine;
pub mod error;
pub mod rebalance;
pub mod selector;
pub mod stats;

pub use engine::{AssignmentEngine, Reassignment, MAX_WRITE_ATTEMPTS};
pub use error::{DomainError, DomainResult, ErrorCode};
pub use rebalance::{FailedLookup, RebalanceReport, RebalancedPr, SkipReason, SkippedPr};
pub use selector::MAX_REVIEWERS;
pub use stats::{StatsAggregator, UserStats};
