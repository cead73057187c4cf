/// Entity models for reviewer assignment
///
/// Plain data plus validation predicates, and the PostgreSQL queries for
/// each table. Business rules live in `crate::assignment`.
///
/// # Models
///
/// - `user`: canonical user records with the authoritative activity flag
/// - `team`: teams and their member snapshot
/// - `pull_request`: pull requests, their status machine and reviewers
///
/// # Example
///
/// ```
/// use reviewrota_shared::models::pull_request::{PullRequest, PrStatus};
///
/// let pr = PullRequest::open("pr-1", "Add search", "alice", vec![], chrono::Utc::now());
/// assert_eq!(pr.status, PrStatus::Open);
/// assert!(pr.has_consistent_merge_state());
/// ```

pub mod pull_request;
pub mod team;
pub mod user;

pub use pull_request::{PrStatus, PullRequest, PullRequestShort};
pub use team::{Team, TeamMember};
pub use user::User;
