/// Candidate selection.
///
/// Pure functions over a roster. Randomness is always passed in so callers
/// (and tests) control the source; nothing here touches process-global
/// random state.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::User;

/// Reviewers picked when a pull request is opened or rebalanced
pub const MAX_REVIEWERS: usize = 2;

/// Applies the eligibility rules to a roster
///
/// Keeps users that are active, belong to `team_name`, and are not listed
/// in `excluded` (author, old reviewer, reviewers already on the PR).
/// Roster order is preserved.
pub fn eligible_candidates<'a, S>(roster: &'a [User], team_name: &str, excluded: &[S]) -> Vec<&'a User>
where
    S: AsRef<str>,
{
    roster
        .iter()
        .filter(|u| u.is_active && u.team_name == team_name)
        .filter(|u| !excluded.iter().any(|id| id.as_ref() == u.user_id))
        .collect()
}

/// Picks up to `max_count` distinct user IDs uniformly at random
///
/// An empty candidate list yields an empty selection.
pub fn select_reviewers<R: Rng + ?Sized>(
    rng: &mut R,
    candidates: &[&User],
    max_count: usize,
) -> Vec<String> {
    candidates
        .choose_multiple(rng, max_count.min(candidates.len()))
        .map(|u| u.user_id.clone())
        .collect()
}

/// Picks one candidate uniformly at random, `None` if there are none
pub fn select_one<'a, R: Rng + ?Sized>(rng: &mut R, candidates: &[&'a User]) -> Option<&'a User> {
    candidates.choose(rng).copied()
}
