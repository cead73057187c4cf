/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `team`: Team creation, lookup and rebalancing
/// - `users`: User activity and review lists
/// - `pull_requests`: Pull request lifecycle
/// - `stats`: Review statistics

pub mod health;
pub mod pull_requests;
pub mod stats;
pub mod team;
pub mod users;
