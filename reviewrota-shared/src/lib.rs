//! # ReviewRota Shared Library
//!
//! Domain model, storage and business logic for assigning and rotating pull
//! request reviewers. The HTTP server in `reviewrota-api` is a thin layer
//! over the services exported here.
//!
//! ## Module Organization
//!
//! - `models`: Entity types and their PostgreSQL queries
//! - `storage`: Repository traits with PostgreSQL and in-memory backends
//! - `db`: Connection pool and migrations
//! - `assignment`: Reviewer selection, PR lifecycle, rebalancing, stats
//! - `roster`: Team and user management

pub mod assignment;
pub mod db;
pub mod models;
pub mod roster;
pub mod storage;

/// Current version of the ReviewRota shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
