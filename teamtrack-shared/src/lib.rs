//! # TeamTrack Shared Library
//!
//! Domain types, persistence and access control for the TeamTrack API.
//!
//! ## Module Organization
//!
//! - `models`: companies, users, projects and tasks, with their SQL
//! - `store`: the `Store` trait and its PostgreSQL and in-memory backends
//! - `auth`: bearer tokens, password hashing and access decisions
//! - `db`: connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the TeamTrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
