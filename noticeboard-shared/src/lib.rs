//! # Noticeboard Shared Library
//!
//! This crate contains shared types, utilities, and data access used by the
//! Noticeboard API server.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, JWT tokens, logout blacklist, auth context
//! - `db`: Connection pool and migrations
//! - `models`: Database models and data structures
//! - `redis`: Redis client used by the token blacklist

pub mod auth;
pub mod db;
pub mod models;
pub mod redis;

/// Current version of the Noticeboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
