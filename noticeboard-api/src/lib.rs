//! # Noticeboard API Server Library
//!
//! This library provides the core functionality for the Noticeboard API
//! server: the content API behind an institution's public website and its
//! admin dashboard.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder and auth layer
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers
//! - `upload`: Upload directory, file type checks, pagination helpers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod upload;
