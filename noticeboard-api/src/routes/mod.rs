/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Registration, login, profile, logout, user list
/// - `files`: PDF and image uploads grouped by category
/// - `gallery`: Gallery albums

pub mod files;
pub mod gallery;
pub mod health;
pub mod users;
