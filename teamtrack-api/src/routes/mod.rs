/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `profile`: The caller's own account and statistics
/// - `projects`: Projects and their members
/// - `tasks`: Tasks within projects
/// - `users`: Company directory
///
/// `views` holds the JSON shapes shared between them.

pub mod auth;
pub mod health;
pub mod profile;
pub mod projects;
pub mod tasks;
pub mod users;
pub mod views;
