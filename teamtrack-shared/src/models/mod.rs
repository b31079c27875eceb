/// Database models for TeamTrack
///
/// Record types and their PostgreSQL operations.
///
/// # Models
///
/// - `company`: Tenants; looked up by normalized name at registration
/// - `user`: Accounts, each belonging to exactly one company
/// - `project`: Projects with an owner, a fixed company and a member set
/// - `task`: Tasks within a project, optionally assigned to a user
///
/// Handlers don't call these functions directly; they go through
/// [`crate::store::Store`] so that every tenant-scoped query carries an
/// authorization decision.

pub mod company;
pub mod project;
pub mod task;
pub mod user;
