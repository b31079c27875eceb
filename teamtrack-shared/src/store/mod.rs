/// Entity store
///
/// The [`Store`] trait is the only way the HTTP layer reads or writes tenant
/// data. Operations that list, change or delete tenant records take a scope
/// or grant from [`crate::auth::access`]; those types cannot be built outside
/// this crate, so every such call is preceded by an authorization decision.
///
/// Lookups by ID (`find_user`, `find_project`) are unscoped. They feed the
/// access layer, which decides what the caller may do with the result.
///
/// # Backends
///
/// - [`postgres::PgStore`]: PostgreSQL via sqlx
/// - [`memory::MemoryStore`]: in-process maps behind a `RwLock`, for tests
///   and local development
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use teamtrack_shared::store::{memory::MemoryStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let acme = store.find_or_create_company("Acme").await?;
/// assert_eq!(acme.name, "Acme");
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::access::{
    MemberGrant, NewProject, NewTask, Principal, ProjectScope, TaskScope, TaskUpdate, UserScope,
};
use crate::models::company::Company;
use crate::models::project::Project;
use crate::models::task::{Task, TaskStats};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field already holds this value
    #[error("Duplicate {field}")]
    Duplicate { field: &'static str },

    /// A record the operation depends on is missing
    #[error("{0} not found")]
    Missing(&'static str),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for companies, users, projects and tasks
#[async_trait]
pub trait Store: Send + Sync {
    /// Looks up a company by normalized name, creating it if absent
    async fn find_or_create_company(&self, name: &str) -> Result<Company, StoreError>;

    async fn find_company(&self, id: Uuid) -> Result<Option<Company>, StoreError>;

    /// Creates a user
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate { field: "email" }` if the email is taken.
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Loads users for display; unknown IDs are skipped
    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    /// Updates the principal's own name and/or email
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate { field: "email" }` if the new email is taken.
    async fn update_user(
        &self,
        principal: &Principal,
        changes: UpdateUser,
    ) -> Result<Option<User>, StoreError>;

    /// Users of the scope's company, ordered by name
    async fn list_users(&self, scope: &UserScope) -> Result<Vec<User>, StoreError>;

    /// Inserts a project together with its owner membership
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError>;

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    /// Projects in scope, newest first
    async fn list_projects(&self, scope: &ProjectScope) -> Result<Vec<Project>, StoreError>;

    async fn count_projects(&self, scope: &ProjectScope) -> Result<i64, StoreError>;

    /// Adds the granted member if absent and returns the project
    ///
    /// Returns `None` if the project no longer exists.
    async fn add_member(&self, grant: &MemberGrant) -> Result<Option<Project>, StoreError>;

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError>;

    async fn find_task(&self, scope: &TaskScope, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Tasks in scope, newest first
    async fn list_tasks(&self, scope: &TaskScope) -> Result<Vec<Task>, StoreError>;

    /// Applies `update` to a task in scope
    ///
    /// `updated_at` always ends up strictly greater than before. Returns
    /// `None` if the task is not in scope.
    async fn update_task(
        &self,
        scope: &TaskScope,
        id: Uuid,
        update: TaskUpdate,
    ) -> Result<Option<Task>, StoreError>;

    /// Deletes a task in scope; returns whether it existed
    async fn delete_task(&self, scope: &TaskScope, id: Uuid) -> Result<bool, StoreError>;

    /// Counts over tasks assigned to the principal
    async fn task_stats(&self, principal: &Principal) -> Result<TaskStats, StoreError>;

    /// Checks that the backend is reachable
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Resolves the project filter for a task update
///
/// The task must lie in the scope's project (if any) and in the project the
/// assignment grant was issued for (if any). `Err(())` means both are set and
/// disagree, so nothing can match.
pub(crate) fn update_project_filter(scope: &TaskScope, update: &TaskUpdate) -> Result<Option<Uuid>, ()> {
    match (scope.project_id, update.assigned_project()) {
        (Some(scoped), Some(granted)) if scoped != granted => Err(()),
        (scoped, granted) => Ok(granted.or(scoped)),
    }
}
