/// PostgreSQL store backed by a sqlx pool
///
/// Queries live on the model types; this module maps scopes and grants onto
/// them and translates constraint violations into [`StoreError`] variants.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{update_project_filter, Store, StoreError};
use crate::auth::access::{
    MemberGrant, NewProject, NewTask, Principal, ProjectScope, TaskScope, TaskUpdate, UserScope,
};
use crate::db::pool::health_check;
use crate::models::company::Company;
use crate::models::project::Project;
use crate::models::task::{InsertTask, Task, TaskColumns, TaskStats};
use crate::models::user::{normalize_email, CreateUser, UpdateUser, User};

/// Unique constraint on `users.email`
const USERS_EMAIL_KEY: &str = "users_email_key";

/// [`Store`] over PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a duplicate email to `StoreError::Duplicate`
fn user_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.constraint() == Some(USERS_EMAIL_KEY) {
            return StoreError::Duplicate { field: "email" };
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl Store for PgStore {
    async fn find_or_create_company(&self, name: &str) -> Result<Company, StoreError> {
        Ok(Company::find_or_create(&self.pool, name).await?)
    }

    async fn find_company(&self, id: Uuid) -> Result<Option<Company>, StoreError> {
        Ok(Company::find_by_id(&self.pool, id).await?)
    }

    async fn create_user(&self, mut data: CreateUser) -> Result<User, StoreError> {
        data.email = normalize_email(&data.email);
        User::create(&self.pool, data).await.map_err(user_write_error)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, &normalize_email(email)).await?)
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        Ok(User::find_by_ids(&self.pool, ids).await?)
    }

    async fn update_user(
        &self,
        principal: &Principal,
        mut changes: UpdateUser,
    ) -> Result<Option<User>, StoreError> {
        changes.email = changes.email.as_deref().map(normalize_email);
        User::update(&self.pool, principal.user_id(), changes)
            .await
            .map_err(user_write_error)
    }

    async fn list_users(&self, scope: &UserScope) -> Result<Vec<User>, StoreError> {
        Ok(User::list_by_company(&self.pool, scope.company_id).await?)
    }

    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        Ok(Project::create(
            &self.pool,
            &project.name,
            project.description.as_deref(),
            project.owner_id,
            project.company_id,
        )
        .await?)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn list_projects(&self, scope: &ProjectScope) -> Result<Vec<Project>, StoreError> {
        Ok(Project::list_visible_to(&self.pool, scope.user_id).await?)
    }

    async fn count_projects(&self, scope: &ProjectScope) -> Result<i64, StoreError> {
        Ok(Project::count_visible_to(&self.pool, scope.user_id).await?)
    }

    async fn add_member(&self, grant: &MemberGrant) -> Result<Option<Project>, StoreError> {
        Ok(Project::add_member(&self.pool, grant.project_id, grant.user_id).await?)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let draft = &task.draft;
        let insert = InsertTask {
            title: &draft.title,
            description: draft.description.as_deref(),
            project_id: task.project_id,
            assigned_to_id: task.assignee.as_ref().map(|grant| grant.assignee_id),
            status: draft.status,
            priority: draft.priority,
            deadline: draft.deadline,
        };

        Task::create(&self.pool, insert).await.map_err(|e| match &e {
            // Project deleted between the access check and the insert
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::Missing("Project")
            }
            _ => StoreError::Database(e),
        })
    }

    async fn find_task(&self, scope: &TaskScope, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_visible(&self.pool, scope.user_id, id, scope.project_id).await?)
    }

    async fn list_tasks(&self, scope: &TaskScope) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_visible(&self.pool, scope.user_id, scope.project_id).await?)
    }

    async fn update_task(
        &self,
        scope: &TaskScope,
        id: Uuid,
        update: TaskUpdate,
    ) -> Result<Option<Task>, StoreError> {
        let Ok(project_id) = update_project_filter(scope, &update) else {
            return Ok(None);
        };

        let assigned_to_id = update.assigned_to();
        let changes = update.changes;
        let columns = TaskColumns {
            title: changes.title,
            description: changes.description,
            status: changes.status,
            priority: changes.priority,
            deadline: changes.deadline,
            assigned_to_id,
        };

        Ok(Task::update_visible(&self.pool, scope.user_id, id, project_id, columns).await?)
    }

    async fn delete_task(&self, scope: &TaskScope, id: Uuid) -> Result<bool, StoreError> {
        Ok(Task::delete_visible(&self.pool, scope.user_id, id, scope.project_id).await?)
    }

    async fn task_stats(&self, principal: &Principal) -> Result<TaskStats, StoreError> {
        Ok(Task::stats_for_assignee(&self.pool, principal.user_id()).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(health_check(&self.pool).await?)
    }
}
