/// Response shapes
///
/// Projects are returned with `owner` and `members` populated as
/// `{id, name, email}`; tasks with `assignedTo` populated the same way and
/// `project` as `{id, name}`. Password hashes never appear.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use teamtrack_shared::models::project::{Project, ProjectStatus};
use teamtrack_shared::models::task::{Task, TaskPriority, TaskStatus};
use teamtrack_shared::models::user::User;
use teamtrack_shared::store::{Store, StoreError};
use uuid::Uuid;

/// User reference inside another resource
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Project reference inside a task
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner: Option<UserSummary>,
    pub company_id: Uuid,
    pub members: Vec<UserSummary>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub project: Option<ProjectSummary>,
    pub assigned_to: Option<UserSummary>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loads the given users, keyed by ID
async fn users_by_id(
    store: &dyn Store,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, UserSummary>, StoreError> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let users = store.find_users_by_ids(&ids).await?;
    Ok(users.iter().map(|u| (u.id, UserSummary::from(u))).collect())
}

/// Populates owners and members
pub async fn project_views(
    store: &dyn Store,
    projects: Vec<Project>,
) -> Result<Vec<ProjectView>, StoreError> {
    let users = users_by_id(
        store,
        projects
            .iter()
            .flat_map(|p| p.members.iter().copied().chain([p.owner_id])),
    )
    .await?;

    Ok(projects
        .into_iter()
        .map(|p| ProjectView {
            owner: users.get(&p.owner_id).cloned(),
            members: p
                .members
                .iter()
                .filter_map(|id| users.get(id).cloned())
                .collect(),
            id: p.id,
            name: p.name,
            description: p.description,
            company_id: p.company_id,
            status: p.status,
            created_at: p.created_at,
        })
        .collect())
}

pub async fn project_view(store: &dyn Store, project: Project) -> Result<ProjectView, StoreError> {
    let mut views = project_views(store, vec![project]).await?;
    views.pop().ok_or(StoreError::Missing("Project"))
}

/// Populates assignees, and project names from `projects`
pub async fn task_views(
    store: &dyn Store,
    tasks: Vec<Task>,
    projects: &[Project],
) -> Result<Vec<TaskView>, StoreError> {
    let users = users_by_id(store, tasks.iter().filter_map(|t| t.assigned_to_id)).await?;
    let names: HashMap<Uuid, &str> = projects.iter().map(|p| (p.id, p.name.as_str())).collect();

    Ok(tasks
        .into_iter()
        .map(|t| TaskView {
            project: names.get(&t.project_id).map(|name| ProjectSummary {
                id: t.project_id,
                name: name.to_string(),
            }),
            assigned_to: t.assigned_to_id.and_then(|id| users.get(&id).cloned()),
            id: t.id,
            title: t.title,
            description: t.description,
            status: t.status,
            priority: t.priority,
            deadline: t.deadline,
            created_at: t.created_at,
            updated_at: t.updated_at,
        })
        .collect())
}

pub async fn task_view(
    store: &dyn Store,
    task: Task,
    project: Option<&Project>,
) -> Result<TaskView, StoreError> {
    let projects: Vec<Project> = project.cloned().into_iter().collect();
    let mut views = task_views(store, vec![task], &projects).await?;
    views.pop().ok_or(StoreError::Missing("Task"))
}
