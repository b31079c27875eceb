/// Task endpoints
///
/// # Endpoints
///
/// - `GET /tasks?projectId=` - Tasks in projects visible to the caller
/// - `POST /tasks` - Create a task, optionally assigned
/// - `PATCH /tasks/:id` - Update supplied fields
/// - `DELETE /tasks/:id` - Delete a task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, InternalContext},
    extract::{present, ValidatedJson, ValidatedPath, ValidatedQuery},
    routes::views::{task_view, task_views, TaskView},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teamtrack_shared::{
    auth::{
        access::{
            authorize_project_read, authorize_task_assign, authorize_task_create,
            authorize_task_read, resolve_principal, AssignmentChange, TaskChanges, TaskDraft,
            TaskUpdate,
        },
        middleware::AuthContext,
    },
    models::task::{TaskPriority, TaskStatus},
    store::StoreError,
};
use uuid::Uuid;
use validator::Validate;

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Project ID
    pub project: Uuid,

    /// Assignee user ID
    pub assigned_to: Option<Uuid>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    pub deadline: Option<DateTime<Utc>>,
}

/// Partial task update
///
/// Absent fields are left alone. `description`, `deadline` and `assignedTo`
/// may be `null` to clear them.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "present")]
    pub deadline: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "present")]
    pub assigned_to: Option<Option<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct DeleteTaskResponse {
    pub message: String,
}

/// Lists tasks visible to the caller
///
/// With `projectId`, only that project's tasks; a project the caller can't
/// see yields an empty list.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedQuery(query): ValidatedQuery<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskView>>> {
    const CONTEXT: &str = "Error fetching tasks";
    let store = state.store();

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;
    let scope = authorize_task_read(&principal, query.project_id);

    let tasks = store.list_tasks(&scope).await.internal(CONTEXT)?;
    let projects = store
        .list_projects(&authorize_project_read(&principal))
        .await
        .internal(CONTEXT)?;

    let views = task_views(store, tasks, &projects).await.internal(CONTEXT)?;
    Ok(Json(views))
}

/// Creates a task
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or the project or assignee
///   doesn't exist
/// - `403 Forbidden`: The project or the assignee belongs to another company
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    const CONTEXT: &str = "Error creating task";
    let store = state.store();

    if req.title.trim().is_empty() {
        return Err(ApiError::invalid("title", "Title is required"));
    }

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;

    let project = store
        .find_project(req.project)
        .await
        .internal(CONTEXT)?
        .ok_or_else(|| ApiError::invalid("project", "Project not found"))?;

    let assignee = match req.assigned_to {
        Some(id) => Some(
            store
                .find_user(id)
                .await
                .internal(CONTEXT)?
                .ok_or_else(|| ApiError::invalid("assignedTo", "User not found"))?,
        ),
        None => None,
    };

    let new_task = authorize_task_create(
        &principal,
        &project,
        assignee.as_ref(),
        TaskDraft {
            title: req.title.trim().to_string(),
            description: req.description,
            status: req.status.unwrap_or_default(),
            priority: req.priority.unwrap_or_default(),
            deadline: req.deadline,
        },
    )?;

    let task = store
        .create_task(new_task)
        .await
        .map_err(|e| match e {
            StoreError::Missing(_) => ApiError::invalid("project", "Project not found"),
            other => ApiError::from(other),
        })
        .internal(CONTEXT)?;

    tracing::info!(
        task_id = %task.id,
        project_id = %task.project_id,
        assigned_to = ?task.assigned_to_id,
        "Task created"
    );

    let view = task_view(store, task, Some(&project)).await.internal(CONTEXT)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Updates a task
///
/// Only supplied fields change; `updatedAt` always moves forward. A new
/// assignee is checked against the task's project like at creation.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or the assignee doesn't exist
/// - `403 Forbidden`: The assignee belongs to another company
/// - `404 Not Found`: Task doesn't exist or isn't visible to the caller
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedPath(task_id): ValidatedPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskView>> {
    const CONTEXT: &str = "Error updating task";
    let store = state.store();

    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::invalid("title", "Title is required"));
    }

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;
    let scope = authorize_task_read(&principal, None);

    let task = store
        .find_task(&scope, task_id)
        .await
        .internal(CONTEXT)?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let project = store
        .find_project(task.project_id)
        .await
        .internal(CONTEXT)?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let assignment = match req.assigned_to {
        None => AssignmentChange::Keep,
        Some(None) => AssignmentChange::Clear,
        Some(Some(user_id)) => {
            let assignee = store
                .find_user(user_id)
                .await
                .internal(CONTEXT)?
                .ok_or_else(|| ApiError::invalid("assignedTo", "User not found"))?;

            AssignmentChange::Assign(authorize_task_assign(
                &principal,
                Some(&task),
                &assignee,
                &project,
            )?)
        }
    };

    let update = TaskUpdate::new(
        TaskChanges {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            status: req.status,
            priority: req.priority,
            deadline: req.deadline,
        },
        assignment,
    );

    let task = store
        .update_task(&scope, task_id, update)
        .await
        .internal(CONTEXT)?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::debug!(task_id = %task.id, status = task.status.as_str(), "Task updated");

    let view = task_view(store, task, Some(&project)).await.internal(CONTEXT)?;
    Ok(Json(view))
}

/// Deletes a task
///
/// # Errors
///
/// - `404 Not Found`: Task doesn't exist or isn't visible to the caller
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedPath(task_id): ValidatedPath<Uuid>,
) -> ApiResult<Json<DeleteTaskResponse>> {
    const CONTEXT: &str = "Error deleting task";
    let store = state.store();

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;
    let scope = authorize_task_read(&principal, None);

    if !store.delete_task(&scope, task_id).await.internal(CONTEXT)? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(task_id = %task_id, "Task deleted");

    Ok(Json(DeleteTaskResponse {
        message: "Task deleted successfully".to_string(),
    }))
}
