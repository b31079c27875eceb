/// Project endpoints
///
/// # Endpoints
///
/// - `GET /projects` - Projects the caller owns or is a member of
/// - `POST /projects` - Create a project owned by the caller
/// - `POST /projects/:id/members` - Add a colleague to a project

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, InternalContext},
    extract::{ValidatedJson, ValidatedPath},
    routes::views::{project_view, project_views, ProjectView},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use teamtrack_shared::auth::{
    access::{
        authorize_member_add, authorize_project_create, authorize_project_read, resolve_principal,
        ProjectDraft,
    },
    middleware::AuthContext,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ProjectView>>> {
    const CONTEXT: &str = "Error fetching projects";
    let store = state.store();

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;
    let scope = authorize_project_read(&principal);

    let projects = store.list_projects(&scope).await.internal(CONTEXT)?;
    let views = project_views(store, projects).await.internal(CONTEXT)?;

    Ok(Json(views))
}

/// Creates a project
///
/// The owner is the caller and the company is the caller's company; neither
/// can be chosen by the client. The owner starts as the only member.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    const CONTEXT: &str = "Error creating project";
    let store = state.store();

    if req.name.trim().is_empty() {
        return Err(ApiError::invalid("name", "Name is required"));
    }

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;
    let new_project = authorize_project_create(
        &principal,
        ProjectDraft {
            name: req.name.trim().to_string(),
            description: req.description,
        },
    );

    let project = store.create_project(new_project).await.internal(CONTEXT)?;

    tracing::info!(
        project_id = %project.id,
        owner_id = %project.owner_id,
        company_id = %project.company_id,
        "Project created"
    );

    let view = project_view(store, project).await.internal(CONTEXT)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Adds a user to a project's member set
///
/// Adding an existing member succeeds without changing anything.
///
/// # Errors
///
/// - `403 Forbidden`: The user or the project belongs to another company,
///   or the configured member-add policy refuses the caller
/// - `404 Not Found`: Project or user doesn't exist
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedPath(project_id): ValidatedPath<Uuid>,
    ValidatedJson(req): ValidatedJson<AddMemberRequest>,
) -> ApiResult<Json<ProjectView>> {
    const CONTEXT: &str = "Error adding member";
    let store = state.store();

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;

    let project = store
        .find_project(project_id)
        .await
        .internal(CONTEXT)?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let candidate = store
        .find_user(req.user_id)
        .await
        .internal(CONTEXT)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let grant = authorize_member_add(
        state.config.member_add_policy,
        &principal,
        &project,
        &candidate,
    )?;

    let project = store
        .add_member(&grant)
        .await
        .internal(CONTEXT)?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let view = project_view(store, project).await.internal(CONTEXT)?;
    Ok(Json(view))
}
