/// The caller's own account
///
/// # Endpoints
///
/// - `GET /profile` - Account, company and task statistics
/// - `PATCH /profile` - Change name and/or email

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, InternalContext},
    extract::ValidatedJson,
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use teamtrack_shared::{
    auth::{
        access::{authorize_project_read, resolve_principal},
        middleware::AuthContext,
    },
    models::{
        task::TaskStats,
        user::{UpdateUser, User},
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct CompanySummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileUser {
    #[serde(flatten)]
    pub user: User,
    pub company: Option<CompanySummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    #[serde(flatten)]
    pub tasks: TaskStats,
    pub project_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: ProfileUser,
    pub stats: ProfileStats,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: Option<String>,
}

/// Returns the caller with their company and statistics
///
/// Task counts cover tasks assigned to the caller; `projectCount` covers
/// projects the caller owns or is a member of.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    const CONTEXT: &str = "Error fetching profile";
    let store = state.store();

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;

    let user = store
        .find_user(principal.user_id())
        .await
        .internal(CONTEXT)?
        .ok_or_else(|| ApiError::PrincipalNotFound("User not found".to_string()))?;
    let company = store
        .find_company(principal.company_id())
        .await
        .internal(CONTEXT)?;

    let tasks = store.task_stats(&principal).await.internal(CONTEXT)?;
    let project_count = store
        .count_projects(&authorize_project_read(&principal))
        .await
        .internal(CONTEXT)?;

    Ok(Json(ProfileResponse {
        user: ProfileUser {
            user,
            company: company.map(|c| CompanySummary {
                id: c.id,
                name: c.name,
            }),
        },
        stats: ProfileStats {
            tasks,
            project_count,
        },
    }))
}

/// Updates the caller's name and/or email
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or email already in use
/// - `404 Not Found`: The caller's account no longer exists
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    const CONTEXT: &str = "Error updating profile";
    let store = state.store();

    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::invalid("name", "Name is required"));
    }

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;

    let changes = UpdateUser {
        name: req.name.map(|n| n.trim().to_string()),
        email: req.email,
    };

    let user = store
        .update_user(&principal, changes)
        .await
        .internal(CONTEXT)?
        .ok_or_else(|| ApiError::PrincipalNotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(user))
}
