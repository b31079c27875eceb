/// Company directory
///
/// `GET /users` lists the caller's colleagues, the caller included. Users of
/// other companies are never returned.

use crate::{
    app::AppState,
    error::{ApiResult, InternalContext},
};
use axum::{extract::State, Extension, Json};
use teamtrack_shared::{
    auth::{
        access::{authorize_user_list, resolve_principal},
        middleware::AuthContext,
    },
    models::user::User,
};

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<User>>> {
    const CONTEXT: &str = "Error fetching users";
    let store = state.store();

    let principal = resolve_principal(store, auth.user_id).await.internal(CONTEXT)?;
    let users = store
        .list_users(&authorize_user_list(&principal))
        .await
        .internal(CONTEXT)?;

    Ok(Json(users))
}
