/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/register` - Register a new user, joining or creating a company
/// - `POST /auth/login` - Exchange email and password for a bearer token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, InternalContext},
    extract::ValidatedJson,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use teamtrack_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User},
};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    /// Email address
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    /// Password
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// Company to join; created if no company with this name exists
    #[validate(length(min = 1, max = 100, message = "Company name must be 1 to 100 characters"))]
    pub company_name: String,
}

/// Register response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token
    pub token: String,

    /// The authenticated user
    pub user: User,
}

/// Runs Argon2 off the async runtime
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, password::PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("Hashing task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Register a new user
///
/// The company is looked up by normalized name (`"Acme"`, `" acme "` and
/// `"ACME"` are the same company) and created on first use.
///
/// # Endpoint
///
/// ```text
/// POST /auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Alice",
///   "email": "alice@acme.test",
///   "password": "secret1",
///   "companyName": "Acme"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "message": "User created successfully", "userId": "uuid" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or email already registered
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    const CONTEXT: &str = "Error creating user";

    if req.company_name.trim().is_empty() {
        return Err(ApiError::invalid("companyName", "Company name is required"));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::invalid("name", "Name is required"));
    }

    let store = state.store();

    if store
        .find_user_by_email(&req.email)
        .await
        .internal(CONTEXT)?
        .is_some()
    {
        return Err(ApiError::Duplicate("User already exists".to_string()));
    }

    let company = store
        .find_or_create_company(&req.company_name)
        .await
        .internal(CONTEXT)?;

    let params = state.config.password;
    let password = req.password;
    let password_hash = blocking(move || password::hash_password(&password, &params))
        .await
        .internal(CONTEXT)?;

    let user = store
        .create_user(CreateUser {
            name: req.name.trim().to_string(),
            email: req.email,
            password_hash,
            company_id: company.id,
        })
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Duplicate(_) => ApiError::Duplicate("User already exists".to_string()),
            other => other,
        })
        .internal(CONTEXT)?;

    tracing::info!(user_id = %user.id, company_id = %company.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// { "email": "alice@acme.test", "password": "secret1" }
/// ```
///
/// # Response
///
/// ```json
/// { "token": "eyJ...", "user": { "id": "uuid", "name": "Alice", ... } }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    const CONTEXT: &str = "Error logging in";

    let user = state
        .store()
        .find_user_by_email(&req.email)
        .await
        .internal(CONTEXT)?
        .ok_or(ApiError::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let password = req.password;
    let valid = blocking(move || password::verify_password(&password, &hash))
        .await
        .internal(CONTEXT)?;

    if !valid {
        tracing::debug!(user_id = %user.id, "Login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let claims =
        jwt::Claims::for_hours(user.id, state.config.jwt.expiration_hours).internal(CONTEXT)?;
    let token = jwt::create_token(&claims, state.jwt_secret()).internal(CONTEXT)?;

    Ok(Json(LoginResponse { token, user }))
}
