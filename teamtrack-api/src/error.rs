/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Errors are rendered as
///
/// ```json
/// { "error": "cross_tenant_violation", "message": "...", "details": [...] }
/// ```
///
/// Internal errors never expose their cause. Each endpoint attaches a fixed
/// message with [`InternalContext::internal`]; the cause is logged.
///
/// # Example
///
/// ```
/// use teamtrack_api::error::{ApiResult, InternalContext};
/// use teamtrack_shared::store::Store;
/// use axum::Json;
///
/// async fn health(store: &dyn Store) -> ApiResult<Json<&'static str>> {
///     store.health_check().await.internal("Error checking health")?;
///     Ok(Json("ok"))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use teamtrack_shared::auth::access::AccessError;
use teamtrack_shared::auth::jwt::JwtError;
use teamtrack_shared::auth::password::PasswordError;
use teamtrack_shared::store::StoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned for internal errors that have no endpoint context
const DEFAULT_INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// No bearer token (401)
    Unauthenticated(String),

    /// Bearer token rejected (401)
    InvalidToken(String),

    /// Token user no longer exists (404)
    PrincipalNotFound(String),

    /// Request would cross a company boundary (403)
    CrossTenantViolation(String),

    /// Refused by policy (403)
    Forbidden(String),

    /// Entity missing or out of scope (404)
    NotFound(String),

    /// Unique field already taken (400)
    Duplicate(String),

    /// Request body failed validation (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Wrong email or password (401)
    InvalidCredentials,

    /// Anything else (500); `cause` is logged, `message` is returned
    InternalError {
        message: &'static str,
        cause: String,
    },
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "not_found", "invalid_token")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Internal error with the default message
    pub fn internal(cause: impl fmt::Display) -> Self {
        ApiError::InternalError {
            message: DEFAULT_INTERNAL_MESSAGE,
            cause: cause.to_string(),
        }
    }

    /// Single-field validation error
    pub fn invalid(field: &str, message: &str) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_)
            | ApiError::InvalidToken(_)
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::PrincipalNotFound(_) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::CrossTenantViolation(_) | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Duplicate(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::InvalidToken(_) => "invalid_token",
            ApiError::PrincipalNotFound(_) => "principal_not_found",
            ApiError::CrossTenantViolation(_) => "cross_tenant_violation",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Duplicate(_) => "duplicate",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::InternalError { .. } => "internal_error",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            ApiError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            ApiError::PrincipalNotFound(msg) => write!(f, "Principal not found: {}", msg),
            ApiError::CrossTenantViolation(msg) => write!(f, "Cross-tenant violation: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Duplicate(msg) => write!(f, "Duplicate: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InvalidCredentials => write!(f, "Invalid email or password"),
            ApiError::InternalError { message, cause } => {
                write!(f, "Internal error: {} ({})", message, cause)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            ApiError::Unauthenticated(msg)
            | ApiError::InvalidToken(msg)
            | ApiError::PrincipalNotFound(msg)
            | ApiError::CrossTenantViolation(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Duplicate(msg) => (msg, None),
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors))
            }
            ApiError::InvalidCredentials => ("Invalid email or password".to_string(), None),
            ApiError::InternalError { message, cause } => {
                // Log internal errors but don't expose details to clients
                tracing::error!(cause = %cause, "{}", message);
                (message.to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Attaches an endpoint's fixed message to internal errors
pub trait InternalContext<T> {
    /// Converts the error to `ApiError`; internal errors get `message`
    fn internal(self, message: &'static str) -> ApiResult<T>;
}

impl<T, E> InternalContext<T> for Result<T, E>
where
    E: Into<ApiError>,
{
    fn internal(self, message: &'static str) -> ApiResult<T> {
        self.map_err(|err| match err.into() {
            ApiError::InternalError { cause, .. } => ApiError::InternalError { message, cause },
            other => other,
        })
    }
}

/// Convert validator errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    }
}

/// Convert access decisions to API errors
impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => {
                ApiError::Unauthenticated("Authentication required".to_string())
            }
            AccessError::InvalidToken(msg) => ApiError::InvalidToken(msg),
            AccessError::PrincipalNotFound => {
                ApiError::PrincipalNotFound("User not found".to_string())
            }
            AccessError::CrossTenantViolation(msg) => ApiError::CrossTenantViolation(msg),
            AccessError::Forbidden(msg) => ApiError::Forbidden(msg),
            AccessError::NotFound(entity) => ApiError::NotFound(format!("{} not found", entity)),
            AccessError::Store(err) => err.into(),
        }
    }
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => {
                ApiError::Duplicate(format!("A user with this {} already exists", field))
            }
            StoreError::Missing(entity) => ApiError::NotFound(format!("{} not found", entity)),
            StoreError::Database(err) => ApiError::internal(format!("Database error: {}", err)),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::internal(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(_) => ApiError::internal(err),
            JwtError::Expired => ApiError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::InvalidToken("Invalid token issuer".to_string())
            }
            JwtError::ValidationError(_) => ApiError::InvalidToken(format!("Invalid token: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");

        let err = ApiError::invalid("email", "Invalid email format");
        assert_eq!(err.to_string(), "Validation failed: 1 errors");
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::Unauthenticated(String::new()), StatusCode::UNAUTHORIZED),
            (ApiError::InvalidToken(String::new()), StatusCode::UNAUTHORIZED),
            (ApiError::PrincipalNotFound(String::new()), StatusCode::NOT_FOUND),
            (ApiError::CrossTenantViolation(String::new()), StatusCode::FORBIDDEN),
            (ApiError::Forbidden(String::new()), StatusCode::FORBIDDEN),
            (ApiError::NotFound(String::new()), StatusCode::NOT_FOUND),
            (ApiError::Duplicate(String::new()), StatusCode::BAD_REQUEST),
            (ApiError::ValidationError(vec![]), StatusCode::BAD_REQUEST),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ApiError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status, "{}", err);
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_access_error_mapping() {
        let err: ApiError = AccessError::Unauthenticated.into();
        assert_eq!(err.code(), "unauthenticated");

        let err: ApiError = AccessError::CrossTenantViolation("nope".to_string()).into();
        assert_eq!(err.code(), "cross_tenant_violation");

        let err: ApiError = AccessError::NotFound("Project").into();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Project not found"));

        let err: ApiError = AccessError::Store(StoreError::Duplicate { field: "email" }).into();
        assert_eq!(err.code(), "duplicate");
    }

    #[test]
    fn test_internal_context_replaces_message_only_for_internal_errors() {
        let result: Result<(), PasswordError> = Err(PasswordError::HashError("oom".to_string()));
        let err = result.internal("Error creating user").unwrap_err();
        assert!(matches!(
            err,
            ApiError::InternalError { message: "Error creating user", .. }
        ));

        let result: Result<(), AccessError> = Err(AccessError::PrincipalNotFound);
        let err = result.internal("Error fetching projects").unwrap_err();
        assert_eq!(err.code(), "principal_not_found");
    }

    #[test]
    fn test_internal_response_hides_cause() {
        let err = ApiError::InternalError {
            message: "Error fetching tasks",
            cause: "connection refused".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
