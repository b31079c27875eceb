/// Request authentication helpers for Axum
///
/// The API server's auth layer calls [`authenticate_request`] and, on
/// success, inserts the returned [`AuthContext`] into the request extensions.
/// Handlers then read it with `Extension<AuthContext>`.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use teamtrack_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::access::{authenticate, AccessError};

/// Authentication context added to request extensions
///
/// Carries only the token's user ID; the company is resolved per request
/// from the store so that removed users lose access immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Raw `Authorization` header value, if present and valid UTF-8
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// See [`authenticate`].
pub fn authenticate_request(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AccessError> {
    let user_id = authenticate(authorization_header(headers), secret)?;
    Ok(AuthContext { user_id })
}
