/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id credential hashing
/// - [`jwt`]: HS256 bearer token issue and validation
/// - [`access`]: principal resolution and per-operation access decisions
/// - [`middleware`]: request authentication helpers for Axum
///
/// # Example
///
/// ```
/// use teamtrack_shared::auth::jwt::{create_token, Claims};
/// use teamtrack_shared::auth::access::authenticate;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-key-that-is-at-least-32-bytes";
/// let user_id = Uuid::new_v4();
/// let token = create_token(&Claims::new(user_id), secret)?;
///
/// let header = format!("Bearer {}", token);
/// assert_eq!(authenticate(Some(&header), secret)?, user_id);
/// # Ok(())
/// # }
/// ```

pub mod access;
pub mod jwt;
pub mod middleware;
pub mod password;
