/// JWT token generation and validation module
///
/// Bearer tokens identify the principal (user) making a request. Tokens are
/// signed using HS256 (HMAC-SHA256) with a process-wide secret.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable, 24 hours by default
/// - **Validation**: Signature, expiration, not-before and issuer checks
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use teamtrack_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id);
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated.user_id, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim written into and required from every token
pub const ISSUER: &str = "teamtrack";

/// Default token lifetime
pub const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },
}

/// JWT claims structure
///
/// - `userId`: the principal
/// - `iss`: always "teamtrack"
/// - `iat`, `nbf`, `exp`: Unix timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal user ID
    #[serde(rename = "userId")]
    pub user_id: Uuid,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims with the default expiration
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self::issued_at(user_id, now, now + Duration::hours(DEFAULT_EXPIRATION_HOURS))
    }

    /// Creates claims expiring `hours` from now
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if the expiration is not representable
    pub fn for_hours(user_id: Uuid, hours: i64) -> Result<Self, JwtError> {
        let expires_in = Duration::try_hours(hours).ok_or_else(|| {
            JwtError::CreateError(format!("Token lifetime of {} hours is out of range", hours))
        })?;
        Self::with_expiration(user_id, expires_in)
    }

    /// Creates claims expiring after `expires_in`
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if the expiration overflows
    ///
    /// # Example
    ///
    /// ```
    /// use teamtrack_shared::auth::jwt::Claims;
    /// use chrono::Duration;
    /// use uuid::Uuid;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let claims = Claims::with_expiration(Uuid::new_v4(), Duration::hours(1))?;
    /// assert!(!claims.is_expired());
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_expiration(user_id: Uuid, expires_in: Duration) -> Result<Self, JwtError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(expires_in)
            .ok_or_else(|| JwtError::CreateError("Token expiration out of range".to_string()))?;

        Ok(Self::issued_at(user_id, now, expiration))
    }

    fn issued_at(user_id: Uuid, now: DateTime<Utc>, expiration: DateTime<Utc>) -> Self {
        Self {
            user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Creates a signed JWT from claims
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT and extracts its claims
///
/// Verifies the signature, `exp`, `nbf` and that the issuer is "teamtrack".
///
/// # Errors
///
/// - `JwtError::Expired` when `exp` has passed
/// - `JwtError::InvalidIssuer` when `iss` doesn't match
/// - `JwtError::ValidationError` for a bad signature or malformed token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}
