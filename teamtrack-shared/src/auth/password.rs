/// Password hashing module using Argon2id
///
/// Stored credentials are PHC strings produced by Argon2id. The cost
/// parameters are configurable so that tests can use cheap settings; the
/// defaults are:
///
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// Verification reads the parameters back out of the stored hash, so changing
/// them only affects newly hashed passwords.
///
/// # Example
///
/// ```
/// use teamtrack_shared::auth::password::{hash_password, verify_password, PasswordParams};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let params = PasswordParams::default();
/// let hash = hash_password("correct horse", &params)?;
///
/// assert!(verify_password("correct horse", &hash)?);
/// assert!(!verify_password("battery staple", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Number of lanes
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Hashes a password with Argon2id
///
/// Returns a PHC string such as
/// `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`. A fresh 16-byte salt is
/// drawn from the OS RNG on every call.
///
/// This is CPU- and memory-heavy; async callers should run it on a blocking
/// thread.
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the parameters are rejected or
/// hashing fails
pub fn hash_password(password: &str, params: &PasswordParams) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon_params = ParamsBuilder::new()
        .m_cost(params.memory_kib)
        .t_cost(params.iterations)
        .p_cost(params.parallelism)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon_params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Comparison is constant-time.
///
/// # Errors
///
/// - `PasswordError::InvalidHash` if `hash` isn't a PHC string
/// - `PasswordError::VerifyError` for any failure other than a mismatch
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> PasswordParams {
        PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123", &light()).expect("Should hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=1024,t=1,p=1"));
    }

    #[test]
    fn test_default_params_are_embedded() {
        let hash = hash_password("pw", &PasswordParams::default()).unwrap();
        assert!(hash.contains("m=65536,t=3,p=4"));
    }

    #[test]
    fn test_hash_password_unique_salts() {
        let hash1 = hash_password("same_password", &light()).unwrap();
        let hash2 = hash_password("same_password", &light()).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("same_password", &hash1).unwrap());
        assert!(verify_password("same_password", &hash2).unwrap());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password("correct_password", &light()).unwrap();
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_invalid_hash() {
        let result = verify_password("password", "not_a_valid_hash");
        assert!(matches!(result, Err(PasswordError::InvalidHash(_))));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = PasswordParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        };
        assert!(matches!(
            hash_password("pw", &params),
            Err(PasswordError::HashError(_))
        ));
    }

    #[test]
    fn test_unicode_password() {
        let password = "пароль密码🔒";
        let hash = hash_password(password, &light()).unwrap();
        assert!(verify_password(password, &hash).unwrap());
    }
}
