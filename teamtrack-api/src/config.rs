/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file loaded
/// first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `STORE_BACKEND`: `postgres` (default) or `memory`
/// - `DATABASE_URL`: PostgreSQL connection string (required for `postgres`)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for token signing (required, 32+ characters)
/// - `JWT_EXPIRATION_HOURS`: Token lifetime, at most 8760 (default: 24)
/// - `MEMBER_ADD_POLICY`: `same-company` (default), `project-member` or `owner-only`
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`:
///   password hashing cost (default: 65536, 3, 4)
/// - `LOG_FORMAT`: `pretty` (default) or `json`
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use teamtrack_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

use anyhow::Context;
use teamtrack_shared::auth::access::MemberAddPolicy;
use teamtrack_shared::auth::password::PasswordParams;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Longest accepted `JWT_EXPIRATION_HOURS` (one year)
pub const MAX_JWT_EXPIRATION_HOURS: i64 = 24 * 365;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Which store backs the API
    pub store: StoreConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Who may add project members
    pub member_add_policy: MemberAddPolicy,

    /// Password hashing cost
    pub password: PasswordParams,

    /// Log output format
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Store backend selection
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// PostgreSQL via a connection pool
    Postgres(DatabaseConfig),

    /// Process memory; data is lost on exit
    Memory,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 characters. Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Lifetime of issued tokens
    pub expiration_hours: i64,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Unknown LOG_FORMAT: {}", other),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `JWT_SECRET` is missing or shorter than 32 characters
    /// - `JWT_EXPIRATION_HOURS` is not between 1 and 8760
    /// - `DATABASE_URL` is missing while the postgres backend is selected
    /// - Any variable has an unparsable value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds configuration from a variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        fn parsed<T: FromStr>(
            var: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: T,
        ) -> anyhow::Result<T>
        where
            T::Err: std::fmt::Display,
        {
            match var(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<T>()
                    .map_err(|e| anyhow::anyhow!("Invalid {}: {}", key, e)),
                None => Ok(default),
            }
        }

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parsed(&var, "API_PORT", 8080u16)?;
        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let backend = var("STORE_BACKEND").unwrap_or_else(|| "postgres".to_string());
        let store = match backend.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => StoreConfig::Postgres(DatabaseConfig {
                url: var("DATABASE_URL")
                    .context("DATABASE_URL environment variable is required")?,
                max_connections: parsed(&var, "DATABASE_MAX_CONNECTIONS", 10u32)?,
            }),
            "memory" => StoreConfig::Memory,
            other => anyhow::bail!("Unknown STORE_BACKEND: {}", other),
        };

        let secret = var("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_JWT_SECRET_LEN);
        }
        let expiration_hours = parsed(&var, "JWT_EXPIRATION_HOURS", 24i64)?;
        if !(1..=MAX_JWT_EXPIRATION_HOURS).contains(&expiration_hours) {
            anyhow::bail!(
                "JWT_EXPIRATION_HOURS must be between 1 and {}",
                MAX_JWT_EXPIRATION_HOURS
            );
        }

        let member_add_policy = parsed(&var, "MEMBER_ADD_POLICY", MemberAddPolicy::default())?;

        let defaults = PasswordParams::default();
        let password = PasswordParams {
            memory_kib: parsed(&var, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parsed(&var, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parsed(&var, "ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        let log_format = parsed(&var, "LOG_FORMAT", LogFormat::default())?;

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
            },
            store,
            jwt: JwtConfig {
                secret,
                expiration_hours,
            },
            member_add_policy,
            password,
            log_format,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
