/// User model and database operations
///
/// Every user belongs to exactly one company. The company is assigned at
/// registration and never changes afterwards, so there is no operation that
/// updates `company_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     company_id UUID NOT NULL REFERENCES companies(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teamtrack_shared::models::user::{User, CreateUser};
/// use teamtrack_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(company_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@acme.test".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     company_id,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ada@acme.test").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// User account
///
/// The password hash is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address, unique across all companies
    pub email: String,

    /// Argon2id password hash
    #[serde(skip)]
    pub password_hash: String,

    /// Company the user belongs to (immutable)
    pub company_id: Uuid,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub company_id: Uuid,
}

/// Input for updating a user's profile
///
/// Only `Some` fields are written. The company cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Canonical form of an email address used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const USER_COLUMNS: &str = "id, name, email, password_hash, company_id, created_at, updated_at";

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `users_email_key` if the email is
    /// already registered.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, company_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.company_id)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Loads the users with the given IDs, in no particular order
    ///
    /// Unknown IDs are skipped.
    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Lists every user of a company, ordered by name
    pub async fn list_by_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE company_id = $1
            ORDER BY name ASC, created_at ASC
            "#
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Updates name and/or email
    ///
    /// Returns `None` if the user doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }
}
