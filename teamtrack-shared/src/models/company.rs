/// Company model and database operations
///
/// Companies are the tenant boundary: every user belongs to exactly one
/// company, and projects inherit their company from their owner.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE companies (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     name_key VARCHAR(255) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Identity
///
/// Companies are looked up by [`company_name_key`], a normalized form of the
/// name supplied at registration. `"Acme"`, `" acme "` and `"ACME"` all resolve
/// to the same company. The display name is the one given by the first
/// registration.
///
/// # Example
///
/// ```no_run
/// use teamtrack_shared::models::company::Company;
/// use teamtrack_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let acme = Company::find_or_create(&pool, "Acme").await?;
/// let again = Company::find_or_create(&pool, "  ACME ").await?;
/// assert_eq!(acme.id, again.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Company (tenant) record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    /// Unique company ID
    pub id: Uuid,

    /// Display name, as given by the first registration
    pub name: String,

    /// Normalized lookup key
    #[serde(skip)]
    pub name_key: String,

    /// When the company was created
    pub created_at: DateTime<Utc>,
}

/// Normalizes a company name into its lookup key
///
/// Trims the name, collapses internal whitespace runs to one space and
/// lowercases the result.
///
/// # Example
///
/// ```
/// use teamtrack_shared::models::company::company_name_key;
///
/// assert_eq!(company_name_key("  Acme   Corp "), "acme corp");
/// ```
pub fn company_name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Company {
    /// Finds the company for `name`, creating it if none exists
    ///
    /// Runs as a single upsert on the unique `name_key`, so concurrent
    /// registrations for the same new company converge on one row.
    pub async fn find_or_create(pool: &PgPool, name: &str) -> Result<Self, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, name_key)
            VALUES ($1, $2)
            ON CONFLICT (name_key) DO UPDATE SET name_key = EXCLUDED.name_key
            RETURNING id, name, name_key, created_at
            "#,
        )
        .bind(name.trim())
        .bind(company_name_key(name))
        .fetch_one(pool)
        .await?;

        Ok(company)
    }

    /// Finds a company by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, name_key, created_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(company)
    }
}
