/// Project model and database operations
///
/// A project is owned by the user who created it and belongs to that user's
/// company. Members are stored as a set in `project_members`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM ('active', 'completed', 'archived');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     company_id UUID NOT NULL REFERENCES companies(id),
///     status project_status NOT NULL DEFAULT 'active',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     added_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// The database functions here take raw IDs. Callers outside this crate go
/// through [`crate::store::Store`], which only accepts scopes and grants
/// produced by [`crate::auth::access`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

/// Project record with its member set
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Project name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Creating user
    pub owner_id: Uuid,

    /// Owner's company at creation time; never changes
    pub company_id: Uuid,

    /// Member user IDs in the order they were added; always contains the owner
    pub members: Vec<Uuid>,

    /// Lifecycle status
    pub status: ProjectStatus,

    /// When the project was created
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Whether `user_id` owns or is a member of this project
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.members.contains(&user_id)
    }

    /// Inserts a project and its owner membership in one transaction
    pub async fn create(
        pool: &PgPool,
        name: &str,
        description: Option<&str>,
        owner_id: Uuid,
        company_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO projects (name, description, owner_id, company_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .bind(company_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
            .bind(project_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Self::find_by_id(pool, project_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists projects owned by or shared with `user_id`, newest first
    pub async fn list_visible_to(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects p
            WHERE {VISIBLE_TO_USER}
            ORDER BY p.created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Counts projects owned by or shared with `user_id`
    pub async fn count_visible_to(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM projects p WHERE {VISIBLE_TO_USER}"
        ))
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Adds `user_id` to the member set if absent
    ///
    /// Single statement, so concurrent adds cannot lose each other.
    /// Returns the project after the insert, or `None` if it doesn't exist.
    pub async fn add_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id)
            SELECT id, $2 FROM projects WHERE id = $1
            ON CONFLICT (project_id, user_id) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        tracing::debug!(
            project_id = %project_id,
            user_id = %user_id,
            inserted = inserted.rows_affected(),
            "Project member add"
        );

        Self::find_by_id(pool, project_id).await
    }
}

/// Column list shared by every project query; `members` is aggregated from
/// `project_members` in insertion order.
const PROJECT_COLUMNS: &str = r#"
    p.id, p.name, p.description, p.owner_id, p.company_id, p.status, p.created_at,
    ARRAY(
        SELECT m.user_id FROM project_members m
        WHERE m.project_id = p.id
        ORDER BY m.added_at, m.user_id
    ) AS members
"#;

/// Visibility predicate over `projects p` for the user bound at `$1`
pub(crate) const VISIBLE_TO_USER: &str = r#"
    (p.owner_id = $1 OR EXISTS (
        SELECT 1 FROM project_members m
        WHERE m.project_id = p.id AND m.user_id = $1
    ))
"#;
