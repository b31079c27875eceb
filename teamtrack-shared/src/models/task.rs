/// Task model and database operations
///
/// Tasks belong to exactly one project and optionally to one assignee from the
/// project's company.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     assigned_to_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     deadline TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Visibility follows the project: a task is visible to a user when its
/// project is owned by or shared with that user.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::project::VISIBLE_TO_USER;

/// Task progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Whether the task counts as done in profile statistics
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task counts for one assignee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub total_tasks: i64,
}

impl TaskStats {
    /// Tallies the given tasks
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut stats, task| {
            if task.status.is_completed() {
                stats.completed_tasks += 1;
            } else {
                stats.pending_tasks += 1;
            }
            stats.total_tasks += 1;
            stats
        })
    }
}

/// Next `updated_at` for a record last touched at `previous`
///
/// Always strictly later than `previous`, even when the clock hasn't advanced
/// past it at microsecond resolution.
pub fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    let floor = previous + Duration::microseconds(1);
    if now > floor {
        now
    } else {
        floor
    }
}

/// Raw insert data; see [`crate::auth::access::NewTask`]
pub(crate) struct InsertTask<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub project_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
}

/// Raw field changes; `None` leaves a column untouched
#[derive(Default)]
pub(crate) struct TaskColumns {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub assigned_to_id: Option<Option<Uuid>>,
}

const TASK_COLUMNS: &str =
    "t.id, t.title, t.description, t.project_id, t.assigned_to_id, t.status, t.priority, \
     t.deadline, t.created_at, t.updated_at";

/// Restricts `tasks t` to projects visible to the user bound at `$1`
fn visible_task_filter() -> String {
    format!(
        "t.project_id IN (SELECT p.id FROM projects p WHERE {})",
        VISIBLE_TO_USER
    )
}

impl Task {
    pub(crate) async fn create(pool: &PgPool, data: InsertTask<'_>) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks AS t
                (title, description, project_id, assigned_to_id, status, priority, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.project_id)
        .bind(data.assigned_to_id)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.deadline)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task visible to `user_id`, optionally required to be in `project_id`
    pub(crate) async fn find_visible(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        project_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t \
             WHERE {} AND t.id = $2 AND ($3::uuid IS NULL OR t.project_id = $3)",
            visible_task_filter()
        ))
        .bind(user_id)
        .bind(id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks visible to `user_id`, optionally narrowed to one project
    pub(crate) async fn list_visible(
        pool: &PgPool,
        user_id: Uuid,
        project_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks t
            WHERE {} AND ($2::uuid IS NULL OR t.project_id = $2)
            ORDER BY t.created_at DESC
            "#,
            visible_task_filter()
        ))
        .bind(user_id)
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Applies `changes` to a task visible to `user_id`
    ///
    /// `updated_at` always moves strictly forward. When `project_id` is given
    /// the task must also belong to that project. Returns `None` if no
    /// matching task exists.
    pub(crate) async fn update_visible(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        project_id: Option<Uuid>,
        changes: TaskColumns,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from(
            "UPDATE tasks AS t SET updated_at = GREATEST(NOW(), t.updated_at + INTERVAL '1 microsecond')",
        );
        let mut bind_count = 3;

        if changes.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if changes.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if changes.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if changes.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if changes.deadline.is_some() {
            bind_count += 1;
            query.push_str(&format!(", deadline = ${}", bind_count));
        }
        if changes.assigned_to_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assigned_to_id = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE {} AND t.id = $2 AND ($3::uuid IS NULL OR t.project_id = $3) RETURNING {TASK_COLUMNS}",
            visible_task_filter()
        ));

        let mut q = sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .bind(id)
            .bind(project_id);

        if let Some(title) = changes.title {
            q = q.bind(title);
        }
        if let Some(description) = changes.description {
            q = q.bind(description);
        }
        if let Some(status) = changes.status {
            q = q.bind(status);
        }
        if let Some(priority) = changes.priority {
            q = q.bind(priority);
        }
        if let Some(deadline) = changes.deadline {
            q = q.bind(deadline);
        }
        if let Some(assigned_to_id) = changes.assigned_to_id {
            q = q.bind(assigned_to_id);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task visible to `user_id`; returns whether a row was removed
    pub(crate) async fn delete_visible(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        project_id: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "DELETE FROM tasks t \
             WHERE {} AND t.id = $2 AND ($3::uuid IS NULL OR t.project_id = $3)",
            visible_task_filter()
        ))
        .bind(user_id)
        .bind(id)
        .bind(project_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Task counts over tasks assigned to `user_id`
    pub async fn stats_for_assignee(pool: &PgPool, user_id: Uuid) -> Result<TaskStats, sqlx::Error> {
        let (completed_tasks, pending_tasks, total_tasks): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'completed'),
                COUNT(*) FILTER (WHERE status <> 'completed'),
                COUNT(*)
            FROM tasks
            WHERE assigned_to_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(TaskStats {
            completed_tasks,
            pending_tasks,
            total_tasks,
        })
    }
}
