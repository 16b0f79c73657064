//! SQLite persistence gateway.
//!
//! One method per access pattern. Nothing here cascades: removing a row with
//! children is the caller's job (see `hierarchy`).

use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::Config;
use crate::error::{EntityKind, Error, Result};
use crate::models::{NewProject, NewTask, Project, Task};

const PROJECT_COLUMNS: &str =
    "id, name, description, parent_project_id, creation_date, last_modified_date";

const TASK_COLUMNS: &str = "id, name, description, project_id, parent_task_id, due_date, \
     completion_date, task_completed, priority, creation_date, last_updated_date";

pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Opens (creating if needed) the database at `config.db_path` and applies
    /// pending migrations.
    pub async fn connect(config: &Config) -> Result<Self> {
        if let Some(dir) = config.db_path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| Error::Storage(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.db_path)
            .create_if_missing(true)
            .foreign_keys(true);

        tracing::debug!(path = %config.db_path.display(), "opening database");
        Self::open(options).await
    }

    /// Private in-memory database, used by tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        Self::open(options).await
    }

    async fn open(options: SqliteConnectOptions) -> Result<Self> {
        // A single connection that is never recycled; an in-memory database
        // lives exactly as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Db { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO projects (name, description, parent_project_id, creation_date, last_modified_date)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.parent_project_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::debug!(id, name = %project.name, "created project");
        self.get_project(id).await
    }

    pub async fn get_project(&self, id: i64) -> Result<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::not_found(EntityKind::Project, id))
    }

    pub async fn get_project_by_name(&self, name: &str) -> Result<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::not_found(EntityKind::Project, format!("'{name}'")))
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Direct children only.
    pub async fn list_subprojects(&self, parent_project_id: i64) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE parent_project_id = ? ORDER BY id"
        ))
        .bind(parent_project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Persists the full record and refreshes `last_modified_date`.
    pub async fn update_project(&self, project: &mut Project) -> Result<()> {
        project.last_modified_date = Utc::now();
        let result = sqlx::query(
            "UPDATE projects SET name = ?, description = ?, parent_project_id = ?, last_modified_date = ?
             WHERE id = ?",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.parent_project_id)
        .bind(project.last_modified_date)
        .bind(project.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(EntityKind::Project, project.id));
        }
        tracing::debug!(id = project.id, "updated project");
        Ok(())
    }

    pub async fn delete_project(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(EntityKind::Project, id));
        }
        tracing::debug!(id, "deleted project");
        Ok(())
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tasks (name, description, project_id, parent_task_id, due_date, priority,
                                task_completed, creation_date, last_updated_date)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.project_id)
        .bind(task.parent_task_id)
        .bind(task.due_date)
        .bind(task.priority)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::debug!(id, name = %task.name, project_id = task.project_id, "created task");
        self.get_task(id).await
    }

    pub async fn get_task(&self, id: i64) -> Result<Task> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Task, id))
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Every task of the project, at any depth.
    pub async fn list_tasks_for_project(&self, project_id: i64) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ? ORDER BY id"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Direct children only.
    pub async fn list_subtasks(&self, parent_task_id: i64) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE parent_task_id = ? ORDER BY id"
        ))
        .bind(parent_task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Persists the full record and refreshes `last_updated_date`.
    pub async fn update_task(&self, task: &mut Task) -> Result<()> {
        task.last_updated_date = Utc::now();
        let result = sqlx::query(
            "UPDATE tasks SET name = ?, description = ?, project_id = ?, parent_task_id = ?,
                    due_date = ?, completion_date = ?, task_completed = ?, priority = ?,
                    last_updated_date = ?
             WHERE id = ?",
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.project_id)
        .bind(task.parent_task_id)
        .bind(task.due_date)
        .bind(task.completion_date)
        .bind(task.task_completed)
        .bind(task.priority)
        .bind(task.last_updated_date)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(EntityKind::Task, task.id));
        }
        tracing::debug!(id = task.id, completed = task.task_completed, "updated task");
        Ok(())
    }

    pub async fn delete_task(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(EntityKind::Task, id));
        }
        tracing::debug!(id, "deleted task");
        Ok(())
    }
}
