use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub parent_project_id: Option<i64>,
    pub creation_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub project_id: i64,
    pub parent_task_id: Option<i64>,
    /// Local wall-clock time.
    pub due_date: Option<NaiveDateTime>,
    /// Set exactly when `task_completed` is true.
    pub completion_date: Option<DateTime<Utc>>,
    pub task_completed: bool,
    pub priority: Priority,
    pub creation_date: DateTime<Utc>,
    pub last_updated_date: DateTime<Utc>,
}

impl Task {
    /// Flips completion and keeps `completion_date` in step with it.
    pub fn toggle_completion(&mut self, now: DateTime<Utc>) {
        self.task_completed = !self.task_completed;
        self.completion_date = self.task_completed.then_some(now);
        self.last_updated_date = now;
    }
}

/// Fields for a project that has not been stored yet.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub parent_project_id: Option<i64>,
}

/// Fields for a task that has not been stored yet.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub project_id: i64,
    pub parent_task_id: Option<i64>,
    pub due_date: Option<NaiveDateTime>,
    pub priority: Priority,
}

/// Task priority, stored as its integer code.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, sqlx::Type,
)]
#[repr(i32)]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
    #[default]
    None = 4,
}

impl Priority {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::None => "None",
        }
    }
}

impl TryFrom<i64> for Priority {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            4 => Ok(Priority::None),
            other => Err(Error::validation(format!(
                "priority must be between 1 and 4, got {other}"
            ))),
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    /// Accepts a level name (any case) or its numeric code.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return Priority::try_from(code);
        }
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            "none" => Ok(Priority::None),
            _ => Err(Error::validation(format!(
                "unknown priority '{s}', expected high, medium, low or none"
            ))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
