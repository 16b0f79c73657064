//! Create/edit flows behind the commands.
//!
//! Caller input is validated before any store access. References to other
//! records are resolved and checked to exist, giving `NotFound` rather than a
//! storage constraint failure.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::db::Db;
use crate::error::{EntityKind, Error, Result};
use crate::hierarchy::{NodeStore, ProjectTree, TaskTree, subtree_ids};
use crate::models::{NewProject, NewTask, Priority, Project, Task};
use crate::render::DATE_FORMAT;

#[derive(Debug, Clone, Default)]
pub struct ProjectInput {
    pub name: String,
    pub description: Option<String>,
    /// Parent project name or id.
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub name: String,
    pub description: Option<String>,
    /// Owning project name or id.
    pub project: String,
    /// Parent task id.
    pub parent_task: Option<String>,
    pub due: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_task: Option<String>,
    pub due: Option<String>,
    pub priority: Option<Priority>,
}

fn required_name(name: &str, entity: EntityKind) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(format!("{entity} name is required")));
    }
    Ok(name.to_string())
}

/// `YYYY-MM-DD HH:MM`, or a bare `YYYY-MM-DD` meaning midnight.
pub fn parse_due_date(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    NaiveDateTime::parse_from_str(input, DATE_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| {
            Error::validation(format!(
                "invalid due date '{input}', expected YYYY-MM-DD HH:MM"
            ))
        })
}

pub fn parse_task_id(input: &str) -> Result<i64> {
    input.trim().parse().map_err(|_| {
        Error::validation(format!(
            "parent task must be identified by a numeric ID, got '{input}'"
        ))
    })
}

/// A numeric identifier is an id; anything else is a name.
pub async fn resolve_project(db: &Db, identifier: &str) -> Result<Project> {
    let identifier = identifier.trim();
    match identifier.parse::<i64>() {
        Ok(id) => db.get_project(id).await,
        Err(_) => db.get_project_by_name(identifier).await,
    }
}

pub async fn create_project(db: &Db, input: ProjectInput) -> Result<Project> {
    let name = required_name(&input.name, EntityKind::Project)?;

    let parent_project_id = match input.parent.as_deref() {
        Some(parent) => Some(resolve_project(db, parent).await?.id),
        None => None,
    };

    db.create_project(&NewProject {
        name,
        description: input.description,
        parent_project_id,
    })
    .await
}

pub async fn edit_project(db: &Db, id: i64, changes: ProjectChanges) -> Result<Project> {
    let name = match changes.name.as_deref() {
        Some(name) => Some(required_name(name, EntityKind::Project)?),
        None => None,
    };

    let mut project = db.get_project(id).await?;

    if let Some(name) = name {
        project.name = name;
    }
    if let Some(description) = changes.description {
        project.description = Some(description);
    }
    if let Some(parent) = changes.parent.as_deref() {
        let parent = resolve_project(db, parent).await?;
        reject_cycle(&ProjectTree::new(db), id, parent.id).await?;
        project.parent_project_id = Some(parent.id);
    }

    db.update_project(&mut project).await?;
    Ok(project)
}

pub async fn create_task(db: &Db, input: TaskInput) -> Result<Task> {
    let name = required_name(&input.name, EntityKind::Task)?;
    if input.project.trim().is_empty() {
        return Err(Error::validation("task must belong to a project"));
    }
    let parent_task_id = input.parent_task.as_deref().map(parse_task_id).transpose()?;
    let due_date = input.due.as_deref().map(parse_due_date).transpose()?;

    let project = resolve_project(db, &input.project).await?;
    if let Some(parent) = parent_task_id {
        db.get_task(parent).await?;
    }

    db.create_task(&NewTask {
        name,
        description: input.description,
        project_id: project.id,
        parent_task_id,
        due_date,
        priority: input.priority.unwrap_or_default(),
    })
    .await
}

pub async fn edit_task(db: &Db, id: i64, changes: TaskChanges) -> Result<Task> {
    let name = match changes.name.as_deref() {
        Some(name) => Some(required_name(name, EntityKind::Task)?),
        None => None,
    };
    let parent_task_id = changes.parent_task.as_deref().map(parse_task_id).transpose()?;
    let due_date = changes.due.as_deref().map(parse_due_date).transpose()?;

    let mut task = db.get_task(id).await?;

    if let Some(name) = name {
        task.name = name;
    }
    if let Some(description) = changes.description {
        task.description = Some(description);
    }
    if let Some(due_date) = due_date {
        task.due_date = Some(due_date);
    }
    if let Some(priority) = changes.priority {
        task.priority = priority;
    }
    if let Some(parent) = parent_task_id {
        db.get_task(parent).await?;
        reject_cycle(&TaskTree::new(db), id, parent).await?;
        task.parent_task_id = Some(parent);
    }

    db.update_task(&mut task).await?;
    Ok(task)
}

/// Fails when `new_parent` is `id` itself or one of its descendants.
async fn reject_cycle<S: NodeStore>(store: &S, id: i64, new_parent: i64) -> Result<()> {
    if subtree_ids(store, id).await?.contains(&new_parent) {
        return Err(Error::validation(format!(
            "{} {new_parent} cannot become the parent of {id}: it is {id} or one of its descendants",
            S::KIND
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_dates_accept_minutes_or_bare_dates() {
        let with_time = parse_due_date("2024-10-01 09:30").unwrap();
        assert_eq!(with_time.to_string(), "2024-10-01 09:30:00");

        let bare = parse_due_date(" 2024-10-01 ").unwrap();
        assert_eq!(bare.to_string(), "2024-10-01 00:00:00");

        let err = parse_due_date("next tuesday").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn parent_task_ids_must_be_numeric() {
        assert_eq!(parse_task_id("42").unwrap(), 42);
        assert!(matches!(parse_task_id("groceries"), Err(Error::Validation(_))));
    }
}
