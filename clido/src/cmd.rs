//! Command handlers. Each one runs a single logical operation against an
//! open database and prints the outcome.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::Local;
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use clido_core::render::{project_table, project_tree, task_table, task_tree};
use clido_core::service::{
    self, ProjectChanges, ProjectInput, TaskChanges, TaskInput, resolve_project,
};
use clido_core::{Db, ProjectTree, Task, TaskTree, remove_subtree, toggle_subtree};

use crate::cli::{Cli, Commands, EditTarget, Kind, ListKind, NewTarget};

/// Runs every command that needs the store.
pub async fn run(db: &Db, command: Commands) -> Result<()> {
    match command {
        Commands::New { target } => cmd_new(db, target).await,
        Commands::Edit { target } => cmd_edit(db, target).await,
        Commands::Remove { kind, id } => cmd_remove(db, kind, id).await,
        Commands::Toggle { id, recursive } => cmd_toggle(db, id, recursive).await,
        Commands::List {
            kind,
            project,
            json,
            tree,
        } => cmd_list(db, kind, project, json, tree).await,
        Commands::Completion { .. } | Commands::Version => {
            unreachable!("handled before the database is opened")
        }
    }
}

async fn cmd_new(db: &Db, target: NewTarget) -> Result<()> {
    match target {
        NewTarget::Project {
            name,
            description,
            project,
        } => {
            let project = service::create_project(
                db,
                ProjectInput {
                    name,
                    description,
                    parent: project,
                },
            )
            .await
            .context("creating project")?;
            println!("Project '{}' created successfully (ID: {}).", project.name, project.id);
        }
        NewTarget::Task {
            name,
            description,
            project,
            task,
            due,
            priority,
        } => {
            let task = service::create_task(
                db,
                TaskInput {
                    name,
                    description,
                    project,
                    parent_task: task,
                    due,
                    priority,
                },
            )
            .await
            .context("creating task")?;
            println!(
                "Task '{}' created successfully (ID: {}) with priority {}.",
                task.name, task.id, task.priority
            );
        }
    }
    Ok(())
}

async fn cmd_edit(db: &Db, target: EditTarget) -> Result<()> {
    match target {
        EditTarget::Project {
            id,
            name,
            description,
            project,
        } => {
            let project = service::edit_project(
                db,
                id,
                ProjectChanges {
                    name,
                    description,
                    parent: project,
                },
            )
            .await
            .with_context(|| format!("editing project {id}"))?;
            println!("Project '{}' updated successfully.", project.name);
        }
        EditTarget::Task {
            id,
            name,
            description,
            task,
            due,
            priority,
        } => {
            let task = service::edit_task(
                db,
                id,
                TaskChanges {
                    name,
                    description,
                    parent_task: task,
                    due,
                    priority,
                },
            )
            .await
            .with_context(|| format!("editing task {id}"))?;
            println!("Task '{}' updated successfully.", task.name);
            println!(
                "New details: Priority: {}, Due Date: {}",
                task.priority,
                clido_core::render::format_date(task.due_date)
            );
        }
    }
    Ok(())
}

async fn cmd_remove(db: &Db, kind: Kind, id: i64) -> Result<()> {
    match kind {
        Kind::Project => {
            let removed = remove_subtree(&ProjectTree::new(db), id)
                .await
                .with_context(|| format!("removing project {id}"))?;
            println!("Project (ID: {id}) and {} subproject(s) removed.", removed - 1);
        }
        Kind::Task => {
            let removed = remove_subtree(&TaskTree::new(db), id)
                .await
                .with_context(|| format!("removing task {id}"))?;
            println!("Task (ID: {id}) and {} subtask(s) removed.", removed - 1);
        }
    }
    Ok(())
}

async fn cmd_toggle(db: &Db, id: i64, recursive: bool) -> Result<()> {
    let toggled = toggle_subtree(db, id, recursive)
        .await
        .with_context(|| format!("toggling task {id}"))?;

    for task in &toggled {
        let status = if task.task_completed {
            "completed"
        } else {
            "uncompleted"
        };
        println!("Task '{}' (ID: {}) marked as {status}.", task.name, task.id);
    }
    Ok(())
}

async fn cmd_list(
    db: &Db,
    kind: ListKind,
    project: Option<String>,
    json: bool,
    tree: bool,
) -> Result<()> {
    match kind {
        ListKind::Projects => {
            if let Some(ident) = project {
                anyhow::bail!("--project '{ident}' only filters `list tasks`");
            }
            let projects = db.list_projects().await.context("listing projects")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if tree {
                print!("{}", project_tree(&projects));
            } else {
                println!("Projects:");
                print!("{}", project_table(&projects).render());
            }
        }
        ListKind::Tasks => {
            let tasks = match project.as_deref() {
                Some(ident) => {
                    let project = resolve_project(db, ident)
                        .await
                        .with_context(|| format!("looking up project '{ident}'"))?;
                    if !json {
                        println!("Tasks in project '{}':", project.name);
                    }
                    db.list_tasks_for_project(project.id)
                        .await
                        .context("listing tasks")?
                }
                None => {
                    if !json {
                        println!("All Tasks:");
                    }
                    db.list_tasks().await.context("listing tasks")?
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tree {
                print!("{}", task_tree(&tasks));
            } else {
                let projects = db.list_projects().await.context("listing projects")?;
                let outside_parents = parents_outside(db, &tasks).await?;
                let parent_names: HashMap<i64, &str> = outside_parents
                    .iter()
                    .map(|t| (t.id, t.name.as_str()))
                    .collect();
                let now = Local::now().naive_local();
                print!(
                    "{}",
                    task_table(&tasks, &projects, &parent_names, now).render()
                );
            }
        }
    }
    Ok(())
}

/// Parent tasks referenced from `tasks` but not contained in it.
async fn parents_outside(db: &Db, tasks: &[Task]) -> Result<Vec<Task>> {
    let mut parents = Vec::new();
    for parent_id in tasks.iter().filter_map(|t| t.parent_task_id) {
        if tasks.iter().any(|t| t.id == parent_id) || parents.iter().any(|p: &Task| p.id == parent_id) {
            continue;
        }
        match db.get_task(parent_id).await {
            Ok(parent) => parents.push(parent),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e).context("looking up parent task"),
        }
    }
    Ok(parents)
}

pub fn cmd_completion(shell: Shell) {
    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

pub fn cmd_version() {
    println!(
        "clido version {}\nOS/Arch: {}/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn project_filter_is_rejected_when_listing_projects() {
        let db = Db::connect_in_memory().await.unwrap();

        let err = cmd_list(&db, ListKind::Projects, Some("work".into()), false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("list tasks"));
        assert!(cmd_list(&db, ListKind::Projects, None, false, false).await.is_ok());
    }
}
