use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use clido_core::Priority;

/// Projects and tasks from the terminal.
/// Storage defaults to <data dir>/clido/data.db, or a path passed via --db.
#[derive(Parser)]
#[command(name = "clido", version, about = "CLI to-do list manager")]
pub struct Cli {
    /// Path to the SQLite database file.
    #[arg(long, global = true, env = "CLIDO_DB")]
    pub db: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    Project,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    Projects,
    Tasks,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new project or task.
    New {
        #[command(subcommand)]
        target: NewTarget,
    },

    /// Edit an existing project or task.
    Edit {
        #[command(subcommand)]
        target: EditTarget,
    },

    /// Remove a project or task along with all its subprojects or subtasks.
    Remove {
        kind: Kind,
        id: i64,
    },

    /// Toggle task completion status.
    Toggle {
        id: i64,
        /// Also toggle every subtask, each one flipping its own state.
        #[arg(short, long)]
        recursive: bool,
    },

    /// List projects or tasks.
    List {
        kind: ListKind,
        /// Only tasks of this project (name or ID). Rejected with `projects`.
        #[arg(short, long)]
        project: Option<String>,
        /// Output records as JSON.
        #[arg(short, long)]
        json: bool,
        /// Render as a tree across parent-child relationships.
        #[arg(short, long)]
        tree: bool,
    },

    /// Generate shell completion scripts.
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version and platform information.
    Version,
}

#[derive(Subcommand)]
pub enum NewTarget {
    Project {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Parent project name or ID.
        #[arg(short, long)]
        project: Option<String>,
    },
    Task {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Owning project name or ID.
        #[arg(short, long)]
        project: String,
        /// Parent task ID.
        #[arg(short, long)]
        task: Option<String>,
        /// Due date: YYYY-MM-DD HH:MM or YYYY-MM-DD.
        #[arg(short = 'D', long)]
        due: Option<String>,
        /// high | medium | low | none, or 1-4.
        #[arg(short = 'r', long)]
        priority: Option<Priority>,
    },
}

#[derive(Subcommand)]
pub enum EditTarget {
    Project {
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// New parent project name or ID.
        #[arg(short, long)]
        project: Option<String>,
    },
    Task {
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// New parent task ID.
        #[arg(short, long)]
        task: Option<String>,
        #[arg(short = 'D', long)]
        due: Option<String>,
        #[arg(short = 'r', long)]
        priority: Option<Priority>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn non_numeric_ids_are_rejected() {
        assert!(Cli::try_parse_from(["clido", "remove", "task", "abc"]).is_err());
        assert!(Cli::try_parse_from(["clido", "toggle", "3", "-r"]).is_ok());
    }

    #[test]
    fn priority_accepts_names_and_codes() {
        let cli = Cli::try_parse_from([
            "clido", "new", "task", "-n", "ship", "-p", "work", "--priority", "high",
        ])
        .unwrap();
        match cli.command {
            Commands::New {
                target: NewTarget::Task { priority, .. },
            } => assert_eq!(priority, Some(Priority::High)),
            _ => panic!("expected new task"),
        }

        assert!(
            Cli::try_parse_from(["clido", "new", "task", "-n", "x", "-p", "w", "-r", "9"]).is_err()
        );
    }
}
