//! Projects and tasks kept in two parent-pointer forests on SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod render;
pub mod service;

pub use config::Config;
pub use db::Db;
pub use error::{EntityKind, Error, ErrorKind, Result};
pub use hierarchy::{
    Hierarchical, NodeStore, ProjectTree, TaskTree, TreeNode, build_forest, remove_subtree,
    toggle_subtree,
};
pub use models::{NewProject, NewTask, Priority, Project, Task};
