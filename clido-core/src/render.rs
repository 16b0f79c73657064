//! Table and tree layouts for listings. Everything here is pure: callers pass
//! in the records and the clock.

use std::collections::HashMap;
use std::fmt::{self, Write as _};

use chrono::NaiveDateTime;

use crate::hierarchy::{Hierarchical, TreeNode, build_forest};
use crate::models::{Project, Task};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn format_date(date: Option<NaiveDateTime>) -> String {
    match date {
        Some(date) => date.format(DATE_FORMAT).to_string(),
        None => "None".to_string(),
    }
}

/// Whether a task's due date has passed, as of `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PastDue {
    No,
    Yes,
    /// Past the due date, but already completed.
    WasDue,
}

impl PastDue {
    pub fn of(task: &Task, now: NaiveDateTime) -> Self {
        match task.due_date {
            Some(due) if now > due => {
                if task.task_completed {
                    PastDue::WasDue
                } else {
                    PastDue::Yes
                }
            }
            _ => PastDue::No,
        }
    }
}

impl fmt::Display for PastDue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PastDue::No => "no",
            PastDue::Yes => "yes",
            PastDue::WasDue => "was due",
        })
    }
}

/// Word-wraps `text` to lines of at most `width` chars. A word longer than
/// `width` keeps its own line unbroken.
pub fn wrap_text(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let line_len = line.chars().count();
        if line_len > 0 && line_len + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }

    lines.join("\n")
}

/// Bordered text table; cells may span several lines.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (col, cell) in row.iter().enumerate().take(widths.len()) {
                let longest = cell.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                widths[col] = widths[col].max(longest);
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let rule = {
            let mut rule = String::from("+");
            for width in &widths {
                rule.push_str(&"-".repeat(width + 2));
                rule.push('+');
            }
            rule
        };

        let mut out = String::new();
        out.push_str(&rule);
        out.push('\n');
        write_row(&mut out, &self.headers, &widths);
        out.push_str(&rule);
        out.push('\n');
        for row in &self.rows {
            write_row(&mut out, row, &widths);
            out.push_str(&rule);
            out.push('\n');
        }
        out
    }
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let cell_lines: Vec<Vec<&str>> = widths
        .iter()
        .enumerate()
        .map(|(col, _)| {
            cells
                .get(col)
                .map(|c| c.lines().collect())
                .unwrap_or_default()
        })
        .collect();
    let height = cell_lines.iter().map(Vec::len).max().unwrap_or(0).max(1);

    for line in 0..height {
        out.push('|');
        for (col, width) in widths.iter().enumerate() {
            let text = cell_lines[col].get(line).copied().unwrap_or("");
            let _ = write!(out, " {text:<width$} |");
        }
        out.push('\n');
    }
}

fn kind_and_parent<T: Hierarchical>(item: &T, names: &HashMap<i64, &str>) -> (String, String) {
    match item.parent_id() {
        None => ("Parent".to_string(), "None".to_string()),
        Some(parent) => {
            let name = names
                .get(&parent)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("#{parent}"));
            ("Child".to_string(), name)
        }
    }
}

fn names_by_id<T: Hierarchical>(items: &[T]) -> HashMap<i64, &str> {
    items.iter().map(|i| (i.id(), i.display_name())).collect()
}

pub fn project_table(projects: &[Project]) -> Table {
    let names = names_by_id(projects);
    let mut table = Table::new(["ID", "Name", "Description", "Type", "Child Of"]);

    for project in projects {
        let (kind, parent) = kind_and_parent(project, &names);
        table.push_row(vec![
            project.id.to_string(),
            wrap_text(&project.name, 30),
            wrap_text(project.description.as_deref().unwrap_or(""), 50),
            kind,
            parent,
        ]);
    }

    table
}

/// `parent_names` resolves parent tasks that are not themselves in `tasks`.
pub fn task_table(
    tasks: &[Task],
    projects: &[Project],
    parent_names: &HashMap<i64, &str>,
    now: NaiveDateTime,
) -> Table {
    let mut names = parent_names.clone();
    names.extend(names_by_id(tasks));
    let project_names = names_by_id(projects);

    let mut table = Table::new([
        "ID",
        "Name",
        "Description",
        "Due Date",
        "Completed",
        "Past Due",
        "Priority",
        "Project",
        "Type",
        "Child Of",
    ]);

    for task in tasks {
        let (kind, parent) = kind_and_parent(task, &names);
        let project = project_names.get(&task.project_id).copied().unwrap_or("");
        table.push_row(vec![
            task.id.to_string(),
            wrap_text(&task.name, 20),
            wrap_text(task.description.as_deref().unwrap_or(""), 30),
            format_date(task.due_date),
            task.task_completed.to_string(),
            PastDue::of(task, now).to_string(),
            task.priority.to_string(),
            wrap_text(project, 20),
            kind,
            parent,
        ]);
    }

    table
}

fn write_tree<T, F>(out: &mut String, nodes: &[TreeNode<'_, T>], guide: &str, details: &F)
where
    T: Hierarchical,
    F: Fn(&T) -> Vec<String>,
{
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let (branch, next_guide) = if last {
            ("└── ", format!("{guide}    "))
        } else {
            ("├── ", format!("{guide}│   "))
        };

        let _ = writeln!(
            out,
            "{guide}{branch}{} (ID: {})",
            node.item.display_name(),
            node.item.id()
        );
        for line in details(node.item) {
            let line = format!("{next_guide}{line}");
            let _ = writeln!(out, "{}", line.trim_end());
        }
        write_tree(out, &node.children, &next_guide, details);
    }
}

pub fn project_tree(projects: &[Project]) -> String {
    let mut out = String::new();
    write_tree(&mut out, &build_forest(projects), "", &|_: &Project| Vec::new());
    out
}

pub fn task_tree(tasks: &[Task]) -> String {
    let mut out = String::new();
    write_tree(&mut out, &build_forest(tasks), "", &|task: &Task| {
        vec![
            format!(
                "Description: {}",
                task.description.as_deref().unwrap_or("")
            ),
            format!(
                "Due Date: {}, Completed: {}, Priority: {}",
                format_date(task.due_date),
                task.task_completed,
                task.priority
            ),
        ]
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn project(id: i64, name: &str, parent: Option<i64>) -> Project {
        let stamp = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        Project {
            id,
            name: name.into(),
            description: None,
            parent_project_id: parent,
            creation_date: stamp,
            last_modified_date: stamp,
        }
    }

    fn task(id: i64, name: &str, parent: Option<i64>) -> Task {
        let stamp = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        Task {
            id,
            name: name.into(),
            description: None,
            project_id: 1,
            parent_task_id: parent,
            due_date: None,
            completion_date: None,
            task_completed: false,
            priority: Priority::None,
            creation_date: stamp,
            last_updated_date: stamp,
        }
    }

    #[test]
    fn wrap_keeps_short_text_and_breaks_on_words() {
        assert_eq!(wrap_text("short", 10), "short");
        assert_eq!(
            wrap_text("This is a very long sentence that needs to be wrapped.", 20),
            "This is a very long\nsentence that needs\nto be wrapped."
        );
        assert_eq!(wrap_text("a supercalifragilistic b", 5), "a\nsupercalifragilistic\nb");
    }

    #[test]
    fn past_due_depends_on_completion() {
        let now = at(2024, 9, 10, 12, 0);
        let mut overdue = task(1, "overdue", None);
        overdue.due_date = Some(now - Duration::days(1));
        assert_eq!(PastDue::of(&overdue, now), PastDue::Yes);

        overdue.task_completed = true;
        assert_eq!(PastDue::of(&overdue, now), PastDue::WasDue);

        let mut upcoming = task(2, "upcoming", None);
        upcoming.due_date = Some(now + Duration::hours(1));
        assert_eq!(PastDue::of(&upcoming, now), PastDue::No);
        assert_eq!(PastDue::of(&task(3, "undated", None), now), PastDue::No);
    }

    #[test]
    fn table_pads_cells_and_expands_wrapped_rows() {
        let mut table = Table::new(["ID", "Name"]);
        table.push_row(vec!["1".into(), "alpha\nbeta".into()]);

        let expected = "\
+----+-------+
| ID | Name  |
+----+-------+
| 1  | alpha |
|    | beta  |
+----+-------+
";
        assert_eq!(table.render(), expected);
    }

    #[test]
    fn project_table_names_parents() {
        let projects = vec![project(1, "home", None), project(2, "garden", Some(1))];
        let rendered = project_table(&projects).render();

        assert!(rendered.contains("| 2  | garden | "));
        assert!(rendered.contains("| Child  | home     |"));
        assert!(rendered.contains("| Parent | None     |"));
    }

    #[test]
    fn project_tree_draws_connectors() {
        let projects = vec![
            project(1, "home", None),
            project(2, "garden", Some(1)),
            project(3, "kitchen", Some(1)),
            project(4, "shed", Some(2)),
            project(5, "work", None),
        ];
        let expected = "\
├── home (ID: 1)
│   ├── garden (ID: 2)
│   │   └── shed (ID: 4)
│   └── kitchen (ID: 3)
└── work (ID: 5)
";
        assert_eq!(project_tree(&projects), expected);
    }

    #[test]
    fn task_tree_prints_details_under_each_node() {
        let mut root = task(1, "release", None);
        root.due_date = Some(at(2024, 10, 1, 9, 30));
        root.priority = Priority::High;
        let child = task(2, "changelog", Some(1));

        let rendered = task_tree(&[root, child]);
        let expected = "\
└── release (ID: 1)
    Description:
    Due Date: 2024-10-01 09:30, Completed: false, Priority: High
    └── changelog (ID: 2)
        Description:
        Due Date: None, Completed: false, Priority: None
";
        assert_eq!(rendered, expected);
    }
}
