//! Multi-node operations over the project and task forests.
//!
//! Trees are never held in memory between calls; every cascade walks the
//! parent-id relation through the gateway. Nodes touched before a failure stay
//! touched: there is no transaction around a cascade.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use chrono::Utc;

use crate::db::Db;
use crate::error::{EntityKind, Error, Result};
use crate::models::{Project, Task};

/// A record that sits in a parent-pointer forest.
pub trait Hierarchical {
    fn id(&self) -> i64;
    fn parent_id(&self) -> Option<i64>;
    fn display_name(&self) -> &str;
}

impl Hierarchical for Project {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_project_id
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

impl Hierarchical for Task {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_task_id
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// What a cascade needs from storage for one entity kind.
pub trait NodeStore {
    type Node: Hierarchical;

    const KIND: EntityKind;

    fn get(&self, id: i64) -> impl Future<Output = Result<Self::Node>>;

    /// Direct children of `id`.
    fn children(&self, id: i64) -> impl Future<Output = Result<Vec<Self::Node>>>;

    /// Removes the single node `id`. Its children must already be gone.
    fn remove(&self, id: i64) -> impl Future<Output = Result<()>>;
}

pub struct ProjectTree<'a> {
    db: &'a Db,
}

impl<'a> ProjectTree<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }
}

impl NodeStore for ProjectTree<'_> {
    type Node = Project;

    const KIND: EntityKind = EntityKind::Project;

    async fn get(&self, id: i64) -> Result<Project> {
        self.db.get_project(id).await
    }

    async fn children(&self, id: i64) -> Result<Vec<Project>> {
        self.db.list_subprojects(id).await
    }

    /// Tasks reference their project, so they go first. A task whose parent
    /// lives in another project starts its own subtree, unless an earlier
    /// subtree already took it.
    async fn remove(&self, id: i64) -> Result<()> {
        let tasks = self.db.list_tasks_for_project(id).await?;
        let in_project: HashSet<i64> = tasks.iter().map(|t| t.id).collect();
        let task_tree = TaskTree::new(self.db);
        let mut removed = HashSet::new();

        for root in tasks
            .iter()
            .filter(|t| t.parent_task_id.is_none_or(|p| !in_project.contains(&p)))
        {
            if removed.contains(&root.id) {
                continue;
            }
            let ids = subtree_ids(&task_tree, root.id).await?;
            remove_ids(&task_tree, &ids).await?;
            removed.extend(ids);
        }

        self.db.delete_project(id).await
    }
}

pub struct TaskTree<'a> {
    db: &'a Db,
}

impl<'a> TaskTree<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }
}

impl NodeStore for TaskTree<'_> {
    type Node = Task;

    const KIND: EntityKind = EntityKind::Task;

    async fn get(&self, id: i64) -> Result<Task> {
        self.db.get_task(id).await
    }

    async fn children(&self, id: i64) -> Result<Vec<Task>> {
        self.db.list_subtasks(id).await
    }

    async fn remove(&self, id: i64) -> Result<()> {
        self.db.delete_task(id).await
    }
}

fn context<S: NodeStore>(op: &'static str, id: i64) -> impl FnOnce(Error) -> Error {
    move |source| {
        tracing::warn!(op, entity = %S::KIND, id, error = %source, "cascade aborted");
        Error::Cascade {
            op,
            entity: S::KIND,
            id,
            source: Box::new(source),
        }
    }
}

/// Ids of `root_id` and all its descendants, pre-order, children in store
/// order. A node reached twice is visited once.
pub async fn subtree_ids<S: NodeStore>(store: &S, root_id: i64) -> Result<Vec<i64>> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![root_id];

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        order.push(id);
        let children = store
            .children(id)
            .await
            .map_err(context::<S>("list children of", id))?;
        stack.extend(children.iter().rev().map(Hierarchical::id));
    }

    Ok(order)
}

/// Removes `root_id` and every descendant, leaves first. Returns how many
/// nodes were removed.
pub async fn remove_subtree<S: NodeStore>(store: &S, root_id: i64) -> Result<usize> {
    let ids = subtree_ids(store, root_id).await?;
    remove_ids(store, &ids).await?;
    Ok(ids.len())
}

/// Removes pre-ordered `ids` back to front, so descendants go before
/// ancestors. Stops at the first failure.
async fn remove_ids<S: NodeStore>(store: &S, ids: &[i64]) -> Result<()> {
    for &id in ids.iter().rev() {
        tracing::debug!(entity = %S::KIND, id, "removing");
        store.remove(id).await.map_err(context::<S>("remove", id))?;
    }
    Ok(())
}

/// Flips completion of `root_id`, and of every descendant when `recursive`.
///
/// Each task flips its own state; descendants are not forced to match the
/// root. A task is toggled before its children are listed. Returns the
/// updated tasks in pre-order, root first.
pub async fn toggle_subtree(db: &Db, root_id: i64, recursive: bool) -> Result<Vec<Task>> {
    let tree = TaskTree::new(db);
    let mut toggled = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![root_id];

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let mut task = tree
            .get(id)
            .await
            .map_err(context::<TaskTree>("toggle", id))?;
        task.toggle_completion(Utc::now());
        db.update_task(&mut task)
            .await
            .map_err(context::<TaskTree>("toggle", id))?;
        tracing::debug!(id, completed = task.task_completed, "toggled task");
        toggled.push(task);

        if recursive {
            let children = tree
                .children(id)
                .await
                .map_err(context::<TaskTree>("list children of", id))?;
            stack.extend(children.iter().rev().map(|c| c.id));
        }
    }

    Ok(toggled)
}

/// One node of a projected forest.
#[derive(Debug)]
pub struct TreeNode<'a, T> {
    pub item: &'a T,
    pub children: Vec<TreeNode<'a, T>>,
}

/// Projects a flat list into a forest keyed on `parent_id`.
///
/// Roots are items without a parent; input order is kept among siblings.
/// An item whose parent is not in `items` is dropped, not promoted.
pub fn build_forest<T: Hierarchical>(items: &[T]) -> Vec<TreeNode<'_, T>> {
    let mut children_of: HashMap<i64, Vec<&T>> = HashMap::new();
    for item in items {
        if let Some(parent) = item.parent_id() {
            children_of.entry(parent).or_default().push(item);
        }
    }

    items
        .iter()
        .filter(|item| item.parent_id().is_none())
        .map(|root| attach(root, &children_of))
        .collect()
}

fn attach<'a, T: Hierarchical>(item: &'a T, children_of: &HashMap<i64, Vec<&'a T>>) -> TreeNode<'a, T> {
    let children = children_of
        .get(&item.id())
        .map(|kids| kids.iter().map(|kid| attach(*kid, children_of)).collect())
        .unwrap_or_default();

    TreeNode { item, children }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use super::*;

    struct Node {
        id: i64,
        parent: Option<i64>,
    }

    impl Hierarchical for Node {
        fn id(&self) -> i64 {
            self.id
        }

        fn parent_id(&self) -> Option<i64> {
            self.parent
        }

        fn display_name(&self) -> &str {
            "node"
        }
    }

    fn node(id: i64, parent: Option<i64>) -> Node {
        Node { id, parent }
    }

    /// Parent links in memory; removing `fail_on` reports a storage error.
    struct MemoryTree {
        parents: RefCell<BTreeMap<i64, Option<i64>>>,
        fail_on: i64,
    }

    impl MemoryTree {
        fn new(links: &[(i64, Option<i64>)], fail_on: i64) -> Self {
            Self {
                parents: RefCell::new(links.iter().copied().collect()),
                fail_on,
            }
        }

        fn contains(&self, id: i64) -> bool {
            self.parents.borrow().contains_key(&id)
        }
    }

    impl NodeStore for MemoryTree {
        type Node = Node;

        const KIND: EntityKind = EntityKind::Task;

        async fn get(&self, id: i64) -> Result<Node> {
            self.parents
                .borrow()
                .get(&id)
                .map(|&parent| node(id, parent))
                .ok_or_else(|| Error::not_found(Self::KIND, id))
        }

        async fn children(&self, id: i64) -> Result<Vec<Node>> {
            Ok(self
                .parents
                .borrow()
                .iter()
                .filter(|(_, parent)| **parent == Some(id))
                .map(|(&child, &parent)| node(child, parent))
                .collect())
        }

        async fn remove(&self, id: i64) -> Result<()> {
            if id == self.fail_on {
                return Err(Error::Storage(sqlx::Error::PoolClosed));
            }
            self.parents
                .borrow_mut()
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| Error::not_found(Self::KIND, id))
        }
    }

    #[tokio::test]
    async fn failed_remove_stops_the_cascade_and_keeps_ancestors() {
        let store = MemoryTree::new(&[(1, None), (2, Some(1)), (3, Some(2)), (4, Some(2))], 2);

        let err = remove_subtree(&store, 1).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Cascade { op: "remove", entity: EntityKind::Task, id: 2, .. }
        ));
        assert_eq!(err.kind(), crate::ErrorKind::Storage);

        assert!(!store.contains(3));
        assert!(!store.contains(4));
        assert!(store.contains(2));
        assert!(store.contains(1));
    }

    fn ids<T: Hierarchical>(nodes: &[TreeNode<'_, T>]) -> Vec<i64> {
        nodes.iter().map(|n| n.item.id()).collect()
    }

    #[test]
    fn forest_follows_parent_ids_in_input_order() {
        let items = vec![node(1, None), node(2, Some(1)), node(3, Some(1)), node(4, Some(2))];
        let forest = build_forest(&items);

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].children), vec![2, 3]);
        assert_eq!(ids(&forest[0].children[0].children), vec![4]);
        assert!(forest[0].children[1].children.is_empty());
    }

    #[test]
    fn orphans_are_neither_children_nor_roots() {
        let items = vec![node(1, None), node(5, Some(99)), node(6, Some(5))];
        let forest = build_forest(&items);

        assert_eq!(ids(&forest), vec![1]);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn sibling_order_follows_input_not_id() {
        let items = vec![node(10, None), node(3, Some(10)), node(2, Some(10)), node(1, None)];
        let forest = build_forest(&items);

        assert_eq!(ids(&forest), vec![10, 1]);
        assert_eq!(ids(&forest[0].children), vec![3, 2]);
    }
}
