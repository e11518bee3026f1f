//! The in-memory item tree and everything that edits it.
//!
//! Two forests are kept: `staging`, which every edit touches, and `main`, the
//! last saved copy. They are separately owned values, so nothing done to one
//! can show up in the other; `commit` clones staging into main.
//!
//! All lookups walk the staging forest level by level with [`Queue`]. Nothing
//! in here performs I/O or fails; an id that is not found leaves the store as
//! it was and the operation reports `false`/`None`.

use std::cell::Cell;

use tracing::debug;

use crate::events::{Listeners, Subscription};
use zeroize::Zeroize;

use crate::models::{zeroize_forest, Node, NodeData};
use crate::queue::Queue;

/// Emitted after the selection or the expanded set changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    ActiveChanged(Option<String>),
    ExpandedChanged(Vec<String>),
}

pub struct ItemStore {
    active: Option<Node>,
    item_count: u64,
    staging: Vec<Node>,
    main: Vec<Node>,
    expanded_ids: Vec<String>,
    dirty: Cell<Option<bool>>,
    listeners: Listeners<StoreEvent>,
}

impl ItemStore {
    /// The active node is the one named by `selected_id`, or the first root
    /// when that id is absent or no longer in the forest. `expanded_ids` is
    /// taken as is, even if some ids point at nothing.
    pub fn new(forest: Vec<Node>, selected_id: Option<&str>, expanded_ids: Vec<String>) -> Self {
        let active = selected_id
            .and_then(|id| find_node(&forest, id))
            .or_else(|| forest.first())
            .cloned();
        Self {
            active,
            item_count: 1,
            main: forest.clone(),
            staging: forest,
            expanded_ids,
            dirty: Cell::new(Some(false)),
            listeners: Listeners::new(),
        }
    }

    pub fn staging(&self) -> &[Node] {
        &self.staging
    }

    pub fn main(&self) -> &[Node] {
        &self.main
    }

    pub fn active(&self) -> Option<&Node> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|node| node.id.as_str())
    }

    pub fn expanded_ids(&self) -> &[String] {
        &self.expanded_ids
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded_ids.iter().any(|expanded| expanded == id)
    }

    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        find_node(&self.staging, id)
    }

    /// Id of the node holding `id` as a child; `None` for roots and unknown ids.
    pub fn parent_id(&self, id: &str) -> Option<&str> {
        let path = locate(&self.staging, id)?;
        let (_, parent_path) = path.split_last()?;
        node_at(&self.staging, parent_path).map(|parent| parent.id.as_str())
    }

    pub fn subscribe<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.listeners.unsubscribe(subscription)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        if let Some(dirty) = self.dirty.get() {
            return dirty;
        }
        let dirty = self.staging != self.main;
        self.dirty.set(Some(dirty));
        dirty
    }

    pub fn switch_active_node(&mut self, id: &str) -> bool {
        match find_node(&self.staging, id) {
            Some(node) => {
                self.active = Some(node.clone());
                self.notify_active();
                true
            }
            None => {
                debug!(id, "switch target not found");
                false
            }
        }
    }

    pub fn update_active_node(&mut self, node: Option<Node>) {
        self.active = node;
        self.notify_active();
    }

    /// Copies `node.data` onto the staging node with the same id. Children and id are kept.
    pub fn update_item(&mut self, node: &Node) -> bool {
        match find_node_mut(&mut self.staging, &node.id) {
            Some(target) => {
                target.data = node.data.clone();
                self.invalidate();
                true
            }
            None => {
                debug!(id = %node.id, "update target not found");
                false
            }
        }
    }

    pub fn edit_active<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut NodeData),
    {
        let Some(mut updated) = self.active.clone() else {
            return false;
        };
        edit(&mut updated.data);
        let written = self.update_item(&updated);
        self.update_active_node(Some(updated));
        written
    }

    pub fn rename_item(&mut self, id: &str, title: &str) -> bool {
        let Some(node) = find_node_mut(&mut self.staging, id) else {
            return false;
        };
        node.data.title = title.to_string();
        if let Some(active) = self.active.as_mut().filter(|active| active.id == id) {
            active.data.title = title.to_string();
        }
        self.invalidate();
        true
    }

    pub fn add_new_top_item(&mut self) -> String {
        let node = self.next_item();
        let id = node.id.clone();
        self.active = Some(node.clone());
        self.staging.push(node);
        self.invalidate();
        self.notify_active();
        id
    }

    /// Unknown parents change nothing, the title counter included.
    pub fn add_new_sub_item_by_id(&mut self, parent_id: &str) -> Option<String> {
        let Some(path) = locate(&self.staging, parent_id) else {
            debug!(parent_id, "parent for new item not found");
            return None;
        };
        let node = self.next_item();
        let id = node.id.clone();
        self.active = Some(node.clone());
        node_at_mut(&mut self.staging, &path)?.children_mut().push(node);
        self.invalidate();
        self.notify_active();
        Some(id)
    }

    /// The parent of the removed node becomes active. For a removed root the
    /// new first root does, or nothing when no roots are left. This happens
    /// whatever was active before.
    pub fn remove_item_and_children(&mut self, id: &str) -> bool {
        let Some(path) = locate(&self.staging, id) else {
            debug!(id, "removal target not found");
            return false;
        };
        let Some((&index, parent_path)) = path.split_last() else {
            return false;
        };

        if parent_path.is_empty() {
            self.staging.remove(index);
        } else {
            let Some(parent) = node_at_mut(&mut self.staging, parent_path) else {
                return false;
            };
            if let Some(children) = parent.children.as_mut() {
                children.remove(index);
                if children.is_empty() {
                    parent.children = None;
                }
            }
        }

        self.active = if parent_path.is_empty() {
            self.staging.first().cloned()
        } else {
            node_at(&self.staging, parent_path).cloned()
        };
        self.invalidate();
        self.notify_active();
        true
    }

    /// Moves the subtree at `id` to the end of `new_parent`'s children, or of
    /// the root list for `None`. The moved node becomes active.
    ///
    /// Refused when either id is unknown or the target lies inside the moved subtree.
    pub fn move_item(&mut self, id: &str, new_parent: Option<&str>) -> bool {
        let Some(path) = locate(&self.staging, id) else {
            return false;
        };
        let target_path = match new_parent {
            Some(parent_id) => match locate(&self.staging, parent_id) {
                Some(target) if target.starts_with(&path) => {
                    debug!(id, parent_id, "refusing to move an item into its own subtree");
                    return false;
                }
                Some(target) => Some(target),
                None => return false,
            },
            None => None,
        };

        let Some(node) = detach(&mut self.staging, &path) else {
            return false;
        };
        let moved = node.clone();
        match target_path {
            Some(mut target) => {
                // Later siblings of the detached node shifted one slot left.
                let depth = path.len() - 1;
                if target.len() > depth
                    && target[..depth] == path[..depth]
                    && target[depth] > path[depth]
                {
                    target[depth] -= 1;
                }
                match node_at_mut(&mut self.staging, &target) {
                    Some(parent) => parent.children_mut().push(node),
                    // Never lose a detached subtree.
                    None => self.staging.push(node),
                }
            }
            None => self.staging.push(node),
        }

        self.active = Some(moved);
        self.invalidate();
        self.notify_active();
        true
    }

    pub fn replace_staging(&mut self, forest: Vec<Node>) {
        self.staging = forest;
        self.invalidate();
    }

    pub fn commit(&mut self) {
        self.main = self.staging.clone();
        self.dirty.set(Some(false));
    }

    /// Overwrites every title and credential held by the store and empties it.
    ///
    /// No events are emitted, so the persisted selection survives.
    pub fn wipe(&mut self) {
        zeroize_forest(&mut self.staging);
        zeroize_forest(&mut self.main);
        if let Some(mut active) = self.active.take() {
            active.zeroize();
        }
        self.dirty.set(Some(false));
    }

    pub fn set_expanded_ids(&mut self, ids: Vec<String>) {
        self.expanded_ids = ids;
        let event = StoreEvent::ExpandedChanged(self.expanded_ids.clone());
        self.listeners.emit(&event);
    }

    pub fn set_expanded(&mut self, id: &str, expanded: bool) {
        if self.is_expanded(id) == expanded {
            return;
        }
        let mut ids = self.expanded_ids.clone();
        if expanded {
            ids.push(id.to_string());
        } else {
            ids.retain(|existing| existing != id);
        }
        self.set_expanded_ids(ids);
    }

    fn next_item(&mut self) -> Node {
        let node = Node::titled(&format!("item{}", self.item_count));
        self.item_count += 1;
        node
    }

    fn invalidate(&self) {
        self.dirty.set(None);
    }

    fn notify_active(&mut self) {
        let event = StoreEvent::ActiveChanged(self.active_id().map(str::to_string));
        self.listeners.emit(&event);
    }
}

pub fn find_node<'a>(forest: &'a [Node], id: &str) -> Option<&'a Node> {
    let mut queue: Queue<&Node> = forest.iter().collect();
    while let Some(node) = queue.dequeue() {
        if node.id == id {
            return Some(node);
        }
        queue.extend(node.children());
    }
    None
}

fn find_node_mut<'a>(forest: &'a mut [Node], id: &str) -> Option<&'a mut Node> {
    let path = locate(forest, id)?;
    node_at_mut(forest, &path)
}

/// Child-index path from the root list down to `id`, found level by level.
///
/// Every visited node leaves a `(parent slot, index)` entry in `trail`, so
/// the path is rebuilt from the match without a second walk.
fn locate(forest: &[Node], id: &str) -> Option<Vec<usize>> {
    let mut trail: Vec<(Option<usize>, usize)> = Vec::new();
    let mut queue: Queue<(&Node, Option<usize>, usize)> = forest
        .iter()
        .enumerate()
        .map(|(index, node)| (node, None, index))
        .collect();

    while let Some((node, parent_slot, index)) = queue.dequeue() {
        let slot = trail.len();
        trail.push((parent_slot, index));
        if node.id == id {
            let mut path = Vec::new();
            let mut cursor = Some(slot);
            while let Some(current) = cursor {
                let (parent, index) = trail[current];
                path.push(index);
                cursor = parent;
            }
            path.reverse();
            return Some(path);
        }
        queue.extend(
            node.children()
                .iter()
                .enumerate()
                .map(|(child_index, child)| (child, Some(slot), child_index)),
        );
    }
    None
}

fn node_at<'a>(forest: &'a [Node], path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let mut node = forest.get(*first)?;
    for &index in rest {
        node = node.children().get(index)?;
    }
    Some(node)
}

fn node_at_mut<'a>(forest: &'a mut [Node], path: &[usize]) -> Option<&'a mut Node> {
    let (first, rest) = path.split_first()?;
    let mut node = forest.get_mut(*first)?;
    for &index in rest {
        node = node.children.as_mut()?.get_mut(index)?;
    }
    Some(node)
}

fn detach(forest: &mut Vec<Node>, path: &[usize]) -> Option<Node> {
    let (&index, parent_path) = path.split_last()?;
    if parent_path.is_empty() {
        return (index < forest.len()).then(|| forest.remove(index));
    }
    let parent = node_at_mut(forest, parent_path)?;
    let children = parent.children.as_mut()?;
    if index >= children.len() {
        return None;
    }
    let node = children.remove(index);
    if children.is_empty() {
        parent.children = None;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credential;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    fn node(id: &str, children: Vec<Node>) -> Node {
        let mut node = Node::titled(id).with_children(children);
        node.id = id.to_string();
        node
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    fn recorded(store: &mut ItemStore) -> Rc<RefCell<Vec<StoreEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        events
    }

    fn balanced(prefix: &str, depth: usize, fan_out: usize) -> Node {
        let children = if depth <= 1 {
            Vec::new()
        } else {
            (0..fan_out)
                .map(|i| balanced(&format!("{prefix}.{i}"), depth - 1, fan_out))
                .collect()
        };
        node(prefix, children)
    }

    fn collect_ids(forest: &[Node], out: &mut Vec<String>) {
        for n in forest {
            out.push(n.id.clone());
            collect_ids(n.children(), out);
        }
    }

    #[test]
    fn starts_on_stored_selection_or_first_root() {
        let forest = vec![node("a", vec![node("b", vec![])]), node("c", vec![])];

        let store = ItemStore::new(forest.clone(), Some("b"), vec![]);
        assert_eq!(store.active_id(), Some("b"));

        let store = ItemStore::new(forest.clone(), Some("gone"), vec!["ghost".into()]);
        assert_eq!(store.active_id(), Some("a"));
        assert_eq!(store.expanded_ids(), ["ghost".to_string()]);

        let store = ItemStore::new(Vec::new(), None, vec![]);
        assert!(store.active().is_none());
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn new_items_get_distinct_ids_and_counter_titles() {
        let mut store = ItemStore::new(Vec::new(), None, vec![]);
        let mut seen = HashSet::new();

        let top = store.add_new_top_item();
        assert!(seen.insert(top.clone()));
        assert_eq!(store.active_id(), Some(top.as_str()));
        assert_eq!(store.staging()[0].data.title, "item1");

        for _ in 0..20 {
            let parent = store.active_id().unwrap().to_string();
            let child = store.add_new_sub_item_by_id(&parent).unwrap();
            assert!(seen.insert(child.clone()));
            assert_eq!(store.active_id(), Some(child.as_str()));
            assert!(seen.insert(store.add_new_top_item()));
            store.switch_active_node(&child);
        }
        assert_eq!(store.item_count(), 42);
        assert_eq!(store.find(&top).unwrap().children()[0].data.title, "item2");
    }

    #[test]
    fn sub_item_for_unknown_parent_is_a_no_op() {
        let mut store = ItemStore::new(vec![node("a", vec![])], None, vec![]);
        let events = recorded(&mut store);

        assert_eq!(store.add_new_sub_item_by_id("missing"), None);
        assert_eq!(store.item_count(), 1);
        assert!(!store.has_unsaved_changes());
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn counter_is_never_reused_after_deletion() {
        let mut store = ItemStore::new(Vec::new(), None, vec![]);
        let first = store.add_new_top_item();
        store.remove_item_and_children(&first);
        store.add_new_top_item();
        assert_eq!(store.staging()[0].data.title, "item2");
    }

    #[test]
    fn deleting_a_child_focuses_its_parent() {
        let forest = vec![node("A", vec![node("B", vec![]), node("C", vec![])])];
        let mut store = ItemStore::new(forest, Some("B"), vec![]);
        let events = recorded(&mut store);

        assert!(store.remove_item_and_children("B"));

        assert_eq!(store.active_id(), Some("A"));
        assert_eq!(ids(store.staging()), vec!["A"]);
        assert_eq!(ids(store.staging()[0].children()), vec!["C"]);
        assert_eq!(ids(store.active().unwrap().children()), vec!["C"]);
        assert_eq!(
            *events.borrow(),
            vec![StoreEvent::ActiveChanged(Some("A".into()))]
        );
    }

    #[test]
    fn deleting_an_unselected_child_still_focuses_its_parent() {
        let forest = vec![
            node("A", vec![node("B", vec![node("D", vec![])])]),
            node("X", vec![]),
        ];
        let mut store = ItemStore::new(forest, Some("X"), vec![]);

        assert!(store.remove_item_and_children("D"));
        assert_eq!(store.active_id(), Some("B"));
        assert!(store.find("B").unwrap().children.is_none());
    }

    #[test]
    fn deleting_a_root_promotes_the_next_root() {
        let forest = vec![node("X", vec![]), node("Y", vec![]), node("Z", vec![])];
        let mut store = ItemStore::new(forest, Some("X"), vec![]);

        assert!(store.remove_item_and_children("X"));
        assert_eq!(store.active_id(), Some("Y"));
        assert_eq!(ids(store.staging()), vec!["Y", "Z"]);

        assert!(store.remove_item_and_children("Z"));
        assert_eq!(store.active_id(), Some("Y"));
    }

    #[test]
    fn deleting_the_last_root_clears_the_active_node() {
        let mut store = ItemStore::new(vec![node("X", vec![node("kid", vec![])])], None, vec![]);
        let events = recorded(&mut store);

        assert!(store.remove_item_and_children("X"));
        assert!(store.active().is_none());
        assert!(store.staging().is_empty());
        assert!(store.find("kid").is_none());
        assert_eq!(*events.borrow(), vec![StoreEvent::ActiveChanged(None)]);
    }

    #[test]
    fn deleting_an_unknown_id_changes_nothing() {
        let forest = vec![node("A", vec![node("B", vec![])])];
        let mut store = ItemStore::new(forest.clone(), Some("B"), vec![]);
        let events = recorded(&mut store);

        assert!(!store.remove_item_and_children("nope"));
        assert_eq!(store.staging(), forest.as_slice());
        assert_eq!(store.active_id(), Some("B"));
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn dirty_flag_follows_edits_and_commits() {
        let mut store = ItemStore::new(Vec::new(), None, vec![]);
        assert!(!store.has_unsaved_changes());

        store.add_new_top_item();
        assert!(store.has_unsaved_changes());

        store.commit();
        assert!(!store.has_unsaved_changes());
        assert_eq!(store.main(), store.staging());
    }

    #[test]
    fn reverting_an_edit_clears_the_dirty_flag() {
        let mut store = ItemStore::new(vec![node("A", vec![])], None, vec![]);
        store.rename_item("A", "renamed");
        assert!(store.has_unsaved_changes());
        store.rename_item("A", "A");
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn main_is_independent_of_later_staging_edits() {
        let mut store = ItemStore::new(Vec::new(), None, vec![]);
        let root = store.add_new_top_item();
        store.commit();
        let snapshot = store.main().to_vec();

        store.add_new_sub_item_by_id(&root);
        store.edit_active(|data| data.credentials.push(Credential::new("pin", "0000")));
        store.rename_item(&root, "changed");

        assert_eq!(store.main(), snapshot.as_slice());
        assert!(store.has_unsaved_changes());
    }

    #[test]
    fn every_node_in_a_deep_forest_can_be_activated() {
        let forest = vec![balanced("r", 5, 3)];
        let mut all = Vec::new();
        collect_ids(&forest, &mut all);
        assert_eq!(all.len(), 1 + 3 + 9 + 27 + 81);

        let mut store = ItemStore::new(forest, None, vec![]);
        for id in &all {
            assert!(store.switch_active_node(id));
            assert_eq!(store.active_id(), Some(id.as_str()));
            assert_eq!(store.active().unwrap(), store.find(id).unwrap());
        }
    }

    #[test]
    fn switch_miss_keeps_the_current_node() {
        let mut store = ItemStore::new(vec![node("A", vec![])], None, vec![]);
        let events = recorded(&mut store);
        assert!(!store.switch_active_node("missing"));
        assert_eq!(store.active_id(), Some("A"));
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn update_of_unknown_item_leaves_staging_untouched() {
        let forest = vec![node("A", vec![node("B", vec![])])];
        let mut store = ItemStore::new(forest.clone(), None, vec![]);

        let mut stranger = Node::titled("stranger");
        stranger.id = "nonexistent".into();
        stranger.data.credentials.push(Credential::new("x", "y"));

        assert!(!store.update_item(&stranger));
        assert_eq!(store.staging(), forest.as_slice());
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn update_item_replaces_data_but_keeps_children() {
        let forest = vec![node("A", vec![node("B", vec![])])];
        let mut store = ItemStore::new(forest, None, vec![]);

        let mut edited = node("A", vec![]);
        edited.data.title = "Accounts".into();
        assert!(store.update_item(&edited));

        let a = store.find("A").unwrap();
        assert_eq!(a.data.title, "Accounts");
        assert_eq!(ids(a.children()), vec!["B"]);
        // updateItem alone leaves the active snapshot as it was.
        assert_eq!(store.active().unwrap().data.title, "A");
    }

    #[test]
    fn update_active_node_accepts_none_and_notifies() {
        let mut store = ItemStore::new(vec![node("A", vec![])], None, vec![]);
        let events = recorded(&mut store);
        store.update_active_node(None);
        assert!(store.active().is_none());
        assert_eq!(*events.borrow(), vec![StoreEvent::ActiveChanged(None)]);
    }

    #[test]
    fn edit_active_updates_tree_and_snapshot() {
        let mut store = ItemStore::new(vec![node("A", vec![])], None, vec![]);
        assert!(store.edit_active(|data| {
            data.title = "Mail".into();
            data.credentials.push(Credential::new("user", "me@example.com"));
        }));
        assert_eq!(store.find("A").unwrap().data.title, "Mail");
        assert_eq!(store.active().unwrap().data.credentials.len(), 1);
    }

    #[test]
    fn replace_staging_marks_changes_but_keeps_main_and_active() {
        let mut store = ItemStore::new(vec![node("A", vec![])], None, vec![]);
        store.replace_staging(vec![node("imported", vec![])]);

        assert!(store.has_unsaved_changes());
        assert_eq!(ids(store.main()), vec!["A"]);
        assert_eq!(store.active_id(), Some("A"));

        store.replace_staging(vec![node("A", vec![])]);
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn move_reparents_subtrees() {
        let forest = vec![
            node("A", vec![node("B", vec![node("C", vec![])])]),
            node("D", vec![]),
        ];
        let mut store = ItemStore::new(forest, None, vec![]);

        assert!(store.move_item("B", Some("D")));
        assert_eq!(store.active_id(), Some("B"));
        assert!(store.find("A").unwrap().children.is_none());
        assert_eq!(ids(store.find("D").unwrap().children()), vec!["B"]);
        assert_eq!(store.parent_id("C"), Some("B"));

        assert!(store.move_item("C", None));
        assert_eq!(ids(store.staging()), vec!["A", "D", "C"]);
    }

    #[test]
    fn move_adjusts_for_shifted_siblings() {
        let forest = vec![node("A", vec![]), node("B", vec![node("B1", vec![])])];
        let mut store = ItemStore::new(forest, None, vec![]);
        assert!(store.move_item("A", Some("B1")));
        assert_eq!(ids(store.staging()), vec!["B"]);
        assert_eq!(ids(store.find("B1").unwrap().children()), vec!["A"]);
    }

    #[test]
    fn move_into_own_subtree_is_refused() {
        let forest = vec![node("A", vec![node("B", vec![])])];
        let mut store = ItemStore::new(forest.clone(), None, vec![]);
        assert!(!store.move_item("A", Some("B")));
        assert!(!store.move_item("A", Some("A")));
        assert!(!store.move_item("A", Some("missing")));
        assert_eq!(store.staging(), forest.as_slice());
    }

    #[test]
    fn expanded_ids_are_stored_and_announced() {
        let mut store = ItemStore::new(Vec::new(), None, vec![]);
        let events = recorded(&mut store);

        store.set_expanded_ids(vec!["ghost-id".into()]);
        store.set_expanded("other", true);
        store.set_expanded("other", true);
        store.set_expanded("ghost-id", false);

        assert_eq!(store.expanded_ids(), ["other".to_string()]);
        assert_eq!(
            *events.borrow(),
            vec![
                StoreEvent::ExpandedChanged(vec!["ghost-id".into()]),
                StoreEvent::ExpandedChanged(vec!["ghost-id".into(), "other".into()]),
                StoreEvent::ExpandedChanged(vec!["other".into()]),
            ]
        );
    }

    #[test]
    fn unsubscribed_listeners_stop_hearing_events() {
        let mut store = ItemStore::new(Vec::new(), None, vec![]);
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let handle = store.subscribe(move |_| counter.set(counter.get() + 1));

        store.add_new_top_item();
        assert!(store.unsubscribe(handle));
        store.add_new_top_item();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn locate_reports_index_paths() {
        let forest = vec![
            node("A", vec![node("B", vec![]), node("C", vec![node("E", vec![])])]),
            node("D", vec![]),
        ];
        assert_eq!(locate(&forest, "E"), Some(vec![0, 1, 0]));
        assert_eq!(locate(&forest, "D"), Some(vec![1]));
        assert_eq!(locate(&forest, "Z"), None);
        assert_eq!(node_at(&forest, &[0, 1, 0]).map(|n| n.id.as_str()), Some("E"));
    }

    #[test]
    fn wipe_clears_both_copies_quietly() {
        let mut root = node("a", vec![]);
        root.data.credentials.push(Credential::new("pin", "1234"));
        let mut store = ItemStore::new(vec![root], None, vec![]);
        let events = recorded(&mut store);

        store.wipe();

        assert!(store.staging().is_empty());
        assert!(store.main().is_empty());
        assert_eq!(store.active(), None);
        assert!(!store.has_unsaved_changes());
        assert!(events.borrow().is_empty());
    }
}
