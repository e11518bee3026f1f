//! Keeps the selected item and the expanded tree rows across restarts.
//!
//! Writes come from store events and never fail the edit that caused them:
//! errors are logged and dropped.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::events::Subscription;
use crate::storage::{atomic_write, restrict_file};
use crate::store::{ItemStore, StoreEvent};

/// Two key-value slots: selected item id and expanded item ids.
pub trait SelectionStore {
    fn read_selected_id(&self) -> Result<Option<String>>;
    fn write_selected_id(&mut self, id: Option<&str>) -> Result<()>;
    fn read_expanded_ids(&self) -> Result<Vec<String>>;
    fn write_expanded_ids(&mut self, ids: &[String]) -> Result<()>;
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
struct TreeViewSlots {
    tree_view_selected_item_id: Option<String>,
    tree_view_expanded_items: Vec<String>,
}

pub struct FileSelectionStore {
    path: PathBuf,
}

impl FileSelectionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_raw(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!("Could not read tree view state at {}", self.path.display())
            }),
        }
    }

    fn parse(&self, raw: &[u8]) -> Result<TreeViewSlots> {
        serde_json::from_slice(raw)
            .map_err(|e| anyhow!("Invalid tree view state at {}: {e}", self.path.display()))
    }

    fn load(&self) -> Result<TreeViewSlots> {
        match self.read_raw()? {
            Some(raw) => self.parse(&raw),
            None => Ok(TreeViewSlots::default()),
        }
    }

    fn save(&self, slots: &TreeViewSlots) -> Result<()> {
        let data = serde_json::to_string_pretty(slots)?;
        atomic_write(&self.path, data.as_bytes())?;
        restrict_file(&self.path)
    }

    fn update(&self, apply: impl FnOnce(&mut TreeViewSlots)) -> Result<()> {
        // A corrupt file should not block new writes; an unreadable one should.
        let mut slots = match self.read_raw()? {
            Some(raw) => self.parse(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "replacing unreadable tree view state");
                TreeViewSlots::default()
            }),
            None => TreeViewSlots::default(),
        };
        apply(&mut slots);
        self.save(&slots)
    }
}

impl SelectionStore for FileSelectionStore {
    fn read_selected_id(&self) -> Result<Option<String>> {
        Ok(self.load()?.tree_view_selected_item_id)
    }

    fn write_selected_id(&mut self, id: Option<&str>) -> Result<()> {
        self.update(|slots| slots.tree_view_selected_item_id = id.map(str::to_string))
    }

    fn read_expanded_ids(&self) -> Result<Vec<String>> {
        Ok(self.load()?.tree_view_expanded_items)
    }

    fn write_expanded_ids(&mut self, ids: &[String]) -> Result<()> {
        self.update(|slots| slots.tree_view_expanded_items = ids.to_vec())
    }
}

#[derive(Clone, Default)]
pub struct MemorySelectionStore {
    slots: Rc<RefCell<TreeViewSlots>>,
    fail_writes: bool,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("selection store is read-only"));
        }
        Ok(())
    }
}

impl SelectionStore for MemorySelectionStore {
    fn read_selected_id(&self) -> Result<Option<String>> {
        Ok(self.slots.borrow().tree_view_selected_item_id.clone())
    }

    fn write_selected_id(&mut self, id: Option<&str>) -> Result<()> {
        self.check_writable()?;
        self.slots.borrow_mut().tree_view_selected_item_id = id.map(str::to_string);
        Ok(())
    }

    fn read_expanded_ids(&self) -> Result<Vec<String>> {
        Ok(self.slots.borrow().tree_view_expanded_items.clone())
    }

    fn write_expanded_ids(&mut self, ids: &[String]) -> Result<()> {
        self.check_writable()?;
        self.slots.borrow_mut().tree_view_expanded_items = ids.to_vec();
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialSelection {
    pub selected_id: Option<String>,
    pub expanded_ids: Vec<String>,
}

/// Reads both slots for startup. Unreadable slots count as empty.
pub fn load_initial_selection(store: &impl SelectionStore) -> InitialSelection {
    let selected_id = store.read_selected_id().unwrap_or_else(|e| {
        warn!(error = %e, "failed to read selected item id");
        None
    });
    let expanded_ids = store.read_expanded_ids().unwrap_or_else(|e| {
        warn!(error = %e, "failed to read expanded item ids");
        Vec::new()
    });
    InitialSelection {
        selected_id,
        expanded_ids,
    }
}

pub fn persist_selection<S>(items: &mut ItemStore, mut slots: S) -> Subscription
where
    S: SelectionStore + 'static,
{
    items.subscribe(move |event| match event {
        StoreEvent::ActiveChanged(id) => {
            if let Err(e) = slots.write_selected_id(id.as_deref()) {
                warn!(error = %e, "failed to persist selected item id");
            }
        }
        StoreEvent::ExpandedChanged(ids) => {
            if let Err(e) = slots.write_expanded_ids(ids) {
                warn!(error = %e, "failed to persist expanded item ids");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;

    fn forest() -> Vec<Node> {
        let mut a = Node::titled("a");
        a.id = "a".into();
        let mut b = Node::titled("b");
        b.id = "b".into();
        a.children_mut().push(b);
        vec![a]
    }

    #[test]
    fn expanded_ids_survive_without_matching_nodes() {
        let slots = MemorySelectionStore::new();
        let mut items = ItemStore::new(forest(), None, vec![]);
        persist_selection(&mut items, slots.clone());

        items.set_expanded_ids(vec!["ghost-id".into()]);

        assert_eq!(slots.read_expanded_ids().unwrap(), vec!["ghost-id".to_string()]);
        let initial = load_initial_selection(&slots);
        let reopened = ItemStore::new(forest(), initial.selected_id.as_deref(), initial.expanded_ids);
        assert_eq!(reopened.expanded_ids(), ["ghost-id".to_string()]);
    }

    #[test]
    fn selection_follows_switches_additions_and_deletions() {
        let slots = MemorySelectionStore::new();
        let mut items = ItemStore::new(forest(), None, vec![]);
        persist_selection(&mut items, slots.clone());

        items.switch_active_node("b");
        assert_eq!(slots.read_selected_id().unwrap().as_deref(), Some("b"));

        let added = items.add_new_sub_item_by_id("b").unwrap();
        assert_eq!(slots.read_selected_id().unwrap(), Some(added));

        items.switch_active_node("a");
        items.remove_item_and_children("b");
        assert_eq!(slots.read_selected_id().unwrap().as_deref(), Some("a"));

        items.remove_item_and_children("a");
        assert_eq!(slots.read_selected_id().unwrap(), None);
    }

    #[test]
    fn restart_restores_the_persisted_selection() {
        let slots = MemorySelectionStore::new();
        let mut items = ItemStore::new(forest(), None, vec![]);
        persist_selection(&mut items, slots.clone());
        items.switch_active_node("b");

        let initial = load_initial_selection(&slots);
        let reopened = ItemStore::new(forest(), initial.selected_id.as_deref(), initial.expanded_ids);
        assert_eq!(reopened.active_id(), Some("b"));
    }

    #[test]
    fn write_failures_never_reach_the_store() {
        let mut items = ItemStore::new(forest(), None, vec![]);
        persist_selection(&mut items, MemorySelectionStore::failing());

        assert!(items.switch_active_node("b"));
        items.set_expanded_ids(vec!["a".into()]);
        let id = items.add_new_top_item();
        assert_eq!(items.active_id(), Some(id.as_str()));
        assert_eq!(items.expanded_ids(), ["a".to_string()]);
    }

    #[test]
    fn file_store_keeps_slots_independent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree_view.json");
        let mut slots = FileSelectionStore::new(path.clone());

        assert_eq!(load_initial_selection(&slots), InitialSelection::default());

        slots.write_selected_id(Some("item-1")).unwrap();
        slots
            .write_expanded_ids(&["x".to_string(), "y".to_string()])
            .unwrap();
        slots.write_selected_id(None).unwrap();

        let reopened = FileSelectionStore::new(path.clone());
        assert_eq!(reopened.read_selected_id().unwrap(), None);
        assert_eq!(
            reopened.read_expanded_ids().unwrap(),
            vec!["x".to_string(), "y".to_string()]
        );

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("treeViewExpandedItems"));
    }

    #[test]
    fn corrupt_file_reads_as_empty_and_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree_view.json");
        fs::write(&path, "not json").unwrap();
        let mut slots = FileSelectionStore::new(path);

        assert_eq!(load_initial_selection(&slots), InitialSelection::default());
        slots.write_selected_id(Some("fresh")).unwrap();
        assert_eq!(slots.read_selected_id().unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn read_failures_are_not_mistaken_for_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree_view.json");
        fs::create_dir(&path).unwrap();
        let mut slots = FileSelectionStore::new(path.clone());

        let err = slots.write_expanded_ids(&["a".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Could not read tree view state"));
        assert!(slots.read_expanded_ids().is_err());
        assert!(path.is_dir());
    }
}
