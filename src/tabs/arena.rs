// ABOUTME: Flat id-indexed tab arena with parent back-references that keeps group children and layouts in sync

use crate::models::{SplitDirection, Tab};
use crate::tabs::mosaic::{
    append_to_layout, clean_layout, get_tab_ids_from_mosaic_tree, remove_tab_from_mosaic_tree,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TabArenaError {
    #[error("Tab already exists: {0}")]
    DuplicateId(String),
    #[error("Parent tab not found: {0}")]
    ParentNotFound(String),
    #[error("Parent tab is not a group: {0}")]
    NotAGroup(String),
}

/// Tabs stored by id. Each node's `tabs` field is kept empty inside the arena;
/// child order lives in `children` and is rebuilt by [`TabArena::into_forest`].
#[derive(Debug, Default, Clone)]
pub struct TabArena {
    nodes: HashMap<String, Tab>,
    children: HashMap<String, Vec<String>>,
    roots: Vec<String>,
}

impl TabArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens a forest. Duplicate ids after the first occurrence are dropped.
    pub fn from_forest(tabs: Vec<Tab>) -> Self {
        let mut arena = Self::new();
        for tab in tabs {
            arena.absorb(tab, None);
        }
        arena
    }

    fn absorb(&mut self, mut tab: Tab, parent: Option<&str>) {
        if self.nodes.contains_key(&tab.id) {
            tracing::warn!(tab_id = %tab.id, "Dropping duplicate tab id");
            return;
        }

        let id = tab.id.clone();
        tab.parent_id = parent.map(str::to_string);
        let children = std::mem::take(&mut tab.tabs);

        match parent {
            Some(parent) => self.children.entry(parent.to_string()).or_default().push(id.clone()),
            None => self.roots.push(id.clone()),
        }
        if tab.is_group() {
            self.children.entry(id.clone()).or_default();
        }
        self.nodes.insert(id.clone(), tab);

        for child in children {
            self.absorb(child, Some(&id));
        }
    }

    pub fn into_forest(mut self) -> Vec<Tab> {
        let roots = std::mem::take(&mut self.roots);
        roots
            .into_iter()
            .filter_map(|id| self.take_subtree(&id))
            .collect()
    }

    fn take_subtree(&mut self, id: &str) -> Option<Tab> {
        let mut tab = self.nodes.remove(id)?;
        let child_ids = self.children.remove(id).unwrap_or_default();
        tab.tabs = child_ids
            .iter()
            .filter_map(|child| self.take_subtree(child))
            .collect();
        Some(tab)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Tab> {
        self.nodes.get(id)
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id)?.parent_id.as_deref()
    }

    pub fn child_ids(&self, group_id: &str) -> &[String] {
        self.children.get(group_id).map_or(&[], Vec::as_slice)
    }

    pub fn children(&self, group_id: &str) -> Vec<&Tab> {
        self.child_ids(group_id)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Adds `tab` (and any nested children it carries) under `parent`, or as a
    /// root. When added to a group that already has a layout, the new tab is
    /// split in to the right of it.
    pub fn insert(&mut self, tab: Tab, parent: Option<&str>) -> Result<(), TabArenaError> {
        if self.nodes.contains_key(&tab.id) {
            return Err(TabArenaError::DuplicateId(tab.id));
        }

        let Some(parent_id) = parent else {
            self.absorb(tab, None);
            return Ok(());
        };

        let group = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| TabArenaError::ParentNotFound(parent_id.to_string()))?;
        if !group.is_group() {
            return Err(TabArenaError::NotAGroup(parent_id.to_string()));
        }

        let id = tab.id.clone();
        let was_empty = self.child_ids(parent_id).is_empty();
        self.absorb(tab, Some(parent_id));

        let live = self.live_children(parent_id);
        if let Some(group) = self.nodes.get_mut(parent_id) {
            let had_layout = group.mosaic_tree.is_some();
            // Stale leaves from persisted state must not survive the split
            let layout = group
                .mosaic_tree
                .take()
                .and_then(|tree| clean_layout(tree, &live));
            if had_layout || was_empty {
                group.mosaic_tree = Some(append_to_layout(layout, id, SplitDirection::Row));
            }
        }
        Ok(())
    }

    fn live_children(&self, group_id: &str) -> HashSet<String> {
        self.child_ids(group_id).iter().cloned().collect()
    }

    /// Removes `id` and its whole subtree, pruning it from the parent's layout.
    pub fn remove(&mut self, id: &str) -> Option<Tab> {
        let parent = self.nodes.get(id)?.parent_id.clone();

        match &parent {
            Some(parent_id) => {
                if let Some(siblings) = self.children.get_mut(parent_id) {
                    siblings.retain(|sibling| sibling != id);
                }
                let live = self.live_children(parent_id);
                if let Some(group) = self.nodes.get_mut(parent_id) {
                    group.mosaic_tree = group
                        .mosaic_tree
                        .take()
                        .and_then(|tree| remove_tab_from_mosaic_tree(tree, &id.to_string()))
                        .and_then(|tree| clean_layout(tree, &live));
                }
            }
            None => self.roots.retain(|root| root != id),
        }

        self.take_subtree(id)
    }

    /// Prunes every group layout against its live children. Returns the ids of
    /// groups whose layout changed.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut repaired = Vec::new();

        for (group_id, child_ids) in &self.children {
            let Some(group) = self.nodes.get_mut(group_id) else {
                continue;
            };
            let Some(tree) = group.mosaic_tree.take() else {
                continue;
            };

            let valid: HashSet<String> = child_ids.iter().cloned().collect();
            let before = tree.clone();
            group.mosaic_tree = clean_layout(tree, &valid);
            if group.mosaic_tree.as_ref() != Some(&before) {
                repaired.push(group_id.clone());
            }
        }

        repaired.sort();
        repaired
    }

    /// Whether every leaf of the group's layout is one of its direct children.
    pub fn layout_is_consistent(&self, group_id: &str) -> bool {
        let Some(tree) = self.nodes.get(group_id).and_then(|g| g.mosaic_tree.as_ref()) else {
            return true;
        };
        let children: HashSet<&String> = self.child_ids(group_id).iter().collect();
        get_tab_ids_from_mosaic_tree(tree)
            .iter()
            .all(|leaf| children.contains(leaf))
    }
}
