// ABOUTME: Recursive tab tree queries and mutations - lookup, parent search, removal and id-remapping clones

use crate::models::Tab;
use crate::tabs::mosaic::update_mosaic_tree_ids;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Depth-first search through every group's children.
pub fn find_tab<'a>(tabs: &'a [Tab], id: &str) -> Option<&'a Tab> {
    for tab in tabs {
        if tab.id == id {
            return Some(tab);
        }
        if tab.is_group() {
            if let Some(found) = find_tab(&tab.tabs, id) {
                return Some(found);
            }
        }
    }
    None
}

pub fn find_tab_mut<'a>(tabs: &'a mut [Tab], id: &str) -> Option<&'a mut Tab> {
    for tab in tabs.iter_mut() {
        if tab.id == id {
            return Some(tab);
        }
        if tab.is_group() {
            if let Some(found) = find_tab_mut(&mut tab.tabs, id) {
                return Some(found);
            }
        }
    }
    None
}

/// The group whose direct children include `id`.
pub fn find_parent_tab<'a>(tabs: &'a [Tab], id: &str) -> Option<&'a Tab> {
    for tab in tabs.iter().filter(|t| t.is_group()) {
        if tab.tabs.iter().any(|child| child.id == id) {
            return Some(tab);
        }
        if let Some(parent) = find_parent_tab(&tab.tabs, id) {
            return Some(parent);
        }
    }
    None
}

/// Removes `id` from whichever level lists it as a direct child.
///
/// Leaves any `mosaic_tree` untouched; callers prune the layout separately.
pub fn remove_tab_recursive(tabs: &mut Vec<Tab>, id: &str) -> bool {
    if let Some(index) = tabs.iter().position(|t| t.id == id) {
        tabs.remove(index);
        return true;
    }

    tabs.iter_mut()
        .filter(|t| t.is_group())
        .any(|group| remove_tab_recursive(&mut group.tabs, id))
}

/// Ids of every tab whose `parent_id` is `group_id`.
pub fn get_child_tab_ids(all_tabs: &[Tab], group_id: &str) -> Vec<String> {
    let mut ids = Vec::new();
    collect_children(all_tabs, group_id, &mut ids);
    ids
}

fn collect_children(tabs: &[Tab], group_id: &str, out: &mut Vec<String>) {
    for tab in tabs {
        if tab.parent_id.as_deref() == Some(group_id) {
            out.push(tab.id.clone());
        }
        collect_children(&tab.tabs, group_id, out);
    }
}

/// Deep-clones a tab forest with a fresh id on every tab.
///
/// Group layouts and `parent_id` links are rewritten through the old-to-new id
/// map; `created_at` is reset to the clone time.
pub fn clone_tabs_with_new_ids(tabs: &[Tab]) -> Vec<Tab> {
    clone_tabs_with_new_ids_at(tabs, Utc::now())
}

pub fn clone_tabs_with_new_ids_at(tabs: &[Tab], now: DateTime<Utc>) -> Vec<Tab> {
    let mut id_map = HashMap::new();
    clone_level(tabs, None, &mut id_map, now)
}

fn clone_level(
    tabs: &[Tab],
    new_parent: Option<&str>,
    id_map: &mut HashMap<String, String>,
    now: DateTime<Utc>,
) -> Vec<Tab> {
    let mut cloned = Vec::with_capacity(tabs.len());

    for tab in tabs {
        let new_id = Uuid::new_v4().to_string();
        id_map.insert(tab.id.clone(), new_id.clone());

        let children = clone_level(&tab.tabs, Some(&new_id), id_map, now);
        let mosaic_tree = tab
            .mosaic_tree
            .clone()
            .map(|tree| update_mosaic_tree_ids(tree, id_map));

        let parent_id = match new_parent {
            Some(parent) => Some(parent.to_string()),
            None => tab
                .parent_id
                .as_ref()
                .map(|old| id_map.get(old).cloned().unwrap_or_else(|| old.clone())),
        };

        cloned.push(Tab {
            id: new_id,
            parent_id,
            tabs: children,
            mosaic_tree,
            created_at: now,
            ..tab.clone()
        });
    }

    cloned
}
