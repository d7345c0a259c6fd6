// ABOUTME: Mosaic split-layout tree operations - pruning dead leaves, collapsing one-child splits and id remapping

use crate::models::{MosaicNode, SplitDirection};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Prunes `tree` so every leaf is in `valid_ids`.
///
/// A split that loses one side is replaced by the surviving side, so the
/// result never contains a split with fewer than two live children.
/// Returns `None` when nothing survives.
pub fn clean_layout<T>(tree: MosaicNode<T>, valid_ids: &HashSet<T>) -> Option<MosaicNode<T>>
where
    T: Eq + Hash,
{
    prune(tree, &|id| valid_ids.contains(id))
}

/// Removes a single leaf with the same collapse rules as [`clean_layout`].
pub fn remove_tab_from_mosaic_tree<T>(tree: MosaicNode<T>, tab_id: &T) -> Option<MosaicNode<T>>
where
    T: PartialEq,
{
    prune(tree, &|id| id != tab_id)
}

fn prune<T, F>(tree: MosaicNode<T>, keep: &F) -> Option<MosaicNode<T>>
where
    F: Fn(&T) -> bool,
{
    match tree {
        MosaicNode::Leaf(id) => keep(&id).then_some(MosaicNode::Leaf(id)),
        MosaicNode::Split {
            direction,
            first,
            second,
            split_percentage,
        } => match (prune(*first, keep), prune(*second, keep)) {
            (None, None) => None,
            (Some(survivor), None) | (None, Some(survivor)) => Some(survivor),
            (Some(first), Some(second)) => Some(MosaicNode::Split {
                direction,
                first: Box::new(first),
                second: Box::new(second),
                split_percentage,
            }),
        },
    }
}

/// Leaf ids in left-to-right (first, then second) order.
pub fn get_tab_ids_from_mosaic_tree<T: Clone>(tree: &MosaicNode<T>) -> Vec<T> {
    let mut ids = Vec::new();
    collect_ids(tree, &mut ids);
    ids
}

fn collect_ids<T: Clone>(tree: &MosaicNode<T>, out: &mut Vec<T>) {
    match tree {
        MosaicNode::Leaf(id) => out.push(id.clone()),
        MosaicNode::Split { first, second, .. } => {
            collect_ids(first, out);
            collect_ids(second, out);
        }
    }
}

/// Rewrites every leaf through `id_map`. Ids missing from the map are kept as-is.
pub fn update_mosaic_tree_ids(
    tree: MosaicNode<String>,
    id_map: &HashMap<String, String>,
) -> MosaicNode<String> {
    match tree {
        MosaicNode::Leaf(id) => {
            let mapped = id_map.get(&id).cloned().unwrap_or(id);
            MosaicNode::Leaf(mapped)
        }
        MosaicNode::Split {
            direction,
            first,
            second,
            split_percentage,
        } => MosaicNode::Split {
            direction,
            first: Box::new(update_mosaic_tree_ids(*first, id_map)),
            second: Box::new(update_mosaic_tree_ids(*second, id_map)),
            split_percentage,
        },
    }
}

/// Adds `id` to the right of an existing layout, or starts a new one.
pub fn append_to_layout<T>(
    tree: Option<MosaicNode<T>>,
    id: T,
    direction: SplitDirection,
) -> MosaicNode<T> {
    match tree {
        Some(existing) => MosaicNode::split(direction, existing, MosaicNode::Leaf(id)),
        None => MosaicNode::Leaf(id),
    }
}
