// ABOUTME: Tab tree module - pure functions over recursive tabs and mosaic layouts, plus a flat tab arena

pub mod arena;
pub mod mosaic;
pub mod tree;

pub use arena::{TabArena, TabArenaError};
pub use mosaic::{
    append_to_layout, clean_layout, get_tab_ids_from_mosaic_tree, remove_tab_from_mosaic_tree,
    update_mosaic_tree_ids,
};
pub use tree::{
    clone_tabs_with_new_ids, clone_tabs_with_new_ids_at, find_parent_tab, find_tab, find_tab_mut,
    get_child_tab_ids, remove_tab_recursive,
};
