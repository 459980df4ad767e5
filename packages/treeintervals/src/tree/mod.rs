pub mod random_tree;
pub mod simple_tree;
pub mod tree_change;
pub mod tree_view;
