//! Generic containers used by the footprint and matching stages.

pub mod avl;
pub mod search;

pub use avl::{AvlTree, Traversal};
pub use search::{find_first_ge, find_first_ge_by};
