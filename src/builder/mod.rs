//! Forest construction.
//!
//! The tree builder turns a flat step table into `FINAL` roots; the stack
//! compactor folds runs of `ADD` steps into `STACK` nodes along the way.

pub mod compact;
pub mod tree;

pub use compact::{compact, fresh_stack_id};
pub use tree::{build_forest, TreeBuilder};
