//! # resolution-how
//!
//! Builds the "how" view of an entity-resolution result: a navigable forest
//! reconstructed from the flat table of pairwise resolution steps the backend
//! returns, plus the interactive state (expansion, pinned steps) a viewer
//! keeps while a user explores it.
//!
//! ## Core Concepts
//!
//! - **Resolution step**: one pairwise merge of two inputs into a virtual entity
//! - **Final state**: a terminal virtual entity; each becomes a `FINAL` root
//! - **Stack**: two or more contiguous `ADD` steps grouped for display
//! - **Group**: an input of a `MERGE` step together with its history
//! - **Pin/unpin**: promote a step out of its stack, or fold it back in
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resolution_how::{HowConfig, HowSession, ItemType, StepRepository};
//!
//! let repository = StepRepository::from_json(&payload)?;
//! let mut session = HowSession::new("1001", repository, HowConfig::default());
//!
//! for root in session.forest().roots() {
//!     println!("{} {} ({} ids)", root.item_type, root.id, root.covered_ids.len());
//! }
//!
//! let stack = session.node_by_id("V3", Some(ItemType::Step)).and_then(|n| n.owner_id.clone());
//! if let Some(stack_id) = stack {
//!     session.pin_step("V3", &stack_id);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod config;
pub mod error;
pub mod forest;
pub mod index;
pub mod node;
pub mod repository;
pub mod session;
pub mod step;

// Re-export primary types at crate root for convenience
pub use builder::{build_forest, compact, TreeBuilder};
pub use config::HowConfig;
pub use error::{ConfigError, Diagnostic, HowError, HowResult, PayloadError, StructuralError};
pub use forest::Forest;
pub use index::{NodeIndex, Occurrence};
pub use node::{ItemType, NodePath, StepNode, StepType};
pub use repository::{FinalStates, HowPayload, HowSummary, KeyedSteps, StepRepository, StepTable};
pub use session::{HowSession, UiState};
pub use step::{RecordRef, ResolutionStep, VirtualEntityRef};
