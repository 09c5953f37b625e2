//! Domain layer: the hierarchy engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod coding_system;
pub mod definition;
pub mod entities;
pub mod error;
pub mod hierarchy;
pub mod status;
pub mod tree;
pub mod update;

pub use coding_system::CodingSystem;
pub use definition::{build_definition_rows, DefinitionRow};
pub use entities::{
    parse_updates, slugify, Code, DecisionSet, DisplayFilter, Draft, Mark, Search, SearchSelection,
    Status, StatusMap, Update,
};
pub use error::{DomainError, DomainResult};
pub use hierarchy::Hierarchy;
pub use status::{included_codes, summarize};
pub use tree::{tree_rows, Glyph, TreePresenter, TreeRow, TreeRows, TreeTable};
pub use update::UpdateOutcome;
