//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on collaborator traits (TerminologySource) but are
//! themselves concrete structs, not traits.

mod builder;

pub use builder::{BuilderService, DraftView, SearchEntry, NO_SEARCH_TERM};
