//! Infrastructure layer: file-backed collaborators and DI container
//!
//! This layer implements the collaborator traits and wires up services.

pub mod di;
pub mod draft;
pub mod error;
pub mod terminology;
pub mod traits;

pub use draft::{load_draft, save_draft};
pub use error::{InfraError, InfraResult};
pub use terminology::FileTerminology;
