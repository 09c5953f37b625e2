//! Collaborator boundary traits for testability
//!
//! The engine never fetches coding-system data itself. Services receive it
//! through these traits, so tests can substitute in-memory implementations.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Code, CodingSystem};

/// Read access to one coding system's concepts, terms and is-a relations.
pub trait TerminologySource: Send + Sync {
    /// Coding system this source serves.
    fn coding_system(&self) -> CodingSystem;

    /// Top concept of the hierarchy.
    fn root(&self) -> Code;

    /// Every code in this coding system.
    fn codes(&self) -> BTreeSet<Code>;

    /// Whether the code exists in this coding system.
    fn contains(&self, code: &str) -> bool;

    /// Every `(parent, child)` edge on an upward path from any of `codes`.
    fn edges_for(&self, codes: &BTreeSet<Code>) -> Vec<(Code, Code)>;

    /// Display terms for `codes`; unknown codes are omitted.
    fn code_to_term(&self, codes: &BTreeSet<Code>) -> BTreeMap<Code, String>;
}
