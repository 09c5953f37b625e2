//! Codelist builder engine.
//!
//! Given a coding-system hierarchy (a DAG of codes) and a user's explicit
//! include/exclude decisions, derives the status of every code, applies
//! ordered updates, and lays the hierarchy out as indented trees.
//!
//! Layers:
//! - [`domain`]: the pure engine (hierarchy, statuses, updates, trees)
//! - [`application`]: services combining a draft with a terminology
//! - [`infrastructure`]: file-backed terminology and draft documents
//! - [`cli`]: the `codelists` command line

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
