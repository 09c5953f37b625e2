//! File-backed terminology snapshots.
//!
//! A snapshot is a TOML document:
//!
//! ```toml
//! coding_system = "snomedct"
//! root = "138875005"
//! edges = [["138875005", "404684003"], ["404684003", "116309007"]]
//!
//! [terms]
//! "116309007" = "Finding of elbow region (finding)"
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::{Code, CodingSystem};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::TerminologySource;

#[derive(Debug, Deserialize)]
struct RawTerminology {
    coding_system: CodingSystem,
    root: Code,
    #[serde(default)]
    edges: Vec<(Code, Code)>,
    #[serde(default)]
    terms: BTreeMap<Code, String>,
}

/// In-memory terminology loaded from a snapshot file.
#[derive(Debug, Clone)]
pub struct FileTerminology {
    coding_system: CodingSystem,
    root: Code,
    /// child -> parents
    parents: BTreeMap<Code, BTreeSet<Code>>,
    terms: BTreeMap<Code, String>,
    /// Every code named by an edge, a term or the root.
    codes: BTreeSet<Code>,
}

impl FileTerminology {
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> InfraResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| InfraError::io(format!("read terminology {}", path.display()), e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            InfraError::Parse { message, .. } => InfraError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> InfraResult<Self> {
        let raw: RawTerminology = toml::from_str(content).map_err(|e| InfraError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        Ok(Self::from_parts(raw.coding_system, raw.root, raw.edges, raw.terms))
    }

    pub fn from_parts(
        coding_system: CodingSystem,
        root: impl Into<Code>,
        edges: impl IntoIterator<Item = (Code, Code)>,
        terms: BTreeMap<Code, String>,
    ) -> Self {
        let root = root.into();
        let mut parents: BTreeMap<Code, BTreeSet<Code>> = BTreeMap::new();
        let mut codes: BTreeSet<Code> = terms.keys().cloned().collect();
        codes.insert(root.clone());
        for (parent, child) in edges {
            codes.insert(parent.clone());
            codes.insert(child.clone());
            parents.entry(child).or_default().insert(parent);
        }
        debug!(
            "terminology {}: root={} codes={} terms={}",
            coding_system,
            root,
            codes.len(),
            terms.len()
        );
        Self {
            coding_system,
            root,
            parents,
            terms,
            codes,
        }
    }
}

impl TerminologySource for FileTerminology {
    fn coding_system(&self) -> CodingSystem {
        self.coding_system
    }

    fn root(&self) -> Code {
        self.root.clone()
    }

    fn codes(&self) -> BTreeSet<Code> {
        self.codes.clone()
    }

    fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    fn edges_for(&self, codes: &BTreeSet<Code>) -> Vec<(Code, Code)> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = codes.iter().map(String::as_str).collect();
        let mut edges = Vec::new();
        while let Some(code) = queue.pop_front() {
            if !seen.insert(code) {
                continue;
            }
            for parent in self.parents.get(code).into_iter().flatten() {
                edges.push((parent.clone(), code.to_string()));
                queue.push_back(parent);
            }
        }
        edges
    }

    fn code_to_term(&self, codes: &BTreeSet<Code>) -> BTreeMap<Code, String> {
        codes
            .iter()
            .filter_map(|code| self.terms.get(code).map(|term| (code.clone(), term.clone())))
            .collect()
    }
}
