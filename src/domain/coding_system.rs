//! Supported coding systems and their per-system behaviour

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::entities::Code;
use crate::domain::error::DomainError;
use crate::domain::hierarchy::Hierarchy;

const UNKNOWN_TYPE: &str = "unknown";

/// Clinical terminologies a draft can be built against.
///
/// Every variant answers the same questions (display term, code type), so
/// callers never dispatch on a string key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CodingSystem {
    SnomedCt,
    Ctv3,
    Bnf,
}

impl CodingSystem {
    pub const ALL: [CodingSystem; 3] = [CodingSystem::SnomedCt, CodingSystem::Ctv3, CodingSystem::Bnf];

    pub fn id(self) -> &'static str {
        match self {
            CodingSystem::SnomedCt => "snomedct",
            CodingSystem::Ctv3 => "ctv3",
            CodingSystem::Bnf => "bnf",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CodingSystem::SnomedCt => "SNOMED CT",
            CodingSystem::Ctv3 => "CTV3 (Read V3)",
            CodingSystem::Bnf => "BNF",
        }
    }

    /// Term shown for a code missing from the term table.
    pub fn unknown_term(self) -> &'static str {
        match self {
            // TPP's local Y-codes are not in the published CTV3 release
            CodingSystem::Ctv3 => "Unknown code (a TPP Y-code?)",
            CodingSystem::SnomedCt | CodingSystem::Bnf => "Unknown code",
        }
    }

    pub fn lookup_term<'a>(self, code: &str, terms: &'a BTreeMap<Code, String>) -> &'a str {
        terms.get(code).map_or(self.unknown_term(), String::as_str)
    }

    /// Classify a code into the type used to group tree tables.
    ///
    /// - SNOMED CT: semantic tag of the term, e.g. `disorder`
    /// - CTV3: term of the top-level ancestor (a child of the root)
    /// - BNF: level implied by the length of the code
    pub fn code_type(self, code: &str, hierarchy: &Hierarchy, terms: &BTreeMap<Code, String>) -> String {
        match self {
            CodingSystem::SnomedCt => terms
                .get(code)
                .and_then(|term| semantic_tag(term))
                .unwrap_or(UNKNOWN_TYPE)
                .to_string(),
            CodingSystem::Ctv3 => {
                let top = top_level_ancestor(code, hierarchy);
                self.lookup_term(&top, terms).to_string()
            }
            CodingSystem::Bnf => bnf_level(code).to_string(),
        }
    }

    pub fn codes_by_type(
        self,
        codes: &BTreeSet<Code>,
        hierarchy: &Hierarchy,
        terms: &BTreeMap<Code, String>,
    ) -> BTreeMap<String, BTreeSet<Code>> {
        let mut by_type: BTreeMap<String, BTreeSet<Code>> = BTreeMap::new();
        for code in codes {
            by_type
                .entry(self.code_type(code, hierarchy, terms))
                .or_default()
                .insert(code.clone());
        }
        by_type
    }
}

impl fmt::Display for CodingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CodingSystem {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CodingSystem::ALL
            .into_iter()
            .find(|system| system.id() == s)
            .ok_or_else(|| DomainError::UnknownCodingSystem(s.to_string()))
    }
}

impl TryFrom<String> for CodingSystem {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CodingSystem> for String {
    fn from(system: CodingSystem) -> Self {
        system.id().to_string()
    }
}

/// `"Lateral epicondylitis (disorder)"` -> `Some("disorder")`
fn semantic_tag(term: &str) -> Option<&str> {
    let inner = term.trim_end().strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let tag = inner[open + 1..].trim();
    (!tag.is_empty()).then_some(tag)
}

fn top_level_ancestor(code: &str, hierarchy: &Hierarchy) -> Code {
    let root = hierarchy.root();
    if code == root || !hierarchy.contains(code) {
        return code.to_string();
    }
    let is_top = |c: &str| hierarchy.parents(c).contains(root);
    if is_top(code) {
        return code.to_string();
    }
    hierarchy
        .ancestors(code)
        .into_iter()
        .find(|a| is_top(a.as_str()))
        .unwrap_or_else(|| code.to_string())
}

fn bnf_level(code: &str) -> &'static str {
    match code.len() {
        2 => "chapter",
        4 => "section",
        6 => "paragraph",
        7 => "subparagraph",
        9 => "chemical",
        11 => "product",
        15 => "presentation",
        _ => UNKNOWN_TYPE,
    }
}
