//! Domain entities: codes, statuses, marks and explicit decisions

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::coding_system::CodingSystem;
use crate::domain::error::{DomainError, DomainResult};

/// Opaque identifier of a node in a coding-system hierarchy.
pub type Code = String;

/// Derived status of every node, keyed by code.
pub type StatusMap = BTreeMap<Code, Status>;

/// Derived status of a node.
///
/// The serialized form is the token vocabulary used by persisted drafts and
/// exports: `?`, `+`, `(+)`, `-`, `(-)`, `!`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Status {
    Unknown,
    Included,
    IncludedByAncestor,
    Excluded,
    ExcludedByAncestor,
    Conflict,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Unknown,
        Status::Included,
        Status::IncludedByAncestor,
        Status::Excluded,
        Status::ExcludedByAncestor,
        Status::Conflict,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Status::Unknown => "?",
            Status::Included => "+",
            Status::IncludedByAncestor => "(+)",
            Status::Excluded => "-",
            Status::ExcludedByAncestor => "(-)",
            Status::Conflict => "!",
        }
    }

    /// True for `+` and `(+)`: the code ends up in an exported codelist.
    pub fn is_included(self) -> bool {
        matches!(self, Status::Included | Status::IncludedByAncestor)
    }

    /// True for `-` and `(-)`.
    pub fn is_excluded(self) -> bool {
        matches!(self, Status::Excluded | Status::ExcludedByAncestor)
    }

    pub fn is_explicit(self) -> bool {
        matches!(self, Status::Included | Status::Excluded)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Status {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.token() == s)
            .ok_or_else(|| DomainError::InvalidStatus(s.to_string()))
    }
}

impl TryFrom<String> for Status {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.token().to_string()
    }
}

/// Decision a client may request for a single code.
///
/// Derived tokens (`!`, `(+)`, `(-)`) are outputs only and never parse as marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mark {
    Clear,
    Include,
    Exclude,
}

impl Mark {
    pub fn token(self) -> &'static str {
        match self {
            Mark::Clear => "?",
            Mark::Include => "+",
            Mark::Exclude => "-",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Mark {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "?" => Ok(Mark::Clear),
            "+" => Ok(Mark::Include),
            "-" => Ok(Mark::Exclude),
            other => Err(DomainError::InvalidMark(other.to_string())),
        }
    }
}

impl TryFrom<String> for Mark {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mark> for String {
    fn from(mark: Mark) -> Self {
        mark.token().to_string()
    }
}

/// Ordered batch entry: later entries for the same code win.
pub type Update = (Code, Mark);

/// Parse raw `(code, mark)` pairs as received from a client.
pub fn parse_updates<C, M>(raw: &[(C, M)]) -> DomainResult<Vec<Update>>
where
    C: AsRef<str>,
    M: AsRef<str>,
{
    raw.iter()
        .map(|(code, mark)| Ok((code.as_ref().to_string(), mark.as_ref().parse()?)))
        .collect()
}

/// User-asserted include/exclude decisions. The two sets are always disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionSet {
    included: BTreeSet<Code>,
    excluded: BTreeSet<Code>,
}

impl DecisionSet {
    /// Build a decision set, rejecting a code that is both included and excluded.
    pub fn new<I, E>(included: I, excluded: E) -> DomainResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Code>,
        E: IntoIterator,
        E::Item: Into<Code>,
    {
        let included: BTreeSet<Code> = included.into_iter().map(Into::into).collect();
        let excluded: BTreeSet<Code> = excluded.into_iter().map(Into::into).collect();
        if let Some(code) = included.intersection(&excluded).next() {
            return Err(DomainError::OverlappingDecisions(code.clone()));
        }
        Ok(Self { included, excluded })
    }

    /// Recover explicit decisions from a status map: `+` entries are included,
    /// `-` entries excluded, everything else is derived.
    pub fn from_statuses(statuses: &StatusMap) -> Self {
        let mut decisions = Self::default();
        for (code, status) in statuses {
            match status {
                Status::Included => {
                    decisions.included.insert(code.clone());
                }
                Status::Excluded => {
                    decisions.excluded.insert(code.clone());
                }
                _ => {}
            }
        }
        decisions
    }

    pub fn included(&self) -> &BTreeSet<Code> {
        &self.included
    }

    pub fn excluded(&self) -> &BTreeSet<Code> {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }

    /// Explicit status of a code, if any.
    pub fn explicit_status(&self, code: &str) -> Option<Status> {
        if self.included.contains(code) {
            Some(Status::Included)
        } else if self.excluded.contains(code) {
            Some(Status::Excluded)
        } else {
            None
        }
    }

    /// All explicitly decided codes.
    pub fn codes(&self) -> BTreeSet<Code> {
        self.included.union(&self.excluded).cloned().collect()
    }

    /// Apply a single mark: the code is first removed from both sets.
    pub fn apply(&mut self, code: &str, mark: Mark) {
        self.included.remove(code);
        self.excluded.remove(code);
        match mark {
            Mark::Include => {
                self.included.insert(code.to_string());
            }
            Mark::Exclude => {
                self.excluded.insert(code.to_string());
            }
            Mark::Clear => {}
        }
    }

    /// Apply a batch strictly in order.
    pub fn apply_all(&mut self, updates: &[Update]) {
        for (code, mark) in updates {
            self.apply(code, *mark);
        }
    }
}

/// Which subset of a draft's codes is on display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchSelection {
    /// Every code in the draft.
    #[default]
    NoSelection,
    /// Codes returned by the search with this slug.
    ExplicitSearch(String),
    /// Codes that belong to no search.
    UnassignedCodes,
}

/// Filter applied to displayed codes by derived status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayFilter {
    #[default]
    All,
    Included,
    Excluded,
    Unresolved,
    InConflict,
}

impl DisplayFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            DisplayFilter::All => true,
            DisplayFilter::Included => status.is_included(),
            DisplayFilter::Excluded => status.is_excluded(),
            DisplayFilter::Unresolved => status == Status::Unknown,
            DisplayFilter::InConflict => status == Status::Conflict,
        }
    }

    /// Human-readable label, `None` for `All`.
    pub fn label(self) -> Option<&'static str> {
        match self {
            DisplayFilter::All => None,
            DisplayFilter::Included => Some("included"),
            DisplayFilter::Excluded => Some("excluded"),
            DisplayFilter::Unresolved => Some("unresolved"),
            DisplayFilter::InConflict => Some("in conflict"),
        }
    }
}

impl FromStr for DisplayFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DisplayFilter::All),
            "included" => Ok(DisplayFilter::Included),
            "excluded" => Ok(DisplayFilter::Excluded),
            "unresolved" => Ok(DisplayFilter::Unresolved),
            "in-conflict" => Ok(DisplayFilter::InConflict),
            other => Err(DomainError::InvalidFilter(other.to_string())),
        }
    }
}

/// A search run against a coding system and the codes it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub term: String,
    pub slug: String,
    pub codes: BTreeSet<Code>,
}

impl Search {
    pub fn new(term: impl Into<String>, codes: impl IntoIterator<Item = Code>) -> Self {
        let term = term.into();
        Self {
            slug: slugify(&term),
            term,
            codes: codes.into_iter().collect(),
        }
    }
}

/// Lowercase ASCII slug: alphanumerics kept, other runs collapsed to `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// A codelist under construction: explicit decisions plus the searches that
/// brought codes into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub coding_system: CodingSystem,
    /// Codes added without a search.
    pub codes: BTreeSet<Code>,
    pub decisions: DecisionSet,
    pub searches: Vec<Search>,
}

impl Draft {
    pub fn new(name: impl Into<String>, coding_system: CodingSystem) -> Self {
        Self {
            name: name.into(),
            coding_system,
            codes: BTreeSet::new(),
            decisions: DecisionSet::default(),
            searches: Vec::new(),
        }
    }

    /// A draft seeded with codes that belong to no search.
    pub fn with_codes(
        name: impl Into<String>,
        coding_system: CodingSystem,
        codes: impl IntoIterator<Item = Code>,
    ) -> Self {
        let mut draft = Self::new(name, coding_system);
        draft.codes.extend(codes);
        draft
    }

    /// Every code the draft knows about.
    pub fn all_codes(&self) -> BTreeSet<Code> {
        let mut codes = self.codes.clone();
        codes.extend(self.decisions.codes());
        for search in &self.searches {
            codes.extend(search.codes.iter().cloned());
        }
        codes
    }

    pub fn search(&self, slug: &str) -> Option<&Search> {
        self.searches.iter().find(|s| s.slug == slug)
    }

    /// Record a search and the codes it returned.
    ///
    /// # Errors
    /// `DuplicateSearch` if a search with the same slug exists.
    pub fn add_search(
        &mut self,
        term: impl Into<String>,
        codes: impl IntoIterator<Item = Code>,
    ) -> DomainResult<&Search> {
        let search = Search::new(term, codes);
        if self.search(&search.slug).is_some() {
            return Err(DomainError::DuplicateSearch(search.slug));
        }
        self.searches.push(search);
        Ok(&self.searches[self.searches.len() - 1])
    }

    /// Drop a search. Its codes leave the draft unless another search
    /// returned them or they carry an explicit decision.
    pub fn remove_search(&mut self, slug: &str) -> Option<Search> {
        let index = self.searches.iter().position(|s| s.slug == slug)?;
        let removed = self.searches.remove(index);
        for code in &removed.codes {
            let kept = self.searches.iter().any(|s| s.codes.contains(code))
                || self.decisions.explicit_status(code).is_some();
            if !kept {
                self.codes.remove(code);
            }
        }
        Some(removed)
    }

    /// Codes not returned by any search.
    pub fn unassigned_codes(&self) -> BTreeSet<Code> {
        self.all_codes()
            .into_iter()
            .filter(|code| !self.searches.iter().any(|s| s.codes.contains(code)))
            .collect()
    }
}
