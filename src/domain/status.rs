//! Status resolution: propagating explicit decisions down the hierarchy.
//!
//! A code that is not itself decided takes its status from its nearest
//! explicitly decided ancestors, measured in parent-edge hops. When the
//! nearest ancestors disagree, the code is in conflict. Only explicit
//! decisions stop the search along a path; derived statuses never do.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::BitOrAssign;

use tracing::{debug, instrument};

use crate::domain::entities::{Code, DecisionSet, Status, StatusMap};
use crate::domain::hierarchy::Hierarchy;

/// Set of polarities reaching a node at its minimal distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Polarity(u8);

impl Polarity {
    const INCLUDE: Polarity = Polarity(0b01);
    const EXCLUDE: Polarity = Polarity(0b10);

    fn of_explicit(status: Status) -> Self {
        if status == Status::Included {
            Self::INCLUDE
        } else {
            Self::EXCLUDE
        }
    }

    fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn derived(self) -> Status {
        match self {
            Self::INCLUDE => Status::IncludedByAncestor,
            Self::EXCLUDE => Status::ExcludedByAncestor,
            p if p.is_empty() => Status::Unknown,
            _ => Status::Conflict,
        }
    }
}

impl BitOrAssign for Polarity {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Hierarchy {
    /// Status of a single code.
    ///
    /// Walks up the hierarchy one level at a time; explicit ancestors end
    /// their path, and the first level that reaches any explicit ancestor
    /// decides the status.
    pub fn node_status(&self, code: &str, decisions: &DecisionSet) -> Status {
        if let Some(status) = decisions.explicit_status(code) {
            return status;
        }

        let mut seen: HashSet<&str> = HashSet::from([code]);
        let mut frontier: Vec<&str> = vec![code];
        while !frontier.is_empty() {
            let mut polarity = Polarity::default();
            let mut next = Vec::new();
            for current in frontier {
                for parent in self.parents(current) {
                    if !seen.insert(parent) {
                        continue;
                    }
                    match decisions.explicit_status(parent) {
                        Some(explicit) => polarity |= Polarity::of_explicit(explicit),
                        None => next.push(parent.as_str()),
                    }
                }
            }
            if !polarity.is_empty() {
                return polarity.derived();
            }
            frontier = next;
        }
        Status::Unknown
    }

    /// Status of every code in the hierarchy.
    ///
    /// Multi-source breadth-first propagation along child edges: every
    /// explicit code is a source at distance zero, and a code is resolved at
    /// the first level that reaches it, merging the polarities of all its
    /// parents on that level. Runs in O(nodes + edges).
    #[instrument(level = "debug", skip_all, fields(nodes = self.len()))]
    pub fn resolve_statuses(&self, decisions: &DecisionSet) -> StatusMap {
        let mut statuses = StatusMap::new();
        let mut labels: HashMap<&str, Polarity> = HashMap::new();
        let mut frontier: Vec<&str> = Vec::new();

        for code in self.nodes() {
            if let Some(explicit) = decisions.explicit_status(code) {
                statuses.insert(code.clone(), explicit);
                labels.insert(code, Polarity::of_explicit(explicit));
                frontier.push(code);
            }
        }
        let ignored = decisions.codes().iter().filter(|c| !self.contains(c)).count();
        if ignored > 0 {
            debug!("resolve_statuses: ignoring {} decisions outside the hierarchy", ignored);
        }

        let mut depth = 0usize;
        while !frontier.is_empty() {
            depth += 1;
            let mut next: BTreeMap<&str, Polarity> = BTreeMap::new();
            for code in &frontier {
                let polarity = labels.get(code).copied().unwrap_or_default();
                for child in self.children(code) {
                    if labels.contains_key(child.as_str()) {
                        continue;
                    }
                    *next.entry(child.as_str()).or_default() |= polarity;
                }
            }
            for (code, polarity) in &next {
                labels.insert(code, *polarity);
                statuses.insert((*code).to_string(), polarity.derived());
            }
            frontier = next.into_keys().collect();
        }
        debug!("resolve_statuses: {} codes labelled in {} levels", labels.len(), depth.saturating_sub(1));

        for code in self.nodes() {
            statuses.entry(code.clone()).or_insert(Status::Unknown);
        }
        statuses
    }
}

/// Number of codes per status, in token order.
pub fn summarize(statuses: &StatusMap) -> BTreeMap<Status, usize> {
    let mut counts = BTreeMap::new();
    for status in statuses.values() {
        *counts.entry(*status).or_insert(0) += 1;
    }
    counts
}

/// Codes whose status carries the include polarity, i.e. the codelist itself.
pub fn included_codes(statuses: &StatusMap) -> Vec<Code> {
    statuses
        .iter()
        .filter(|(_, status)| status.is_included())
        .map(|(code, _)| code.clone())
        .collect()
}
