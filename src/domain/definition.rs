//! Summary of a codelist as its explicit rules.
//!
//! Each included code is a rule covering the code and its descendants,
//! minus any excluded codes that fall under it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::coding_system::CodingSystem;
use crate::domain::entities::{Code, DecisionSet};
use crate::domain::hierarchy::Hierarchy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionRow {
    pub name: String,
    pub code: Code,
    /// Whether the rule covers every descendant of `code`.
    pub all_descendants: bool,
    /// Excluded codes below this one; meaningless when `all_descendants` is false.
    pub excluded_descendants: Vec<DefinitionRow>,
}

impl DefinitionRow {
    fn leaf(name: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            all_descendants: true,
            excluded_descendants: Vec::new(),
        }
    }
}

/// One row per included code, ordered by name, each listing the excluded
/// codes that are its descendants.
pub fn build_definition_rows(
    hierarchy: &Hierarchy,
    decisions: &DecisionSet,
    terms: &BTreeMap<Code, String>,
    coding_system: CodingSystem,
) -> Vec<DefinitionRow> {
    let name = |code: &str| coding_system.lookup_term(code, terms);

    let excluded = by_name(decisions.excluded(), &name);
    by_name(decisions.included(), &name)
        .into_iter()
        .map(|code| {
            let descendants = hierarchy.descendants(code);
            DefinitionRow {
                excluded_descendants: excluded
                    .iter()
                    .filter(|ex| descendants.contains(**ex))
                    .map(|ex| DefinitionRow::leaf(name(*ex), *ex))
                    .collect(),
                ..DefinitionRow::leaf(name(code), code)
            }
        })
        .collect()
}

/// Codes ordered by display name, then by code.
fn by_name<'c, 't>(
    codes: impl IntoIterator<Item = &'c Code>,
    name: impl Fn(&str) -> &'t str,
) -> Vec<&'c str> {
    let mut codes: Vec<&str> = codes.into_iter().map(String::as_str).collect();
    codes.sort_by(|a, b| name(*a).cmp(name(*b)).then_with(|| a.cmp(b)));
    codes
}
