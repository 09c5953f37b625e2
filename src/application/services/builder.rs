//! Codelist builder service
//!
//! Assembles everything a client needs to work on a draft: the hierarchy
//! spanning the draft's codes, their statuses, tree tables and exports.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    build_definition_rows, included_codes, Code, CodingSystem, DefinitionRow, DisplayFilter,
    DomainError, Draft, Hierarchy, Search, SearchSelection, Status, StatusMap, TreePresenter,
    TreeTable, Update, UpdateOutcome,
};
use crate::infrastructure::traits::TerminologySource;

/// Label of the pseudo-search holding codes returned by no search.
pub const NO_SEARCH_TERM: &str = "[no search term]";

/// One entry in the list of searches shown alongside a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchEntry {
    pub term: String,
    /// `None` for the unassigned-codes entry.
    pub slug: Option<String>,
    pub active: bool,
}

/// Page model for a draft.
#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    pub draft_name: String,
    pub coding_system: CodingSystem,
    pub searches: Vec<SearchEntry>,
    pub filter: Option<&'static str>,
    pub tree_tables: Vec<TreeTable>,
    pub all_codes: Vec<Code>,
    pub included_codes: Vec<Code>,
    pub excluded_codes: Vec<Code>,
    pub code_to_term: BTreeMap<Code, String>,
    pub code_to_status: StatusMap,
}

/// Service orchestrating the hierarchy engine against a terminology.
pub struct BuilderService {
    terminology: Arc<dyn TerminologySource>,
}

impl BuilderService {
    pub fn new(terminology: Arc<dyn TerminologySource>) -> Self {
        Self { terminology }
    }

    pub fn coding_system(&self) -> CodingSystem {
        self.terminology.coding_system()
    }

    pub fn terms(&self, codes: &BTreeSet<Code>) -> BTreeMap<Code, String> {
        self.terminology.code_to_term(codes)
    }

    /// Draft spanning every code of the terminology, in its coding system.
    pub fn terminology_draft(&self, name: impl Into<String>) -> Draft {
        Draft::with_codes(name, self.coding_system(), self.terminology.codes())
    }

    /// Hierarchy spanning `codes` and all their ancestors up to the root.
    ///
    /// # Errors
    /// `UnknownCode` if a code is not part of the terminology.
    #[instrument(level = "debug", skip_all, fields(codes = codes.len()))]
    pub fn hierarchy_for(&self, codes: &BTreeSet<Code>) -> ApplicationResult<Hierarchy> {
        if let Some(code) = codes.iter().find(|c| !self.terminology.contains(c)) {
            return Err(DomainError::UnknownCode(code.clone()).into());
        }
        let edges = self.terminology.edges_for(codes);
        let hierarchy = Hierarchy::new(self.terminology.root(), edges)?;
        // a code with no path to the root never makes it into the edge list
        if let Some(code) = codes.iter().find(|c| !hierarchy.contains(c)) {
            return Err(DomainError::UnknownCode(code.clone()).into());
        }
        Ok(hierarchy)
    }

    /// Statuses of every code in the draft's hierarchy.
    pub fn statuses(&self, draft: &Draft) -> ApplicationResult<StatusMap> {
        self.check_coding_system(draft)?;
        let hierarchy = self.hierarchy_for(&draft.all_codes())?;
        Ok(hierarchy.resolve_statuses(&draft.decisions))
    }

    /// Apply a batch of updates to the draft's decisions.
    #[instrument(level = "debug", skip(self, draft), fields(draft = %draft.name))]
    pub fn update(&self, draft: &Draft, updates: &[Update]) -> ApplicationResult<UpdateOutcome> {
        self.check_coding_system(draft)?;
        let hierarchy = self.hierarchy_for(&draft.all_codes())?;
        let outcome = hierarchy.update_explicit_decisions(&draft.decisions, updates)?;
        info!(
            "updated {}: {} included, {} excluded",
            draft.name,
            outcome.decisions.included().len(),
            outcome.decisions.excluded().len()
        );
        Ok(outcome)
    }

    /// Add a search and the codes it returned to the draft.
    ///
    /// # Errors
    /// - `UnknownCode` if a returned code is not part of the terminology
    /// - `DuplicateSearch` if the draft already has a search with this slug
    #[instrument(level = "debug", skip(self, draft, codes), fields(draft = %draft.name))]
    pub fn add_search(
        &self,
        draft: &mut Draft,
        term: &str,
        codes: BTreeSet<Code>,
    ) -> ApplicationResult<Search> {
        self.check_coding_system(draft)?;
        if let Some(code) = codes.iter().find(|c| !self.terminology.contains(c)) {
            return Err(DomainError::UnknownCode(code.clone()).into());
        }
        let search = draft.add_search(term, codes)?.clone();
        info!("search '{}' added to {}: {} codes", search.term, draft.name, search.codes.len());
        Ok(search)
    }

    /// The draft expressed as include rules with their excluded descendants.
    pub fn definition(&self, draft: &Draft) -> ApplicationResult<Vec<DefinitionRow>> {
        self.check_coding_system(draft)?;
        let hierarchy = self.hierarchy_for(&draft.all_codes())?;
        let terms = self.terminology.code_to_term(&draft.decisions.codes());
        Ok(build_definition_rows(
            &hierarchy,
            &draft.decisions,
            &terms,
            draft.coding_system,
        ))
    }

    /// `(code, term)` for every draft code that ends up in the codelist.
    pub fn export(&self, draft: &Draft) -> ApplicationResult<Vec<(Code, String)>> {
        let statuses = self.statuses(draft)?;
        let codes: BTreeSet<Code> = draft
            .all_codes()
            .into_iter()
            .filter(|code| statuses.get(code).is_some_and(|s| s.is_included()))
            .collect();
        let terms = self.terminology.code_to_term(&codes);
        debug!("export {}: {} codes", draft.name, codes.len());
        Ok(codes
            .into_iter()
            .map(|code| {
                let term = draft.coding_system.lookup_term(&code, &terms).to_string();
                (code, term)
            })
            .collect())
    }

    /// Build the page model for a draft.
    ///
    /// # Errors
    /// - `CodingSystemMismatch` if the draft and terminology disagree
    /// - `SearchNotFound` for an unknown search slug
    /// - `UnknownCode` if a draft code is not in the terminology
    #[instrument(level = "debug", skip(self, draft), fields(draft = %draft.name))]
    pub fn draft_view(
        &self,
        draft: &Draft,
        selection: &SearchSelection,
        filter: DisplayFilter,
    ) -> ApplicationResult<DraftView> {
        self.check_coding_system(draft)?;
        let all_codes = draft.all_codes();
        let hierarchy = self.hierarchy_for(&all_codes)?;
        let statuses = hierarchy.resolve_statuses(&draft.decisions);

        let selected = match selection {
            SearchSelection::NoSelection => all_codes.clone(),
            SearchSelection::ExplicitSearch(slug) => draft
                .search(slug)
                .ok_or_else(|| ApplicationError::SearchNotFound(slug.clone()))?
                .codes
                .clone(),
            SearchSelection::UnassignedCodes => draft.unassigned_codes(),
        };
        let displayed: BTreeSet<Code> = selected
            .into_iter()
            .filter(|code| filter.matches(statuses.get(code).copied().unwrap_or(Status::Unknown)))
            .collect();
        let ancestors = hierarchy.filter_to_ultimate_ancestors(&displayed);
        debug!(
            "draft_view: {} displayed codes under {} ultimate ancestors",
            displayed.len(),
            ancestors.len()
        );

        let code_to_term = self.terminology.code_to_term(hierarchy.nodes());
        let ancestors_by_type = draft
            .coding_system
            .codes_by_type(&ancestors, &hierarchy, &code_to_term);
        let included: BTreeSet<Code> = included_codes(&statuses).into_iter().collect();
        let tree_tables = TreePresenter::new(&hierarchy, &included, &code_to_term)
            .with_coding_system(draft.coding_system)
            .tables(&ancestors_by_type);

        let with_status = |pred: fn(Status) -> bool| -> Vec<Code> {
            all_codes
                .iter()
                .filter(|code| statuses.get(*code).copied().is_some_and(pred))
                .cloned()
                .collect()
        };
        let included_codes = with_status(Status::is_included);
        let excluded_codes = with_status(Status::is_excluded);

        Ok(DraftView {
            draft_name: draft.name.clone(),
            coding_system: draft.coding_system,
            searches: search_entries(draft, selection),
            filter: filter.label(),
            tree_tables,
            all_codes: all_codes.into_iter().collect(),
            included_codes,
            excluded_codes,
            code_to_term,
            code_to_status: statuses,
        })
    }

    fn check_coding_system(&self, draft: &Draft) -> ApplicationResult<()> {
        let terminology = self.terminology.coding_system();
        if draft.coding_system != terminology {
            return Err(ApplicationError::CodingSystemMismatch {
                draft: draft.coding_system,
                terminology,
            });
        }
        Ok(())
    }
}

/// Searches ordered by term, then the unassigned entry when it has codes.
fn search_entries(draft: &Draft, selection: &SearchSelection) -> Vec<SearchEntry> {
    if draft.searches.is_empty() {
        return Vec::new();
    }
    let mut entries: Vec<SearchEntry> = draft
        .searches
        .iter()
        .map(|search| SearchEntry {
            term: search.term.clone(),
            active: matches!(selection, SearchSelection::ExplicitSearch(slug) if *slug == search.slug),
            slug: Some(search.slug.clone()),
        })
        .collect();
    entries.sort_by(|a, b| a.term.cmp(&b.term));
    if !draft.unassigned_codes().is_empty() {
        entries.push(SearchEntry {
            term: NO_SEARCH_TERM.to_string(),
            slug: None,
            active: *selection == SearchSelection::UnassignedCodes,
        });
    }
    entries
}
