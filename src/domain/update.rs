//! Incremental edits to explicit decisions.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::entities::{DecisionSet, StatusMap, Update};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::hierarchy::Hierarchy;

/// Decisions after a batch of updates, with statuses re-derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub decisions: DecisionSet,
    pub statuses: StatusMap,
}

impl Hierarchy {
    /// Apply `updates` in order to a copy of `decisions` and re-resolve.
    ///
    /// Every code is checked against the hierarchy before anything changes,
    /// so a rejected batch leaves no partial edits behind.
    #[instrument(level = "debug", skip(self, decisions))]
    pub fn update_explicit_decisions(
        &self,
        decisions: &DecisionSet,
        updates: &[Update],
    ) -> DomainResult<UpdateOutcome> {
        if let Some((code, _)) = updates.iter().find(|(code, _)| !self.contains(code)) {
            return Err(DomainError::UnknownCode(code.clone()));
        }

        let mut decisions = decisions.clone();
        decisions.apply_all(updates);
        debug!(
            "update: {} included, {} excluded after {} updates",
            decisions.included().len(),
            decisions.excluded().len(),
            updates.len()
        );

        let statuses = self.resolve_statuses(&decisions);
        Ok(UpdateOutcome { decisions, statuses })
    }

    /// Same as [`Hierarchy::update_explicit_decisions`], starting from a
    /// persisted status map rather than from explicit decision sets.
    pub fn update_node_to_status(&self, statuses: &StatusMap, updates: &[Update]) -> DomainResult<StatusMap> {
        let decisions = DecisionSet::from_statuses(statuses);
        Ok(self.update_explicit_decisions(&decisions, updates)?.statuses)
    }
}
