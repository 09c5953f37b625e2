//! Draft documents on disk.
//!
//! ```toml
//! name = "Tennis elbow"
//! coding_system = "snomedct"
//! codes = ["116309007"]
//! included = ["35185008"]
//! excluded = []
//!
//! [[searches]]
//! term = "epicondylitis"
//! codes = ["73583000", "202855006"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::domain::{Code, CodingSystem, DecisionSet, Draft, Search};
use crate::infrastructure::error::{InfraError, InfraResult};

#[derive(Debug, Serialize, Deserialize)]
struct RawDraft {
    name: String,
    coding_system: CodingSystem,
    #[serde(default)]
    codes: BTreeSet<Code>,
    #[serde(default)]
    included: BTreeSet<Code>,
    #[serde(default)]
    excluded: BTreeSet<Code>,
    #[serde(default)]
    searches: Vec<RawSearch>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawSearch {
    term: String,
    #[serde(default)]
    codes: BTreeSet<Code>,
}

impl RawDraft {
    fn into_draft(self) -> InfraResult<Draft> {
        let decisions =
            DecisionSet::new(self.included, self.excluded).map_err(ApplicationError::from)?;
        Ok(Draft {
            name: self.name,
            coding_system: self.coding_system,
            codes: self.codes,
            decisions,
            searches: self
                .searches
                .into_iter()
                .map(|s| Search::new(s.term, s.codes))
                .collect(),
        })
    }

    fn from_draft(draft: &Draft) -> Self {
        Self {
            name: draft.name.clone(),
            coding_system: draft.coding_system,
            codes: draft.codes.clone(),
            included: draft.decisions.included().clone(),
            excluded: draft.decisions.excluded().clone(),
            searches: draft
                .searches
                .iter()
                .map(|s| RawSearch {
                    term: s.term.clone(),
                    codes: s.codes.clone(),
                })
                .collect(),
        }
    }
}

/// Parse a draft document from TOML text.
pub fn parse_draft(content: &str, path: &Path) -> InfraResult<Draft> {
    let raw: RawDraft = toml::from_str(content).map_err(|e| InfraError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    raw.into_draft()
}

#[instrument(level = "debug")]
pub fn load_draft(path: &Path) -> InfraResult<Draft> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| InfraError::io(format!("read draft {}", path.display()), e))?;
    let draft = parse_draft(&content, path)?;
    debug!(
        "load_draft: {} with {} codes, {} searches",
        draft.name,
        draft.all_codes().len(),
        draft.searches.len()
    );
    Ok(draft)
}

/// Write a draft back, e.g. after applying updates.
#[instrument(level = "debug", skip(draft), fields(draft = %draft.name))]
pub fn save_draft(path: &Path, draft: &Draft) -> InfraResult<()> {
    let content = toml::to_string_pretty(&RawDraft::from_draft(draft)).map_err(|e| InfraError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    std::fs::write(path, content)
        .map_err(|e| InfraError::io(format!("write draft {}", path.display()), e))
}
