//! Service container for dependency injection
//!
//! Wires up the builder service with its terminology.

use std::path::Path;
use std::sync::Arc;

use crate::application::services::BuilderService;
use crate::config::Settings;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::terminology::FileTerminology;
use crate::infrastructure::traits::TerminologySource;

/// Container holding settings and the collaborators services need.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Terminology the builder service works against
    pub terminology: Arc<dyn TerminologySource>,
}

impl ServiceContainer {
    /// Create a container backed by a terminology snapshot on disk.
    pub fn new(settings: Settings, terminology_path: &Path) -> InfraResult<Self> {
        let terminology = FileTerminology::load(terminology_path)?;
        Ok(Self::with_deps(settings, Arc::new(terminology)))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, terminology: Arc<dyn TerminologySource>) -> Self {
        Self {
            settings: Arc::new(settings),
            terminology,
        }
    }

    pub fn builder_service(&self) -> BuilderService {
        BuilderService::new(Arc::clone(&self.terminology))
    }
}
