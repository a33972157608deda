use crate::error::{AppError, Result};
use crate::maintenance::bundle::MaintenanceBundle;
use crate::ml::Classifier;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Example issue used when no text is given on the command line
pub const DEFAULT_ISSUE: &str = "El aire acondicionado no funciona en la habitación 101";

/// Loaded maintenance model answering one issue at a time
#[derive(Debug)]
pub struct MaintenancePredictor {
    bundle: MaintenanceBundle,
}

impl MaintenancePredictor {
    pub fn new(bundle: MaintenanceBundle) -> Self {
        Self { bundle }
    }

    /// Load from a single bundle artifact
    pub fn load(bundle_path: &Path) -> Result<Self> {
        MaintenanceBundle::load(bundle_path).map(Self::new)
    }

    /// Load from the split classifier and vectorizer artifacts
    pub fn load_components(classifier_path: &Path, vectorizer_path: &Path) -> Result<Self> {
        MaintenanceBundle::load_components(classifier_path, vectorizer_path).map(Self::new)
    }

    /// Text after cleaning, as the vectorizer sees it
    pub fn clean(&self, text: &str) -> String {
        self.bundle.vectorizer.preprocessor.clean(text)
    }

    /// Priority label for one raw issue
    pub fn predict_priority(&self, text: &str) -> Result<String> {
        let features = self.bundle.vectorizer.transform(&[text])?;
        let predicted = self.bundle.classifier.forest.predict(&features)?;
        let index = predicted
            .first()
            .copied()
            .ok_or_else(|| AppError::Prediction("classifier returned no prediction".to_string()))?;
        let label = self.bundle.classifier.labels.decode(index)?.to_string();

        debug!(cleaned = %self.clean(text), priority = %label, "Issue classified");
        Ok(label)
    }

    pub fn classes(&self) -> &[String] {
        self.bundle.classifier.labels.classes()
    }

    pub fn run_id(&self) -> Uuid {
        self.bundle.run_id
    }
}
