use crate::error::{AppError, Result};
use crate::ml::artifact::{self, ArtifactHeader, ArtifactKind, RunInfo};
use crate::ml::{Classifier, LabelEncoder, RandomForestClassifier, TextPreprocessor, TfidfVectorizer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Cleaning plus TF-IDF for maintenance issues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueVectorizer {
    pub preprocessor: TextPreprocessor,
    pub tfidf: TfidfVectorizer,
}

impl IssueVectorizer {
    /// Clean and vectorize a batch of raw issues
    pub fn transform<S: AsRef<str>>(&self, issues: &[S]) -> Result<Array2<f64>> {
        let cleaned: Vec<String> = issues
            .iter()
            .map(|issue| self.preprocessor.clean(issue.as_ref()))
            .collect();
        self.tfidf.transform(&cleaned)
    }

    pub fn n_features(&self) -> usize {
        self.tfidf.n_features()
    }
}

/// Random forest with the label names it predicts
#[derive(Debug, Serialize, Deserialize)]
pub struct IssueClassifier {
    pub forest: RandomForestClassifier,
    pub labels: LabelEncoder,
}

/// Vectorizer and classifier from one training run, stored and loaded together
#[derive(Debug, Serialize, Deserialize)]
pub struct MaintenanceBundle {
    /// Compatibility id; matches the header run id of every artifact of the run
    pub run_id: Uuid,
    pub vectorizer: IssueVectorizer,
    pub classifier: IssueClassifier,
}

fn check_width(vectorizer: &IssueVectorizer, classifier: &IssueClassifier) -> Result<()> {
    let produced = vectorizer.n_features();
    let expected = classifier.forest.n_features();
    if produced != expected {
        return Err(AppError::ArtifactMismatch {
            expected: format!("{} features", expected),
            found: format!("{} features", produced),
        });
    }
    Ok(())
}

impl MaintenanceBundle {
    pub fn new(run_id: Uuid, vectorizer: IssueVectorizer, classifier: IssueClassifier) -> Result<Self> {
        check_width(&vectorizer, &classifier)?;
        Ok(Self {
            run_id,
            vectorizer,
            classifier,
        })
    }

    /// Pair separately loaded components, rejecting ones from different runs
    pub fn from_components(
        classifier: (ArtifactHeader, IssueClassifier),
        vectorizer: (ArtifactHeader, IssueVectorizer),
    ) -> Result<Self> {
        let (classifier_header, classifier) = classifier;
        let (vectorizer_header, vectorizer) = vectorizer;
        if classifier_header.run_id != vectorizer_header.run_id {
            return Err(AppError::ArtifactMismatch {
                expected: format!("vectorizer from run {}", classifier_header.run_id),
                found: format!("vectorizer from run {}", vectorizer_header.run_id),
            });
        }
        Self::new(classifier_header.run_id, vectorizer, classifier)
    }

    pub fn save(&self, path: &Path, run: &RunInfo) -> Result<()> {
        self.check_run(run.run_id)?;
        artifact::save(path, ArtifactKind::MaintenanceBundle, run, self)
    }

    /// Write the classifier and vectorizer as two artifacts sharing the run id
    pub fn save_components(&self, classifier_path: &Path, vectorizer_path: &Path, run: &RunInfo) -> Result<()> {
        self.check_run(run.run_id)?;
        artifact::save(classifier_path, ArtifactKind::MaintenanceClassifier, run, &self.classifier)?;
        artifact::save(vectorizer_path, ArtifactKind::MaintenanceVectorizer, run, &self.vectorizer)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let (header, bundle): (ArtifactHeader, Self) = artifact::load(path, ArtifactKind::MaintenanceBundle)?;
        bundle.check_run(header.run_id)?;
        check_width(&bundle.vectorizer, &bundle.classifier)?;
        info!(path = %path.display(), run_id = %bundle.run_id, "Maintenance bundle loaded");
        Ok(bundle)
    }

    pub fn load_components(classifier_path: &Path, vectorizer_path: &Path) -> Result<Self> {
        let classifier = artifact::load(classifier_path, ArtifactKind::MaintenanceClassifier)?;
        let vectorizer = artifact::load(vectorizer_path, ArtifactKind::MaintenanceVectorizer)?;
        let bundle = Self::from_components(classifier, vectorizer)?;
        info!(
            classifier = %classifier_path.display(),
            vectorizer = %vectorizer_path.display(),
            run_id = %bundle.run_id,
            "Maintenance components loaded"
        );
        Ok(bundle)
    }

    fn check_run(&self, run_id: Uuid) -> Result<()> {
        if self.run_id != run_id {
            return Err(AppError::ArtifactMismatch {
                expected: self.run_id.to_string(),
                found: run_id.to_string(),
            });
        }
        Ok(())
    }
}
