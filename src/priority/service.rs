use crate::config::PriorityConfig;
use crate::error::{AppError, Result};
use crate::metrics::{
    MODEL_INFO, PREDICTIONS_TOTAL, PREDICTION_DURATION_SECONDS, UNKNOWN_CATEGORIES_TOTAL,
};
use crate::ml::artifact::{self, ArtifactHeader, ArtifactKind};
use crate::models::{PriorityPrediction, TicketFeatures};
use crate::priority::pipeline::PriorityPipeline;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Settings applied to every prediction
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    /// Identifier returned in each response
    pub model_name: String,

    /// Below this top probability a prediction needs review
    pub review_threshold: f64,
}

impl From<&PriorityConfig> for ServiceSettings {
    fn from(config: &PriorityConfig) -> Self {
        Self {
            model_name: config.model_name.clone(),
            review_threshold: config.review_threshold,
        }
    }
}

/// Loaded priority model; immutable after construction and shared by all requests
#[derive(Debug)]
pub struct PriorityService {
    pipeline: PriorityPipeline,
    settings: ServiceSettings,
    header: Option<ArtifactHeader>,
}

impl PriorityService {
    /// Read and validate the artifact at `path`
    pub fn load(path: &Path, settings: ServiceSettings) -> Result<Self> {
        let (header, pipeline): (ArtifactHeader, PriorityPipeline) =
            artifact::load(path, ArtifactKind::PriorityPipeline)?;

        if header.model_name != settings.model_name {
            warn!(
                artifact_model = %header.model_name,
                configured_model = %settings.model_name,
                "Artifact was trained under a different model name"
            );
        }
        MODEL_INFO
            .with_label_values(&[settings.model_name.as_str(), header.run_id.to_string().as_str()])
            .set(1.0);
        info!(
            path = %path.display(),
            run_id = %header.run_id,
            trained_at = %header.trained_at,
            classes = ?pipeline.classes(),
            "Priority model loaded"
        );

        Ok(Self {
            pipeline,
            settings,
            header: Some(header),
        })
    }

    /// Wrap an in-memory pipeline
    pub fn from_pipeline(pipeline: PriorityPipeline, settings: ServiceSettings) -> Self {
        Self {
            pipeline,
            settings,
            header: None,
        }
    }

    /// Score one ticket
    pub fn predict(&self, ticket: &TicketFeatures) -> Result<PriorityPrediction> {
        let started = Instant::now();
        let scores = self.pipeline.score(ticket)?;

        let (priority, top) = scores
            .top()
            .map(|(label, p)| (label.to_string(), p))
            .ok_or_else(|| AppError::Prediction("model produced no class probabilities".to_string()))?;

        let score = (100.0 * top).round_ties_even().clamp(0.0, 100.0) as u8;
        let needs_review = top < self.settings.review_threshold;

        for column in &scores.unknown_categories {
            UNKNOWN_CATEGORIES_TOTAL
                .with_label_values(&[column.as_str()])
                .inc();
            debug!(column = %column, "Unseen category value, encoded as all zeros");
        }
        PREDICTIONS_TOTAL
            .with_label_values(&[priority.as_str(), if needs_review { "true" } else { "false" }])
            .inc();
        PREDICTION_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        debug!(priority = %priority, score, needs_review, "Ticket scored");

        Ok(PriorityPrediction {
            priority,
            score,
            proba: scores.proba.into_iter().collect(),
            needs_review,
            model: self.settings.model_name.clone(),
            unknown_categories: scores.unknown_categories,
        })
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Header of the artifact this service was loaded from
    pub fn header(&self) -> Option<&ArtifactHeader> {
        self.header.as_ref()
    }
}
