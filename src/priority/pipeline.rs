use crate::config::PriorityConfig;
use crate::error::{AppError, Result};
use crate::ml::{
    ClassificationReport, LabelEncoder, LogisticRegression, LogisticRegressionParams, TfidfConfig,
    TicketFeatureTransformer,
};
use crate::models::{TicketFeatures, TicketRecord};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Class probabilities for one ticket, in label order
#[derive(Debug, Clone, PartialEq)]
pub struct TicketScores {
    pub proba: Vec<(String, f64)>,

    /// Categorical columns whose value was not seen in training
    pub unknown_categories: Vec<String>,
}

impl TicketScores {
    /// First label holding the highest probability
    pub fn top(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, p) in &self.proba {
            if best.map_or(true, |(_, b)| *p > b) {
                best = Some((label.as_str(), *p));
            }
        }
        best
    }
}

/// Fitted column transformer plus logistic regression, persisted as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityPipeline {
    transformer: TicketFeatureTransformer,
    classifier: LogisticRegression,
    labels: LabelEncoder,
}

impl PriorityPipeline {
    /// Fit the transformer and classifier on labelled tickets
    pub fn fit(records: &[TicketRecord], config: &PriorityConfig) -> Result<Self> {
        let tickets: Vec<TicketFeatures> = records.iter().map(TicketRecord::features).collect();
        let label_names: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();

        let labels = LabelEncoder::fit(&label_names)?;
        let y = labels.encode_all(&label_names)?;

        let mut transformer = TicketFeatureTransformer::new(TfidfConfig {
            ngram_range: config.ngram_range,
            min_doc_freq: config.min_df,
        });
        let x = transformer.fit_transform(&tickets)?;

        let params = LogisticRegressionParams {
            c: config.c,
            max_iter: config.max_iter,
            tol: config.tol,
            ..Default::default()
        };
        let classifier = LogisticRegression::fit(&x, &y, labels.len(), &params)?;

        info!(
            n_samples = records.len(),
            n_features = transformer.n_features(),
            vocab_size = transformer.vocab_size(),
            n_classes = labels.len(),
            n_iter = classifier.n_iter(),
            converged = classifier.converged(),
            "Priority pipeline fitted"
        );

        Ok(Self {
            transformer,
            classifier,
            labels,
        })
    }

    /// Probabilities for a single ticket
    pub fn score(&self, ticket: &TicketFeatures) -> Result<TicketScores> {
        let encoded = self.transformer.transform_one(ticket)?;
        let width = encoded.features.len();
        let row = encoded
            .features
            .into_shape((1, width))
            .map_err(|e| AppError::Internal(format!("Failed to shape feature row: {}", e)))?;
        let proba = self.classifier.predict_proba(&row)?;

        Ok(TicketScores {
            proba: self
                .labels
                .classes()
                .iter()
                .cloned()
                .zip(proba.row(0).iter().copied())
                .collect(),
            unknown_categories: encoded.unknown_categories,
        })
    }

    /// Predicted class indices for a batch
    pub fn predict(&self, tickets: &[TicketFeatures]) -> Result<Vec<usize>> {
        let x: Array2<f64> = self.transformer.transform(tickets)?;
        self.classifier.predict(&x)
    }

    /// Classification report on labelled tickets
    pub fn evaluate(&self, records: &[TicketRecord]) -> Result<ClassificationReport> {
        let tickets: Vec<TicketFeatures> = records.iter().map(TicketRecord::features).collect();
        let y_pred = self.predict(&tickets)?;

        let predicted = y_pred
            .iter()
            .map(|&index| self.labels.decode(index))
            .collect::<Result<Vec<&str>>>()?;
        let actual: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();

        Ok(ClassificationReport::from_label_names(&actual, &predicted))
    }

    pub fn classes(&self) -> &[String] {
        self.labels.classes()
    }

    pub fn n_features(&self) -> usize {
        self.transformer.n_features()
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }
}
