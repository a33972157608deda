use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Answer to a single-ticket priority request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityPrediction {
    /// Label with the highest probability
    pub priority: String,

    /// Top probability as a 0-100 integer
    pub score: u8,

    /// Probability of every trained label
    pub proba: BTreeMap<String, f64>,

    /// Top probability fell below the review threshold
    pub needs_review: bool,

    /// Model identifier
    pub model: String,

    /// Categorical columns whose value was never seen in training
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_categories: Vec<String>,
}

impl PriorityPrediction {
    /// Highest class probability
    pub fn confidence(&self) -> f64 {
        self.proba.values().copied().fold(0.0, f64::max)
    }
}
