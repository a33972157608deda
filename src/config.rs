use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides, e.g. `TICKET_PRIORITY__SERVER__PORT`.
pub const ENV_PREFIX: &str = "TICKET_PRIORITY";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Pipeline A: mixed-feature logistic regression
    #[serde(default)]
    pub priority: PriorityConfig,

    /// Pipeline B: cleaned-text random forest
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CONFIG_PATH").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load configuration, layering an optional file over the built-in defaults
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ));

        // Override with config file if it exists
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: Config = builder
            // Override with environment variables (prefix: TICKET_PRIORITY)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipelines cannot work with
    pub fn validate(&self) -> Result<()> {
        let p = &self.priority;
        if !(p.review_threshold > 0.0 && p.review_threshold < 1.0) {
            return Err(AppError::Configuration(format!(
                "priority.review_threshold must be in (0, 1), got {}",
                p.review_threshold
            )));
        }
        check_test_size("priority.test_size", p.test_size)?;
        check_test_size("maintenance.test_size", self.maintenance.test_size)?;

        let (min_n, max_n) = p.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(AppError::Configuration(format!(
                "priority.ngram_range must satisfy 1 <= min <= max, got ({}, {})",
                min_n, max_n
            )));
        }
        if p.min_df == 0 {
            return Err(AppError::Configuration(
                "priority.min_df must be at least 1".to_string(),
            ));
        }
        if p.max_iter == 0 {
            return Err(AppError::Configuration(
                "priority.max_iter must be at least 1".to_string(),
            ));
        }
        if p.c <= 0.0 {
            return Err(AppError::Configuration(format!(
                "priority.c must be positive, got {}",
                p.c
            )));
        }
        if self.maintenance.n_trees == 0 {
            return Err(AppError::Configuration(
                "maintenance.n_trees must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_test_size(key: &str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(AppError::Configuration(format!(
            "{} must be in (0, 1), got {}",
            key, value
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    /// Labelled ticket CSV
    #[serde(default = "default_priority_dataset")]
    pub dataset_path: PathBuf,

    /// Where the fitted pipeline is written and read
    #[serde(default = "default_priority_model")]
    pub model_path: PathBuf,

    /// Identifier returned in every prediction
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Below this top-class probability a prediction needs review
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,

    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Split seed
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// TF-IDF n-gram range (min, max)
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),

    /// Minimum number of documents a term must appear in
    #[serde(default = "default_min_df")]
    pub min_df: usize,

    /// Optimizer iteration cap
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Inverse regularization strength
    #[serde(default = "default_c")]
    pub c: f64,

    /// Gradient tolerance for early stopping
    #[serde(default = "default_tol")]
    pub tol: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_priority_dataset(),
            model_path: default_priority_model(),
            model_name: default_model_name(),
            review_threshold: default_review_threshold(),
            test_size: default_test_size(),
            seed: default_seed(),
            ngram_range: default_ngram_range(),
            min_df: default_min_df(),
            max_iter: default_max_iter(),
            c: default_c(),
            tol: default_tol(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Maintenance issue CSV
    #[serde(default = "default_maintenance_dataset")]
    pub dataset_path: PathBuf,

    /// Combined vectorizer + classifier bundle
    #[serde(default = "default_bundle_path")]
    pub bundle_path: PathBuf,

    /// Standalone classifier artifact (split export)
    #[serde(default = "default_classifier_path")]
    pub classifier_path: PathBuf,

    /// Standalone vectorizer artifact (split export)
    #[serde(default = "default_vectorizer_path")]
    pub vectorizer_path: PathBuf,

    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Split and forest seed
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of trees in the forest
    #[serde(default = "default_n_trees")]
    pub n_trees: u16,

    /// Optional tree depth limit
    #[serde(default)]
    pub max_depth: Option<u16>,

    /// Stopword file (one word per line) replacing the built-in Spanish list
    #[serde(default)]
    pub stopwords_path: Option<PathBuf>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_maintenance_dataset(),
            bundle_path: default_bundle_path(),
            classifier_path: default_classifier_path(),
            vectorizer_path: default_vectorizer_path(),
            test_size: default_test_size(),
            seed: default_seed(),
            n_trees: default_n_trees(),
            max_depth: None,
            stopwords_path: None,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_priority_dataset() -> PathBuf {
    PathBuf::from("./ai_priority/tickets_priority_dataset.csv")
}

fn default_priority_model() -> PathBuf {
    PathBuf::from("priority_model.bin")
}

fn default_model_name() -> String {
    "tfidf_logreg_v1".to_string()
}

fn default_review_threshold() -> f64 {
    0.55
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_ngram_range() -> (usize, usize) {
    (1, 2)
}

fn default_min_df() -> usize {
    2
}

fn default_max_iter() -> usize {
    200
}

fn default_c() -> f64 {
    1.0
}

fn default_tol() -> f64 {
    1e-4
}

fn default_maintenance_dataset() -> PathBuf {
    PathBuf::from("./training/tickets_mantenimiento.csv")
}

fn default_bundle_path() -> PathBuf {
    PathBuf::from("./training/maintenance_bundle.bin")
}

fn default_classifier_path() -> PathBuf {
    PathBuf::from("./training/priority_model.bin")
}

fn default_vectorizer_path() -> PathBuf {
    PathBuf::from("./training/vectorizer.bin")
}

fn default_n_trees() -> u16 {
    100
}
