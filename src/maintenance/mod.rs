//! Spanish maintenance issue classifier: text cleaning, TF-IDF and a random forest.

pub mod bundle;
pub mod service;
pub mod training;

pub use bundle::{IssueClassifier, IssueVectorizer, MaintenanceBundle};
pub use service::{MaintenancePredictor, DEFAULT_ISSUE};
pub use training::{train_maintenance_model, MaintenanceTrainingSummary};
