/// Machine learning building blocks shared by both pipelines
///
/// This module provides:
/// - CSV loading and seeded train/test splits
/// - Text cleaning and tokenization
/// - TF-IDF, scaling and one-hot feature extraction
/// - Multinomial logistic regression and a random forest wrapper
/// - Classification reports and the versioned artifact envelope

pub mod artifact;
pub mod classifier;
pub mod dataset;
pub mod evaluation;
pub mod features;
pub mod labels;
pub mod logistic;
pub mod text;

pub use artifact::{ArtifactHeader, ArtifactKind, RunInfo};
pub use classifier::{Classifier, ForestParams, RandomForestClassifier};
pub use dataset::{load_csv, stratified_split, train_test_split, SplitIndices};
pub use evaluation::{ClassMetrics, ClassificationReport};
pub use features::{
    EncodedTicket, OneHotEncoder, StandardScaler, TfidfConfig, TfidfVectorizer,
    TicketFeatureTransformer,
};
pub use labels::LabelEncoder;
pub use logistic::{ClassWeight, LogisticRegression, LogisticRegressionParams};
pub use text::{StopWords, TextPreprocessor};
