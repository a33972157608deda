use crate::config::MaintenanceConfig;
use crate::error::Result;
use crate::maintenance::bundle::{IssueClassifier, IssueVectorizer, MaintenanceBundle};
use crate::ml::artifact::RunInfo;
use crate::ml::{
    load_csv, train_test_split, ClassificationReport, Classifier, ForestParams, LabelEncoder,
    RandomForestClassifier, StopWords, TextPreprocessor, TfidfConfig, TfidfVectorizer,
};
use crate::models::IssueRecord;
use ndarray::Axis;
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

/// Model name stamped on maintenance artifacts
pub const MAINTENANCE_MODEL_NAME: &str = "tfidf_random_forest";

/// Outcome of a maintenance training run
#[derive(Debug, Clone)]
pub struct MaintenanceTrainingSummary {
    pub run_id: Uuid,
    pub n_train: usize,
    pub n_test: usize,
    pub vocab_size: usize,
    pub report: ClassificationReport,

    /// Every artifact written by the run
    pub artifacts: Vec<PathBuf>,
}

/// Fit vectorizer and forest on issue records; returns the bundle and its
/// held-out report
pub fn fit_bundle(
    records: &[IssueRecord],
    config: &MaintenanceConfig,
    run_id: Uuid,
) -> Result<(MaintenanceBundle, ClassificationReport, usize, usize)> {
    let stopwords = StopWords::load_or_default(config.stopwords_path.as_deref())?;
    let preprocessor = TextPreprocessor::new(stopwords);
    let cleaned: Vec<String> = records.iter().map(|r| preprocessor.clean(&r.issue)).collect();

    // Vocabulary and idf come from the whole corpus, the forest only sees the
    // training rows.
    let mut tfidf = TfidfVectorizer::new(TfidfConfig::default());
    let x = tfidf.fit_transform(&cleaned)?;

    let split = train_test_split(records.len(), config.test_size, config.seed)?;
    let (train, test) = split.apply(records);

    let train_labels: Vec<&str> = train.iter().map(|r| r.priority.as_str()).collect();
    let labels = LabelEncoder::fit(&train_labels)?;
    let y_train = labels.encode_all(&train_labels)?;

    let forest = RandomForestClassifier::fit(
        &x.select(Axis(0), &split.train),
        &y_train,
        labels.len(),
        ForestParams {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            seed: config.seed,
        },
    )?;

    let predicted = forest
        .predict(&x.select(Axis(0), &split.test))?
        .into_iter()
        .map(|index| labels.decode(index).map(str::to_string))
        .collect::<Result<Vec<String>>>()?;
    let actual: Vec<&str> = test.iter().map(|r| r.priority.as_str()).collect();
    let report = ClassificationReport::from_label_names(&actual, &predicted);
    debug!(model = forest.name(), n_test = actual.len(), "Held-out rows scored");

    let bundle = MaintenanceBundle::new(
        run_id,
        IssueVectorizer {
            preprocessor,
            tfidf,
        },
        IssueClassifier { forest, labels },
    )?;
    Ok((bundle, report, train.len(), test.len()))
}

/// Train from `config.dataset_path`, write the bundle and, when `split_export`
/// is set, the classifier and vectorizer as separate artifacts
pub fn train_maintenance_model(
    config: &MaintenanceConfig,
    split_export: bool,
) -> Result<MaintenanceTrainingSummary> {
    let records: Vec<IssueRecord> = load_csv(&config.dataset_path)?;
    let run = RunInfo::new(MAINTENANCE_MODEL_NAME);
    info!(
        run_id = %run.run_id,
        records = records.len(),
        n_trees = config.n_trees,
        seed = config.seed,
        "Training maintenance model"
    );

    let (bundle, report, n_train, n_test) = fit_bundle(&records, config, run.run_id)?;
    info!(accuracy = report.accuracy, "Maintenance model evaluated");

    bundle.save(&config.bundle_path, &run)?;
    let mut artifacts = vec![config.bundle_path.clone()];
    if split_export {
        bundle.save_components(&config.classifier_path, &config.vectorizer_path, &run)?;
        artifacts.push(config.classifier_path.clone());
        artifacts.push(config.vectorizer_path.clone());
    }

    Ok(MaintenanceTrainingSummary {
        run_id: run.run_id,
        n_train,
        n_test,
        vocab_size: bundle.vectorizer.n_features(),
        report,
        artifacts,
    })
}
