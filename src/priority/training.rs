use crate::config::PriorityConfig;
use crate::error::Result;
use crate::ml::artifact::{self, ArtifactKind, RunInfo};
use crate::ml::{load_csv, stratified_split, ClassificationReport};
use crate::models::TicketRecord;
use crate::priority::pipeline::PriorityPipeline;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// Outcome of one training run
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub run_id: Uuid,
    pub model_name: String,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,

    /// Held-out evaluation
    pub report: ClassificationReport,

    pub artifact_path: PathBuf,

    /// Optimizer reached its gradient tolerance
    pub converged: bool,
}

/// Fit on a stratified split of labelled records and evaluate on the rest
pub fn fit_and_evaluate(
    records: &[TicketRecord],
    config: &PriorityConfig,
) -> Result<(PriorityPipeline, ClassificationReport, usize, usize)> {
    let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
    let split = stratified_split(&labels, config.test_size, config.seed)?;
    let (train, test) = split.apply(records);

    let pipeline = PriorityPipeline::fit(&train, config)?;
    let report = pipeline.evaluate(&test)?;
    Ok((pipeline, report, train.len(), test.len()))
}

/// Train the priority pipeline from `config.dataset_path` and write it to
/// `config.model_path`
pub fn train_priority_model(config: &PriorityConfig) -> Result<TrainingSummary> {
    let records: Vec<TicketRecord> = load_csv(&config.dataset_path)?;
    let run = RunInfo::new(&config.model_name);
    info!(
        run_id = %run.run_id,
        records = records.len(),
        seed = config.seed,
        "Training priority model"
    );

    let (pipeline, report, n_train, n_test) = fit_and_evaluate(&records, config)?;
    info!(
        accuracy = report.accuracy,
        macro_f1 = report.macro_avg.f1_score,
        "Priority model evaluated"
    );

    artifact::save(&config.model_path, ArtifactKind::PriorityPipeline, &run, &pipeline)?;

    Ok(TrainingSummary {
        run_id: run.run_id,
        model_name: run.model_name,
        n_train,
        n_test,
        n_features: pipeline.n_features(),
        converged: pipeline.classifier().converged(),
        report,
        artifact_path: config.model_path.clone(),
    })
}
