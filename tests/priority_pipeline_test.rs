//! Integration tests for the priority pipeline: training from CSV, persisting
//! the artifact and serving predictions from it.

mod common;

use common::priority_config;
use ticket_priority::{
    models::TicketFeatures,
    priority::{train_priority_model, PriorityService, ServiceSettings},
    AppError,
};

fn ticket(text: &str, domain: &str, vip: i64, spend30d: f64, eta_to_sla_min: f64) -> TicketFeatures {
    TicketFeatures {
        text: text.to_string(),
        domain: domain.to_string(),
        vip,
        spend30d,
        eta_to_sla_min,
    }
}

fn trained_service() -> (tempfile::TempDir, PriorityService) {
    let dir = tempfile::tempdir().unwrap();
    let config = priority_config(&dir);
    train_priority_model(&config).unwrap();
    let service = PriorityService::load(&config.model_path, ServiceSettings::from(&config)).unwrap();
    (dir, service)
}

#[test]
fn test_training_writes_artifact_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = priority_config(&dir);

    let summary = train_priority_model(&config).unwrap();

    assert!(config.model_path.exists());
    assert_eq!(summary.n_train + summary.n_test, 60);
    assert_eq!(summary.n_test, 12);
    assert_eq!(summary.report.per_class.len(), 3);
    for class in &summary.report.per_class {
        assert_eq!(class.support, 4);
    }
    assert!(summary.report.accuracy > 0.8);
}

#[test]
fn test_prediction_properties() {
    let (_dir, service) = trained_service();
    let prediction = service
        .predict(&ticket("checkout outage payments failing", "rb", 1, 950.0, -15.0))
        .unwrap();

    let total: f64 = prediction.proba.values().sum();
    assert!((total - 1.0).abs() < 1e-6);

    let top = prediction.confidence();
    assert_eq!(prediction.proba[&prediction.priority], top);
    assert_eq!(prediction.score, (100.0 * top).round_ties_even() as u8);
    assert_eq!(prediction.needs_review, top < 0.55);
    assert_eq!(prediction.model, "tfidf_logreg_v1");
    assert_eq!(prediction.priority, "high");
}

#[test]
fn test_unknown_domain_still_predicts() {
    let (_dir, service) = trained_service();
    let prediction = service
        .predict(&ticket("question about newsletter preferences", "enterprise", 0, 25.0, 1400.0))
        .unwrap();

    assert_eq!(prediction.unknown_categories, vec!["domain".to_string()]);
    assert_eq!(prediction.proba.len(), 3);
    assert!(prediction.proba.contains_key(&prediction.priority));
}

#[test]
fn test_training_is_deterministic() {
    let probe = ticket("refund request for invoice", "m", 0, 310.0, 200.0);

    let (_a, first) = trained_service();
    let (_b, second) = trained_service();

    let p1 = first.predict(&probe).unwrap();
    let p2 = second.predict(&probe).unwrap();
    assert_eq!(p1.priority, p2.priority);
    assert_eq!(p1.score, p2.score);
    for (label, p) in &p1.proba {
        assert!((p - p2.proba[label]).abs() < 1e-12);
    }
}

#[test]
fn test_loaded_service_reports_run_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = priority_config(&dir);
    let summary = train_priority_model(&config).unwrap();

    let service = PriorityService::load(&config.model_path, ServiceSettings::from(&config)).unwrap();
    assert_eq!(service.header().unwrap().run_id, summary.run_id);
}

#[test]
fn test_single_class_dataset_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = priority_config(&dir);
    let path = dir.path().join("one_class.csv");
    common::write_file(
        &path,
        "text,spend30d,eta_to_sla_min,domain,vip,label\n\
         a b c,1,2,rb,0,high\n\
         d e f,3,4,m,1,high\n\
         g h i,5,6,rb,0,high\n",
    );
    config.dataset_path = path;

    let err = train_priority_model(&config).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn test_missing_column_is_a_dataset_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = priority_config(&dir);
    let path = dir.path().join("broken.csv");
    common::write_file(&path, "text,spend30d,domain,vip,label\nhello world,1,rb,0,high\n");
    config.dataset_path = path;

    let err = train_priority_model(&config).unwrap_err();
    assert!(matches!(err, AppError::Dataset(_)));
}
