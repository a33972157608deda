//! Integration tests for the maintenance issue pipeline.

mod common;

use common::maintenance_config;
use ticket_priority::{
    maintenance::{train_maintenance_model, MaintenancePredictor, DEFAULT_ISSUE},
    AppError,
};

#[test]
fn test_train_and_predict_default_issue() {
    let dir = tempfile::tempdir().unwrap();
    let config = maintenance_config(&dir);

    let summary = train_maintenance_model(&config, false).unwrap();
    assert_eq!(summary.n_test, 9);
    assert_eq!(summary.n_train, 36);
    assert_eq!(summary.artifacts, vec![config.bundle_path.clone()]);
    assert!(summary.report.accuracy > 0.5);

    let predictor = MaintenancePredictor::load(&config.bundle_path).unwrap();
    assert_eq!(predictor.run_id(), summary.run_id);
    assert_eq!(
        predictor.clean(DEFAULT_ISSUE),
        "aire acondicionado funciona habitación 101"
    );

    let label = predictor.predict_priority(DEFAULT_ISSUE).unwrap();
    assert!(["alta", "baja", "media"].contains(&label.as_str()));
}

#[test]
fn test_split_export_loads_as_components() {
    let dir = tempfile::tempdir().unwrap();
    let config = maintenance_config(&dir);

    let summary = train_maintenance_model(&config, true).unwrap();
    assert_eq!(summary.artifacts.len(), 3);

    let from_bundle = MaintenancePredictor::load(&config.bundle_path).unwrap();
    let from_parts =
        MaintenancePredictor::load_components(&config.classifier_path, &config.vectorizer_path)
            .unwrap();

    for issue in ["Fuga de agua en el baño", "Cambiar la bombilla", DEFAULT_ISSUE] {
        assert_eq!(
            from_bundle.predict_priority(issue).unwrap(),
            from_parts.predict_priority(issue).unwrap()
        );
    }
}

#[test]
fn test_components_from_different_runs_fail() {
    let first_dir = tempfile::tempdir().unwrap();
    let first = maintenance_config(&first_dir);
    train_maintenance_model(&first, true).unwrap();

    let second_dir = tempfile::tempdir().unwrap();
    let second = maintenance_config(&second_dir);
    train_maintenance_model(&second, true).unwrap();

    let err = MaintenancePredictor::load_components(&first.classifier_path, &second.vectorizer_path)
        .unwrap_err();
    assert!(matches!(err, AppError::ArtifactMismatch { .. }));
}

#[test]
fn test_swapped_component_files_fail() {
    let dir = tempfile::tempdir().unwrap();
    let config = maintenance_config(&dir);
    train_maintenance_model(&config, true).unwrap();

    let err = MaintenancePredictor::load_components(&config.vectorizer_path, &config.classifier_path)
        .unwrap_err();
    assert!(matches!(err, AppError::Artifact(_)));
}

#[test]
fn test_training_is_deterministic() {
    let a_dir = tempfile::tempdir().unwrap();
    let b_dir = tempfile::tempdir().unwrap();
    let a = train_maintenance_model(&maintenance_config(&a_dir), false).unwrap();
    let b = train_maintenance_model(&maintenance_config(&b_dir), false).unwrap();

    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.report, b.report);
}

#[test]
fn test_custom_stopword_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = maintenance_config(&dir);
    let stopwords = dir.path().join("stopwords.txt");
    common::write_file(&stopwords, "el\nla\nno\nen\naire\n");
    config.stopwords_path = Some(stopwords);

    train_maintenance_model(&config, false).unwrap();
    let predictor = MaintenancePredictor::load(&config.bundle_path).unwrap();
    assert_eq!(
        predictor.clean(DEFAULT_ISSUE),
        "acondicionado funciona habitación 101"
    );
}
