//! Shared fixtures for integration tests: small labelled datasets written to
//! temporary CSV files and configurations pointing at them.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::Path;
use tempfile::TempDir;
use ticket_priority::config::{MaintenanceConfig, PriorityConfig};

const HIGH_TEXTS: [&str; 3] = [
    "checkout outage payments failing for all customers",
    "site down cannot process payments urgent",
    "production outage checkout failing again",
];
const MEDIUM_TEXTS: [&str; 3] = [
    "invoice amount looks wrong please check",
    "refund request pending for last invoice",
    "billing address update failing on invoice",
];
const LOW_TEXTS: [&str; 3] = [
    "how do i change my profile picture",
    "question about newsletter preferences",
    "feature request dark mode for profile page",
];

/// 60 tickets, 20 per priority, with text, spend and SLA signals agreeing
pub fn priority_csv() -> String {
    let mut csv = String::from("text,spend30d,eta_to_sla_min,domain,vip,label,channel\n");
    for i in 0..20 {
        let jitter = (i % 5) as f64;
        let domain = if i % 2 == 0 { "rb" } else { "m" };
        writeln!(
            csv,
            "\"{}\",{},{},{},{},high,email",
            HIGH_TEXTS[i % 3],
            900.0 + 10.0 * jitter,
            -20.0 + jitter,
            domain,
            1
        )
        .unwrap();
        writeln!(
            csv,
            "\"{}\",{},{},{},{},medium,chat",
            MEDIUM_TEXTS[i % 3],
            300.0 + 10.0 * jitter,
            240.0 + jitter,
            domain,
            i % 2
        )
        .unwrap();
        writeln!(
            csv,
            "\"{}\",{},{},{},{},low,web",
            LOW_TEXTS[i % 3],
            20.0 + jitter,
            1440.0 + jitter,
            domain,
            0
        )
        .unwrap();
    }
    csv
}

const ISSUES: [(&str, &str); 9] = [
    ("El aire acondicionado no funciona", "alta"),
    ("Fuga de agua en el baño de la habitación", "alta"),
    ("No hay luz en toda la planta", "alta"),
    ("El aire acondicionado hace mucho ruido", "media"),
    ("La televisión de la habitación no enciende", "media"),
    ("La ducha pierde presión de agua", "media"),
    ("Cambiar la bombilla de la lámpara", "baja"),
    ("Reponer toallas en la habitación", "baja"),
    ("La cortina de la ventana está descolgada", "baja"),
];

/// 45 maintenance issues cycling through three priorities
pub fn maintenance_csv() -> String {
    let mut csv = String::from("issue,priority\n");
    for (issue, priority) in ISSUES.iter().cycle().take(45) {
        writeln!(csv, "\"{}\",{}", issue, priority).unwrap();
    }
    csv
}

pub fn write_file(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
}

/// Priority config whose dataset and model live in `dir`
pub fn priority_config(dir: &TempDir) -> PriorityConfig {
    let dataset_path = dir.path().join("tickets_priority_dataset.csv");
    write_file(&dataset_path, &priority_csv());
    PriorityConfig {
        dataset_path,
        model_path: dir.path().join("priority_model.bin"),
        ..Default::default()
    }
}

/// Maintenance config whose dataset and artifacts live in `dir`
pub fn maintenance_config(dir: &TempDir) -> MaintenanceConfig {
    let dataset_path = dir.path().join("tickets_mantenimiento.csv");
    write_file(&dataset_path, &maintenance_csv());
    MaintenanceConfig {
        dataset_path,
        bundle_path: dir.path().join("maintenance_bundle.bin"),
        classifier_path: dir.path().join("priority_model.bin"),
        vectorizer_path: dir.path().join("vectorizer.bin"),
        n_trees: 20,
        ..Default::default()
    }
}
