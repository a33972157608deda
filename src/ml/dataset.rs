use crate::error::{AppError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Read every row of a headered CSV file into `T`.
///
/// Fails on the first row that is missing a column or has a value of the wrong
/// type; the error names the offending record.
pub fn load_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| match e.kind() {
            csv::ErrorKind::Io(_) => AppError::NotFound(format!("{}: {}", path.display(), e)),
            _ => AppError::from(e),
        })?;

    let records: Vec<T> = reader
        .deserialize()
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| AppError::Dataset(format!("{}: {}", path.display(), e)))?;

    if records.is_empty() {
        return Err(AppError::Dataset(format!(
            "{} contains no data rows",
            path.display()
        )));
    }

    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Pick the rows of `items` for each side
    pub fn apply<T: Clone>(&self, items: &[T]) -> (Vec<T>, Vec<T>) {
        let pick = |idx: &[usize]| -> Vec<T> { idx.iter().map(|&i| items[i].clone()).collect() };
        (pick(&self.train), pick(&self.test))
    }
}

fn test_count(n_samples: usize, test_size: f64) -> Result<(usize, usize)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(AppError::Validation(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    let n_test = (test_size * n_samples as f64).ceil() as usize;
    let n_train = n_samples.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(AppError::Validation(format!(
            "With n_samples={} and test_size={}, one side of the split would be empty",
            n_samples, test_size
        )));
    }
    Ok((n_train, n_test))
}

/// Shuffled split without regard to labels.
pub fn train_test_split(n_samples: usize, test_size: f64, seed: u64) -> Result<SplitIndices> {
    let (_, n_test) = test_count(n_samples, test_size)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut rng);
    let train = indices.split_off(n_test);

    debug!(n_train = train.len(), n_test = indices.len(), seed, "Shuffle split");
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

/// Shuffled split that preserves each label's share on both sides.
///
/// Requires at least two classes, at least two rows per class, and room for
/// every class on each side of the split.
pub fn stratified_split<L: AsRef<str>>(
    labels: &[L],
    test_size: f64,
    seed: u64,
) -> Result<SplitIndices> {
    let n_samples = labels.len();
    let (n_train, n_test) = test_count(n_samples, test_size)?;

    let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_class.entry(label.as_ref()).or_default().push(i);
    }

    let n_classes = by_class.len();
    if n_classes < 2 {
        return Err(AppError::Validation(
            "Stratified split needs at least 2 classes in the label column".to_string(),
        ));
    }
    if let Some((label, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(AppError::Validation(format!(
            "The least populated class '{}' has only {} member; stratified split needs at least 2",
            label,
            rows.len()
        )));
    }
    if n_test < n_classes || n_train < n_classes {
        return Err(AppError::Validation(format!(
            "Split sizes (train={}, test={}) must each be at least the number of classes ({})",
            n_train, n_test, n_classes
        )));
    }

    // Floor of the proportional share, then hand out the remainder by largest
    // fractional part while keeping one training row per class.
    let mut allocation: Vec<(usize, f64)> = by_class
        .values()
        .map(|rows| {
            let exact = rows.len() as f64 * n_test as f64 / n_samples as f64;
            (exact.floor() as usize, exact.fract())
        })
        .collect();
    let mut remaining = n_test - allocation.iter().map(|(t, _)| *t).sum::<usize>();

    let mut order: Vec<usize> = (0..n_classes).collect();
    order.sort_by(|&a, &b| allocation[b].1.total_cmp(&allocation[a].1));
    let sizes: Vec<usize> = by_class.values().map(Vec::len).collect();
    for &class in order.iter().cycle().take(n_classes * 2) {
        if remaining == 0 {
            break;
        }
        if allocation[class].0 + 1 < sizes[class] {
            allocation[class].0 += 1;
            remaining -= 1;
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (mut rows, (take, _)) in by_class.into_values().zip(allocation) {
        rows.shuffle(&mut rng);
        let rest = rows.split_off(take);
        test.extend(rows);
        train.extend(rest);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    debug!(n_train = train.len(), n_test = test.len(), seed, "Stratified split");
    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    fn labels(counts: &[(&str, usize)]) -> Vec<String> {
        counts.iter()
            .flat_map(|(label, n)| std::iter::repeat(label.to_string()).take(*n))
            .collect()
    }

    #[test]
    fn test_train_test_split_sizes() {
        let split = train_test_split(100, 0.2, 42).unwrap();
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.test.len(), 20);

        // Test size rounds up
        let split = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn test_split_is_a_partition() {
        let split = train_test_split(50, 0.2, 1).unwrap();
        let all: HashSet<usize> = split.train.iter().chain(&split.test).copied().collect();
        assert_eq!(all.len(), 50);
    }

    #[test]
    fn test_split_is_deterministic_per_seed() {
        assert_eq!(
            train_test_split(40, 0.25, 42).unwrap(),
            train_test_split(40, 0.25, 42).unwrap()
        );
        assert_ne!(
            train_test_split(40, 0.25, 42).unwrap(),
            train_test_split(40, 0.25, 43).unwrap()
        );
    }

    #[test]
    fn test_stratified_split_preserves_proportions() {
        let y = labels(&[("high", 20), ("low", 60), ("medium", 20)]);
        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        let count = |label: &str| split.test.iter().filter(|&&i| y[i] == label).count();
        assert_eq!(count("high"), 4);
        assert_eq!(count("low"), 12);
        assert_eq!(count("medium"), 4);
    }

    #[test]
    fn test_stratified_split_keeps_every_class_in_train() {
        let y = labels(&[("a", 2), ("b", 2), ("c", 6)]);
        let split = stratified_split(&y, 0.3, 42).unwrap();
        let train_labels: HashSet<&str> = split.train.iter().map(|&i| y[i].as_str()).collect();
        assert_eq!(train_labels.len(), 3);
        assert_eq!(split.train.len() + split.test.len(), 10);
    }

    #[test]
    fn test_stratified_split_rejects_single_class() {
        let y = labels(&[("high", 10)]);
        assert!(matches!(
            stratified_split(&y, 0.2, 42),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_stratified_split_rejects_singleton_class() {
        let y = labels(&[("high", 10), ("low", 1)]);
        let err = stratified_split(&y, 0.2, 42).unwrap_err();
        assert!(err.to_string().contains("low"));
    }

    #[test]
    fn test_apply_selects_rows() {
        let items = vec!["a", "b", "c"];
        let split = SplitIndices {
            train: vec![2, 0],
            test: vec![1],
        };
        let (train, test) = split.apply(&items);
        assert_eq!(train, vec!["c", "a"]);
        assert_eq!(test, vec!["b"]);
    }

    #[test]
    fn test_load_csv_reports_missing_column() {
        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct Row {
            issue: String,
            priority: String,
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "issue\nsolo texto").unwrap();
        let err = load_csv::<Row>(file.path()).err().unwrap();
        assert!(matches!(err, AppError::Dataset(_)));
    }

    #[test]
    fn test_load_csv_missing_file() {
        #[derive(serde::Deserialize)]
        struct Row {
            #[allow(dead_code)]
            issue: String,
        }
        let err = load_csv::<Row>(Path::new("/nonexistent/tickets.csv"))
            .err()
            .unwrap();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
