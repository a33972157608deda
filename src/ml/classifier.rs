use crate::error::{AppError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier as ForestModel, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;
use tracing::debug;

/// Trait for fitted classifiers working on class indices
pub trait Classifier: Send + Sync {
    /// Predict class indices, one per row
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>>;

    /// Number of input columns the model was fitted on
    fn n_features(&self) -> usize;

    /// Short algorithm name for logs
    fn name(&self) -> &'static str;
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: u16,
    pub max_depth: Option<u16>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            seed: 42,
        }
    }
}

/// Bagged decision trees with sqrt(n_features) candidate columns per split
#[derive(Serialize, Deserialize)]
pub struct RandomForestClassifier {
    model: ForestModel<f64, i32, DenseMatrix<f64>, Vec<i32>>,
    n_features: usize,
    n_classes: usize,
    params: ForestParams,
}

impl fmt::Debug for RandomForestClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForestClassifier")
            .field("n_features", &self.n_features)
            .field("n_classes", &self.n_classes)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn to_dense_matrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let (rows, cols) = arr.dim();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(rows, cols, data, false)
}

impl RandomForestClassifier {
    /// Fit on features and class indices in `0..n_classes`
    pub fn fit(features: &Array2<f64>, labels: &[usize], n_classes: usize, params: ForestParams) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(AppError::Validation(format!(
                "feature rows ({}) and labels ({}) differ in length",
                features.nrows(),
                labels.len()
            )));
        }
        if features.nrows() == 0 {
            return Err(AppError::Training("cannot fit a forest on zero rows".to_string()));
        }

        let x = to_dense_matrix(features);
        let y: Vec<i32> = labels.iter().map(|&l| l as i32).collect();

        let mut parameters = RandomForestClassifierParameters::default()
            .with_n_trees(params.n_trees)
            .with_seed(params.seed);
        if let Some(depth) = params.max_depth {
            parameters = parameters.with_max_depth(depth);
        }

        let model = ForestModel::fit(&x, &y, parameters)
            .map_err(|e| AppError::Training(format!("Failed to train random forest: {}", e)))?;

        debug!(
            n_trees = params.n_trees,
            n_features = features.ncols(),
            n_classes,
            "Random forest fitted"
        );

        Ok(Self {
            model,
            n_features: features.ncols(),
            n_classes,
            params,
        })
    }
}

impl Classifier for RandomForestClassifier {
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        if features.ncols() != self.n_features {
            return Err(AppError::Prediction(format!(
                "expected {} features, got {}",
                self.n_features,
                features.ncols()
            )));
        }

        let x = to_dense_matrix(features);
        let predictions = self
            .model
            .predict(&x)
            .map_err(|e| AppError::Prediction(format!("Prediction failed: {}", e)))?;

        predictions
            .into_iter()
            .map(|p| {
                usize::try_from(p)
                    .ok()
                    .filter(|&idx| idx < self.n_classes)
                    .ok_or_else(|| AppError::Prediction(format!("forest produced unknown class {}", p)))
            })
            .collect()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}
