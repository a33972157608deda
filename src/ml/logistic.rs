use crate::error::{AppError, Result};
use argmin::core::{CostFunction, Error as SolverError, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ndarray::{s, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Correction pairs kept by L-BFGS
const LBFGS_MEMORY: usize = 10;

/// Sample weighting by class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Every sample counts the same
    Uniform,
    /// Weight `n_samples / (n_classes * class_count)`
    #[default]
    Balanced,
}

/// Hyperparameters for multinomial logistic regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionParams {
    /// Inverse L2 regularization strength
    pub c: f64,

    /// Iteration cap for the optimizer
    pub max_iter: usize,

    /// Stop once the largest gradient component is below this
    pub tol: f64,

    pub class_weight: ClassWeight,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 200,
            tol: 1e-4,
            class_weight: ClassWeight::Balanced,
        }
    }
}

/// Softmax regression over dense features, L2-penalised, intercept unpenalised.
///
/// Minimises the weighted mean cross-entropy plus `||W||² / (2 C S)` where `S`
/// is the total sample weight, which has the same minimiser as the summed
/// formulation. Optimised with L-BFGS and a More-Thuente line search over the
/// flattened `[coef, intercept]` vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Coefficients (n_classes × n_features)
    coef: Array2<f64>,

    /// Per-class intercept
    intercept: Array1<f64>,

    /// Iterations actually run
    n_iter: usize,

    /// Largest gradient component at the solution is within `tol`
    converged: bool,
}

struct Problem<'a> {
    x: &'a Array2<f64>,
    targets: Array2<f64>,
    sample_weight: Array1<f64>,
    total_weight: f64,
    alpha: f64,
}

impl Problem<'_> {
    fn log_proba(&self, coef: &Array2<f64>, intercept: &Array1<f64>) -> Array2<f64> {
        let mut logits = self.x.dot(&coef.t());
        logits += intercept;
        for mut row in logits.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            let log_sum = row.iter().map(|v| (v - max).exp()).sum::<f64>().ln() + max;
            row -= log_sum;
        }
        logits
    }

    fn loss_from(&self, log_proba: &Array2<f64>, coef: &Array2<f64>) -> f64 {
        let data_loss: f64 = log_proba
            .rows()
            .into_iter()
            .zip(self.targets.rows())
            .zip(&self.sample_weight)
            .map(|((lp, t), &w)| -w * lp.dot(&t))
            .sum();
        data_loss / self.total_weight + 0.5 * self.alpha * coef.iter().map(|c| c * c).sum::<f64>()
    }

    fn loss(&self, coef: &Array2<f64>, intercept: &Array1<f64>) -> f64 {
        self.loss_from(&self.log_proba(coef, intercept), coef)
    }

    fn grad(&self, coef: &Array2<f64>, intercept: &Array1<f64>) -> (Array2<f64>, Array1<f64>) {
        let log_proba = self.log_proba(coef, intercept);
        let mut diff = log_proba.mapv(f64::exp) - &self.targets;
        for (mut row, &w) in diff.rows_mut().into_iter().zip(&self.sample_weight) {
            row *= w / self.total_weight;
        }

        let grad_coef = diff.t().dot(self.x) + coef * self.alpha;
        let grad_intercept = diff.sum_axis(Axis(0));
        (grad_coef, grad_intercept)
    }

    fn unpack(&self, params: &Array1<f64>) -> std::result::Result<(Array2<f64>, Array1<f64>), SolverError> {
        let (n_classes, n_features) = (self.targets.ncols(), self.x.ncols());
        let split = n_classes * n_features;
        let coef = Array2::from_shape_vec((n_classes, n_features), params.slice(s![..split]).to_vec())?;
        let intercept = params.slice(s![split..]).to_owned();
        Ok((coef, intercept))
    }
}

fn pack(coef: &Array2<f64>, intercept: &Array1<f64>) -> Array1<f64> {
    coef.iter().chain(intercept.iter()).copied().collect()
}

fn max_abs(values: &Array1<f64>) -> f64 {
    values.iter().fold(0.0_f64, |m, g| m.max(g.abs()))
}

/// Borrowed view handed to the solver so the problem stays usable afterwards
struct Objective<'p>(&'p Problem<'p>);

impl CostFunction for Objective<'_> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> std::result::Result<Self::Output, SolverError> {
        let (coef, intercept) = self.0.unpack(params)?;
        Ok(self.0.loss(&coef, &intercept))
    }
}

impl Gradient for Objective<'_> {
    type Param = Array1<f64>;
    type Gradient = Array1<f64>;

    fn gradient(&self, params: &Self::Param) -> std::result::Result<Self::Gradient, SolverError> {
        let (coef, intercept) = self.0.unpack(params)?;
        let (grad_coef, grad_intercept) = self.0.grad(&coef, &intercept);
        Ok(pack(&grad_coef, &grad_intercept))
    }
}

fn solver_error(e: SolverError) -> AppError {
    AppError::Training(format!("Logistic regression solver failed: {}", e))
}

impl LogisticRegression {
    /// Fit on features `x` and class indices `y` in `0..n_classes`
    pub fn fit(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        params: &LogisticRegressionParams,
    ) -> Result<Self> {
        let (n_samples, n_features) = x.dim();
        if n_samples != y.len() {
            return Err(AppError::Validation(format!(
                "feature rows ({}) and labels ({}) differ in length",
                n_samples,
                y.len()
            )));
        }
        if n_classes < 2 {
            return Err(AppError::Training(format!(
                "logistic regression needs at least 2 classes, got {}",
                n_classes
            )));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(AppError::Validation(format!(
                "label index {} out of range for {} classes",
                bad, n_classes
            )));
        }

        let mut counts = vec![0usize; n_classes];
        for &label in y {
            counts[label] += 1;
        }
        let class_weights: Vec<f64> = counts
            .iter()
            .map(|&count| match params.class_weight {
                ClassWeight::Balanced if count > 0 => {
                    n_samples as f64 / (n_classes as f64 * count as f64)
                }
                _ => 1.0,
            })
            .collect();

        let mut targets = Array2::zeros((n_samples, n_classes));
        for (i, &label) in y.iter().enumerate() {
            targets[[i, label]] = 1.0;
        }
        let sample_weight: Array1<f64> = y.iter().map(|&label| class_weights[label]).collect();
        let total_weight = sample_weight.sum();

        let problem = Problem {
            x,
            targets,
            sample_weight,
            total_weight,
            alpha: 1.0 / (params.c * total_weight),
        };

        let init: Array1<f64> = Array1::zeros(n_classes * (n_features + 1));
        let (n_iter, solution) = if params.max_iter == 0 {
            (0, init)
        } else {
            let solver = LBFGS::new(MoreThuenteLineSearch::new(), LBFGS_MEMORY)
                .with_tolerance_grad(params.tol)
                .map_err(solver_error)?;
            let result = Executor::new(Objective(&problem), solver)
                .configure(|state| state.param(init.clone()).max_iters(params.max_iter as u64))
                .run()
                .map_err(solver_error)?;
            let state = result.state();
            let best = state.get_best_param().cloned().unwrap_or(init);
            (state.get_iter() as usize, best)
        };

        let (coef, intercept) = problem.unpack(&solution).map_err(solver_error)?;
        // The solver may also stop on a flat cost; only a small gradient counts
        let (grad_coef, grad_intercept) = problem.grad(&coef, &intercept);
        let grad_max = max_abs(&pack(&grad_coef, &grad_intercept));
        let converged = grad_max <= params.tol;

        if !converged {
            warn!(
                max_iter = params.max_iter,
                n_iter,
                grad_max,
                "Logistic regression did not converge; increase max_iter or scale the data"
            );
        }
        debug!(n_iter, converged, n_features, n_classes, "Logistic regression fitted");

        Ok(Self {
            coef,
            intercept,
            n_iter,
            converged,
        })
    }

    /// Class probabilities (n_samples × n_classes); each row sums to 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(AppError::Prediction(format!(
                "expected {} features, got {}",
                self.n_features(),
                x.ncols()
            )));
        }
        let mut proba = x.dot(&self.coef.t());
        proba += &self.intercept;
        for mut row in proba.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row /= sum;
        }
        Ok(proba)
    }

    /// Most probable class index per row; ties go to the lowest index
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(|row| argmax(row.iter().copied())).collect())
    }

    pub fn n_features(&self) -> usize {
        self.coef.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.coef.nrows()
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

/// Index of the first maximum
pub fn argmax<I: IntoIterator<Item = f64>>(values: I) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, v) in values.into_iter().enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best.0
}
