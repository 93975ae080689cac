//! Linear regression fitted by gradient descent.
//!
//! Minimizes the half mean squared error `sum(r^2) / (2n)` with `r = X w + b - y`.
//! Updates use the gradients `dw = 2/n * X^T r (+ penalty)` and `db = 2/n * sum(r)`.
//! Three descent schedules are supported:
//!
//! - `Batch`: one update per iteration over all rows.
//! - `MiniBatch`: rows are shuffled, then one update per `batch_size` window.
//! - `Stochastic`: rows are shuffled, then one update per row.
//!
//! After each iteration the loss is measured on the full training set and fed to
//! early stopping.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::JsonConfig;
use crate::logging::TrainingLog;
use crate::metrics::Regressor;
use crate::{Dataset, Error, GdConfig, Loss, Matrix, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
/// Gradient descent schedule.
pub enum Descent {
    #[serde(rename = "batch")]
    Batch,
    #[serde(rename = "mini_batch", alias = "miniBatch")]
    MiniBatch,
    #[default]
    #[serde(rename = "stochastic", alias = "SGD")]
    Stochastic,
}

impl Descent {
    pub fn name(self) -> &'static str {
        match self {
            Descent::Batch => "batch",
            Descent::MiniBatch => "mini_batch",
            Descent::Stochastic => "stochastic",
        }
    }
}

impl fmt::Display for Descent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Descent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "batch" => Ok(Descent::Batch),
            "mini_batch" | "miniBatch" | "minibatch" => Ok(Descent::MiniBatch),
            "stochastic" | "SGD" | "sgd" => Ok(Descent::Stochastic),
            other => Err(Error::InvalidConfig(format!(
                "unknown descent '{other}', expected 'batch', 'mini_batch' or 'stochastic'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Penalty added to the weight gradient (never to the bias).
pub enum Regularization {
    None,
    /// `alpha * sign(w)`
    L1,
    /// `alpha * w`
    #[default]
    L2,
}

impl Regularization {
    pub fn name(self) -> &'static str {
        match self {
            Regularization::None => "none",
            Regularization::L1 => "l1",
            Regularization::L2 => "l2",
        }
    }
}

impl fmt::Display for Regularization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Regularization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Regularization::None),
            "l1" => Ok(Regularization::L1),
            "l2" => Ok(Regularization::L2),
            other => Err(Error::InvalidConfig(format!(
                "unknown regularization '{other}', expected 'none', 'l1' or 'l2'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Params {
    /// `features x 1`
    weights: Matrix,
    bias: f64,
}

impl Params {
    fn predict(&self, x: &Matrix) -> Result<Matrix> {
        let mut p = x.matmul(&self.weights)?;
        p.add_scalar(self.bias);
        Ok(p)
    }

    fn step(&mut self, x: &Matrix, y: &Matrix, config: &GdConfig) -> Result<()> {
        let residual = self.predict(x)?.sub(y)?;
        let factor = 2.0 / x.rows() as f64;

        let bias_grad = residual.sum() * factor;
        let mut grad = x.transposed().matmul(&residual)?;
        grad.scale(factor);

        let alpha = config.alpha;
        match config.regularization {
            Regularization::None => {}
            Regularization::L2 => {
                for (g, &w) in grad.data_mut().iter_mut().zip(self.weights.data()) {
                    *g += alpha * w;
                }
            }
            Regularization::L1 => {
                for (g, &w) in grad.data_mut().iter_mut().zip(self.weights.data()) {
                    *g += alpha * sign(w);
                }
            }
        }

        let lr = config.learning_rate;
        for (w, &g) in self.weights.data_mut().iter_mut().zip(grad.data()) {
            *w -= lr * g;
        }
        self.bias -= lr * bias_grad;
        Ok(())
    }
}

/// `1`, `-1`, or `0` at exactly zero.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[derive(Serialize)]
struct IterationEvent {
    iteration: usize,
    loss: f64,
    bias: f64,
}

#[derive(Serialize)]
struct StopEvent {
    iteration: usize,
    best_loss: f64,
    early_stopped: bool,
}

/// Linear regression trained by gradient descent.
#[derive(Debug, Clone)]
pub struct GdLinearRegression {
    config: GdConfig,
    params: Option<Params>,
    loss_history: Vec<f64>,
}

impl GdLinearRegression {
    pub fn new(config: GdConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            params: None,
            loss_history: Vec::new(),
        })
    }

    pub fn config(&self) -> &GdConfig {
        &self.config
    }

    /// Fit from zero-initialized parameters.
    ///
    /// With `config.verbose` set, iterations are logged to stderr.
    pub fn fit(&mut self, x: &Matrix, y: &Matrix) -> Result<()> {
        if self.config.verbose {
            let mut log = TrainingLog::stderr();
            self.fit_inner(x, y, Some(&mut log))
        } else {
            self.fit_inner(x, y, None)
        }
    }

    /// Like [`GdLinearRegression::fit`], recording `iteration`, `stop` and `fit`
    /// events to `log`.
    pub fn fit_with_log(&mut self, x: &Matrix, y: &Matrix, log: &mut TrainingLog) -> Result<()> {
        self.fit_inner(x, y, Some(log))
    }

    fn fit_inner(
        &mut self,
        x: &Matrix,
        y: &Matrix,
        mut log: Option<&mut TrainingLog>,
    ) -> Result<()> {
        self.config.validate()?;
        if y.cols() != 1 {
            return Err(Error::InvalidShape(format!(
                "target must be a single column, got {}",
                y.cols()
            )));
        }
        let mut data = Dataset::new(x.clone(), y.clone())?;

        let config = &self.config;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut params = Params {
            weights: Matrix::zeros(x.cols(), 1)?,
            bias: 0.0,
        };
        let mut history = Vec::with_capacity(config.max_iter);
        let mut best = f64::INFINITY;
        let mut no_improvement = 0;
        let mut early_stopped = false;

        for iteration in 1..=config.max_iter {
            match config.descent {
                Descent::Batch => params.step(x, y, config)?,
                Descent::MiniBatch | Descent::Stochastic => {
                    let batch_size = match config.descent {
                        Descent::MiniBatch => config.batch_size,
                        _ => 1,
                    };
                    data.shuffle(&mut rng)?;
                    for (xb, yb) in data.batches(batch_size)? {
                        params.step(&xb.to_matrix(), &yb.to_matrix(), config)?;
                    }
                }
            }

            let loss = Loss::Mse.forward(y, &params.predict(x)?)?;
            history.push(loss);
            if let Some(log) = log.as_deref_mut() {
                log.record(
                    "iteration",
                    &IterationEvent {
                        iteration,
                        loss,
                        bias: params.bias,
                    },
                );
            }

            if loss < best - config.tol {
                best = loss;
                no_improvement = 0;
            } else {
                no_improvement += 1;
            }
            if config.early_stopping && no_improvement >= config.n_iter_no_change {
                if let Some(log) = log.as_deref_mut() {
                    log.record(
                        "stop",
                        &StopEvent {
                            iteration,
                            best_loss: best,
                            early_stopped: true,
                        },
                    );
                }
                early_stopped = true;
                break;
            }
        }

        if let Some(log) = log {
            log.record(
                "fit",
                &StopEvent {
                    iteration: history.len(),
                    best_loss: best,
                    early_stopped,
                },
            );
            log.flush();
        }

        self.params = Some(params);
        self.loss_history = history;
        Ok(())
    }

    /// One weight per feature; `None` before `fit`.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.params.as_ref().map(|p| p.weights.data())
    }

    pub fn bias(&self) -> Option<f64> {
        self.params.as_ref().map(|p| p.bias)
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    /// Full-data loss after each iteration of the last fit.
    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    /// Iterations run by the last fit.
    pub fn n_iter(&self) -> usize {
        self.loss_history.len()
    }

    /// Predict one value per row of `x`, as a `rows x 1` matrix.
    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        let params = self.params.as_ref().ok_or_else(|| {
            Error::NotFitted("gradient descent regression must be fitted before predict".to_owned())
        })?;
        if x.cols() != params.weights.rows() {
            return Err(Error::InvalidShape(format!(
                "input has {} features, model was fitted on {}",
                x.cols(),
                params.weights.rows()
            )));
        }
        params.predict(x)
    }
}

impl Regressor for GdLinearRegression {
    fn predict(&self, x: &Matrix) -> Result<Matrix> {
        GdLinearRegression::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    /// y = 3x + 2 on a symmetric grid.
    fn line() -> (Matrix, Matrix) {
        let xs = vec![-1.0, -0.5, 0.0, 0.5, 1.0];
        let ys = xs.iter().map(|x| 3.0 * x + 2.0).collect();
        (Matrix::column(xs).unwrap(), Matrix::column(ys).unwrap())
    }

    fn config(descent: Descent, regularization: Regularization, alpha: f64) -> GdConfig {
        GdConfig {
            descent,
            regularization,
            alpha,
            learning_rate: 0.1,
            max_iter: 500,
            early_stopping: false,
            batch_size: 2,
            seed: Some(42),
            ..GdConfig::default()
        }
    }

    #[test]
    fn batch_descent_converges_and_loss_never_rises() {
        let (x, y) = line();
        let mut model =
            GdLinearRegression::new(config(Descent::Batch, Regularization::None, 0.0)).unwrap();
        model.fit(&x, &y).unwrap();

        assert_abs_diff_eq!(model.coefficients().unwrap()[0], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(model.bias().unwrap(), 2.0, epsilon = 1e-6);
        assert_eq!(model.n_iter(), 500);
        for pair in model.loss_history().windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn mini_batch_and_stochastic_converge() {
        let (x, y) = line();
        for descent in [Descent::MiniBatch, Descent::Stochastic] {
            let cfg = GdConfig {
                learning_rate: 0.05,
                ..config(descent, Regularization::None, 0.0)
            };
            let mut model = GdLinearRegression::new(cfg).unwrap();
            model.fit(&x, &y).unwrap();
            assert_abs_diff_eq!(model.coefficients().unwrap()[0], 3.0, epsilon = 1e-4);
            assert_abs_diff_eq!(model.bias().unwrap(), 2.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn penalties_shift_the_optimum() {
        let (x, y) = line();

        // L2 optimum: (w - 3) + alpha * w = 0.
        let mut l2 =
            GdLinearRegression::new(config(Descent::Batch, Regularization::L2, 1.0)).unwrap();
        l2.fit(&x, &y).unwrap();
        assert_abs_diff_eq!(l2.coefficients().unwrap()[0], 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(l2.bias().unwrap(), 2.0, epsilon = 1e-6);

        // L1 optimum for positive w: (w - 3) + alpha = 0.
        let mut l1 =
            GdLinearRegression::new(config(Descent::Batch, Regularization::L1, 0.5)).unwrap();
        l1.fit(&x, &y).unwrap();
        assert_abs_diff_eq!(l1.coefficients().unwrap()[0], 2.5, epsilon = 1e-6);
    }

    #[test]
    fn early_stopping_cuts_training_short() {
        let (x, y) = line();
        let cfg = GdConfig {
            early_stopping: true,
            ..config(Descent::Batch, Regularization::None, 0.0)
        };
        let mut model = GdLinearRegression::new(cfg).unwrap();
        model.fit(&x, &y).unwrap();
        assert!(model.n_iter() < 500);
        assert_eq!(model.loss_history().len(), model.n_iter());
    }

    #[test]
    fn validation_and_predict_errors() {
        let (x, y) = line();
        let mut model = GdLinearRegression::new(GdConfig {
            seed: Some(0),
            ..GdConfig::default()
        })
        .unwrap();
        assert!(matches!(model.predict(&x), Err(Error::NotFitted(_))));

        let two_cols = Matrix::zeros(5, 2).unwrap();
        assert!(matches!(model.fit(&x, &two_cols), Err(Error::InvalidShape(_))));
        let short = Matrix::zeros(4, 1).unwrap();
        assert!(matches!(model.fit(&x, &short), Err(Error::InvalidShape(_))));
        assert!(!model.is_fitted());

        model.fit(&x, &y).unwrap();
        let wrong = Matrix::zeros(2, 3).unwrap();
        assert!(matches!(model.predict(&wrong), Err(Error::InvalidShape(_))));
        assert_eq!(model.predict(&x).unwrap().shape(), (5, 1));

        assert!(GdLinearRegression::new(GdConfig {
            learning_rate: 0.0,
            ..GdConfig::default()
        })
        .is_err());
    }

    #[test]
    fn names_parse() {
        assert_eq!("miniBatch".parse::<Descent>().unwrap(), Descent::MiniBatch);
        assert_eq!("SGD".parse::<Descent>().unwrap(), Descent::Stochastic);
        assert_eq!("L1".parse::<Regularization>().unwrap(), Regularization::L1);
        assert!(matches!(
            "elastic".parse::<Regularization>(),
            Err(Error::InvalidConfig(_))
        ));
        assert!("newton".parse::<Descent>().is_err());
    }
}
