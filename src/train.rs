//! Mini-batch training loop and evaluation reports.
//!
//! One epoch is one pass over the training rows in contiguous batches of
//! `batch_size` (the last batch may be shorter), with one optimizer step per
//! batch. After every epoch the whole training set, and the test set when one is
//! given, is re-evaluated with the updated parameters.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::logging::TrainingLog;
use crate::metrics::accuracy;
use crate::mlp::MlpState;
use crate::{Dataset, Matrix, Mlp, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Row shuffling between epochs.
pub enum Shuffle {
    /// Keep the caller's row order every epoch.
    #[default]
    None,
    /// Shuffle every epoch with an RNG seeded once per `train` call.
    Seeded(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Metrics for one dataset.
pub struct EvalReport {
    pub loss: f64,
    /// Fraction of rows classified correctly; `None` for regressors.
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    pub train: EvalReport,
    pub test: Option<EvalReport>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Per-epoch history of one `train` call.
pub struct FitReport {
    pub epochs: Vec<EpochReport>,
}

impl FitReport {
    pub fn last(&self) -> Option<&EpochReport> {
        self.epochs.last()
    }

    /// Training loss after the last epoch.
    pub fn final_loss(&self) -> Option<f64> {
        self.last().map(|e| e.train.loss)
    }

    pub fn final_accuracy(&self) -> Option<f64> {
        self.last().and_then(|e| e.train.accuracy)
    }
}

#[derive(Serialize)]
struct FitSummary {
    epochs: usize,
    train: Option<EvalReport>,
    test: Option<EvalReport>,
    elapsed_ms: u64,
}

impl Mlp {
    /// Train on `(x, y)` for `config.epochs` epochs.
    ///
    /// `test` is evaluated after every epoch but never trained on. Weights are
    /// drawn on the first call; later calls continue from the current
    /// parameters. The caller's matrices are not modified.
    ///
    /// With `config.verbose` set, every epoch is logged to stderr.
    pub fn train(
        &mut self,
        x: &Matrix,
        y: &Matrix,
        test: Option<(&Matrix, &Matrix)>,
    ) -> Result<FitReport> {
        if self.config().verbose {
            let mut log = TrainingLog::stderr();
            self.fit_inner(x, y, test, Some(&mut log))
        } else {
            self.fit_inner(x, y, test, None)
        }
    }

    /// Like [`Mlp::train`], recording `epoch` and `fit` events to `log`.
    pub fn train_with_log(
        &mut self,
        x: &Matrix,
        y: &Matrix,
        test: Option<(&Matrix, &Matrix)>,
        log: &mut TrainingLog,
    ) -> Result<FitReport> {
        self.fit_inner(x, y, test, Some(log))
    }

    /// Loss (and accuracy for classifiers) over a whole dataset.
    pub fn evaluate(&self, x: &Matrix, y: &Matrix) -> Result<EvalReport> {
        self.check_targets(x, y)?;
        let output = self.forward(x)?.into_output();
        let loss = self.config().loss.forward(y, &output)?;
        let accuracy = if self.config().classifier {
            Some(accuracy(y, &output)?)
        } else {
            None
        };
        Ok(EvalReport { loss, accuracy })
    }

    fn fit_inner(
        &mut self,
        x: &Matrix,
        y: &Matrix,
        test: Option<(&Matrix, &Matrix)>,
        mut log: Option<&mut TrainingLog>,
    ) -> Result<FitReport> {
        self.check_targets(x, y)?;
        if let Some((tx, ty)) = test {
            self.check_targets(tx, ty)?;
        }
        if self.state() == MlpState::Uninitialized {
            self.init_weights()?;
        }

        let previous = self.state();
        self.set_state(MlpState::Training);
        match self.run_epochs(x, y, test, log.as_deref_mut()) {
            Ok(report) => {
                self.set_state(MlpState::Fitted);
                Ok(report)
            }
            Err(err) => {
                self.set_state(previous);
                Err(err)
            }
        }
    }

    fn run_epochs(
        &mut self,
        x: &Matrix,
        y: &Matrix,
        test: Option<(&Matrix, &Matrix)>,
        mut log: Option<&mut TrainingLog>,
    ) -> Result<FitReport> {
        let epochs = self.config().epochs;
        let batch_size = self.config().batch_size;
        let mut rng = match self.config().shuffle {
            Shuffle::None => None,
            Shuffle::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
        };

        let mut data = Dataset::new(x.clone(), y.clone())?;
        let mut report = FitReport {
            epochs: Vec::with_capacity(epochs),
        };
        let started = Instant::now();

        for epoch in 1..=epochs {
            let epoch_start = Instant::now();
            if let Some(rng) = rng.as_mut() {
                data.shuffle(rng)?;
            }

            for (xb, yb) in data.batches(batch_size)? {
                self.train_step(&xb.to_matrix(), &yb.to_matrix())?;
            }

            let train = self.evaluate(x, y)?;
            let test = match test {
                Some((tx, ty)) => Some(self.evaluate(tx, ty)?),
                None => None,
            };
            let epoch_report = EpochReport {
                epoch,
                train,
                test,
                elapsed_ms: epoch_start.elapsed().as_millis() as u64,
            };
            if let Some(log) = log.as_deref_mut() {
                log.record("epoch", &epoch_report);
            }
            report.epochs.push(epoch_report);
        }

        if let Some(log) = log {
            let last = report.last();
            log.record(
                "fit",
                &FitSummary {
                    epochs,
                    train: last.map(|e| e.train),
                    test: last.and_then(|e| e.test),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                },
            );
            log.flush();
        }

        Ok(report)
    }
}
