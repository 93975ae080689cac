//! Loss functions.
//!
//! Losses compare a target matrix `y` with a prediction matrix `h` of the same
//! shape (one row per sample) and average over samples:
//!
//! - `Mse`: `sum((h - y)^2) / (2 * rows)`
//! - `CrossEntropy`: `-sum(log h)` over the entries where the one-hot target is
//!   non-zero, divided by `rows`
//!
//! `gradient` returns the per-sample derivative `dL_i/dh` (the `1/rows` average is
//! applied by the training step, together with the learning rate).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Matrix, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Supported loss functions.
pub enum Loss {
    /// Half mean squared error.
    #[serde(rename = "mse", alias = "MSELoss")]
    Mse,
    /// Cross-entropy against one-hot targets.
    ///
    /// Expects probabilities as predictions (softmax output).
    #[serde(rename = "cross_entropy", alias = "crossEntropyLoss")]
    CrossEntropy,
}

impl Loss {
    pub fn name(self) -> &'static str {
        match self {
            Loss::Mse => "mse",
            Loss::CrossEntropy => "cross_entropy",
        }
    }

    /// True when `(output_activation, self)` is a pair for which the output-layer
    /// error `dL/dZ` simplifies to `A - y`.
    #[inline]
    pub fn pairs_with(self, output: Activation) -> bool {
        matches!(
            (output, self),
            (Activation::Softmax, Loss::CrossEntropy) | (Activation::Identity, Loss::Mse)
        )
    }

    /// Compute the loss value.
    pub fn forward(self, y: &Matrix, h: &Matrix) -> Result<f64> {
        ensure_same_shape(y, h)?;
        let n = y.rows() as f64;
        let value = match self {
            Loss::Mse => {
                let sum_sq: f64 = y
                    .data()
                    .iter()
                    .zip(h.data())
                    .map(|(t, p)| (t - p) * (t - p))
                    .sum();
                sum_sq / (2.0 * n)
            }
            Loss::CrossEntropy => {
                let sum: f64 = y
                    .data()
                    .iter()
                    .zip(h.data())
                    .filter(|(t, _)| **t != 0.0)
                    .map(|(_, p)| -p.ln())
                    .sum();
                sum / n
            }
        };
        Ok(value)
    }

    /// Per-sample gradient of the loss with respect to the predictions.
    ///
    /// - `Mse`: `h - y`
    /// - `CrossEntropy`: `-y / h` where `y != 0`, else `0`
    pub fn gradient(self, y: &Matrix, h: &Matrix) -> Result<Matrix> {
        ensure_same_shape(y, h)?;
        match self {
            Loss::Mse => h.sub(y),
            Loss::CrossEntropy => {
                let mut out = y.clone();
                for (o, &p) in out.data_mut().iter_mut().zip(h.data()) {
                    if *o != 0.0 {
                        *o = -*o / p;
                    }
                }
                Ok(out)
            }
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Loss {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "mse" | "MSE" | "MSELoss" => Ok(Loss::Mse),
            "cross_entropy" | "crossentropy" | "crossEntropyLoss" => Ok(Loss::CrossEntropy),
            other => Err(Error::InvalidConfig(format!(
                "unknown loss '{other}', expected 'mse' or 'cross_entropy'"
            ))),
        }
    }
}

fn ensure_same_shape(y: &Matrix, h: &Matrix) -> Result<()> {
    if y.shape() != h.shape() {
        return Err(Error::InvalidShape(format!(
            "target shape {:?} does not match prediction shape {:?}",
            y.shape(),
            h.shape()
        )));
    }
    Ok(())
}
