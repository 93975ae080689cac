//! Parameter update rules.
//!
//! Gradients handed to an optimizer are already scaled by `lr / batch_size`, so
//! the rules below have no learning rate of their own:
//!
//! - `Sgd`: `W -= dW`
//! - `SgdMomentum`: `v = momentum * v - dW; W += v`
//!
//! Momentum state lives in [`Velocity`], owned by the model. It is allocated as
//! zeros on the first momentum step and kept for the rest of the model's life.

use serde::{Deserialize, Serialize};

use crate::{Error, Gradients, Matrix, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Optimizer choice for training.
pub enum Optimizer {
    /// Plain SGD.
    Sgd,
    /// SGD with momentum.
    SgdMomentum { momentum: f64 },
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::SgdMomentum { momentum: 0.9 }
    }
}

impl Optimizer {
    /// Validate optimizer hyperparameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Optimizer::Sgd => Ok(()),
            Optimizer::SgdMomentum { momentum } => {
                if !(momentum.is_finite() && (0.0..1.0).contains(&momentum)) {
                    return Err(Error::InvalidConfig(format!(
                        "momentum must be finite and in [0,1), got {momentum}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Apply one update to `weights`/`biases`.
    ///
    /// `velocity` is created on the first momentum step and reused afterwards.
    pub(crate) fn step(
        self,
        weights: &mut [Matrix],
        biases: &mut [Matrix],
        grads: &Gradients,
        velocity: &mut Option<Velocity>,
    ) -> Result<()> {
        if grads.weights.len() != weights.len() || grads.biases.len() != biases.len() {
            return Err(Error::InvalidShape(format!(
                "gradients cover {} layers, model has {}",
                grads.weights.len(),
                weights.len()
            )));
        }

        match self {
            Optimizer::Sgd => {
                for (w, dw) in weights.iter_mut().zip(&grads.weights) {
                    axpy(w, dw, -1.0)?;
                }
                for (b, db) in biases.iter_mut().zip(&grads.biases) {
                    axpy(b, db, -1.0)?;
                }
            }
            Optimizer::SgdMomentum { momentum } => {
                let v = match velocity {
                    Some(v) => v,
                    None => velocity.insert(Velocity::zeros_like(grads)),
                };
                for ((w, dw), vw) in weights.iter_mut().zip(&grads.weights).zip(&mut v.weights) {
                    accumulate(vw, dw, momentum)?;
                    axpy(w, vw, 1.0)?;
                }
                for ((b, db), vb) in biases.iter_mut().zip(&grads.biases).zip(&mut v.biases) {
                    accumulate(vb, db, momentum)?;
                    axpy(b, vb, 1.0)?;
                }
            }
        }
        Ok(())
    }
}

/// Momentum state: one velocity matrix per weight and bias matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Velocity {
    weights: Vec<Matrix>,
    biases: Vec<Matrix>,
}

impl Velocity {
    fn zeros_like(grads: &Gradients) -> Self {
        let zeros = |m: &Matrix| m.map(|_| 0.0);
        Self {
            weights: grads.weights.iter().map(zeros).collect(),
            biases: grads.biases.iter().map(zeros).collect(),
        }
    }

    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    pub fn biases(&self) -> &[Matrix] {
        &self.biases
    }
}

/// `dst += alpha * src`.
fn axpy(dst: &mut Matrix, src: &Matrix, alpha: f64) -> Result<()> {
    ensure_same_shape(dst, src)?;
    for (d, &s) in dst.data_mut().iter_mut().zip(src.data()) {
        *d += alpha * s;
    }
    Ok(())
}

/// `v = momentum * v - grad`.
fn accumulate(v: &mut Matrix, grad: &Matrix, momentum: f64) -> Result<()> {
    ensure_same_shape(v, grad)?;
    for (vi, &g) in v.data_mut().iter_mut().zip(grad.data()) {
        *vi = momentum * *vi - g;
    }
    Ok(())
}

fn ensure_same_shape(a: &Matrix, b: &Matrix) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::InvalidShape(format!(
            "parameter shape {:?} does not match update shape {:?}",
            a.shape(),
            b.shape()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    fn scalar(v: f64) -> Matrix {
        Matrix::new(1, 1, vec![v]).unwrap()
    }

    fn grads(dw: f64, db: f64) -> Gradients {
        Gradients {
            weights: vec![scalar(dw)],
            biases: vec![scalar(db)],
        }
    }

    #[test]
    fn optimizer_validation_rejects_bad_momentum() {
        assert!(Optimizer::SgdMomentum { momentum: 1.0 }.validate().is_err());
        assert!(Optimizer::SgdMomentum { momentum: -0.1 }.validate().is_err());
        assert!(Optimizer::SgdMomentum { momentum: f64::NAN }.validate().is_err());
        assert!(Optimizer::SgdMomentum { momentum: 0.9 }.validate().is_ok());
        assert!(Optimizer::Sgd.validate().is_ok());
    }

    #[test]
    fn sgd_subtracts_scaled_gradient() {
        let mut w = vec![scalar(1.0)];
        let mut b = vec![scalar(2.0)];
        let mut velocity = None;
        Optimizer::Sgd
            .step(&mut w, &mut b, &grads(0.3, 0.4), &mut velocity)
            .unwrap();
        assert_abs_diff_eq!(w[0].get(0, 0), 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(b[0].get(0, 0), 1.6, epsilon = 1e-12);
        assert!(velocity.is_none());
    }

    #[test]
    fn momentum_accumulates_velocity_across_steps() {
        let mut w = vec![scalar(1.0)];
        let mut b = vec![scalar(0.0)];
        let mut velocity = None;
        let opt = Optimizer::SgdMomentum { momentum: 0.5 };

        // First step behaves like SGD: v = -g.
        opt.step(&mut w, &mut b, &grads(0.2, 0.1), &mut velocity)
            .unwrap();
        assert_abs_diff_eq!(w[0].get(0, 0), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(b[0].get(0, 0), -0.1, epsilon = 1e-12);

        // Second step: v = 0.5 * -0.2 - 0.2 = -0.3.
        opt.step(&mut w, &mut b, &grads(0.2, 0.1), &mut velocity)
            .unwrap();
        assert_abs_diff_eq!(w[0].get(0, 0), 0.5, epsilon = 1e-12);
        let v = velocity.as_ref().unwrap();
        assert_abs_diff_eq!(v.weights()[0].get(0, 0), -0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(v.biases()[0].get(0, 0), -0.15, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_gradients_are_rejected() {
        let mut w = vec![scalar(1.0), scalar(1.0)];
        let mut b = vec![scalar(0.0), scalar(0.0)];
        let mut velocity = None;
        assert!(Optimizer::Sgd
            .step(&mut w, &mut b, &grads(0.1, 0.1), &mut velocity)
            .is_err());
    }
}
