//! Activation functions.
//!
//! A dense layer computes a pre-activation matrix `Z = A W + B` and then applies an
//! activation: `A' = activation(Z)`. All activations except softmax act
//! element-wise; softmax normalizes each row.
//!
//! Activations are selected by name (`"relu"`, `"tanh"`, ...) through `FromStr` or
//! serde. The set is closed: an unknown name is a configuration error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Matrix, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Activation function applied after each dense layer.
pub enum Activation {
    #[serde(rename = "identity")]
    Identity,
    #[serde(rename = "sigmoid")]
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "tanh")]
    Tanh,
    /// Row-wise softmax.
    ///
    /// Computed as `exp(z) / sum(exp(z))` without subtracting the row maximum, so
    /// large logits overflow to `inf`/`NaN`. Inputs are expected to stay in a
    /// moderate range (small initial weights keep them there).
    #[serde(rename = "softmax")]
    Softmax,
}

impl Activation {
    pub const ALL: [Activation; 5] = [
        Activation::Identity,
        Activation::Sigmoid,
        Activation::ReLU,
        Activation::Tanh,
        Activation::Softmax,
    ];

    /// Canonical registry name.
    pub fn name(self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Sigmoid => "sigmoid",
            Activation::ReLU => "relu",
            Activation::Tanh => "tanh",
            Activation::Softmax => "softmax",
        }
    }

    /// True for activations whose derivative only depends on the same element.
    #[inline]
    pub fn is_elementwise(self) -> bool {
        !matches!(self, Activation::Softmax)
    }

    #[inline]
    pub(crate) fn forward_scalar(self, x: f64) -> f64 {
        match self {
            Activation::Identity | Activation::Softmax => x,
            Activation::Sigmoid => sigmoid(x),
            Activation::ReLU => x.max(0.0),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative with respect to the pre-activation `z`.
    #[inline]
    pub(crate) fn grad_scalar(self, z: f64) -> f64 {
        match self {
            Activation::Identity | Activation::Softmax => 1.0,
            Activation::Sigmoid => {
                let s = sigmoid(z);
                s * (1.0 - s)
            }
            Activation::ReLU => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => {
                let t = z.tanh();
                1.0 - t * t
            }
        }
    }

    /// Apply the activation to `z`, returning a new matrix.
    pub fn apply(self, z: &Matrix) -> Matrix {
        match self {
            Activation::Softmax => softmax_rows(z),
            _ => z.map(|v| self.forward_scalar(v)),
        }
    }

    /// Element-wise derivative `act'(z)`.
    ///
    /// Softmax has no element-wise derivative (its Jacobian couples a whole row);
    /// use [`Activation::backward`] for it.
    pub fn derivative(self, z: &Matrix) -> Result<Matrix> {
        if !self.is_elementwise() {
            return Err(Error::InvalidConfig(
                "softmax derivative is not element-wise; use Activation::backward".to_owned(),
            ));
        }
        Ok(z.map(|v| self.grad_scalar(v)))
    }

    /// Map an upstream gradient `dL/dA` to `dL/dZ`.
    ///
    /// `z` is the pre-activation and `a = self.apply(z)` the cached output. For
    /// element-wise activations this is `upstream ⊙ act'(z)`. For softmax each row
    /// gets the Jacobian-vector product `a ⊙ (g - <g, a>)`.
    pub fn backward(self, z: &Matrix, a: &Matrix, upstream: &Matrix) -> Result<Matrix> {
        if z.shape() != upstream.shape() || a.shape() != upstream.shape() {
            return Err(Error::InvalidShape(format!(
                "activation backward: z {:?}, a {:?}, upstream {:?} must match",
                z.shape(),
                a.shape(),
                upstream.shape()
            )));
        }

        match self {
            Activation::Softmax => {
                let mut out = upstream.clone();
                for r in 0..out.rows() {
                    let a_row = a.row(r);
                    let dot: f64 = upstream
                        .row(r)
                        .iter()
                        .zip(a_row)
                        .map(|(g, p)| g * p)
                        .sum();
                    for (o, &p) in out.row_mut(r).iter_mut().zip(a_row) {
                        *o = p * (*o - dot);
                    }
                }
                Ok(out)
            }
            _ => upstream.mul_elementwise(&self.derivative(z)?),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" | "linear" => Ok(Activation::Identity),
            "sigmoid" => Ok(Activation::Sigmoid),
            "relu" => Ok(Activation::ReLU),
            "tanh" => Ok(Activation::Tanh),
            "softmax" => Ok(Activation::Softmax),
            other => Err(Error::InvalidConfig(format!(
                "unknown activation '{other}', expected one of: identity, sigmoid, relu, tanh, softmax"
            ))),
        }
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

fn softmax_rows(z: &Matrix) -> Matrix {
    let mut out = z.clone();
    for r in 0..out.rows() {
        let row = out.row_mut(r);
        let mut sum = 0.0;
        for v in row.iter_mut() {
            *v = v.exp();
            sum += *v;
        }
        for v in row.iter_mut() {
            *v /= sum;
        }
    }
    out
}
