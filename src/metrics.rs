//! Metrics.
//!
//! Metrics are evaluation helpers (they do not participate in backprop).

use crate::matrix::argmax;
use crate::{Error, Matrix, Result};

/// A fitted model that maps feature rows to a single-column prediction.
pub trait Regressor {
    fn predict(&self, x: &Matrix) -> Result<Matrix>;
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

/// Fraction of rows where the prediction's argmax hits the one-hot target.
pub fn accuracy(y: &Matrix, h: &Matrix) -> Result<f64> {
    ensure_same_shape(y, h)?;
    let hits = (0..y.rows())
        .filter(|&r| argmax(y.row(r)) == argmax(h.row(r)))
        .count();
    Ok(hits as f64 / y.rows() as f64)
}

/// Plain mean of squared differences over all entries.
pub fn mean_squared_error(y: &Matrix, h: &Matrix) -> Result<f64> {
    ensure_same_shape(y, h)?;
    let sum: f64 = y
        .data()
        .iter()
        .zip(h.data())
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    Ok(sum / y.data().len() as f64)
}

/// Coefficient of determination of `model` on `(x, y)`.
///
/// `1 - SS_res / SS_tot`. A constant target gives `SS_tot = 0`, reported as
/// `InvalidData`.
pub fn r_squared<M: Regressor + ?Sized>(model: &M, x: &Matrix, y: &Matrix) -> Result<f64> {
    if y.cols() != 1 {
        return Err(Error::InvalidShape(format!(
            "r_squared expects a single target column, got {}",
            y.cols()
        )));
    }
    let h = model.predict(x)?;
    ensure_same_shape(y, &h)?;

    let mean = y.sum() / y.rows() as f64;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (&t, &p) in y.data().iter().zip(h.data()) {
        ss_res += (t - p) * (t - p);
        ss_tot += (t - mean) * (t - mean);
    }
    if ss_tot == 0.0 {
        return Err(Error::InvalidData(
            "r_squared is undefined for a constant target".to_owned(),
        ));
    }
    Ok(1.0 - ss_res / ss_tot)
}
