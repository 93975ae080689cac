//! Ordinary least squares via the normal equation.

use crate::metrics::Regressor;
use crate::{Error, Matrix, Result};

/// Closed-form linear regression: `beta = (X^T X)^-1 X^T y`.
///
/// `coefficients()[0]` is the intercept; `coefficients()[i + 1]` multiplies
/// feature `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearRegression {
    coefficients: Option<Vec<f64>>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit on `x` (one row per sample) and a single-column `y`.
    ///
    /// Fails with `Singular` when `X^T X` cannot be inverted (for example when
    /// a feature is constant or there are fewer samples than coefficients). A
    /// failed fit keeps any previous coefficients.
    pub fn fit(&mut self, x: &Matrix, y: &Matrix) -> Result<()> {
        if y.cols() != 1 {
            return Err(Error::InvalidShape(format!(
                "target must be a single column, got {}",
                y.cols()
            )));
        }
        if x.rows() != y.rows() {
            return Err(Error::InvalidShape(format!(
                "{} feature rows but {} target rows",
                x.rows(),
                y.rows()
            )));
        }

        let design = design_matrix(x)?;
        let design_t = design.transposed();
        let gram_inv = design_t.matmul(&design)?.inverted()?;
        let beta = gram_inv.matmul(&design_t.matmul(y)?)?;

        self.coefficients = Some(beta.into_data());
        Ok(())
    }

    /// Intercept followed by one weight per feature; `None` before `fit`.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Predict one value per row of `x`, as a `rows x 1` matrix.
    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        let coeffs = self.coefficients.as_deref().ok_or_else(|| {
            Error::NotFitted("linear regression must be fitted before predict".to_owned())
        })?;
        if x.cols() + 1 != coeffs.len() {
            return Err(Error::InvalidShape(format!(
                "input has {} features, model was fitted on {}",
                x.cols(),
                coeffs.len() - 1
            )));
        }

        let preds = (0..x.rows())
            .map(|r| {
                x.row(r)
                    .iter()
                    .zip(&coeffs[1..])
                    .fold(coeffs[0], |acc, (v, w)| acc + v * w)
            })
            .collect();
        Matrix::column(preds)
    }
}

impl Regressor for LinearRegression {
    fn predict(&self, x: &Matrix) -> Result<Matrix> {
        LinearRegression::predict(self, x)
    }
}

/// `x` with a leading column of ones.
fn design_matrix(x: &Matrix) -> Result<Matrix> {
    let cols = x.cols() + 1;
    let mut data = Vec::with_capacity(x.rows() * cols);
    for r in 0..x.rows() {
        data.push(1.0);
        data.extend_from_slice(x.row(r));
    }
    Matrix::new(x.rows(), cols, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    use crate::metrics::r_squared;

    fn plane() -> (Matrix, Matrix) {
        // y = 1 + 2 * x1 + x2
        let x = Matrix::new(4, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 10.0, 5.0]).unwrap();
        let y = Matrix::column(vec![5.0, 11.0, 17.0, 26.0]).unwrap();
        (x, y)
    }

    #[test]
    fn recovers_exact_plane() {
        let (x, y) = plane();
        let mut lr = LinearRegression::new();
        lr.fit(&x, &y).unwrap();

        let c = lr.coefficients().unwrap();
        assert_abs_diff_eq!(c[0], 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(c[1], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(c[2], 1.0, epsilon = 1e-8);

        let p = lr.predict(&Matrix::new(1, 2, vec![4.0, 5.0]).unwrap()).unwrap();
        assert_abs_diff_eq!(p.get(0, 0), 14.0, epsilon = 1e-8);
        assert_abs_diff_eq!(r_squared(&lr, &x, &y).unwrap(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn predict_checks_state_and_width() {
        let (x, y) = plane();
        let mut lr = LinearRegression::new();
        assert!(matches!(lr.predict(&x), Err(Error::NotFitted(_))));

        lr.fit(&x, &y).unwrap();
        let wrong = Matrix::zeros(1, 3).unwrap();
        assert!(matches!(lr.predict(&wrong), Err(Error::InvalidShape(_))));
        assert_eq!(lr.predict(&x).unwrap().shape(), (4, 1));
    }

    #[test]
    fn fit_rejects_bad_shapes() {
        let (x, _) = plane();
        let mut lr = LinearRegression::new();
        let two_cols = Matrix::zeros(4, 2).unwrap();
        assert!(matches!(lr.fit(&x, &two_cols), Err(Error::InvalidShape(_))));
        let short = Matrix::zeros(3, 1).unwrap();
        assert!(matches!(lr.fit(&x, &short), Err(Error::InvalidShape(_))));
        assert!(!lr.is_fitted());
    }

    #[test]
    fn duplicated_feature_is_singular() {
        let x = Matrix::new(3, 2, vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]).unwrap();
        let y = Matrix::column(vec![1.0, 2.0, 3.0]).unwrap();
        let mut lr = LinearRegression::new();
        assert!(matches!(lr.fit(&x, &y), Err(Error::Singular { .. })));
        assert!(!lr.is_fitted());
    }
}
