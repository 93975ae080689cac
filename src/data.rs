//! Paired feature/target matrices.
//!
//! `Dataset` keeps `x` and `y` row-aligned: row `i` of `y` is the target of row
//! `i` of `x`, including after shuffling. Batches are contiguous row windows
//! borrowed from the underlying storage.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::matrix::shuffle_rows;
use crate::{Error, Matrix, MatrixView, Result};

/// A supervised dataset: inputs (X) and targets (Y).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Matrix,
    y: Matrix,
}

impl Dataset {
    /// Pair `x` with `y`; row counts must match.
    pub fn new(x: Matrix, y: Matrix) -> Result<Self> {
        if x.rows() != y.rows() {
            return Err(Error::InvalidShape(format!(
                "{} feature rows but {} target rows",
                x.rows(),
                y.rows()
            )));
        }
        Ok(Self { x, y })
    }

    /// Build a dataset from per-sample rows.
    pub fn from_rows(xs: &[Vec<f64>], ys: &[Vec<f64>]) -> Result<Self> {
        if xs.is_empty() || ys.is_empty() {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        }
        Self::new(Matrix::from_rows(xs)?, Matrix::from_rows(ys)?)
    }

    #[inline]
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.x.rows()
    }

    #[inline]
    /// Always false: a `Matrix` has at least one row.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.x.cols()
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.y.cols()
    }

    pub fn x(&self) -> &Matrix {
        &self.x
    }

    pub fn y(&self) -> &Matrix {
        &self.y
    }

    pub fn into_parts(self) -> (Matrix, Matrix) {
        (self.x, self.y)
    }

    /// Permute the samples, keeping every input paired with its target.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        shuffle_rows(&mut self.x, &mut self.y, rng)
    }

    /// Iterate over consecutive windows of `batch_size` rows.
    ///
    /// The last batch is shorter when `len()` is not a multiple of `batch_size`.
    pub fn batches(&self, batch_size: usize) -> Result<Batches<'_>> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        Ok(Batches {
            data: self,
            batch_size,
            start: 0,
        })
    }
}

/// Iterator returned by [`Dataset::batches`].
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    data: &'a Dataset,
    batch_size: usize,
    start: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = (MatrixView<'a>, MatrixView<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.start >= self.data.len() {
            return None;
        }
        let end = (self.start + self.batch_size).min(self.data.len());
        let x = self.data.x.row_slice(self.start, end).ok()?;
        let y = self.data.y.row_slice(self.start, end).ok()?;
        self.start = end;
        Some((x, y))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.data.len().saturating_sub(self.start);
        let n = remaining.div_ceil(self.batch_size);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Batches<'_> {}

/// Sample isotropic Gaussian blobs around `centers`.
///
/// Each sample picks a center uniformly at random and adds `N(0, std^2)` noise
/// per feature. Returns `x` with one row per sample and `y` as a column of
/// center indices.
pub fn make_blobs<R: Rng + ?Sized>(
    n_samples: usize,
    centers: &Matrix,
    std: f64,
    rng: &mut R,
) -> Result<Dataset> {
    if n_samples == 0 {
        return Err(Error::InvalidData("n_samples must be > 0".to_owned()));
    }
    if !(std.is_finite() && std >= 0.0) {
        return Err(Error::InvalidConfig(format!(
            "cluster std must be finite and >= 0, got {std}"
        )));
    }

    let features = centers.cols();
    let mut x = Vec::with_capacity(n_samples * features);
    let mut y = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let cluster = rng.gen_range(0..centers.rows());
        y.push(cluster as f64);
        for &c in centers.row(cluster) {
            let noise: f64 = rng.sample(StandardNormal);
            x.push(c + std * noise);
        }
    }

    Dataset::new(
        Matrix::new(n_samples, features, x)?,
        Matrix::column(y)?,
    )
}
