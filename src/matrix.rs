//! Dense row-major matrix.
//!
//! `Matrix` owns a flat `Vec<f64>` with an explicit `(rows, cols)` shape. The
//! invariant `data.len() == rows * cols` (with `rows, cols > 0`) is checked at
//! construction and preserved by every operation. In-place operations
//! (`transpose`, `inverse`) build the new buffer first and only then swap it in,
//! so a failing call leaves the receiver untouched.

use std::fmt;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::matmul;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Borrowed window of consecutive rows of a `Matrix`.
///
/// Rows are contiguous in row-major storage, so a row window can share the
/// parent's buffer. Column windows cannot and are copied by `Matrix::col_slice`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixView<'a> {
    rows: usize,
    cols: usize,
    data: &'a [f64],
}

impl Matrix {
    /// Build a matrix from a row-major buffer.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidShape(format!(
                "matrix dimensions must be > 0, got {rows}x{cols}"
            )));
        }
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            Error::InvalidShape(format!("matrix shape {rows}x{cols} overflows"))
        })?;
        if data.len() != expected {
            return Err(Error::InvalidShape(format!(
                "data length {} does not match {rows}x{cols}",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// A `rows x cols` matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Self::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            Error::InvalidShape(format!("matrix shape {rows}x{cols} overflows"))
        })?;
        Self::new(rows, cols, vec![value; len])
    }

    pub fn identity(size: usize) -> Result<Self> {
        let mut m = Self::zeros(size, size)?;
        for i in 0..size {
            m.data[i * size + i] = 1.0;
        }
        Ok(m)
    }

    /// Build a matrix from per-row vectors (copied into contiguous storage).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::InvalidShape(format!(
                    "row {i} has len {}, expected {cols}",
                    row.len()
                )));
            }
        }
        let data = rows.iter().flatten().copied().collect();
        Self::new(rows.len(), cols, data)
    }

    /// A single-column matrix.
    pub fn column(values: Vec<f64>) -> Result<Self> {
        let rows = values.len();
        Self::new(rows, 1, values)
    }

    /// Entries drawn from `N(0, 1) * scale`.
    pub fn random_normal<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        scale: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let mut m = Self::zeros(rows, cols)?;
        for v in &mut m.data {
            let z: f64 = rng.sample(StandardNormal);
            *v = z * scale;
        }
        Ok(m)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Element at `(r, c)`.
    ///
    /// Panics if out of bounds.
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        self.data[r * self.cols + c] = value;
    }

    /// Borrow row `r` as a slice.
    ///
    /// Panics if `r >= rows`.
    #[inline]
    pub fn row(&self, r: usize) -> &[f64] {
        let start = r * self.cols;
        &self.data[start..start + self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        let start = r * self.cols;
        &mut self.data[start..start + self.cols]
    }

    /// Copy column `c` into a `rows x 1` matrix.
    pub fn col(&self, c: usize) -> Result<Matrix> {
        if c >= self.cols {
            return Err(Error::InvalidShape(format!(
                "column index {c} out of range for {} columns",
                self.cols
            )));
        }
        let data = (0..self.rows).map(|r| self.data[r * self.cols + c]).collect();
        Matrix::new(self.rows, 1, data)
    }

    /// Rows `start..end` as a borrowed view.
    pub fn row_slice(&self, start: usize, end: usize) -> Result<MatrixView<'_>> {
        if start >= end || end > self.rows {
            return Err(Error::InvalidShape(format!(
                "row range {start}..{end} invalid for {} rows",
                self.rows
            )));
        }
        Ok(MatrixView {
            rows: end - start,
            cols: self.cols,
            data: &self.data[start * self.cols..end * self.cols],
        })
    }

    /// Columns `start..end` copied into a new matrix.
    pub fn col_slice(&self, start: usize, end: usize) -> Result<Matrix> {
        if start >= end || end > self.cols {
            return Err(Error::InvalidShape(format!(
                "column range {start}..{end} invalid for {} columns",
                self.cols
            )));
        }
        let width = end - start;
        let mut data = Vec::with_capacity(self.rows * width);
        for r in 0..self.rows {
            data.extend_from_slice(&self.row(r)[start..end]);
        }
        Matrix::new(self.rows, width, data)
    }

    #[inline]
    pub fn as_view(&self) -> MatrixView<'_> {
        MatrixView {
            rows: self.rows,
            cols: self.cols,
            data: &self.data,
        }
    }

    fn ensure_same_shape(&self, other: &Matrix, op: &str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::InvalidShape(format!(
                "cannot {op} {}x{} and {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(())
    }

    fn zip_with(&self, other: &Matrix, op: &str, f: impl Fn(f64, f64) -> f64) -> Result<Matrix> {
        self.ensure_same_shape(other, op)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Element-wise `self + other`; shapes must match.
    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    /// Element-wise `self - other`; shapes must match.
    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "subtract", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product; shapes must match.
    pub fn mul_elementwise(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "multiply", |a, b| a * b)
    }

    /// Element-wise addition with broadcasting.
    ///
    /// For each axis the sizes must be equal or one of them must be 1. The
    /// result takes the larger size on each axis.
    pub fn add_broadcast(&self, other: &Matrix) -> Result<Matrix> {
        let rows_ok = self.rows == other.rows || self.rows == 1 || other.rows == 1;
        let cols_ok = self.cols == other.cols || self.cols == 1 || other.cols == 1;
        if !(rows_ok && cols_ok) {
            return Err(Error::InvalidShape(format!(
                "cannot broadcast {}x{} with {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }

        let rows = self.rows.max(other.rows);
        let cols = self.cols.max(other.cols);
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                let a = self.data[(i % self.rows) * self.cols + (j % self.cols)];
                let b = other.data[(i % other.rows) * other.cols + (j % other.cols)];
                data.push(a + b);
            }
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Matrix product `self * other`, single-threaded.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        self.as_view().matmul(other)
    }

    /// Matrix product `self * other`, parallel over output rows.
    ///
    /// Produces exactly the same values as [`Matrix::matmul`].
    pub fn matmul_par(&self, other: &Matrix) -> Result<Matrix> {
        self.as_view().matmul_par(other)
    }

    /// Transpose in place.
    pub fn transpose(&mut self) {
        let mut data = vec![0.0; self.data.len()];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        std::mem::swap(&mut self.rows, &mut self.cols);
        self.data = data;
    }

    /// Transposed copy.
    pub fn transposed(&self) -> Matrix {
        let mut t = self.clone();
        t.transpose();
        t
    }

    /// Invert in place using Gauss-Jordan elimination with partial pivoting.
    ///
    /// Fails with `NotSquare` for non-square matrices and `Singular` when a pivot
    /// is exactly zero. The receiver is only overwritten on success.
    pub fn inverse(&mut self) -> Result<()> {
        if self.rows != self.cols {
            return Err(Error::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }

        let n = self.rows;
        let mut work = self.data.clone();
        let mut inv = Matrix::identity(n)?.data;

        for col in 0..n {
            // Partial pivoting: largest magnitude entry at or below the diagonal.
            let mut pivot_row = col;
            for row in col + 1..n {
                if work[row * n + col].abs() > work[pivot_row * n + col].abs() {
                    pivot_row = row;
                }
            }
            if pivot_row != col {
                for k in 0..n {
                    work.swap(col * n + k, pivot_row * n + k);
                    inv.swap(col * n + k, pivot_row * n + k);
                }
            }

            let pivot = work[col * n + col];
            if pivot == 0.0 {
                return Err(Error::Singular { column: col });
            }
            for k in 0..n {
                work[col * n + k] /= pivot;
                inv[col * n + k] /= pivot;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = work[row * n + col];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..n {
                    work[row * n + k] -= factor * work[col * n + k];
                    inv[row * n + k] -= factor * inv[col * n + k];
                }
            }
        }

        self.data = inv;
        Ok(())
    }

    /// Inverted copy; see [`Matrix::inverse`].
    pub fn inverted(&self) -> Result<Matrix> {
        let mut m = self.clone();
        m.inverse()?;
        Ok(m)
    }

    /// Multiply every element by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    pub fn scaled(&self, factor: f64) -> Matrix {
        let mut m = self.clone();
        m.scale(factor);
        m
    }

    /// Add `value` to every element.
    pub fn add_scalar(&mut self, value: f64) {
        for v in &mut self.data {
            *v += value;
        }
    }

    /// Apply `f` element-wise, returning a new matrix.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Per-column mean as a `1 x cols` matrix.
    pub fn column_means(&self) -> Matrix {
        let mut means = vec![0.0; self.cols];
        for r in 0..self.rows {
            for (m, &v) in means.iter_mut().zip(self.row(r)) {
                *m += v;
            }
        }
        let inv_n = 1.0 / self.rows as f64;
        for m in &mut means {
            *m *= inv_n;
        }
        Matrix {
            rows: 1,
            cols: self.cols,
            data: means,
        }
    }

    /// Index of the largest entry of each row (first one on ties).
    pub fn argmax_rows(&self) -> Vec<usize> {
        (0..self.rows).map(|r| argmax(self.row(r))).collect()
    }

    /// True when shapes match and every pair of entries differs by at most `tol`.
    pub fn approx_eq(&self, other: &Matrix, tol: f64) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).abs() <= tol)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let cols = self.cols;
        let (head, tail) = self.data.split_at_mut(hi * cols);
        head[lo * cols..(lo + 1) * cols].swap_with_slice(&mut tail[..cols]);
    }
}

/// Shuffle the rows of `x` and `y` with the same permutation.
///
/// Row `i` of `x` stays paired with row `i` of `y`.
pub fn shuffle_rows<R: Rng + ?Sized>(x: &mut Matrix, y: &mut Matrix, rng: &mut R) -> Result<()> {
    if x.rows != y.rows {
        return Err(Error::InvalidShape(format!(
            "cannot shuffle {} feature rows with {} target rows",
            x.rows, y.rows
        )));
    }

    // Fisher-Yates: row `i` is swapped with a uniformly drawn row in `i..n`.
    let n = x.rows;
    for i in 0..n.saturating_sub(1) {
        let j = rng.gen_range(i..n);
        x.swap_rows(i, j);
        y.swap_rows(i, j);
    }
    Ok(())
}

/// Euclidean distance between two equally sized points.
#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[inline]
pub(crate) fn argmax(xs: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in xs.iter().enumerate() {
        if v > xs[best] {
            best = i;
        }
    }
    best
}

impl<'a> MatrixView<'a> {
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn data(&self) -> &'a [f64] {
        self.data
    }

    #[inline]
    pub fn row(&self, r: usize) -> &'a [f64] {
        let start = r * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Copy the window into an owned matrix.
    pub fn to_matrix(&self) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.to_vec(),
        }
    }

    fn product_buffer(&self, other: &Matrix) -> Result<Vec<f64>> {
        if self.cols != other.rows {
            return Err(Error::InvalidShape(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(vec![0.0; self.rows * other.cols])
    }

    /// Matrix product `self * other`, single-threaded.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        let mut out = self.product_buffer(other)?;
        matmul::gemm(self.rows, other.cols, self.cols, self.data, &other.data, &mut out);
        Ok(Matrix {
            rows: self.rows,
            cols: other.cols,
            data: out,
        })
    }

    /// Matrix product `self * other`, parallel over output rows.
    pub fn matmul_par(&self, other: &Matrix) -> Result<Matrix> {
        let mut out = self.product_buffer(other)?;
        matmul::gemm_par(self.rows, other.cols, self.cols, self.data, &other.data, &mut out);
        Ok(Matrix {
            rows: self.rows,
            cols: other.cols,
            data: out,
        })
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            let row: Vec<String> = self.row(r).iter().map(|v| format!("{v:.6}")).collect();
            writeln!(f, "[{}]", row.join(", "))?;
        }
        Ok(())
    }
}
