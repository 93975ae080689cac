//! K-means clustering (Lloyd's algorithm).
//!
//! Centers start at the first `n_clusters` rows of the training data. Each
//! iteration assigns every row to its nearest center by Euclidean distance (the
//! lowest index wins ties) and moves every center to the mean of its rows. A
//! center that receives no rows stays where it was.

use crate::config::JsonConfig;
use crate::matrix::euclidean;
use crate::{Error, KMeansConfig, Matrix, Result};

#[derive(Debug, Clone)]
pub struct KMeans {
    config: KMeansConfig,
    centers: Option<Matrix>,
    labels: Vec<usize>,
    inertia: f64,
    n_iter: usize,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            centers: None,
            labels: Vec::new(),
            inertia: 0.0,
            n_iter: 0,
        })
    }

    /// `n_clusters` clusters with the default iteration limit.
    pub fn with_clusters(n_clusters: usize) -> Result<Self> {
        Self::new(KMeansConfig {
            n_clusters,
            ..KMeansConfig::default()
        })
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Cluster the rows of `x`.
    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        let k = self.config.n_clusters;
        if x.rows() < k {
            return Err(Error::InvalidData(format!(
                "need at least {k} rows to fit {k} clusters, got {}",
                x.rows()
            )));
        }

        let mut centers = x.row_slice(0, k)?.to_matrix();
        let mut n_iter = 0;
        for iteration in 1..=self.config.max_iterations {
            let labels = assign(x, &centers);
            let updated = recompute_centers(x, &labels, &centers);
            let shift = (0..k)
                .map(|c| euclidean(centers.row(c), updated.row(c)))
                .fold(0.0, f64::max);
            centers = updated;
            n_iter = iteration;

            if matches!(self.config.tol, Some(tol) if shift <= tol) {
                break;
            }
        }

        let labels = assign(x, &centers);
        self.inertia = labels
            .iter()
            .enumerate()
            .map(|(r, &c)| {
                let d = euclidean(x.row(r), centers.row(c));
                d * d
            })
            .sum();
        self.labels = labels;
        self.centers = Some(centers);
        self.n_iter = n_iter;
        Ok(())
    }

    /// Index of the nearest fitted center for every row of `x`.
    pub fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        let centers = self.centers.as_ref().ok_or_else(|| {
            Error::NotFitted("k-means must be fitted before predict".to_owned())
        })?;
        if x.cols() != centers.cols() {
            return Err(Error::InvalidShape(format!(
                "input has {} features, centers have {}",
                x.cols(),
                centers.cols()
            )));
        }
        Ok(assign(x, centers))
    }

    /// `n_clusters x n_features`; `None` before `fit`.
    pub fn centers(&self) -> Option<&Matrix> {
        self.centers.as_ref()
    }

    /// Cluster of each training row from the last fit.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Sum of squared distances from each training row to its center.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

fn nearest(point: &[f64], centers: &Matrix) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for c in 0..centers.rows() {
        let d = euclidean(point, centers.row(c));
        if d < best_dist {
            best = c;
            best_dist = d;
        }
    }
    best
}

fn assign(x: &Matrix, centers: &Matrix) -> Vec<usize> {
    (0..x.rows()).map(|r| nearest(x.row(r), centers)).collect()
}

fn recompute_centers(x: &Matrix, labels: &[usize], previous: &Matrix) -> Matrix {
    let mut sums = previous.map(|_| 0.0);
    let mut counts = vec![0_usize; previous.rows()];
    for (r, &c) in labels.iter().enumerate() {
        counts[c] += 1;
        for (s, &v) in sums.row_mut(c).iter_mut().zip(x.row(r)) {
            *s += v;
        }
    }

    for (c, &count) in counts.iter().enumerate() {
        if count == 0 {
            sums.row_mut(c).copy_from_slice(previous.row(c));
        } else {
            let inv = 1.0 / count as f64;
            for s in sums.row_mut(c) {
                *s *= inv;
            }
        }
    }
    sums
}
