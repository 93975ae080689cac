//! Row-major GEMM kernels used by `Matrix::matmul` and `Matrix::matmul_par`.
//!
//! Both entry points share `gemm_row`, so every output element is produced by the
//! same sequence of floating-point operations regardless of which one ran.

use rayon::prelude::*;

/// Computes one output row: `out[j] = sum_p a_row[p] * b[p, j]`.
///
/// Shape contract:
/// - `a_row.len() == k`
/// - `b.len() == k * n`
/// - `out.len() == n`
#[inline]
fn gemm_row(a_row: &[f64], b: &[f64], n: usize, out: &mut [f64]) {
    debug_assert_eq!(b.len(), a_row.len() * n);
    debug_assert_eq!(out.len(), n);

    for (j, slot) in out.iter_mut().enumerate() {
        let mut acc = 0.0_f64;
        for (p, &av) in a_row.iter().enumerate() {
            acc += av * b[p * n + j];
        }
        *slot = acc;
    }
}

/// `c = a * b` with `a: (m, k)`, `b: (k, n)`, `c: (m, n)`, single-threaded.
pub(crate) fn gemm(m: usize, n: usize, k: usize, a: &[f64], b: &[f64], c: &mut [f64]) {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), k * n);
    debug_assert_eq!(c.len(), m * n);

    for (a_row, c_row) in a.chunks_exact(k).zip(c.chunks_exact_mut(n)) {
        gemm_row(a_row, b, n, c_row);
    }
}

/// `c = a * b`, one rayon task per output row.
///
/// Rows of `c` are disjoint, so tasks never share mutable state; `for_each`
/// returns only after every row has been written.
pub(crate) fn gemm_par(m: usize, n: usize, k: usize, a: &[f64], b: &[f64], c: &mut [f64]) {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), k * n);
    debug_assert_eq!(c.len(), m * n);

    c.par_chunks_exact_mut(n)
        .zip(a.par_chunks_exact(k))
        .for_each(|(c_row, a_row)| gemm_row(a_row, b, n, c_row));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemm_matches_hand_computed_product() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        let mut c = [0.0; 4];
        gemm(2, 2, 2, &a, &b, &mut c);
        assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn gemm_par_is_bit_identical_to_gemm() {
        let a: Vec<f64> = (0..15).map(|i| (i as f64).sin() * 3.7).collect();
        let b: Vec<f64> = (0..20).map(|i| (i as f64).cos() / 1.3).collect();
        let mut seq = vec![0.0; 12];
        let mut par = vec![0.0; 12];
        gemm(3, 4, 5, &a, &b, &mut seq);
        gemm_par(3, 4, 5, &a, &b, &mut par);
        assert_eq!(seq, par);
    }
}
