//! Separable type-II DCT over square greyscale grids.
//!
//! The cosine basis is precomputed once per grid size; the 2-D transform
//! runs the 1-D transform over every row and then over every column of the
//! row-transformed matrix.

use std::f64::consts::PI;

/// Precomputed orthonormal DCT-II basis for one grid size.
#[derive(Debug, Clone)]
pub(crate) struct DctPlan {
    size: usize,
    /// Row-major `basis[k * size + n] = s(k) * cos(pi * (2n + 1) * k / 2N)`.
    basis: Vec<f64>,
}

impl DctPlan {
    pub(crate) fn new(size: usize) -> Self {
        let n_f = size as f64;
        let mut basis = Vec::with_capacity(size * size);
        for k in 0..size {
            let scale = if k == 0 {
                (1.0 / n_f).sqrt()
            } else {
                (2.0 / n_f).sqrt()
            };
            for n in 0..size {
                let angle = PI * (2.0 * n as f64 + 1.0) * k as f64 / (2.0 * n_f);
                basis.push(scale * angle.cos());
            }
        }
        Self { size, basis }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// 1-D DCT of `input` into `output`. Both slices must be `size` long.
    pub(crate) fn transform_1d(&self, input: &[f64], output: &mut [f64]) {
        debug_assert_eq!(input.len(), self.size);
        debug_assert_eq!(output.len(), self.size);
        for (k, out) in output.iter_mut().enumerate() {
            let row = &self.basis[k * self.size..(k + 1) * self.size];
            *out = row.iter().zip(input).map(|(b, x)| b * x).sum();
        }
    }

    /// 2-D DCT of a row-major `size x size` matrix.
    ///
    /// Output is row-major as well: `out[u * size + v]` where `u` is the
    /// vertical frequency and `v` the horizontal one.
    pub(crate) fn transform_2d(&self, matrix: &[f64]) -> Vec<f64> {
        let n = self.size;
        debug_assert_eq!(matrix.len(), n * n);

        let mut rows = vec![0.0; n * n];
        for r in 0..n {
            self.transform_1d(&matrix[r * n..(r + 1) * n], &mut rows[r * n..(r + 1) * n]);
        }

        let mut out = vec![0.0; n * n];
        let mut column = vec![0.0; n];
        let mut transformed = vec![0.0; n];
        for c in 0..n {
            for r in 0..n {
                column[r] = rows[r * n + c];
            }
            self.transform_1d(&column, &mut transformed);
            for u in 0..n {
                out[u * n + c] = transformed[u];
            }
        }
        out
    }
}
