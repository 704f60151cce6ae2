//! Minimal dense matrix kernel
//!
//! Only what the homography solve needs: identity, transpose, products and a
//! Gauss-Jordan inverse. Matrices carry their shape explicitly so every
//! operation can validate its operands up front.

use crate::error::{Result, WarpError};

/// Default magnitude below which a pivot is treated as zero.
pub const DEFAULT_PIVOT_EPSILON: f64 = 1e-12;

/// Row-major dense matrix of `f64`
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// All-zero matrix of the given shape
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// n×n identity matrix
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Build a matrix from row vectors. All rows must have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(WarpError::DimensionMismatch {
                    op: "from_rows",
                    left: (rows.len(), cols),
                    right: (1, row.len()),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Borrow a single row
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for k in 0..self.cols {
            self.data.swap(a * self.cols + k, b * self.cols + k);
        }
    }

    /// Row/column swapped copy
    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out[(j, i)] = self[(i, j)];
            }
        }
        out
    }

    /// Matrix product `self · rhs`
    pub fn multiply(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(WarpError::DimensionMismatch {
                op: "multiply",
                left: self.shape(),
                right: rhs.shape(),
            });
        }

        let mut out = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            let lhs_row = self.row(i);
            for k in 0..rhs.cols {
                let mut acc = 0.0;
                for (j, a) in lhs_row.iter().enumerate() {
                    acc += a * rhs[(j, k)];
                }
                out[(i, k)] = acc;
            }
        }
        Ok(out)
    }

    /// Matrix-vector product `self · v`
    pub fn mul_vec(&self, v: &[f64]) -> Result<Vec<f64>> {
        if self.cols != v.len() {
            return Err(WarpError::DimensionMismatch {
                op: "mul_vec",
                left: self.shape(),
                right: (v.len(), 1),
            });
        }

        Ok((0..self.rows)
            .map(|i| self.row(i).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Inverse by Gauss-Jordan elimination with partial pivoting.
    ///
    /// For every column the remaining row with the largest magnitude entry is
    /// swapped into place, normalized, and eliminated from all other rows. The
    /// same row operations applied to an identity matrix yield the inverse.
    /// Pivots with magnitude `<= epsilon` are rejected as singular.
    pub fn invert(&self, epsilon: f64) -> Result<Matrix> {
        if self.rows != self.cols {
            return Err(WarpError::DimensionMismatch {
                op: "invert",
                left: self.shape(),
                right: (self.cols, self.rows),
            });
        }

        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Matrix::identity(n);

        for col in 0..n {
            // Find pivot
            let mut pivot_row = col;
            let mut pivot_mag = a[(col, col)].abs();
            for row in (col + 1)..n {
                let mag = a[(row, col)].abs();
                if mag > pivot_mag {
                    pivot_mag = mag;
                    pivot_row = row;
                }
            }

            if !(pivot_mag > epsilon) {
                return Err(WarpError::SingularMatrix { column: col });
            }

            a.swap_rows(col, pivot_row);
            inv.swap_rows(col, pivot_row);

            // Normalize pivot row
            let pivot = a[(col, col)];
            a.row_mut(col).iter_mut().for_each(|v| *v /= pivot);
            inv.row_mut(col).iter_mut().for_each(|v| *v /= pivot);

            // Eliminate the column from every other row
            let a_pivot = a.row(col).to_vec();
            let inv_pivot = inv.row(col).to_vec();
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[(row, col)];
                if factor == 0.0 {
                    continue;
                }
                for (dst, src) in a.row_mut(row).iter_mut().zip(&a_pivot) {
                    *dst -= factor * src;
                }
                for (dst, src) in inv.row_mut(row).iter_mut().zip(&inv_pivot) {
                    *dst -= factor * src;
                }
            }
        }

        Ok(inv)
    }
}

impl std::ops::Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.cols + j]
    }
}

impl std::ops::IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn well_conditioned() -> Matrix {
        Matrix::from_rows(&[
            [4.0, 1.0, 0.5, 0.0],
            [1.0, 3.0, 0.0, 0.25],
            [0.5, 0.0, 2.0, 1.0],
            [0.0, 0.25, 1.0, 5.0],
        ])
        .unwrap()
    }

    fn assert_matrix_eq(a: &Matrix, b: &Matrix, eps: f64) {
        assert_eq!(a.shape(), b.shape());
        for i in 0..a.rows() {
            for j in 0..a.cols() {
                assert_abs_diff_eq!(a[(i, j)], b[(i, j)], epsilon = eps);
            }
        }
    }

    #[test]
    fn test_invert_identity() {
        for n in [1, 2, 3, 8] {
            let id = Matrix::identity(n);
            let inv = id.invert(DEFAULT_PIVOT_EPSILON).unwrap();
            assert_eq!(inv, id);
        }
    }

    #[test]
    fn test_double_inverse() {
        let m = well_conditioned();
        let back = m
            .invert(DEFAULT_PIVOT_EPSILON)
            .unwrap()
            .invert(DEFAULT_PIVOT_EPSILON)
            .unwrap();
        assert_matrix_eq(&back, &m, 1e-8);
    }

    #[test]
    fn test_invert_requires_pivoting() {
        // Zero on the leading diagonal: only works if rows get swapped
        let m = Matrix::from_rows(&[[0.0, 1.0], [2.0, 0.0]]).unwrap();
        let inv = m.invert(DEFAULT_PIVOT_EPSILON).unwrap();
        let expected = Matrix::from_rows(&[[0.0, 0.5], [1.0, 0.0]]).unwrap();
        assert_matrix_eq(&inv, &expected, 1e-12);
    }

    #[test]
    fn test_invert_matches_nalgebra() {
        let m = well_conditioned();
        let ours = m.invert(DEFAULT_PIVOT_EPSILON).unwrap();

        let reference = nalgebra::DMatrix::from_row_slice(4, 4, &m.data)
            .try_inverse()
            .unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert_abs_diff_eq!(ours[(i, j)], reference[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_invert_singular() {
        let m = Matrix::from_rows(&[[1.0, 2.0], [2.0, 4.0]]).unwrap();
        assert_eq!(
            m.invert(DEFAULT_PIVOT_EPSILON),
            Err(WarpError::SingularMatrix { column: 1 })
        );
    }

    #[test]
    fn test_invert_epsilon_rejects_noise() {
        let m = Matrix::from_rows(&[[1.0, 0.0], [0.0, 1e-14]]).unwrap();
        assert!(m.invert(1e-12).is_err());
        assert!(m.invert(0.0).is_ok());
    }

    #[test]
    fn test_invert_non_square() {
        let m = Matrix::zeros(2, 3);
        assert!(matches!(
            m.invert(DEFAULT_PIVOT_EPSILON),
            Err(WarpError::DimensionMismatch { op: "invert", .. })
        ));
    }

    #[test]
    fn test_double_transpose() {
        let m = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(2, 0)], 3.0);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn test_multiply_identity() {
        let m = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.multiply(&Matrix::identity(3)).unwrap(), m);
    }

    #[test]
    fn test_multiply_shape_mismatch() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 3);
        assert_eq!(
            a.multiply(&b),
            Err(WarpError::DimensionMismatch {
                op: "multiply",
                left: (2, 3),
                right: (2, 3),
            })
        );
    }

    #[test]
    fn test_ragged_rows() {
        let rows: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            Matrix::from_rows(&rows),
            Err(WarpError::DimensionMismatch { op: "from_rows", .. })
        ));
    }

    #[test]
    fn test_mul_vec() {
        let m = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(m.mul_vec(&[1.0, 1.0]).unwrap(), vec![3.0, 7.0]);
        assert!(m.mul_vec(&[1.0]).is_err());
    }
}
