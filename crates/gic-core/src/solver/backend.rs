use crate::error::{GicError, GicResult};
use faer::solvers::{PartialPivLu, SolverCore};
use faer::{Mat, MatRef};

/// Dense inverse of a square system matrix.
///
/// The H-matrix needs the full inverse of the grounded Laplacian; this is the
/// seam where a sparse factorization can replace the dense one for large
/// grids.
pub trait LinearSystemBackend: Send + Sync {
    /// Return `A⁻¹`, or [`GicError::Singular`] when `A` cannot be inverted.
    fn invert(&self, matrix: MatRef<'_, f64>) -> GicResult<Mat<f64>>;
}

fn check_square(matrix: MatRef<'_, f64>) -> GicResult<usize> {
    let n = matrix.nrows();
    if matrix.ncols() != n {
        return Err(GicError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }
    Ok(n)
}

/// Gauss-Jordan elimination with partial pivoting on `[A | I]`.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn invert(&self, matrix: MatRef<'_, f64>) -> GicResult<Mat<f64>> {
        let n = check_square(matrix)?;
        if n == 0 {
            return Ok(Mat::zeros(0, 0));
        }

        let mut a: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| matrix.read(i, j)).collect())
            .collect();
        let mut inv: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();

        let scale = a
            .iter()
            .flat_map(|row| row.iter())
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let tol = 1e-12 * scale.max(1.0);

        for i in 0..n {
            let mut pivot = i;
            for row in i + 1..n {
                if a[row][i].abs() > a[pivot][i].abs() {
                    pivot = row;
                }
            }
            if pivot != i {
                a.swap(i, pivot);
                inv.swap(i, pivot);
            }

            let diag = a[i][i];
            if diag.abs() < tol {
                return Err(GicError::Singular(format!("zero pivot at row {i}")));
            }

            for value in a[i].iter_mut() {
                *value /= diag;
            }
            for value in inv[i].iter_mut() {
                *value /= diag;
            }

            let pivot_row = a[i].clone();
            let pivot_inv = inv[i].clone();
            for row in 0..n {
                if row == i {
                    continue;
                }
                let factor = a[row][i];
                if factor == 0.0 {
                    continue;
                }
                for (target, &p) in a[row].iter_mut().zip(pivot_row.iter()) {
                    *target -= factor * p;
                }
                for (target, &p) in inv[row].iter_mut().zip(pivot_inv.iter()) {
                    *target -= factor * p;
                }
            }
        }

        Ok(Mat::from_fn(n, n, |i, j| inv[i][j]))
    }
}

/// LU with partial pivoting from faer.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl LinearSystemBackend for FaerSolver {
    fn invert(&self, matrix: MatRef<'_, f64>) -> GicResult<Mat<f64>> {
        let n = check_square(matrix)?;
        if n == 0 {
            return Ok(Mat::zeros(0, 0));
        }

        let lu = PartialPivLu::new(matrix);
        let inverse = lu.inverse();

        // faer does not report singularity; it shows up as Inf/NaN
        for j in 0..n {
            for i in 0..n {
                if !inverse.read(i, j).is_finite() {
                    return Err(GicError::Singular(
                        "non-finite entry in LU inverse".to_string(),
                    ));
                }
            }
        }
        Ok(inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laplacian_3() -> Mat<f64> {
        // Path 0-1-2 with node 0 grounded through 1 S
        let rows = [[3.0, -2.0, 0.0], [-2.0, 3.0, -1.0], [0.0, -1.0, 1.0]];
        Mat::from_fn(3, 3, |i, j| rows[i][j])
    }

    #[test]
    fn backends_agree_and_invert() {
        let a = laplacian_3();
        let gauss = GaussSolver.invert(a.as_ref()).unwrap();
        let faer = FaerSolver.invert(a.as_ref()).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert!((gauss.read(i, j) - faer.read(i, j)).abs() < 1e-10);
                let mut identity = 0.0;
                for k in 0..3 {
                    identity += a.read(i, k) * gauss.read(k, j);
                }
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((identity - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn floating_laplacian_is_singular() {
        let rows = [[1.0, -1.0], [-1.0, 1.0]];
        let a = Mat::from_fn(2, 2, |i, j| rows[i][j]);
        assert!(matches!(
            GaussSolver.invert(a.as_ref()),
            Err(GicError::Singular(_))
        ));
    }

    #[test]
    fn rejects_non_square() {
        let a = Mat::<f64>::zeros(2, 3);
        assert!(matches!(
            FaerSolver.invert(a.as_ref()),
            Err(GicError::DimensionMismatch { .. })
        ));
    }
}
