//! Dense linear algebra used by the solvers and by basis display.
//!
//! Matrices are row-major `Vec<Vec<f64>>`. Everything here is a pure function.

use crate::error::ShapeError;
use crate::EPSILON;

pub type Matrix = Vec<Vec<f64>>;

/// Basic and non-basic column blocks of a constraint matrix
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasisMatrices {
    /// Columns of A at the basic indices, in the order given
    pub basic: Matrix,
    /// Columns of A at the non-basic indices, in the order given
    pub non_basic: Matrix,
}

/// Solution of `Bx = b` for a candidate basis
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasicSolution {
    pub values: Vec<f64>,
    pub feasible: bool,
}

pub fn identity(n: usize) -> Matrix {
    let mut m = vec![vec![0.0; n]; n];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Column count of a rectangular matrix.
pub fn columns(m: &[Vec<f64>]) -> Result<usize, ShapeError> {
    let expected = m.first().map_or(0, Vec::len);
    for (row, values) in m.iter().enumerate() {
        if values.len() != expected {
            return Err(ShapeError::RaggedMatrix {
                row,
                expected,
                found: values.len(),
            });
        }
    }
    Ok(expected)
}

pub fn multiply(a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Matrix, ShapeError> {
    let a_cols = columns(a)?;
    let b_cols = columns(b)?;
    if a_cols != b.len() {
        return Err(ShapeError::IncompatibleMatrices {
            left_rows: a.len(),
            left_cols: a_cols,
            right_rows: b.len(),
            right_cols: b_cols,
        });
    }

    let mut product = vec![vec![0.0; b_cols]; a.len()];
    for (i, row) in a.iter().enumerate() {
        for (k, &a_ik) in row.iter().enumerate() {
            if a_ik == 0.0 {
                continue;
            }
            for j in 0..b_cols {
                product[i][j] += a_ik * b[k][j];
            }
        }
    }
    Ok(product)
}

pub fn multiply_vector(a: &[Vec<f64>], v: &[f64]) -> Result<Vec<f64>, ShapeError> {
    let a_cols = columns(a)?;
    if a_cols != v.len() {
        return Err(ShapeError::IncompatibleMatrices {
            left_rows: a.len(),
            left_cols: a_cols,
            right_rows: v.len(),
            right_cols: 1,
        });
    }
    Ok(a.iter()
        .map(|row| row.iter().zip(v).map(|(x, y)| x * y).sum())
        .collect())
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// Returns `None` for non-square input or when every candidate pivot in some
/// column is below `EPSILON` in magnitude (numerically singular).
pub fn invert(m: &[Vec<f64>]) -> Option<Matrix> {
    let n = m.len();
    if m.iter().any(|row| row.len() != n) {
        return None;
    }

    // Augmented [M | I]
    let mut work: Matrix = m
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut augmented = row.clone();
            augmented.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            augmented
        })
        .collect();

    for col in 0..n {
        let mut best_row = col;
        let mut best_val = work[col][col].abs();
        for (row, values) in work.iter().enumerate().skip(col + 1) {
            if values[col].abs() > best_val {
                best_val = values[col].abs();
                best_row = row;
            }
        }
        if best_val < EPSILON {
            return None;
        }
        work.swap(col, best_row);

        let pivot = work[col][col];
        for value in work[col].iter_mut() {
            *value /= pivot;
        }

        let pivot_row = work[col].clone();
        for (row, values) in work.iter_mut().enumerate() {
            if row == col {
                continue;
            }
            let factor = values[col];
            if factor == 0.0 {
                continue;
            }
            for (value, p) in values.iter_mut().zip(&pivot_row) {
                *value -= factor * p;
            }
        }
    }

    Some(work.into_iter().map(|row| row[n..].to_vec()).collect())
}

/// Fixed two-decimal rendering, one line per row, columns right-aligned.
pub fn format(m: &[Vec<f64>]) -> String {
    let cells: Vec<Vec<String>> = m
        .iter()
        .map(|row| row.iter().map(|v| format!("{:.2}", clean_zero(*v))).collect())
        .collect();
    let width = cells
        .iter()
        .flat_map(|row| row.iter().map(String::len))
        .max()
        .unwrap_or(0);

    cells
        .iter()
        .map(|row| {
            let line: Vec<String> = row.iter().map(|c| format!("{:>width$}", c)).collect();
            format!("[ {} ]", line.join("  "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// Avoid printing "-0.00".
fn clean_zero(v: f64) -> f64 {
    if v.abs() < 0.005 { 0.0 } else { v }
}

/// Slice the columns of `a` into the basic matrix B and non-basic matrix N.
///
/// Column order follows the index slices exactly: reordering `basic_indices`
/// permutes the columns of B and therefore the rows of B⁻¹.
pub fn extract_basis_matrices(
    a: &[Vec<f64>],
    basic_indices: &[usize],
    non_basic_indices: &[usize],
) -> Result<BasisMatrices, ShapeError> {
    let count = columns(a)?;
    let slice = |indices: &[usize]| -> Result<Matrix, ShapeError> {
        if let Some(&index) = indices.iter().find(|&&j| j >= count) {
            return Err(ShapeError::ColumnIndex { index, count });
        }
        Ok(a.iter()
            .map(|row| indices.iter().map(|&j| row[j]).collect())
            .collect())
    };

    Ok(BasisMatrices {
        basic: slice(basic_indices)?,
        non_basic: slice(non_basic_indices)?,
    })
}

/// Solve `Bx = b` through `invert`; `None` when B is singular.
pub fn check_basic_feasibility(b_matrix: &[Vec<f64>], b: &[f64]) -> Option<BasicSolution> {
    let inverse = invert(b_matrix)?;
    let values = multiply_vector(&inverse, b).ok()?;
    let feasible = values.iter().all(|&x| x >= -EPSILON);
    Some(BasicSolution { values, feasible })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[Vec<f64>], b: &[Vec<f64>]) {
        assert_eq!(a.len(), b.len());
        for (ra, rb) in a.iter().zip(b) {
            for (x, y) in ra.iter().zip(rb) {
                assert!((x - y).abs() < 1e-9, "{} != {}\n{}\n{}", x, y, format(a), format(b));
            }
        }
    }

    #[test]
    fn test_identity() {
        let i = identity(3);
        assert_eq!(i[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(i[2], vec![0.0, 0.0, 1.0]);
        assert!(identity(0).is_empty());
    }

    #[test]
    fn test_multiply() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let b = vec![vec![5.0], vec![6.0]];
        assert_eq!(multiply(&a, &b).unwrap(), vec![vec![17.0], vec![39.0]]);
    }

    #[test]
    fn test_multiply_shape_mismatch() {
        let a = vec![vec![1.0, 2.0]];
        let b = vec![vec![1.0, 2.0]];
        assert!(matches!(
            multiply(&a, &b),
            Err(ShapeError::IncompatibleMatrices { .. })
        ));
        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            multiply(&ragged, &b),
            Err(ShapeError::RaggedMatrix { row: 1, .. })
        ));
    }

    #[test]
    fn test_invert_round_trip() {
        let m = vec![
            vec![2.0, 1.0, 0.0],
            vec![1.0, 3.0, 1.0],
            vec![0.0, 1.0, 4.0],
        ];
        let inv = invert(&m).unwrap();
        assert_close(&multiply(&m, &inv).unwrap(), &identity(3));
        assert_close(&invert(&inv).unwrap(), &m);
    }

    #[test]
    fn test_invert_needs_row_swap() {
        // Zero on the diagonal forces partial pivoting
        let m = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let inv = invert(&m).unwrap();
        assert_close(&inv, &m);
    }

    #[test]
    fn test_invert_singular() {
        let m = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(invert(&m).is_none());
        assert!(invert(&[vec![1.0, 2.0]]).is_none());
    }

    #[test]
    fn test_format() {
        let m = vec![vec![1.0, -0.5], vec![10.0, -0.0001]];
        assert_eq!(format(&m), "[  1.00  -0.50 ]\n[ 10.00   0.00 ]");
    }

    #[test]
    fn test_extract_basis_order_matters() {
        let a = vec![vec![2.0, 1.0, 1.0, 0.0], vec![1.0, 2.0, 0.0, 1.0]];
        let forward = extract_basis_matrices(&a, &[0, 1], &[2, 3]).unwrap();
        let reversed = extract_basis_matrices(&a, &[1, 0], &[2, 3]).unwrap();
        assert_eq!(forward.basic, vec![vec![2.0, 1.0], vec![1.0, 2.0]]);
        assert_eq!(reversed.basic, vec![vec![1.0, 2.0], vec![2.0, 1.0]]);
        assert_eq!(forward.non_basic, identity(2));

        // Same basis set, different order: B⁻¹ rows come out permuted
        let inv_forward = invert(&forward.basic).unwrap();
        let inv_reversed = invert(&reversed.basic).unwrap();
        assert_close(&[inv_forward[0].clone()], &[inv_reversed[1].clone()]);

        assert!(matches!(
            extract_basis_matrices(&a, &[4], &[]),
            Err(ShapeError::ColumnIndex { index: 4, count: 4 })
        ));
    }

    #[test]
    fn test_check_basic_feasibility() {
        let b_matrix = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        let solution = check_basic_feasibility(&b_matrix, &[10.0, 8.0]).unwrap();
        assert!(solution.feasible);
        assert!((solution.values[0] - 4.0).abs() < 1e-9);
        assert!((solution.values[1] - 2.0).abs() < 1e-9);

        let solution = check_basic_feasibility(&b_matrix, &[1.0, 8.0]).unwrap();
        assert!(!solution.feasible);

        assert!(check_basic_feasibility(&[vec![1.0, 1.0], vec![1.0, 1.0]], &[1.0, 1.0]).is_none());
    }
}
