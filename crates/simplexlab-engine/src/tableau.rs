//! Simplex tableau shared by the primal and dual solvers.
//!
//! Layout: row 0 is the objective row holding negated reduced costs, rows
//! `1..=m` are constraints, the last column is the right-hand side. Row `i`
//! (1-based) has `basic[i - 1]` as its basic variable, and that column is the
//! unit vector `e_i` over rows `1..=m` after every pivot.

use crate::matrix::Matrix;
use crate::problem::{ConstraintOp, Direction, LinearProgram};

/// Phase-specific part of a tableau
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "phase", rename_all = "snake_case"))]
pub enum TableauKind {
    /// Feasibility search: maximize minus the sum of the artificial columns.
    PhaseOne { artificial_columns: Vec<usize> },
    /// Optimality search on the real objective.
    PhaseTwo { direction: Direction },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tableau {
    pub matrix: Matrix,
    /// Basic column of each constraint row, in row order
    pub basic: Vec<usize>,
    /// Remaining columns, ascending
    pub non_basic: Vec<usize>,
    /// One name per column, RHS excluded
    pub column_names: Vec<String>,
    /// Decision columns come first; slack (and artificial) columns follow
    pub decision_count: usize,
    /// Constraint of the standardized program each row came from
    pub row_origins: Vec<usize>,
    /// Objective constant in maximization sense
    pub objective_constant: f64,
    /// Phase one: sum of artificial values. Phase two: objective in the
    /// original direction, constant included.
    pub objective_value: f64,
    pub kind: TableauKind,
}

/// Slack column assigned to each constraint of a program.
///
/// Every inequality row gets one, numbered in row order after the decision
/// columns. Equality rows get none.
pub fn slack_columns(program: &LinearProgram) -> Vec<Option<usize>> {
    let mut next = program.num_variables();
    program
        .constraints
        .iter()
        .map(|c| match c.op {
            ConstraintOp::Le | ConstraintOp::Ge => {
                next += 1;
                Some(next - 1)
            }
            ConstraintOp::Eq => None,
        })
        .collect()
}

/// Coefficient of the slack column in its own row: `+1` for `≤`, `-1`
/// (surplus) for `≥`.
pub fn slack_coefficient(op: ConstraintOp) -> f64 {
    match op {
        ConstraintOp::Ge => -1.0,
        ConstraintOp::Le | ConstraintOp::Eq => 1.0,
    }
}

impl Tableau {
    /// Number of constraint rows
    pub fn num_rows(&self) -> usize {
        self.matrix.len().saturating_sub(1)
    }

    /// Number of variable columns, RHS excluded
    pub fn num_columns(&self) -> usize {
        self.column_names.len()
    }

    pub fn rhs_column(&self) -> usize {
        self.num_columns()
    }

    /// Right-hand side of tableau row `row` (0 is the objective row).
    pub fn rhs(&self, row: usize) -> f64 {
        self.matrix[row][self.rhs_column()]
    }

    pub fn reduced_cost(&self, column: usize) -> f64 {
        self.matrix[0][column]
    }

    pub fn is_phase_one(&self) -> bool {
        matches!(self.kind, TableauKind::PhaseOne { .. })
    }

    pub fn artificial_columns(&self) -> &[usize] {
        match &self.kind {
            TableauKind::PhaseOne { artificial_columns } => artificial_columns,
            TableauKind::PhaseTwo { .. } => &[],
        }
    }

    pub fn is_artificial(&self, column: usize) -> bool {
        self.artificial_columns().contains(&column)
    }

    /// Current value of every column variable.
    pub fn values(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.num_columns()];
        for (i, &b) in self.basic.iter().enumerate() {
            values[b] = self.rhs(i + 1);
        }
        values
    }

    pub fn row_of_basic(&self, column: usize) -> Option<usize> {
        self.basic.iter().position(|&b| b == column).map(|i| i + 1)
    }

    /// Gauss-Jordan pivot on tableau position (`row`, `column`), `row >= 1`.
    ///
    /// The pivot row is scaled to a unit pivot and the column eliminated from
    /// every other row, objective row included.
    pub fn pivot(&mut self, row: usize, column: usize) {
        let pivot_val = self.matrix[row][column];
        for value in self.matrix[row].iter_mut() {
            *value /= pivot_val;
        }
        self.matrix[row][column] = 1.0;

        let pivot_row = self.matrix[row].clone();
        for (i, values) in self.matrix.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = values[column];
            if factor == 0.0 {
                continue;
            }
            for (value, p) in values.iter_mut().zip(&pivot_row) {
                *value -= factor * p;
            }
            values[column] = 0.0;
        }

        let leaving = self.basic[row - 1];
        self.basic[row - 1] = column;
        self.non_basic.retain(|&j| j != column);
        self.non_basic.push(leaving);
        self.non_basic.sort_unstable();
        self.refresh_objective();
    }

    /// Recompute `objective_value` from the RHS of the objective row.
    pub fn refresh_objective(&mut self) {
        let z = self.rhs(0);
        self.objective_value = match self.kind {
            TableauKind::PhaseOne { .. } => -z,
            TableauKind::PhaseTwo { direction } => direction.sign() * (z + self.objective_constant),
        };
    }

    /// Whether basic columns form the identity over the constraint rows.
    pub fn is_canonical(&self, tolerance: f64) -> bool {
        self.basic.iter().enumerate().all(|(i, &b)| {
            (1..=self.num_rows()).all(|r| {
                let expected = if r == i + 1 { 1.0 } else { 0.0 };
                (self.matrix[r][b] - expected).abs() <= tolerance
            })
        })
    }

    /// Rows whose right-hand side is below `-tolerance`, as tableau row numbers.
    pub fn infeasible_rows(&self, tolerance: f64) -> Vec<usize> {
        (1..=self.num_rows())
            .filter(|&r| self.rhs(r) < -tolerance)
            .collect()
    }

    /// Whether every reduced cost already satisfies the optimality sign.
    pub fn is_dual_feasible(&self, tolerance: f64) -> bool {
        self.first_dual_infeasibility(tolerance).is_none()
    }

    pub(crate) fn first_dual_infeasibility(&self, tolerance: f64) -> Option<usize> {
        (0..self.num_columns()).find(|&j| self.matrix[0][j] < -tolerance)
    }

    /// Constraint rows restricted to the given columns, RHS excluded.
    pub fn constraint_block(&self, columns: &[usize]) -> Matrix {
        self.matrix[1..]
            .iter()
            .map(|row| columns.iter().map(|&j| row[j]).collect())
            .collect()
    }

    /// Drop non-basic columns and renumber the remaining ones.
    pub(crate) fn remove_columns(&mut self, columns: &[usize]) {
        let keep: Vec<usize> = (0..=self.num_columns())
            .filter(|j| !columns.contains(j))
            .collect();
        let renumber = |j: usize| keep.iter().position(|&k| k == j);

        for row in self.matrix.iter_mut() {
            *row = keep.iter().map(|&j| row[j]).collect();
        }
        self.column_names = keep[..keep.len() - 1]
            .iter()
            .map(|&j| self.column_names[j].clone())
            .collect();
        self.basic = self.basic.iter().filter_map(|&j| renumber(j)).collect();
        self.non_basic = self.non_basic.iter().filter_map(|&j| renumber(j)).collect();
        let removed_decisions = columns.iter().filter(|&&j| j < self.decision_count).count();
        self.decision_count -= removed_decisions;
    }

    pub(crate) fn remove_row(&mut self, row: usize) {
        self.matrix.remove(row);
        let basic = self.basic.remove(row - 1);
        self.row_origins.remove(row - 1);
        self.non_basic.push(basic);
        self.non_basic.sort_unstable();
    }

    pub fn column_name(&self, column: usize) -> &str {
        self.column_names
            .get(column)
            .map(String::as_str)
            .unwrap_or("?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tableau {
        // max 3x1 + 2x2, 2x1 + x2 <= 10, x1 + 2x2 <= 8
        Tableau {
            matrix: vec![
                vec![-3.0, -2.0, 0.0, 0.0, 0.0],
                vec![2.0, 1.0, 1.0, 0.0, 10.0],
                vec![1.0, 2.0, 0.0, 1.0, 8.0],
            ],
            basic: vec![2, 3],
            non_basic: vec![0, 1],
            column_names: vec!["x1".into(), "x2".into(), "s1".into(), "s2".into()],
            decision_count: 2,
            row_origins: vec![0, 1],
            objective_constant: 0.0,
            objective_value: 0.0,
            kind: TableauKind::PhaseTwo {
                direction: Direction::Maximize,
            },
        }
    }

    #[test]
    fn test_pivot_keeps_canonical_form() {
        let mut t = sample();
        assert!(t.is_canonical(1e-9));
        t.pivot(1, 0);
        assert!(t.is_canonical(1e-9));
        assert_eq!(t.basic, vec![0, 3]);
        assert_eq!(t.non_basic, vec![1, 2]);
        assert!((t.rhs(1) - 5.0).abs() < 1e-9);
        assert!((t.rhs(2) - 3.0).abs() < 1e-9);
        assert!((t.objective_value - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_values_and_rows() {
        let t = sample();
        assert_eq!(t.values(), vec![0.0, 0.0, 10.0, 8.0]);
        assert_eq!(t.row_of_basic(3), Some(2));
        assert_eq!(t.row_of_basic(0), None);
        assert!(!t.is_dual_feasible(1e-9));
        assert!(t.infeasible_rows(1e-9).is_empty());
    }

    #[test]
    fn test_slack_columns() {
        let mut lp = LinearProgram::with_variable_count(2);
        lp.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 1.0);
        lp.add_constraint(vec![1.0, 1.0], ConstraintOp::Eq, 1.0);
        lp.add_constraint(vec![1.0, 1.0], ConstraintOp::Ge, 1.0);
        assert_eq!(slack_columns(&lp), vec![Some(2), None, Some(3)]);
        assert_eq!(slack_coefficient(ConstraintOp::Ge), -1.0);
    }

    #[test]
    fn test_remove_columns_and_rows() {
        let mut t = sample();
        t.remove_columns(&[1]);
        assert_eq!(t.column_names, vec!["x1", "s1", "s2"]);
        assert_eq!(t.matrix[1], vec![2.0, 1.0, 0.0, 10.0]);
        assert_eq!(t.non_basic, vec![0]);
        t.remove_row(1);
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.row_origins, vec![1]);
    }
}
