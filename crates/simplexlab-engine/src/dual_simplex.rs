//! Dual simplex re-optimization of tableaux that stay optimal but lose
//! primal feasibility after a right-hand side change or an added cut.

use log::{debug, trace};

use crate::error::{EngineError, ShapeError};
use crate::format::format_number;
use crate::matrix;
use crate::problem::ConstraintOp;
use crate::simplex::Solver;
use crate::solution::standard_matrix;
use crate::standard_form::StandardForm;
use crate::step::{SimplexStep, StepStatus};
use crate::tableau::Tableau;

/// New right-hand side for one constraint of the original program
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RhsChange {
    pub constraint_index: usize,
    pub new_value: f64,
}

/// Dual feasible (optimality signs hold) but primal infeasible.
pub fn is_dual_simplex_candidate(tableau: &Tableau, tolerance: f64) -> bool {
    !tableau.is_phase_one()
        && tableau.is_dual_feasible(tolerance)
        && !needs_dual_simplex(tableau, tolerance).is_empty()
}

/// Rows whose basic variable has a negative value.
pub fn needs_dual_simplex(tableau: &Tableau, tolerance: f64) -> Vec<usize> {
    tableau.infeasible_rows(tolerance)
}

impl Solver {
    /// Restore primal feasibility while keeping every reduced cost non-negative.
    pub fn dual_simplex(&self, tableau: &Tableau) -> Result<Vec<SimplexStep>, EngineError> {
        if tableau.is_phase_one() {
            return Err(EngineError::UnsupportedTableau);
        }
        if let Some(column) = tableau.first_dual_infeasibility(self.tolerance()) {
            return Err(EngineError::NotDualFeasible {
                column,
                value: tableau.reduced_cost(column),
            });
        }

        let mut tableau = tableau.clone();
        let mut steps = Vec::new();
        let violated = needs_dual_simplex(&tableau, self.tolerance());
        let explanation = if violated.is_empty() {
            "Dual simplex: every basic variable is already non-negative".to_string()
        } else {
            let rows: Vec<String> = violated
                .iter()
                .map(|&r| format!("{} = {}", tableau.column_name(tableau.basic[r - 1]), format_number(tableau.rhs(r))))
                .collect();
            format!(
                "Dual simplex: the basis is optimal but infeasible ({})",
                rows.join(", ")
            )
        };
        steps.push(SimplexStep::new(&tableau, StepStatus::DualStart, explanation));
        debug!("dual simplex started with {} infeasible rows", violated.len());

        for _ in 0..self.max_iterations() {
            let Some(row) = self.dual_leaving_row(&tableau) else {
                debug!("dual simplex optimal, Z = {}", tableau.objective_value);
                steps.push(SimplexStep::new(
                    &tableau,
                    StepStatus::Optimal,
                    format!(
                        "Optimal: all right-hand sides are non-negative, Z = {}",
                        format_number(tableau.objective_value)
                    ),
                ));
                return Ok(steps);
            };
            let leaving = tableau.basic[row - 1];

            let Some(col) = self.dual_entering_column(&tableau, row) else {
                debug!("dual simplex: row {} has no negative entry, infeasible", row);
                let mut step = SimplexStep::new(
                    &tableau,
                    StepStatus::Infeasible,
                    format!(
                        "Infeasible: {} must leave but its row has no negative coefficient",
                        tableau.column_name(leaving)
                    ),
                );
                step.leaving = Some(leaving);
                steps.push(step);
                return Ok(steps);
            };

            let element = tableau.matrix[row][col];
            let explanation = format!(
                "{} leaves (value {}), {} enters (ratio {}), pivot {} at row {}",
                tableau.column_name(leaving),
                format_number(tableau.rhs(row)),
                tableau.column_name(col),
                format_number(tableau.reduced_cost(col) / element.abs()),
                format_number(element),
                row
            );
            tableau.pivot(row, col);
            trace!("dual pivot row {} col {}: {}", row, col, explanation);
            steps.push(SimplexStep::pivoted(
                &tableau,
                StepStatus::DualIteration,
                col,
                leaving,
                row,
                explanation,
            ));
        }
        Err(EngineError::IterationLimit(self.max_iterations()))
    }

    /// Most negative right-hand side, lowest row on ties.
    fn dual_leaving_row(&self, tableau: &Tableau) -> Option<usize> {
        let mut min_val = -self.tolerance();
        let mut min_row = None;
        for row in 1..=tableau.num_rows() {
            let value = tableau.rhs(row);
            if value < min_val {
                min_val = value;
                min_row = Some(row);
            }
        }
        min_row
    }

    /// Dual ratio test over negative entries of the leaving row.
    fn dual_entering_column(&self, tableau: &Tableau, row: usize) -> Option<usize> {
        let tol = self.tolerance();
        let mut min_ratio = f64::INFINITY;
        let mut min_col = None;
        for col in 0..tableau.num_columns() {
            let a = tableau.matrix[row][col];
            if a >= -tol {
                continue;
            }
            let ratio = tableau.reduced_cost(col).max(0.0) / a.abs();
            if min_col.is_none() || ratio < min_ratio - tol {
                min_ratio = ratio;
                min_col = Some(col);
            }
        }
        min_col
    }

    /// Append a constraint over the decision columns to an optimal tableau.
    ///
    /// The new row gets a fresh slack column and is rewritten in terms of the
    /// current basis, so the result is canonical and still dual feasible.
    /// `=` is added as a `≤` row followed by a `≥` row.
    pub fn add_constraint_to_tableau(
        &self,
        tableau: &Tableau,
        coefficients: &[f64],
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<Tableau, EngineError> {
        if tableau.is_phase_one() {
            return Err(EngineError::UnsupportedTableau);
        }
        if coefficients.len() != tableau.decision_count {
            return Err(ShapeError::ConstraintLength {
                index: tableau.num_rows(),
                expected: tableau.decision_count,
                found: coefficients.len(),
            }
            .into());
        }

        let negated: Vec<f64> = coefficients.iter().map(|a| -a).collect();
        let rows: Vec<(&[f64], f64)> = match op {
            ConstraintOp::Le => vec![(coefficients, rhs)],
            ConstraintOp::Ge => vec![(negated.as_slice(), -rhs)],
            ConstraintOp::Eq => vec![(coefficients, rhs), (negated.as_slice(), -rhs)],
        };

        let mut result = tableau.clone();
        for (a, b) in rows {
            let origin = result.row_origins.iter().max().map_or(0, |m| m + 1);
            let slack = result.num_columns();
            for row in result.matrix.iter_mut() {
                row.insert(slack, 0.0);
            }
            result.column_names.push(format!("s{}", origin + 1));

            let mut new_row = vec![0.0; slack + 2];
            new_row[..a.len()].copy_from_slice(a);
            new_row[slack] = 1.0;
            new_row[slack + 1] = b;
            for (i, &basic) in result.basic.iter().enumerate() {
                let factor = new_row[basic];
                if factor == 0.0 {
                    continue;
                }
                for (value, source) in new_row.iter_mut().zip(&result.matrix[i + 1]) {
                    *value -= factor * source;
                }
                new_row[basic] = 0.0;
            }

            result.matrix.push(new_row);
            result.basic.push(slack);
            result.row_origins.push(origin);
        }
        debug!(
            "added {} constraint, tableau now has {} rows",
            op.symbol(),
            result.num_rows()
        );
        Ok(result)
    }

    /// Apply RHS changes to an optimal tableau through `B⁻¹` without
    /// re-solving from scratch.
    pub fn modify_rhs(
        &self,
        standard: &StandardForm,
        tableau: &Tableau,
        changes: &[RhsChange],
    ) -> Result<Tableau, EngineError> {
        if tableau.is_phase_one() {
            return Err(EngineError::UnsupportedTableau);
        }
        let count = standard.program.num_constraints();
        if let Some(change) = changes.iter().find(|c| c.constraint_index >= count) {
            return Err(EngineError::ConstraintIndex {
                index: change.constraint_index,
                count,
            });
        }
        if tableau.row_origins.iter().any(|&i| i >= count) {
            return Err(EngineError::UnsupportedTableau);
        }
        if let Some(change) = changes
            .iter()
            .find(|c| !tableau.row_origins.contains(&c.constraint_index))
        {
            return Err(EngineError::RemovedConstraint(change.constraint_index));
        }

        let (a, _) = standard_matrix(standard, &tableau.row_origins);
        if a.first().map_or(0, Vec::len) != tableau.num_columns() {
            return Err(EngineError::UnsupportedTableau);
        }

        let mut b: Vec<f64> = standard.program.constraints.iter().map(|c| c.rhs).collect();
        for change in changes {
            b[change.constraint_index] = standard.standard_rhs(change.constraint_index, change.new_value);
        }
        let b_rows: Vec<f64> = tableau.row_origins.iter().map(|&i| b[i]).collect();

        let basis = matrix::extract_basis_matrices(&a, &tableau.basic, &tableau.non_basic)?;
        let inverse = matrix::invert(&basis.basic).ok_or(EngineError::SingularBasis)?;
        let x_b = matrix::multiply_vector(&inverse, &b_rows)?;

        let mut result = tableau.clone();
        let rhs = result.rhs_column();
        let objective = &standard.program.objective;
        let mut z = 0.0;
        for (i, (&basic, &value)) in result.basic.iter().zip(&x_b).enumerate() {
            result.matrix[i + 1][rhs] = value;
            z += objective.get(basic).copied().unwrap_or(0.0) * value;
        }
        result.matrix[0][rhs] = z;
        result.refresh_objective();
        Ok(result)
    }

    /// RHS re-optimization entry point: modify, then run the dual simplex.
    pub fn reoptimize(
        &self,
        standard: &StandardForm,
        tableau: &Tableau,
        changes: &[RhsChange],
    ) -> Result<Vec<SimplexStep>, EngineError> {
        let modified = self.modify_rhs(standard, tableau, changes)?;
        self.dual_simplex(&modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Direction, LinearProgram};
    use crate::simplex::SolveOutcome;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn solved() -> SolveOutcome {
        // max 3x1 + 2x2, x1 + x2 <= 4, 2x1 + x2 <= 6; optimum x = (2, 2), Z = 10
        let mut lp = LinearProgram::with_variable_count(2);
        lp.set_objective(vec![3.0, 2.0], Direction::Maximize);
        lp.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        lp.add_constraint(vec![2.0, 1.0], ConstraintOp::Le, 6.0);
        Solver::new().solve(&lp).unwrap()
    }

    fn optimal_tableau(outcome: &SolveOutcome) -> Tableau {
        outcome.steps.last().unwrap().tableau.clone()
    }

    fn assert_dual_feasible_throughout(steps: &[SimplexStep]) {
        for step in steps {
            assert!(
                step.tableau.is_dual_feasible(1e-9),
                "reduced costs lost their sign in: {}",
                step.explanation
            );
            assert!(step.tableau.is_canonical(1e-9));
        }
    }

    #[test]
    fn test_added_cut_already_satisfied() {
        // x1 >= 1 holds at (2, 2)
        init();
        let outcome = solved();
        let solver = Solver::new();
        let tableau = solver
            .add_constraint_to_tableau(&optimal_tableau(&outcome), &[1.0, 0.0], ConstraintOp::Ge, 1.0)
            .unwrap();
        assert!(!is_dual_simplex_candidate(&tableau, 1e-9));

        let steps = solver.dual_simplex(&tableau).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].status, StepStatus::DualStart);
        assert_eq!(steps[1].status, StepStatus::Optimal);
        assert!((steps[1].tableau.objective_value - 10.0).abs() < 1e-9);
        assert_dual_feasible_throughout(&steps);
    }

    #[test]
    fn test_added_cut_reoptimizes() {
        // x1 <= 1 cuts off (2, 2); new optimum (1, 3), Z = 9
        init();
        let outcome = solved();
        let solver = Solver::new();
        let tableau = solver
            .add_constraint_to_tableau(&optimal_tableau(&outcome), &[1.0, 0.0], ConstraintOp::Le, 1.0)
            .unwrap();
        assert!(tableau.is_canonical(1e-9));
        assert!(is_dual_simplex_candidate(&tableau, 1e-9));
        assert_eq!(needs_dual_simplex(&tableau, 1e-9), vec![3]);

        let steps = solver.dual_simplex(&tableau).unwrap();
        let statuses: Vec<StepStatus> = steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![StepStatus::DualStart, StepStatus::DualIteration, StepStatus::Optimal]
        );
        assert_dual_feasible_throughout(&steps);

        let last = &steps[2].tableau;
        assert!(last.infeasible_rows(1e-9).is_empty());
        assert!((last.objective_value - 9.0).abs() < 1e-9);
        let values = last.values();
        assert!((values[0] - 1.0).abs() < 1e-9);
        assert!((values[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_added_cut_infeasible() {
        // x1 + x2 >= 10 contradicts x1 + x2 <= 4
        init();
        let outcome = solved();
        let solver = Solver::new();
        let tableau = solver
            .add_constraint_to_tableau(&optimal_tableau(&outcome), &[1.0, 1.0], ConstraintOp::Ge, 10.0)
            .unwrap();
        let steps = solver.dual_simplex(&tableau).unwrap();
        let last = steps.last().unwrap();
        assert_eq!(last.status, StepStatus::Infeasible);
        assert!(last.leaving.is_some());
    }

    #[test]
    fn test_reoptimize_rhs_change() {
        // x1 + x2 <= 1 instead of 4: optimum moves to (1, 0), Z = 3
        init();
        let outcome = solved();
        let solver = Solver::new();
        let tableau = optimal_tableau(&outcome);

        let modified = solver
            .modify_rhs(
                &outcome.standard,
                &tableau,
                &[RhsChange {
                    constraint_index: 0,
                    new_value: 1.0,
                }],
            )
            .unwrap();
        assert!(is_dual_simplex_candidate(&modified, 1e-9));
        // Reduced costs are untouched by an RHS change
        assert_eq!(modified.matrix[0][..4], tableau.matrix[0][..4]);

        let steps = solver.dual_simplex(&modified).unwrap();
        assert_dual_feasible_throughout(&steps);
        let last = steps.last().unwrap();
        assert_eq!(last.status, StepStatus::Optimal);
        assert!((last.tableau.objective_value - 3.0).abs() < 1e-9);
        assert!((last.tableau.values()[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reoptimize_matches_fresh_solve() {
        init();
        let outcome = solved();
        let solver = Solver::new();
        let steps = solver
            .reoptimize(
                &outcome.standard,
                &optimal_tableau(&outcome),
                &[RhsChange {
                    constraint_index: 1,
                    new_value: 5.0,
                }],
            )
            .unwrap();

        let mut fresh = LinearProgram::with_variable_count(2);
        fresh.set_objective(vec![3.0, 2.0], Direction::Maximize);
        fresh.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        fresh.add_constraint(vec![2.0, 1.0], ConstraintOp::Le, 5.0);
        let expected = solver.solve(&fresh).unwrap().solution.objective_value;

        let last = steps.last().unwrap();
        assert_eq!(last.status, StepStatus::Optimal);
        assert!((last.tableau.objective_value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_reoptimize_ge_constraint_sign() {
        // min 2x + 3y, x + y >= 4, x <= 3, y <= 3; raise the >= to 5
        init();
        let mut lp = LinearProgram::with_variable_count(2);
        lp.set_objective(vec![2.0, 3.0], Direction::Minimize);
        lp.add_constraint(vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        lp.add_constraint(vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        lp.add_constraint(vec![0.0, 1.0], ConstraintOp::Le, 3.0);
        let solver = Solver::new();
        let outcome = solver.solve(&lp).unwrap();

        let modified = solver
            .modify_rhs(
                &outcome.standard,
                &optimal_tableau(&outcome),
                &[RhsChange {
                    constraint_index: 0,
                    new_value: 5.0,
                }],
            )
            .unwrap();
        // Same basis stays feasible: x = 3, y = 2
        assert!(modified.infeasible_rows(1e-9).is_empty());
        assert!((modified.objective_value - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_change_to_removed_row_rejected() {
        // x1 + x2 = 4 twice: phase two keeps only one of the rows
        init();
        let mut lp = LinearProgram::with_variable_count(2);
        lp.set_objective(vec![1.0, 2.0], Direction::Maximize);
        lp.add_constraint(vec![1.0, 1.0], ConstraintOp::Eq, 4.0);
        lp.add_constraint(vec![2.0, 2.0], ConstraintOp::Eq, 8.0);
        let solver = Solver::new();
        let outcome = solver.solve(&lp).unwrap();
        let tableau = optimal_tableau(&outcome);
        assert_eq!(tableau.row_origins.len(), 1);

        let removed = 1 - tableau.row_origins[0];
        let change = RhsChange {
            constraint_index: removed,
            new_value: 10.0,
        };
        assert_eq!(
            solver.modify_rhs(&outcome.standard, &tableau, &[change]),
            Err(EngineError::RemovedConstraint(removed))
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        let outcome = solved();
        let solver = Solver::new();

        // The first recorded tableau still has negative reduced costs
        let initial = &outcome.steps[1].tableau;
        assert!(matches!(
            solver.dual_simplex(initial),
            Err(EngineError::NotDualFeasible { .. })
        ));

        let change = RhsChange {
            constraint_index: 7,
            new_value: 1.0,
        };
        assert_eq!(
            solver.modify_rhs(&outcome.standard, &optimal_tableau(&outcome), &[change]),
            Err(EngineError::ConstraintIndex { index: 7, count: 2 })
        );

        let mut broken = optimal_tableau(&outcome);
        broken.basic = vec![0, 0];
        assert_eq!(
            solver.modify_rhs(&outcome.standard, &broken, &[]),
            Err(EngineError::SingularBasis)
        );

        assert!(matches!(
            solver.add_constraint_to_tableau(&optimal_tableau(&outcome), &[1.0], ConstraintOp::Le, 1.0),
            Err(EngineError::Shape(ShapeError::ConstraintLength { .. }))
        ));
    }
}
