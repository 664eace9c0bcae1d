//! Primal to dual conversion on the original problem shape.

use crate::error::ShapeError;
use crate::problem::{ConstraintOp, Direction, LinearProgram, VariableSign};

/// Links one dual variable to the primal constraint it prices.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DualPair {
    /// Dual variable name, `y1..ym`
    pub variable: String,
    /// Primal constraint index
    pub constraint: usize,
    pub constraint_op: ConstraintOp,
    /// Restriction the operator imposes on the dual variable
    pub sign: VariableSign,
}

/// Links one dual constraint back to its primal variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DualConstraintSource {
    pub primal_variable: String,
    pub primal_sign: VariableSign,
    pub op: ConstraintOp,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DualProgram {
    pub dual: LinearProgram,
    pub pairs: Vec<DualPair>,
    pub constraint_sources: Vec<DualConstraintSource>,
}

/// Sign of the dual variable for a primal constraint.
///
/// Stated for a maximization primal; a minimization primal swaps
/// `NonNegative` and `NonPositive`.
pub fn dual_variable_sign(direction: Direction, op: ConstraintOp) -> VariableSign {
    match (direction, op) {
        (_, ConstraintOp::Eq) => VariableSign::Free,
        (Direction::Maximize, ConstraintOp::Le) | (Direction::Minimize, ConstraintOp::Ge) => {
            VariableSign::NonNegative
        }
        (Direction::Maximize, ConstraintOp::Ge) | (Direction::Minimize, ConstraintOp::Le) => {
            VariableSign::NonPositive
        }
    }
}

/// Operator of the dual constraint generated by a primal variable.
pub fn dual_constraint_op(direction: Direction, sign: VariableSign) -> ConstraintOp {
    match (direction, sign) {
        (_, VariableSign::Free) => ConstraintOp::Eq,
        (Direction::Maximize, VariableSign::NonNegative)
        | (Direction::Minimize, VariableSign::NonPositive) => ConstraintOp::Ge,
        (Direction::Maximize, VariableSign::NonPositive)
        | (Direction::Minimize, VariableSign::NonNegative) => ConstraintOp::Le,
    }
}

/// Build the dual of `lp`. Integrality markers are not carried over.
pub fn dual_of(lp: &LinearProgram) -> Result<DualProgram, ShapeError> {
    lp.validate()?;
    let m = lp.num_constraints();
    let names: Vec<String> = (1..=m).map(|i| format!("y{}", i)).collect();

    let mut dual = LinearProgram::new(names.clone());
    dual.set_objective(
        lp.constraints.iter().map(|c| c.rhs).collect(),
        lp.direction.flipped(),
    );
    dual.set_objective_constant(lp.objective_constant);

    let mut pairs = Vec::with_capacity(m);
    for (i, (constraint, variable)) in lp.constraints.iter().zip(names).enumerate() {
        let sign = dual_variable_sign(lp.direction, constraint.op);
        if sign != VariableSign::NonNegative {
            dual.set_sign(i, sign)?;
        }
        pairs.push(DualPair {
            variable,
            constraint: i,
            constraint_op: constraint.op,
            sign,
        });
    }

    let mut constraint_sources = Vec::with_capacity(lp.num_variables());
    for (j, name) in lp.variables.iter().enumerate() {
        let column = lp.constraints.iter().map(|c| c.coefficients[j]).collect();
        let primal_sign = lp.sign(j);
        let op = dual_constraint_op(lp.direction, primal_sign);
        dual.add_constraint(column, op, lp.objective[j]);
        constraint_sources.push(DualConstraintSource {
            primal_variable: name.clone(),
            primal_sign,
            op,
        });
    }

    Ok(DualProgram {
        dual,
        pairs,
        constraint_sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplex::Solver;
    use crate::solution::SolutionStatus;

    fn textbook() -> LinearProgram {
        let mut lp = LinearProgram::with_variable_count(2);
        lp.set_objective(vec![3.0, 2.0], Direction::Maximize);
        lp.add_constraint(vec![2.0, 1.0], ConstraintOp::Le, 10.0);
        lp.add_constraint(vec![1.0, 2.0], ConstraintOp::Le, 8.0);
        lp
    }

    #[test]
    fn test_textbook_dual() {
        let result = dual_of(&textbook()).unwrap();
        let dual = &result.dual;

        assert_eq!(dual.direction, Direction::Minimize);
        assert_eq!(dual.variables, vec!["y1".to_string(), "y2".to_string()]);
        assert_eq!(dual.objective, vec![10.0, 8.0]);
        assert_eq!(dual.constraints[0].coefficients, vec![2.0, 1.0]);
        assert_eq!(dual.constraints[0].op, ConstraintOp::Ge);
        assert_eq!(dual.constraints[0].rhs, 3.0);
        assert_eq!(dual.constraints[1].coefficients, vec![1.0, 2.0]);
        assert_eq!(dual.constraints[1].rhs, 2.0);
        assert!(result.pairs.iter().all(|p| p.sign == VariableSign::NonNegative));
        assert_eq!(
            dual.to_string(),
            "Min Z = 10y1 + 8y2\nSujeito a:\n  2y1 + y2 ≥ 3\n  y1 + 2y2 ≥ 2\n  y1, y2 ≥ 0"
        );
    }

    #[test]
    fn test_strong_duality() {
        let solver = Solver::new();
        let primal = solver.solve(&textbook()).unwrap().solution;
        let dual = solver.solve(&dual_of(&textbook()).unwrap().dual).unwrap().solution;

        assert_eq!(primal.status, SolutionStatus::Optimal);
        assert_eq!(dual.status, SolutionStatus::Optimal);
        assert!((primal.objective_value - 16.0).abs() < 1e-6);
        assert!((dual.objective_value - 16.0).abs() < 1e-6);
        // Dual values equal the primal shadow prices
        for (price, y) in primal.analysis.shadow_prices.iter().zip(&dual.values) {
            assert!((price.value - y).abs() < 1e-6, "{} vs {}", price.value, y);
        }
    }

    #[test]
    fn test_strong_duality_mixed_signs() {
        // min 2x1 + 3x2, x1 + x2 >= 4, x1 <= 3, x2 <= 3
        let mut lp = LinearProgram::with_variable_count(2);
        lp.set_objective(vec![2.0, 3.0], Direction::Minimize);
        lp.add_constraint(vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        lp.add_constraint(vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        lp.add_constraint(vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let result = dual_of(&lp).unwrap();
        let signs: Vec<VariableSign> = result.pairs.iter().map(|p| p.sign).collect();
        assert_eq!(
            signs,
            vec![VariableSign::NonNegative, VariableSign::NonPositive, VariableSign::NonPositive]
        );
        assert!(result.dual.constraints.iter().all(|c| c.op == ConstraintOp::Le));

        let solver = Solver::new();
        let primal = solver.solve(&lp).unwrap().solution;
        let dual = solver.solve(&result.dual).unwrap().solution;
        assert!((primal.objective_value - 9.0).abs() < 1e-6);
        assert!((dual.objective_value - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_sign_rules() {
        let mut lp = LinearProgram::with_variable_count(3);
        lp.set_objective(vec![1.0, -1.0, 2.0], Direction::Maximize);
        lp.set_objective_constant(5.0);
        lp.add_constraint(vec![1.0, 1.0, 1.0], ConstraintOp::Le, 4.0);
        lp.add_constraint(vec![1.0, 0.0, -1.0], ConstraintOp::Ge, 1.0);
        lp.add_constraint(vec![0.0, 1.0, 1.0], ConstraintOp::Eq, 2.0);
        lp.set_sign(1, VariableSign::NonPositive).unwrap();
        lp.set_sign(2, VariableSign::Free).unwrap();

        let result = dual_of(&lp).unwrap();
        let signs: Vec<VariableSign> = result.pairs.iter().map(|p| p.sign).collect();
        assert_eq!(
            signs,
            vec![VariableSign::NonNegative, VariableSign::NonPositive, VariableSign::Free]
        );
        let ops: Vec<ConstraintOp> = result.dual.constraints.iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![ConstraintOp::Ge, ConstraintOp::Le, ConstraintOp::Eq]);
        assert_eq!(result.dual.objective_constant, 5.0);
        assert_eq!(result.constraint_sources[2].primal_variable, "x3");
        assert!(result.dual.to_string().contains("y2 ≤ 0"));
        assert!(result.dual.to_string().contains("y3 livre"));

        // Same shape under minimization: the first two signs swap
        lp.direction = Direction::Minimize;
        let result = dual_of(&lp).unwrap();
        assert_eq!(result.pairs[0].sign, VariableSign::NonPositive);
        assert_eq!(result.pairs[1].sign, VariableSign::NonNegative);
        assert_eq!(result.dual.direction, Direction::Maximize);
        assert_eq!(result.dual.constraints[0].op, ConstraintOp::Le);
        assert_eq!(result.dual.constraints[1].op, ConstraintOp::Ge);
    }

    #[test]
    fn test_shape_checked() {
        let mut lp = LinearProgram::with_variable_count(2);
        lp.add_constraint(vec![1.0], ConstraintOp::Le, 1.0);
        assert!(matches!(dual_of(&lp), Err(ShapeError::ConstraintLength { .. })));
    }
}
