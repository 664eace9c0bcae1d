//! Conversion of an arbitrary linear program to the canonical maximization
//! form the simplex solvers work on.

use std::collections::BTreeSet;

use crate::error::ShapeError;
use crate::problem::{Constraint, ConstraintOp, Direction, LinearProgram, VariableSign};

/// How an original variable is expressed in standardized columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Substitution {
    /// `x = x'`
    Direct(usize),
    /// `x = -x'` for a non-positive variable
    Negated(usize),
    /// `x = x⁺ - x⁻` for a free variable
    Split { positive: usize, negative: usize },
}

/// A standardized program plus everything needed to translate results back.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StandardForm {
    /// Maximization, only `≤`/`=` constraints, all variables non-negative.
    /// Its objective constant is the original constant in maximization sense.
    pub program: LinearProgram,
    /// Human-readable account of every rewrite applied
    pub explanation: Vec<String>,
    pub original_direction: Direction,
    /// Objective constant of the original program, untouched
    pub objective_constant: f64,
    /// One entry per original variable
    pub substitutions: Vec<Substitution>,
    /// Whether each original constraint was multiplied by -1
    pub negated_constraints: Vec<bool>,
}

pub fn standardize(lp: &LinearProgram) -> Result<StandardForm, ShapeError> {
    lp.validate()?;

    let mut explanation = Vec::new();
    let mut variables = Vec::new();
    let mut substitutions = Vec::with_capacity(lp.num_variables());

    for (j, name) in lp.variables.iter().enumerate() {
        match lp.sign(j) {
            VariableSign::NonNegative => {
                substitutions.push(Substitution::Direct(variables.len()));
                variables.push(name.clone());
            }
            VariableSign::NonPositive => {
                let replacement = format!("{}'", name);
                explanation.push(format!(
                    "{} is non-positive: substitute {} = -{} with {} ≥ 0",
                    name, name, replacement, replacement
                ));
                substitutions.push(Substitution::Negated(variables.len()));
                variables.push(replacement);
            }
            VariableSign::Free => {
                let positive = format!("{}⁺", name);
                let negative = format!("{}⁻", name);
                explanation.push(format!(
                    "{} is unrestricted: substitute {} = {} - {} with both parts ≥ 0",
                    name, name, positive, negative
                ));
                substitutions.push(Substitution::Split {
                    positive: variables.len(),
                    negative: variables.len() + 1,
                });
                variables.push(positive);
                variables.push(negative);
            }
        }
    }

    let rewrite = |coefficients: &[f64]| -> Vec<f64> {
        let mut out = vec![0.0; variables.len()];
        for (&c, sub) in coefficients.iter().zip(&substitutions) {
            match *sub {
                Substitution::Direct(col) => out[col] = c,
                Substitution::Negated(col) => out[col] = -c,
                Substitution::Split { positive, negative } => {
                    out[positive] = c;
                    out[negative] = -c;
                }
            }
        }
        out
    };

    let sign = lp.direction.sign();
    if lp.direction == Direction::Minimize {
        explanation.push(
            "Minimization: negate the objective and maximize; the reported optimum is negated back"
                .to_string(),
        );
    }
    let objective: Vec<f64> = rewrite(&lp.objective).into_iter().map(|c| sign * c).collect();

    let mut constraints = Vec::with_capacity(lp.num_constraints());
    let mut negated_constraints = Vec::with_capacity(lp.num_constraints());
    for (i, c) in lp.constraints.iter().enumerate() {
        let coefficients = rewrite(&c.coefficients);
        match c.op {
            ConstraintOp::Ge => {
                explanation.push(format!(
                    "Constraint {} is ≥: multiply both sides by -1 to obtain ≤",
                    i + 1
                ));
                constraints.push(Constraint {
                    coefficients: coefficients.into_iter().map(|a| -a).collect(),
                    op: ConstraintOp::Le,
                    rhs: -c.rhs,
                });
                negated_constraints.push(true);
            }
            ConstraintOp::Le | ConstraintOp::Eq => {
                constraints.push(Constraint {
                    coefficients,
                    op: c.op,
                    rhs: c.rhs,
                });
                negated_constraints.push(false);
            }
        }
    }

    if lp.objective_constant != 0.0 {
        explanation.push(format!(
            "Objective constant {} is kept aside and added to the reported optimum",
            lp.objective_constant
        ));
    }
    if explanation.is_empty() {
        explanation.push("The problem is already in standard form".to_string());
    }

    let integer_variables: BTreeSet<usize> = lp
        .integer_variables
        .iter()
        .filter_map(|&j| match substitutions[j] {
            Substitution::Direct(col) | Substitution::Negated(col) => Some(col),
            Substitution::Split { .. } => None,
        })
        .collect();

    let program = LinearProgram {
        variables,
        objective,
        objective_constant: sign * lp.objective_constant,
        direction: Direction::Maximize,
        constraints,
        signs: None,
        integer_variables,
    };

    Ok(StandardForm {
        program,
        explanation,
        original_direction: lp.direction,
        objective_constant: lp.objective_constant,
        substitutions,
        negated_constraints,
    })
}

impl StandardForm {
    /// Map standardized column values back onto the original variables.
    pub fn recover_values(&self, standard_values: &[f64]) -> Vec<f64> {
        let value = |col: usize| standard_values.get(col).copied().unwrap_or(0.0);
        self.substitutions
            .iter()
            .map(|sub| match *sub {
                Substitution::Direct(col) => value(col),
                Substitution::Negated(col) => -value(col),
                Substitution::Split { positive, negative } => value(positive) - value(negative),
            })
            .collect()
    }

    /// Right-hand side of original constraint `index` as seen by the standardized program.
    pub fn standard_rhs(&self, index: usize, original_rhs: f64) -> f64 {
        if self.negated_constraints.get(index).copied().unwrap_or(false) {
            -original_rhs
        } else {
            original_rhs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_problem() -> LinearProgram {
        // min x1 - 2x2 + x3 + 4
        // s.t. x1 + x2 >= 2
        //      x2 - x3 <= 5
        //      x1 + x3 = 3
        //      x2 free, x3 <= 0
        let mut lp = LinearProgram::with_variable_count(3);
        lp.set_objective(vec![1.0, -2.0, 1.0], Direction::Minimize);
        lp.set_objective_constant(4.0);
        lp.add_constraint(vec![1.0, 1.0, 0.0], ConstraintOp::Ge, 2.0);
        lp.add_constraint(vec![0.0, 1.0, -1.0], ConstraintOp::Le, 5.0);
        lp.add_constraint(vec![1.0, 0.0, 1.0], ConstraintOp::Eq, 3.0);
        lp.set_sign(1, VariableSign::Free).unwrap();
        lp.set_sign(2, VariableSign::NonPositive).unwrap();
        lp
    }

    #[test]
    fn test_standardize_mixed() {
        let lp = mixed_problem();
        let sf = standardize(&lp).unwrap();
        let p = &sf.program;

        assert_eq!(p.direction, Direction::Maximize);
        assert_eq!(p.variables, vec!["x1", "x2⁺", "x2⁻", "x3'"]);
        assert_eq!(p.objective, vec![-1.0, 2.0, -2.0, 1.0]);
        assert_eq!(p.objective_constant, -4.0);
        assert_eq!(sf.objective_constant, 4.0);

        assert_eq!(p.constraints[0].op, ConstraintOp::Le);
        assert_eq!(p.constraints[0].coefficients, vec![-1.0, -1.0, 1.0, 0.0]);
        assert_eq!(p.constraints[0].rhs, -2.0);
        assert_eq!(p.constraints[1].coefficients, vec![0.0, 1.0, -1.0, 1.0]);
        assert_eq!(p.constraints[2].op, ConstraintOp::Eq);
        assert_eq!(p.constraints[2].coefficients, vec![1.0, 0.0, 0.0, -1.0]);
        assert_eq!(sf.negated_constraints, vec![true, false, false]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_input_not_mutated() {
        let lp = mixed_problem();
        let before = lp.clone();
        let _ = standardize(&lp).unwrap();
        assert_eq!(lp, before);
    }

    #[test]
    fn test_recover_values() {
        let sf = standardize(&mixed_problem()).unwrap();
        let original = sf.recover_values(&[1.0, 0.5, 2.0, 3.0]);
        assert_eq!(original, vec![1.0, -1.5, -3.0]);
    }

    #[test]
    fn test_idempotent_on_standard_input() {
        let mut lp = LinearProgram::with_variable_count(2);
        lp.set_objective(vec![3.0, 2.0], Direction::Maximize);
        lp.add_constraint(vec![2.0, 1.0], ConstraintOp::Le, 10.0);
        lp.add_constraint(vec![1.0, 1.0], ConstraintOp::Eq, 5.0);

        let once = standardize(&lp).unwrap();
        let twice = standardize(&once.program).unwrap();
        assert_eq!(once.program, twice.program);
        assert_eq!(once.program.constraints, lp.constraints);
        assert_eq!(twice.explanation, vec!["The problem is already in standard form"]);
    }

    #[test]
    fn test_shape_error() {
        let mut lp = LinearProgram::with_variable_count(2);
        lp.add_constraint(vec![1.0, 2.0, 3.0], ConstraintOp::Le, 1.0);
        assert!(matches!(standardize(&lp), Err(ShapeError::ConstraintLength { .. })));
    }

    #[test]
    fn test_integer_indices_follow_columns() {
        let mut lp = LinearProgram::with_variable_count(3);
        lp.set_sign(0, VariableSign::Free).unwrap();
        lp.set_integer(1);
        lp.set_integer(0);
        let sf = standardize(&lp).unwrap();
        // x1 splits into columns 0 and 1, so x2 lands on column 2
        assert_eq!(sf.program.integer_variables.iter().copied().collect::<Vec<_>>(), vec![2]);
    }
}
