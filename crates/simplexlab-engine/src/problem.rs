use std::collections::BTreeSet;
use std::fmt;

use crate::error::ShapeError;

/// A linear program in its user-facing shape.
///
/// Transformations (standardization, dualization, branching) never mutate a
/// program; they produce a new one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearProgram {
    /// Variable names, index-aligned with every coefficient vector
    pub variables: Vec<String>,
    /// Objective function coefficients
    pub objective: Vec<f64>,
    /// Additive objective constant
    #[cfg_attr(feature = "serde", serde(default))]
    pub objective_constant: f64,
    pub direction: Direction,
    pub constraints: Vec<Constraint>,
    /// Per-variable sign restriction; `None` means all non-negative
    #[cfg_attr(feature = "serde", serde(default))]
    pub signs: Option<Vec<VariableSign>>,
    /// Indices of variables that must take integer values
    #[cfg_attr(feature = "serde", serde(default))]
    pub integer_variables: BTreeSet<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Multiplier that turns an objective in this direction into a maximization.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Maximize => 1.0,
            Direction::Minimize => -1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Maximize => Direction::Minimize,
            Direction::Minimize => Direction::Maximize,
        }
    }

    /// Whether `candidate` beats `incumbent` by more than `tolerance`.
    pub fn improves(self, candidate: f64, incumbent: f64, tolerance: f64) -> bool {
        match self {
            Direction::Maximize => candidate > incumbent + tolerance,
            Direction::Minimize => candidate < incumbent - tolerance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Le => "≤",
            ConstraintOp::Ge => "≥",
            ConstraintOp::Eq => "=",
        }
    }
}

/// Sign restriction of a primal or dual variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VariableSign {
    #[default]
    NonNegative,
    NonPositive,
    Free,
}

impl LinearProgram {
    /// A maximization problem with a zero objective and no constraints.
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: vec![0.0; n],
            objective_constant: 0.0,
            direction: Direction::Maximize,
            constraints: Vec::new(),
            signs: None,
            integer_variables: BTreeSet::new(),
        }
    }

    /// Variables named `x1..xn`.
    pub fn with_variable_count(n: usize) -> Self {
        Self::new((1..=n).map(|i| format!("x{}", i)).collect())
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, direction: Direction) {
        self.objective = coefficients;
        self.direction = direction;
    }

    pub fn set_objective_constant(&mut self, constant: f64) {
        self.objective_constant = constant;
    }

    pub fn add_constraint(&mut self, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            coefficients,
            op,
            rhs,
        });
    }

    pub fn set_sign(&mut self, variable: usize, sign: VariableSign) -> Result<(), ShapeError> {
        let n = self.num_variables();
        if variable >= n {
            return Err(ShapeError::VariableIndex {
                index: variable,
                count: n,
            });
        }
        let signs = self.signs.get_or_insert_with(|| vec![VariableSign::NonNegative; n]);
        signs[variable] = sign;
        Ok(())
    }

    pub fn set_integer(&mut self, variable: usize) {
        self.integer_variables.insert(variable);
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn sign(&self, variable: usize) -> VariableSign {
        self.signs
            .as_ref()
            .and_then(|s| s.get(variable).copied())
            .unwrap_or_default()
    }

    pub fn is_integer(&self, variable: usize) -> bool {
        self.integer_variables.contains(&variable)
    }

    /// Check that every coefficient vector matches the variable count.
    pub fn validate(&self) -> Result<(), ShapeError> {
        let expected = self.num_variables();
        if self.objective.len() != expected {
            return Err(ShapeError::ObjectiveLength {
                expected,
                found: self.objective.len(),
            });
        }
        for (index, c) in self.constraints.iter().enumerate() {
            if c.coefficients.len() != expected {
                return Err(ShapeError::ConstraintLength {
                    index,
                    expected,
                    found: c.coefficients.len(),
                });
            }
        }
        if let Some(signs) = &self.signs {
            if signs.len() != expected {
                return Err(ShapeError::SignLength {
                    expected,
                    found: signs.len(),
                });
            }
        }
        if let Some(&index) = self.integer_variables.iter().find(|&&i| i >= expected) {
            return Err(ShapeError::IntegerIndex {
                index,
                count: expected,
            });
        }
        Ok(())
    }

    /// Objective value (constant included) at the given point.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective_constant + dot(&self.objective, values)
    }

    /// Whether the point satisfies every constraint and sign restriction.
    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        let signs_ok = values.iter().enumerate().all(|(j, &v)| match self.sign(j) {
            VariableSign::NonNegative => v >= -tolerance,
            VariableSign::NonPositive => v <= tolerance,
            VariableSign::Free => true,
        });
        signs_ok && self.constraints.iter().all(|c| c.is_satisfied_by(values, tolerance))
    }
}

impl Constraint {
    pub fn lhs(&self, values: &[f64]) -> f64 {
        dot(&self.coefficients, values)
    }

    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        match self.op {
            ConstraintOp::Le => lhs <= self.rhs + tolerance,
            ConstraintOp::Ge => lhs >= self.rhs - tolerance,
            ConstraintOp::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl fmt::Display for LinearProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format::format_linear_program(self))
    }
}
