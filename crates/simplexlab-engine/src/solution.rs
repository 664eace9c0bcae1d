use crate::matrix::{self, Matrix};
use crate::problem::{ConstraintOp, Direction, LinearProgram};
use crate::standard_form::StandardForm;
use crate::step::{SimplexStep, StepStatus};
use crate::tableau::{slack_coefficient, slack_columns, Tableau, TableauKind};

/// The result of solving an LP problem
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each original variable
    pub values: Vec<f64>,
    /// Optimal objective value in the original direction, constant included
    pub objective_value: f64,
    /// Detailed analysis
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
}

/// Detailed analysis of the optimal solution
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Analysis {
    /// Shadow prices (dual values) for each original constraint
    /// Indicates how much the objective would change per unit of RHS
    pub shadow_prices: Vec<ShadowPrice>,

    /// Reduced costs for each tableau column
    pub reduced_costs: Vec<ReducedCost>,

    /// Indices of constraints that hold with equality at the optimum
    pub binding_constraints: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShadowPrice {
    /// Constraint index in the original program
    pub constraint: usize,
    /// Shadow price value
    pub value: f64,
    /// Interpretation
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReducedCost {
    /// Column name in the standardized tableau
    pub variable: String,
    /// Current value in solution
    pub value: f64,
    /// Objective-row coefficient
    pub reduced_cost: f64,
    /// Is this variable in the basis?
    pub is_basic: bool,
}

impl Solution {
    pub fn infeasible() -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            values: Vec::new(),
            objective_value: f64::NAN,
            analysis: Analysis::default(),
        }
    }

    pub fn unbounded(direction: Direction) -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            values: Vec::new(),
            objective_value: direction.sign() * f64::INFINITY,
            analysis: Analysis::default(),
        }
    }

    /// Build the solution described by the last step of a primal trace.
    pub fn from_steps(
        original: &LinearProgram,
        standard: &StandardForm,
        steps: &[SimplexStep],
        tolerance: f64,
    ) -> Self {
        match steps.last() {
            Some(step) if step.status == StepStatus::Optimal => {
                Self::from_tableau(original, standard, &step.tableau, tolerance)
            }
            Some(step) if step.status == StepStatus::Unbounded => {
                Self::unbounded(standard.original_direction)
            }
            _ => Self::infeasible(),
        }
    }

    /// Read an optimal phase-two tableau back into original terms.
    pub fn from_tableau(
        original: &LinearProgram,
        standard: &StandardForm,
        tableau: &Tableau,
        tolerance: f64,
    ) -> Self {
        let column_values = tableau.values();
        let decision_values = &column_values[..tableau.decision_count];
        let values = standard.recover_values(decision_values);
        let objective_value = match tableau.kind {
            TableauKind::PhaseTwo { .. } => tableau.objective_value,
            TableauKind::PhaseOne { .. } => original.evaluate(&values),
        };

        let analysis = analyze(original, standard, tableau, &values, tolerance);

        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            analysis,
        }
    }
}

fn analyze(
    original: &LinearProgram,
    standard: &StandardForm,
    tableau: &Tableau,
    values: &[f64],
    tolerance: f64,
) -> Analysis {
    let column_values = tableau.values();
    let reduced_costs = (0..tableau.num_columns())
        .map(|j| {
            let is_basic = tableau.basic.contains(&j);
            ReducedCost {
                variable: tableau.column_name(j).to_string(),
                value: column_values[j],
                reduced_cost: if is_basic { 0.0 } else { tableau.reduced_cost(j) },
                is_basic,
            }
        })
        .collect();

    let binding_constraints = original
        .constraints
        .iter()
        .enumerate()
        .filter(|(_, c)| c.op == ConstraintOp::Eq || (c.lhs(values) - c.rhs).abs() <= tolerance)
        .map(|(i, _)| i)
        .collect();

    let duals = standard_duals(standard, tableau).unwrap_or_default();
    let shadow_prices = (0..original.num_constraints())
        .map(|i| {
            let standard_dual = duals.get(i).copied().unwrap_or(0.0);
            let flip = if standard.negated_constraints[i] { -1.0 } else { 1.0 };
            let value = standard.original_direction.sign() * flip * standard_dual;
            ShadowPrice {
                constraint: i,
                value,
                interpretation: interpret(value, tolerance),
            }
        })
        .collect();

    Analysis {
        shadow_prices,
        reduced_costs,
        binding_constraints,
    }
}

fn interpret(value: f64, tolerance: f64) -> String {
    if value.abs() < tolerance {
        "Non-binding constraint".to_string()
    } else if value > 0.0 {
        format!("Increasing RHS by 1 unit would increase the objective by {:.4}", value)
    } else {
        format!("Increasing RHS by 1 unit would decrease the objective by {:.4}", -value)
    }
}

/// Full constraint matrix `[A | S]` of the standardized program, one column
/// per tableau column before artificials, restricted to the given rows.
pub(crate) fn standard_matrix(standard: &StandardForm, rows: &[usize]) -> (Matrix, Vec<f64>) {
    let program = &standard.program;
    let slacks = slack_columns(program);
    let width = program.num_variables() + slacks.iter().flatten().count();

    let mut a = Vec::with_capacity(rows.len());
    let mut b = Vec::with_capacity(rows.len());
    for &i in rows {
        let c = &program.constraints[i];
        let mut row = c.coefficients.clone();
        row.resize(width, 0.0);
        if let Some(s) = slacks[i] {
            row[s] = slack_coefficient(c.op);
        }
        a.push(row);
        b.push(c.rhs);
    }
    (a, b)
}

/// Dual values `y = c_B B⁻¹` for every standardized constraint, in
/// maximization sense. Rows dropped as redundant get zero.
pub(crate) fn standard_duals(standard: &StandardForm, tableau: &Tableau) -> Option<Vec<f64>> {
    let count = standard.program.num_constraints();
    if tableau.row_origins.iter().any(|&i| i >= count) {
        return None;
    }
    let (a, _) = standard_matrix(standard, &tableau.row_origins);
    let width = a.first().map_or(0, Vec::len);
    if tableau.basic.iter().any(|&j| j >= width) {
        return None;
    }
    let basis = matrix::extract_basis_matrices(&a, &tableau.basic, &[]).ok()?;
    let inverse = matrix::invert(&basis.basic)?;

    let objective = &standard.program.objective;
    let c_b: Vec<f64> = tableau
        .basic
        .iter()
        .map(|&j| objective.get(j).copied().unwrap_or(0.0))
        .collect();
    let y = matrix::multiply(&[c_b], &inverse).ok()?.pop()?;

    let mut duals = vec![0.0; standard.program.num_constraints()];
    for (&origin, value) in tableau.row_origins.iter().zip(y) {
        duals[origin] = value;
    }
    Some(duals)
}
