mod branch_and_bound;
mod dual_simplex;
mod duality;
mod error;
pub mod format;
pub mod matrix;
mod problem;
mod simplex;
mod solution;
mod standard_form;
mod step;
mod tableau;

#[cfg(feature = "wasm")]
pub mod wasm;

/// Pivot, singularity and feasibility tolerance shared by every solver.
pub const EPSILON: f64 = 1e-9;

pub use branch_and_bound::{
    most_fractional, Branch, BranchAndBound, BranchAndBoundResult, BranchDirection, BranchNode,
    NodeStatus,
};
pub use dual_simplex::{is_dual_simplex_candidate, needs_dual_simplex, RhsChange};
pub use duality::{
    dual_constraint_op, dual_of, dual_variable_sign, DualConstraintSource, DualPair, DualProgram,
};
pub use error::{EngineError, ShapeError};
pub use format::format_linear_program;
pub use matrix::Matrix;
pub use problem::{Constraint, ConstraintOp, Direction, LinearProgram, VariableSign};
pub use simplex::{SolveOutcome, Solver};
pub use solution::{Analysis, ReducedCost, ShadowPrice, Solution, SolutionStatus};
pub use standard_form::{standardize, StandardForm, Substitution};
pub use step::{final_status, PivotPosition, SimplexStep, StepStatus};
pub use tableau::{Tableau, TableauKind};
