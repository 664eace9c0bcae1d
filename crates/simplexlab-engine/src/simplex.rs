use log::{debug, trace};

use crate::error::EngineError;
use crate::format::format_number;
use crate::problem::LinearProgram;
use crate::solution::Solution;
use crate::standard_form::{standardize, StandardForm};
use crate::step::{SimplexStep, StepStatus};
use crate::tableau::{slack_coefficient, slack_columns, Tableau, TableauKind};
use crate::EPSILON;

/// Two-phase simplex solver that records every step it takes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solver {
    /// Maximum pivots per phase before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Run phase one even when the slack basis is already feasible
    force_phase_one: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: EPSILON,
            force_phase_one: false,
        }
    }
}

/// Everything produced by one solve of a raw program
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveOutcome {
    pub standard: StandardForm,
    /// Full trace; the last step always has a terminal status
    pub steps: Vec<SimplexStep>,
    pub solution: Solution,
}

enum PhaseResult {
    Optimal,
    /// No row limits the entering column
    Unbounded(usize),
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_forced_phase_one(mut self, force: bool) -> Self {
        self.force_phase_one = force;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Standardize and solve a program, recording the full trace.
    pub fn solve(&self, problem: &LinearProgram) -> Result<SolveOutcome, EngineError> {
        let standard = standardize(problem)?;
        debug!(
            "solving {} variables, {} constraints ({} standardized columns)",
            problem.num_variables(),
            problem.num_constraints(),
            standard.program.num_variables()
        );

        let initial = self.build_tableau(&standard, self.force_phase_one);
        let mut steps = vec![SimplexStep::new(
            &initial,
            StepStatus::StandardForm,
            standard.explanation.join("\n"),
        )];
        steps.extend(self.solve_standard(&standard, self.force_phase_one)?);

        let solution = Solution::from_steps(problem, &standard, &steps, self.tolerance);
        Ok(SolveOutcome {
            standard,
            steps,
            solution,
        })
    }

    /// Run both phases on an already standardized program.
    pub fn solve_standard(
        &self,
        standard: &StandardForm,
        force_phase_one: bool,
    ) -> Result<Vec<SimplexStep>, EngineError> {
        let mut steps = Vec::new();
        let mut tableau = self.build_tableau(standard, force_phase_one);

        if tableau.is_phase_one() {
            if !self.phase_one(&mut tableau, &mut steps)? {
                return Ok(steps);
            }
            tableau = self.start_phase_two(tableau, standard, &mut steps);
        } else {
            steps.push(SimplexStep::new(
                &tableau,
                StepStatus::Initial,
                format!(
                    "Initial tableau: the slack basis {{{}}} is feasible, Z = {}",
                    basis_names(&tableau),
                    format_number(tableau.objective_value)
                ),
            ));
        }

        self.phase_two(&mut tableau, &mut steps)?;
        Ok(steps)
    }

    fn build_tableau(&self, standard: &StandardForm, force_phase_one: bool) -> Tableau {
        let program = &standard.program;
        let n = program.num_variables();
        let m = program.num_constraints();
        let slacks = slack_columns(program);
        let n_slack = slacks.iter().flatten().count();

        // A row keeps its slack as initial basic variable only if the slack
        // ends up with coefficient +1 once the RHS is made non-negative.
        let row_sign: Vec<f64> = program
            .constraints
            .iter()
            .map(|c| if c.rhs < 0.0 { -1.0 } else { 1.0 })
            .collect();
        let needs_artificial: Vec<bool> = program
            .constraints
            .iter()
            .zip(&slacks)
            .zip(&row_sign)
            .map(|((c, slack), sign)| slack.is_none() || slack_coefficient(c.op) * sign < 0.0)
            .collect();
        let n_artificial = needs_artificial.iter().filter(|&&a| a).count();

        let total_cols = n + n_slack + n_artificial;
        let mut matrix = vec![vec![0.0; total_cols + 1]; m + 1];
        let mut basic = vec![0; m];
        let mut column_names = program.variables.clone();
        column_names.extend(
            slacks
                .iter()
                .enumerate()
                .filter(|(_, s)| s.is_some())
                .map(|(i, _)| format!("s{}", i + 1)),
        );

        let mut artificial_columns = Vec::with_capacity(n_artificial);
        let mut artificial_idx = n + n_slack;
        for (i, c) in program.constraints.iter().enumerate() {
            let row = &mut matrix[i + 1];
            let sign = row_sign[i];
            for (j, &coef) in c.coefficients.iter().enumerate() {
                row[j] = sign * coef;
            }
            row[total_cols] = sign * c.rhs;

            if let Some(s) = slacks[i] {
                row[s] = sign * slack_coefficient(c.op);
                basic[i] = s;
            }
            if needs_artificial[i] {
                row[artificial_idx] = 1.0;
                basic[i] = artificial_idx;
                artificial_columns.push(artificial_idx);
                column_names.push(format!("a{}", i + 1));
                artificial_idx += 1;
            }
        }

        let kind = if n_artificial > 0 || force_phase_one {
            for &a in &artificial_columns {
                matrix[0][a] = 1.0;
            }
            TableauKind::PhaseOne { artificial_columns }
        } else {
            for (j, &c) in program.objective.iter().enumerate() {
                matrix[0][j] = -c;
            }
            TableauKind::PhaseTwo {
                direction: standard.original_direction,
            }
        };

        let non_basic = (0..total_cols).filter(|j| !basic.contains(j)).collect();
        let mut tableau = Tableau {
            matrix,
            basic,
            non_basic,
            column_names,
            decision_count: n,
            row_origins: (0..m).collect(),
            objective_constant: program.objective_constant,
            objective_value: 0.0,
            kind,
        };
        tableau.refresh_objective();
        tableau
    }

    /// Minimize the sum of artificial variables. Returns `false` after
    /// recording an `infeasible` step when that sum cannot reach zero.
    fn phase_one(
        &self,
        tableau: &mut Tableau,
        steps: &mut Vec<SimplexStep>,
    ) -> Result<bool, EngineError> {
        let artificial = tableau.artificial_columns().to_vec();
        if !artificial.is_empty() {
            let names: Vec<&str> = artificial.iter().map(|&a| tableau.column_name(a)).collect();
            steps.push(SimplexStep::new(
                tableau,
                StepStatus::ArtificialVars,
                format!(
                    "Added artificial variables {} to obtain an initial basis",
                    names.join(", ")
                ),
            ));
        }

        // Price out basic artificials so the objective row is canonical
        for row in 1..=tableau.num_rows() {
            if tableau.is_artificial(tableau.basic[row - 1]) {
                let source = tableau.matrix[row].clone();
                for (value, s) in tableau.matrix[0].iter_mut().zip(&source) {
                    *value -= s;
                }
            }
        }
        tableau.refresh_objective();

        let explanation = if artificial.is_empty() {
            "Phase I: the slack basis is already feasible, W = 0".to_string()
        } else {
            format!(
                "Phase I: minimize W = sum of artificial variables, currently W = {}",
                format_number(tableau.objective_value)
            )
        };
        steps.push(SimplexStep::new(tableau, StepStatus::Phase1Start, explanation));
        debug!("phase one started with {} artificial variables", artificial.len());

        let result = self.iterate(tableau, steps)?;
        let w = tableau.objective_value;
        if matches!(result, PhaseResult::Unbounded(_)) || w > self.tolerance {
            debug!("phase one ended with W = {}: infeasible", w);
            steps.push(SimplexStep::new(
                tableau,
                StepStatus::Infeasible,
                format!(
                    "Infeasible: the artificial variables cannot all reach zero (W = {})",
                    format_number(w)
                ),
            ));
            return Ok(false);
        }
        Ok(true)
    }

    /// Drop artificial columns and restore the real objective row.
    fn start_phase_two(
        &self,
        mut tableau: Tableau,
        standard: &StandardForm,
        steps: &mut Vec<SimplexStep>,
    ) -> Tableau {
        let artificial = tableau.artificial_columns().to_vec();
        let mut notes = Vec::new();

        // Artificials still basic sit at zero; pivot them out or drop the row.
        let mut redundant = Vec::new();
        for row in 1..=tableau.num_rows() {
            let b = tableau.basic[row - 1];
            if !artificial.contains(&b) {
                continue;
            }
            let replacement = (0..tableau.num_columns())
                .find(|j| !artificial.contains(j) && tableau.matrix[row][*j].abs() > self.tolerance);
            match replacement {
                Some(col) => {
                    notes.push(format!(
                        "{} replaces {} in the basis at zero level",
                        tableau.column_name(col),
                        tableau.column_name(b)
                    ));
                    tableau.pivot(row, col);
                }
                None => {
                    notes.push(format!(
                        "constraint {} is redundant and is removed",
                        tableau.row_origins[row - 1] + 1
                    ));
                    redundant.push(row);
                }
            }
        }
        for &row in redundant.iter().rev() {
            tableau.remove_row(row);
        }
        tableau.remove_columns(&artificial);
        tableau.kind = TableauKind::PhaseTwo {
            direction: standard.original_direction,
        };

        let program = &standard.program;
        let rhs = tableau.rhs_column();
        tableau.matrix[0] = vec![0.0; rhs + 1];
        for (j, &c) in program.objective.iter().enumerate() {
            tableau.matrix[0][j] = -c;
        }
        for row in 1..=tableau.num_rows() {
            let b = tableau.basic[row - 1];
            let factor = tableau.matrix[0][b];
            if factor == 0.0 {
                continue;
            }
            let source = tableau.matrix[row].clone();
            for (value, s) in tableau.matrix[0].iter_mut().zip(&source) {
                *value -= factor * s;
            }
            tableau.matrix[0][b] = 0.0;
        }
        tableau.refresh_objective();

        let mut explanation = format!(
            "Phase II: artificial variables removed, original objective restored with basis {{{}}}, Z = {}",
            basis_names(&tableau),
            format_number(tableau.objective_value)
        );
        if !notes.is_empty() {
            explanation.push_str(&format!(" ({})", notes.join("; ")));
        }
        debug!("phase two started, Z = {}", tableau.objective_value);
        steps.push(SimplexStep::new(&tableau, StepStatus::Phase2Start, explanation));
        tableau
    }

    fn phase_two(
        &self,
        tableau: &mut Tableau,
        steps: &mut Vec<SimplexStep>,
    ) -> Result<(), EngineError> {
        match self.iterate(tableau, steps)? {
            PhaseResult::Optimal => {
                debug!("optimal, Z = {}", tableau.objective_value);
                steps.push(SimplexStep::new(
                    tableau,
                    StepStatus::Optimal,
                    format!(
                        "Optimal: no reduced cost is negative, Z = {}",
                        format_number(tableau.objective_value)
                    ),
                ));
            }
            PhaseResult::Unbounded(col) => {
                debug!("unbounded along column {}", col);
                let mut step = SimplexStep::new(
                    tableau,
                    StepStatus::Unbounded,
                    format!(
                        "Unbounded: {} can enter but no constraint limits its increase",
                        tableau.column_name(col)
                    ),
                );
                step.entering = Some(col);
                steps.push(step);
            }
        }
        Ok(())
    }

    /// Pivot until no column improves the objective row.
    fn iterate(
        &self,
        tableau: &mut Tableau,
        steps: &mut Vec<SimplexStep>,
    ) -> Result<PhaseResult, EngineError> {
        for _ in 0..self.max_iterations {
            let Some(col) = self.find_pivot_column(tableau) else {
                return Ok(PhaseResult::Optimal);
            };
            let Some(row) = self.find_pivot_row(tableau, col) else {
                return Ok(PhaseResult::Unbounded(col));
            };

            let leaving = tableau.basic[row - 1];
            let reduced = tableau.reduced_cost(col);
            let element = tableau.matrix[row][col];
            let ratio = tableau.rhs(row) / element;
            let explanation = format!(
                "{} enters (reduced cost {}), {} leaves (ratio {}), pivot {} at row {}",
                tableau.column_name(col),
                format_number(reduced),
                tableau.column_name(leaving),
                format_number(ratio),
                format_number(element),
                row
            );

            tableau.pivot(row, col);
            trace!("pivot row {} col {}: {}", row, col, explanation);
            steps.push(SimplexStep::pivoted(
                tableau,
                StepStatus::Iteration,
                col,
                leaving,
                row,
                explanation,
            ));
        }
        Err(EngineError::IterationLimit(self.max_iterations))
    }

    /// Lowest-index column with a negative objective-row entry.
    ///
    /// Together with the lowest-basic-index ratio tie break this is Bland's
    /// rule, so degenerate vertices cannot cycle.
    fn find_pivot_column(&self, tableau: &Tableau) -> Option<usize> {
        (0..tableau.num_columns()).find(|&j| tableau.reduced_cost(j) < -self.tolerance)
    }

    /// Minimum ratio over rows with a positive entry, lowest basic index on ties.
    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for row in 1..=tableau.num_rows() {
            let val = tableau.matrix[row][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.rhs(row).max(0.0) / val;
            let better = match min_row {
                None => true,
                Some(best) => {
                    ratio < min_ratio - self.tolerance
                        || ((ratio - min_ratio).abs() <= self.tolerance
                            && tableau.basic[row - 1] < tableau.basic[best - 1])
                }
            };
            if better {
                min_ratio = ratio;
                min_row = Some(row);
            }
        }

        min_row
    }
}

pub(crate) fn basis_names(tableau: &Tableau) -> String {
    tableau
        .basic
        .iter()
        .map(|&b| tableau.column_name(b))
        .collect::<Vec<_>>()
        .join(", ")
}
