//! Depth-first branch-and-bound over LP relaxations.

use log::{debug, trace};

use crate::error::EngineError;
use crate::problem::{ConstraintOp, LinearProgram};
use crate::simplex::Solver;
use crate::solution::{Solution, SolutionStatus};
use crate::step::SimplexStep;

/// Status of a node in the search tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeStatus {
    /// Waiting to be processed
    Pending,
    /// Relaxation optimum satisfies every integrality marker
    SolvedInteger,
    /// Relaxation optimum has a fractional integer variable; the node branched
    SolvedFractional,
    /// Relaxation is infeasible
    Infeasible,
    /// Relaxation has no finite optimum
    Unbounded,
    /// Bound cannot beat the incumbent
    Pruned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BranchDirection {
    /// `x ≤ floor(value)`
    Down,
    /// `x ≥ ceil(value)`
    Up,
}

/// The bound a child adds on top of its parent's constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Branch {
    pub variable: usize,
    /// Fractional value in the parent relaxation
    pub value: f64,
    pub direction: BranchDirection,
    pub bound: f64,
}

impl Branch {
    pub fn down(variable: usize, value: f64) -> Self {
        Self {
            variable,
            value,
            direction: BranchDirection::Down,
            bound: value.floor(),
        }
    }

    pub fn up(variable: usize, value: f64) -> Self {
        Self {
            variable,
            value,
            direction: BranchDirection::Up,
            bound: value.ceil(),
        }
    }

    /// Append the branching constraint to a copy of `program`.
    fn apply(&self, program: &LinearProgram) -> LinearProgram {
        let mut child = program.clone();
        let mut coefficients = vec![0.0; program.num_variables()];
        coefficients[self.variable] = 1.0;
        let op = match self.direction {
            BranchDirection::Down => ConstraintOp::Le,
            BranchDirection::Up => ConstraintOp::Ge,
        };
        child.add_constraint(coefficients, op, self.bound);
        child
    }
}

/// A node of the search tree, stored in an arena indexed by `id`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub depth: usize,
    /// Relaxation solved at this node; owns its constraint list
    pub program: LinearProgram,
    /// Bound added relative to the parent, `None` at the root
    pub branch: Option<Branch>,
    pub status: NodeStatus,
    pub relaxation: Option<Solution>,
    pub steps: Vec<SimplexStep>,
}

impl BranchNode {
    fn new(id: usize, parent: Option<usize>, depth: usize, program: LinearProgram, branch: Option<Branch>) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
            depth,
            program,
            branch,
            status: NodeStatus::Pending,
            relaxation: None,
            steps: Vec::new(),
        }
    }

    /// Relaxation objective, if the node was solved to optimality.
    pub fn bound(&self) -> Option<f64> {
        self.relaxation
            .as_ref()
            .filter(|s| s.status == SolutionStatus::Optimal)
            .map(|s| s.objective_value)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchAndBoundResult {
    pub status: SolutionStatus,
    /// Best integer solution found
    pub best: Option<Solution>,
    pub best_node: Option<usize>,
    /// Every node created, root first
    pub nodes: Vec<BranchNode>,
}

impl BranchAndBoundResult {
    pub fn count(&self, status: NodeStatus) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }
}

/// Branch-and-bound driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchAndBound {
    solver: Solver,
    max_nodes: usize,
    /// Distance from the nearest integer still accepted as integral
    integrality_tolerance: f64,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self::new(Solver::default())
    }
}

impl BranchAndBound {
    pub fn new(solver: Solver) -> Self {
        Self {
            solver,
            max_nodes: 10000,
            integrality_tolerance: 1e-6,
        }
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    pub fn with_integrality_tolerance(mut self, tol: f64) -> Self {
        self.integrality_tolerance = tol;
        self
    }

    pub fn solve(&self, problem: &LinearProgram) -> Result<BranchAndBoundResult, EngineError> {
        problem.validate()?;
        let tol = self.solver.tolerance();
        let direction = problem.direction;

        let mut nodes = vec![BranchNode::new(0, None, 0, problem.clone(), None)];
        let mut stack = vec![0];
        let mut incumbent: Option<(f64, usize)> = None;

        while let Some(id) = stack.pop() {
            if let (Some(parent), Some((best, _))) = (nodes[id].parent, incumbent) {
                if let Some(bound) = nodes[parent].bound() {
                    if !direction.improves(bound, best, tol) {
                        trace!("node {} pruned before solving, parent bound {}", id, bound);
                        nodes[id].status = NodeStatus::Pruned;
                        continue;
                    }
                }
            }

            let outcome = self.solver.solve(&nodes[id].program)?;
            let solution = outcome.solution;
            let node = &mut nodes[id];
            node.steps = outcome.steps;

            let mut fractional = None;
            let status = match solution.status {
                SolutionStatus::Infeasible => NodeStatus::Infeasible,
                SolutionStatus::Unbounded => NodeStatus::Unbounded,
                SolutionStatus::Optimal => {
                    let z = solution.objective_value;
                    match incumbent {
                        Some((best, _)) if !direction.improves(z, best, tol) => NodeStatus::Pruned,
                        _ => match most_fractional(
                            problem,
                            &solution.values,
                            self.integrality_tolerance,
                        ) {
                            None => {
                                debug!("node {} integer feasible, Z = {}", id, z);
                                incumbent = Some((z, id));
                                NodeStatus::SolvedInteger
                            }
                            Some(j) => {
                                fractional = Some((j, solution.values[j]));
                                NodeStatus::SolvedFractional
                            }
                        },
                    }
                }
            };
            trace!("node {} at depth {}: {:?}", id, node.depth, status);
            node.status = status;
            node.relaxation = Some(solution);

            let Some((variable, value)) = fractional else {
                continue;
            };
            if nodes.len() + 2 > self.max_nodes {
                return Err(EngineError::NodeLimit(self.max_nodes));
            }

            let depth = nodes[id].depth + 1;
            let down = Branch::down(variable, value);
            let up = Branch::up(variable, value);
            let down_id = nodes.len();
            let up_id = down_id + 1;
            debug!(
                "node {} branches on {} = {}: {} <= {}, {} >= {}",
                id,
                problem.variables[variable],
                value,
                problem.variables[variable],
                down.bound,
                problem.variables[variable],
                up.bound
            );
            let down_node = BranchNode::new(down_id, Some(id), depth, down.apply(&nodes[id].program), Some(down));
            let up_node = BranchNode::new(up_id, Some(id), depth, up.apply(&nodes[id].program), Some(up));
            nodes.push(down_node);
            nodes.push(up_node);
            nodes[id].children = vec![down_id, up_id];
            // Down branch is explored first
            stack.push(up_id);
            stack.push(down_id);
        }

        let status = match nodes[0].status {
            NodeStatus::Unbounded => SolutionStatus::Unbounded,
            NodeStatus::Infeasible => SolutionStatus::Infeasible,
            _ if incumbent.is_some() => SolutionStatus::Optimal,
            _ => SolutionStatus::Infeasible,
        };
        let best_node = incumbent.map(|(_, id)| id);
        let best = best_node.and_then(|id| nodes[id].relaxation.clone());
        debug!(
            "branch-and-bound finished with {:?} after {} nodes",
            status,
            nodes.len()
        );
        Ok(BranchAndBoundResult {
            status,
            best,
            best_node,
            nodes,
        })
    }
}

/// Integer-marked variable farthest from an integer, lowest index on ties.
pub fn most_fractional(problem: &LinearProgram, values: &[f64], tolerance: f64) -> Option<usize> {
    let mut best = None;
    let mut best_distance = tolerance;
    for &j in &problem.integer_variables {
        let Some(&v) = values.get(j) else {
            continue;
        };
        let distance = (v - v.floor()).min(v.ceil() - v);
        if distance > best_distance {
            best_distance = distance;
            best = Some(j);
        }
    }
    best
}
