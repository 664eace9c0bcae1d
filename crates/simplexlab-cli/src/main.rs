use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::{Path, PathBuf};

use simplexlab_engine::{
    dual_of, BranchAndBound, BranchDirection, ConstraintOp, LinearProgram, NodeStatus, RhsChange,
    SimplexStep, Solution, SolutionStatus, Solver, StepStatus, Tableau,
};

#[derive(Parser)]
#[command(name = "simplexlab")]
#[command(about = "Step-by-step linear programming: simplex, dual simplex, duality and branch-and-bound", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a program with the two-phase simplex method
    Solve {
        /// JSON file holding the program
        file: PathBuf,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
        /// Print every tableau of the trace
        #[arg(short, long)]
        steps: bool,
        /// Run phase one even when the slack basis is feasible
        #[arg(long)]
        force_phase_one: bool,
    },
    /// Print the dual of a program
    Dual {
        file: PathBuf,
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Solve the integer-marked variables with branch-and-bound
    Branch {
        file: PathBuf,
        #[arg(short, long, default_value = "pretty")]
        format: String,
        /// Maximum number of search nodes
        #[arg(long, default_value_t = 10000)]
        max_nodes: usize,
    },
    /// Change right-hand sides after solving and re-optimize with the dual simplex
    Reoptimize {
        file: PathBuf,
        /// Changes as INDEX=VALUE, constraint indices start at 0
        #[arg(short, long = "change", required = true, value_parser = parse_change)]
        changes: Vec<RhsChange>,
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Add a constraint to the optimal tableau and re-optimize with the dual simplex
    AddConstraint {
        file: PathBuf,
        /// Comma separated coefficients over the standardized decision columns
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
        coefficients: Vec<f64>,
        #[arg(short, long, value_enum)]
        op: OpArg,
        #[arg(short, long, allow_negative_numbers = true)]
        rhs: f64,
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OpArg {
    Le,
    Ge,
    Eq,
}

impl From<OpArg> for ConstraintOp {
    fn from(op: OpArg) -> Self {
        match op {
            OpArg::Le => ConstraintOp::Le,
            OpArg::Ge => ConstraintOp::Ge,
            OpArg::Eq => ConstraintOp::Eq,
        }
    }
}

fn parse_change(s: &str) -> Result<RhsChange, String> {
    let (index, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=VALUE, got '{}'", s))?;
    Ok(RhsChange {
        constraint_index: index.trim().parse().map_err(|e| format!("bad index: {}", e))?,
        new_value: value.trim().parse().map_err(|e| format!("bad value: {}", e))?,
    })
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    match cli.command {
        Commands::Solve {
            file,
            format,
            steps,
            force_phase_one,
        } => {
            let program = read_program(&file);
            let solver = Solver::new().with_forced_phase_one(force_phase_one);
            let outcome = match solver.solve(&program) {
                Ok(o) => o,
                Err(e) => fail("Solve error", e),
            };

            if format == "json" {
                print_json(&outcome);
                return;
            }
            println!("{}", program);
            println!();
            if steps {
                print_steps(&outcome.steps);
            }
            print_solution(&program, &outcome.solution);
        }
        Commands::Dual { file, format } => {
            let program = read_program(&file);
            let dual = match dual_of(&program) {
                Ok(d) => d,
                Err(e) => fail("Invalid program", e),
            };

            if format == "json" {
                print_json(&dual);
                return;
            }
            println!("Primal:");
            println!("{}", program);
            println!();
            println!("Dual:");
            println!("{}", dual.dual);
            println!();
            for pair in &dual.pairs {
                println!(
                    "  {} prices constraint {} ({}): {:?}",
                    pair.variable,
                    pair.constraint,
                    pair.constraint_op.symbol(),
                    pair.sign
                );
            }
        }
        Commands::Branch {
            file,
            format,
            max_nodes,
        } => {
            let program = read_program(&file);
            let result = match BranchAndBound::new(Solver::new())
                .with_max_nodes(max_nodes)
                .solve(&program)
            {
                Ok(r) => r,
                Err(e) => fail("Branch-and-bound error", e),
            };

            if format == "json" {
                print_json(&result);
                return;
            }
            println!("{}", program);
            println!();
            println!("Search tree ({} nodes):", result.nodes.len());
            for node in &result.nodes {
                let label = match node.branch {
                    Some(b) => format!(
                        "{} {} {}",
                        program.variables[b.variable],
                        match b.direction {
                            BranchDirection::Down => "≤",
                            BranchDirection::Up => "≥",
                        },
                        b.bound
                    ),
                    None => "root".to_string(),
                };
                let bound = node
                    .bound()
                    .map(|z| format!("Z = {:.4}", z))
                    .unwrap_or_default();
                let marker = if result.best_node == Some(node.id) { " *" } else { "" };
                println!(
                    "{}#{} {:16} {:18} {}{}",
                    "  ".repeat(node.depth + 1),
                    node.id,
                    label,
                    status_label(node.status),
                    bound,
                    marker
                );
            }
            println!();
            match &result.best {
                Some(best) => print_solution(&program, best),
                None if result.status == SolutionStatus::Unbounded => {
                    print_solution(&program, &Solution::unbounded(program.direction))
                }
                None => print_solution(&program, &Solution::infeasible()),
            }
        }
        Commands::Reoptimize {
            file,
            changes,
            format,
        } => {
            let program = read_program(&file);
            let solver = Solver::new();
            let outcome = match solver.solve(&program) {
                Ok(o) => o,
                Err(e) => fail("Solve error", e),
            };
            let tableau = optimal_tableau(&outcome.steps);
            let steps = match solver.reoptimize(&outcome.standard, tableau, &changes) {
                Ok(s) => s,
                Err(e) => fail("Re-optimization error", e),
            };

            if format == "json" {
                print_json(&steps);
                return;
            }
            print_steps(&steps);
        }
        Commands::AddConstraint {
            file,
            coefficients,
            op,
            rhs,
            format,
        } => {
            let program = read_program(&file);
            let solver = Solver::new();
            let outcome = match solver.solve(&program) {
                Ok(o) => o,
                Err(e) => fail("Solve error", e),
            };
            let tableau = optimal_tableau(&outcome.steps);
            let steps = match solver
                .add_constraint_to_tableau(tableau, &coefficients, op.into(), rhs)
                .and_then(|t| solver.dual_simplex(&t))
            {
                Ok(s) => s,
                Err(e) => fail("Re-optimization error", e),
            };

            if format == "json" {
                print_json(&steps);
                return;
            }
            print_steps(&steps);
        }
    }
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    std::process::exit(1);
}

fn read_program(file: &Path) -> LinearProgram {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => fail("Error reading file", e),
    };
    match serde_json::from_str(&source) {
        Ok(p) => p,
        Err(e) => fail("Parse error", e),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => fail("Serialization error", e),
    }
}

fn optimal_tableau(steps: &[SimplexStep]) -> &Tableau {
    match steps.last() {
        Some(step) if step.status == StepStatus::Optimal => &step.tableau,
        Some(step) => fail("Cannot re-optimize", format!("{:?} problem", step.status)),
        None => fail("Cannot re-optimize", "empty trace"),
    }
}

fn status_label(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Pending => "pending",
        NodeStatus::SolvedInteger => "integer",
        NodeStatus::SolvedFractional => "fractional",
        NodeStatus::Infeasible => "infeasible",
        NodeStatus::Unbounded => "unbounded",
        NodeStatus::Pruned => "pruned",
    }
}

fn print_steps(steps: &[SimplexStep]) {
    for (i, step) in steps.iter().enumerate() {
        println!("Step {} [{:?}]", i, step.status);
        for line in step.explanation.lines() {
            println!("  {}", line);
        }
        print_tableau(&step.tableau);
        println!();
    }
}

fn print_tableau(tableau: &Tableau) {
    let mut header = format!("  {:>6}", "");
    for name in &tableau.column_names {
        header.push_str(&format!(" {:>8}", name));
    }
    header.push_str(&format!(" {:>8}", "RHS"));
    println!("{}", header);

    for (r, row) in tableau.matrix.iter().enumerate() {
        let label = if r == 0 {
            "Z".to_string()
        } else {
            tableau.column_name(tableau.basic[r - 1]).to_string()
        };
        let mut line = format!("  {:>6}", label);
        for value in row {
            line.push_str(&format!(" {:>8.3}", value + 0.0));
        }
        println!("{}", line);
    }
}

fn print_solution(program: &LinearProgram, solution: &Solution) {
    match solution.status {
        SolutionStatus::Optimal => {
            println!("Status: OPTIMAL");
            println!("Z = {:.4}", solution.objective_value);
            println!();
            for (name, value) in program.variables.iter().zip(&solution.values) {
                println!("  {:12} {:10.4}", name, value);
            }

            println!();
            println!("Shadow prices:");
            for sp in &solution.analysis.shadow_prices {
                println!("  constraint {:3} {:10.4}  {}", sp.constraint, sp.value, sp.interpretation);
            }
            if !solution.analysis.binding_constraints.is_empty() {
                println!();
                println!("Binding constraints: {:?}", solution.analysis.binding_constraints);
            }
        }
        SolutionStatus::Infeasible => {
            println!("Status: INFEASIBLE");
            println!("No solution exists that satisfies all constraints.");
            std::process::exit(1);
        }
        SolutionStatus::Unbounded => {
            println!("Status: UNBOUNDED");
            println!("The problem has no finite optimal solution.");
            std::process::exit(1);
        }
    }
}
