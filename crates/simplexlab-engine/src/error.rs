use thiserror::Error;

/// A malformed problem or matrix. Never retried; the input has to be fixed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("Objective has {found} coefficients but there are {expected} variables")]
    ObjectiveLength { expected: usize, found: usize },
    #[error("Constraint {index} has {found} coefficients but there are {expected} variables")]
    ConstraintLength {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("Sign restrictions cover {found} variables but there are {expected}")]
    SignLength { expected: usize, found: usize },
    #[error("Integer variable index {index} is out of range for {count} variables")]
    IntegerIndex { index: usize, count: usize },
    #[error("Variable index {index} is out of range for {count} variables")]
    VariableIndex { index: usize, count: usize },
    #[error("Matrix row {row} has {found} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Cannot multiply a {left_rows}x{left_cols} matrix by a {right_rows}x{right_cols} matrix")]
    IncompatibleMatrices {
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },
    #[error("Column index {index} is out of range for a matrix with {count} columns")]
    ColumnIndex { index: usize, count: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("Basis matrix is singular; this basis choice is invalid")]
    SingularBasis,
    #[error("Constraint index {index} is out of range for {count} constraints")]
    ConstraintIndex { index: usize, count: usize },
    #[error("Constraint {0} was removed as redundant and has no row in the tableau")]
    RemovedConstraint(usize),
    #[error("Tableau is not dual feasible: column {column} has reduced cost {value:.4}")]
    NotDualFeasible { column: usize, value: f64 },
    #[error("Operation requires a phase two tableau")]
    UnsupportedTableau,
    #[error("Iteration limit of {0} pivots reached")]
    IterationLimit(usize),
    #[error("Branch-and-bound node limit of {0} reached")]
    NodeLimit(usize),
}
