use crate::tableau::Tableau;

/// Kind of a recorded solver step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StepStatus {
    Initial,
    Iteration,
    Optimal,
    Unbounded,
    Infeasible,
    Phase1Start,
    Phase2Start,
    DualStart,
    DualIteration,
    StandardForm,
    ArtificialVars,
}

impl StepStatus {
    /// Whether a trace ends with this status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Optimal | StepStatus::Unbounded | StepStatus::Infeasible
        )
    }
}

/// Tableau coordinates of a pivot element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PivotPosition {
    pub row: usize,
    pub column: usize,
}

/// An immutable snapshot in a solver trace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplexStep {
    pub tableau: Tableau,
    /// Column that entered the basis in this step
    pub entering: Option<usize>,
    /// Column that left the basis in this step
    pub leaving: Option<usize>,
    pub pivot: Option<PivotPosition>,
    pub status: StepStatus,
    pub explanation: String,
}

impl SimplexStep {
    pub fn new(tableau: &Tableau, status: StepStatus, explanation: impl Into<String>) -> Self {
        Self {
            tableau: tableau.clone(),
            entering: None,
            leaving: None,
            pivot: None,
            status,
            explanation: explanation.into(),
        }
    }

    /// A step that records a completed pivot.
    pub fn pivoted(
        tableau: &Tableau,
        status: StepStatus,
        entering: usize,
        leaving: usize,
        row: usize,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            entering: Some(entering),
            leaving: Some(leaving),
            pivot: Some(PivotPosition {
                row,
                column: entering,
            }),
            ..Self::new(tableau, status, explanation)
        }
    }
}

/// Status of the last step of a trace, if any.
pub fn final_status(steps: &[SimplexStep]) -> Option<StepStatus> {
    steps.last().map(|s| s.status)
}
