//! WASM bindings for the engine
//!
//! Every entry point takes and returns plain JavaScript objects shaped like
//! the serde representation of the engine types.

use wasm_bindgen::prelude::*;

use crate::{dual_of, BranchAndBound, LinearProgram, RhsChange, Solver, StandardForm, Tableau};

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Solve a program and return the standard form, step trace and solution
#[wasm_bindgen]
pub fn solve(problem: JsValue) -> Result<JsValue, JsValue> {
    let problem: LinearProgram = from_js(problem)?;
    let outcome = Solver::new()
        .solve(&problem)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&outcome)
}

/// Derive the dual program together with its display text
#[wasm_bindgen]
pub fn dual(problem: JsValue) -> Result<JsValue, JsValue> {
    let problem: LinearProgram = from_js(problem)?;
    let dual = dual_of(&problem).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&DualResult {
        text: dual.dual.to_string(),
        dual,
    })
}

#[derive(serde::Serialize)]
struct DualResult {
    dual: crate::DualProgram,
    text: String,
}

/// Run branch-and-bound and return the whole search tree
#[wasm_bindgen]
pub fn branch_and_bound(problem: JsValue) -> Result<JsValue, JsValue> {
    let problem: LinearProgram = from_js(problem)?;
    let result = BranchAndBound::default()
        .solve(&problem)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&result)
}

/// Apply right-hand side changes to an optimal tableau and return the
/// dual simplex trace
#[wasm_bindgen]
pub fn reoptimize(standard: JsValue, tableau: JsValue, changes: JsValue) -> Result<JsValue, JsValue> {
    let standard: StandardForm = from_js(standard)?;
    let tableau: Tableau = from_js(tableau)?;
    let changes: Vec<RhsChange> = from_js(changes)?;
    let steps = Solver::new()
        .reoptimize(&standard, &tableau, &changes)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&steps)
}
