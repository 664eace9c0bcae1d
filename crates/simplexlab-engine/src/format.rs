//! Plain-text rendering of linear programs for the narrative and
//! visualization layers.

use crate::problem::{Direction, LinearProgram, VariableSign};

/// Render a number without trailing zeros: `3`, `0.5`, `-1.25`.
pub fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        let rounded = value.round();
        if rounded == 0.0 {
            "0".to_string()
        } else {
            format!("{:.0}", rounded)
        }
    } else {
        let fixed = format!("{:.2}", value);
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Render `Σ cᵢ·xᵢ + constant`, skipping zero coefficients.
pub fn format_expression(coefficients: &[f64], variables: &[String], constant: f64) -> String {
    let mut out = String::new();
    for (c, name) in coefficients.iter().zip(variables) {
        if *c == 0.0 {
            continue;
        }
        let magnitude = if (c.abs() - 1.0).abs() < 1e-12 {
            String::new()
        } else {
            format_number(c.abs())
        };
        if out.is_empty() {
            let sign = if *c < 0.0 { "-" } else { "" };
            out.push_str(&format!("{}{}{}", sign, magnitude, name));
        } else {
            let sign = if *c < 0.0 { '-' } else { '+' };
            out.push_str(&format!(" {} {}{}", sign, magnitude, name));
        }
    }

    if constant != 0.0 {
        if out.is_empty() {
            out = format_number(constant);
        } else {
            let sign = if constant < 0.0 { '-' } else { '+' };
            out.push_str(&format!(" {} {}", sign, format_number(constant.abs())));
        }
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

/// Objective line, a `Sujeito a:` block with one constraint per line, then
/// the variable restriction summary.
pub fn format_linear_program(lp: &LinearProgram) -> String {
    let head = match lp.direction {
        Direction::Maximize => "Max",
        Direction::Minimize => "Min",
    };
    let mut lines = vec![format!(
        "{} Z = {}",
        head,
        format_expression(&lp.objective, &lp.variables, lp.objective_constant)
    )];

    lines.push("Sujeito a:".to_string());
    for c in &lp.constraints {
        lines.push(format!(
            "  {} {} {}",
            format_expression(&c.coefficients, &lp.variables, 0.0),
            c.op.symbol(),
            format_number(c.rhs)
        ));
    }

    let group = |sign: VariableSign| -> Vec<&str> {
        lp.variables
            .iter()
            .enumerate()
            .filter(|(j, _)| lp.sign(*j) == sign)
            .map(|(_, name)| name.as_str())
            .collect()
    };
    let non_negative = group(VariableSign::NonNegative);
    let non_positive = group(VariableSign::NonPositive);
    let free = group(VariableSign::Free);
    if !non_negative.is_empty() {
        lines.push(format!("  {} ≥ 0", non_negative.join(", ")));
    }
    if !non_positive.is_empty() {
        lines.push(format!("  {} ≤ 0", non_positive.join(", ")));
    }
    if !free.is_empty() {
        lines.push(format!("  {} livre", free.join(", ")));
    }

    let integers: Vec<&str> = lp
        .integer_variables
        .iter()
        .filter_map(|&j| lp.variables.get(j).map(String::as_str))
        .collect();
    if !integers.is_empty() {
        lines.push(format!("  {} ∈ ℤ", integers.join(", ")));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ConstraintOp;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-1.25), "-1.25");
        assert_eq!(format_number(12.6667), "12.67");
    }

    #[test]
    fn test_format_expression() {
        let vars: Vec<String> = vec!["x1".into(), "x2".into(), "x3".into()];
        assert_eq!(format_expression(&[3.0, -1.0, 0.0], &vars, 0.0), "3x1 - x2");
        assert_eq!(format_expression(&[-1.0, 0.5, 2.0], &vars, -4.0), "-x1 + 0.5x2 + 2x3 - 4");
        assert_eq!(format_expression(&[0.0, 0.0, 0.0], &vars, 0.0), "0");
    }

    #[test]
    fn test_format_linear_program() {
        let mut lp = LinearProgram::with_variable_count(3);
        lp.set_objective(vec![3.0, 2.0, 0.0], Direction::Maximize);
        lp.add_constraint(vec![2.0, 1.0, 0.0], ConstraintOp::Le, 10.0);
        lp.add_constraint(vec![1.0, 2.0, 1.0], ConstraintOp::Ge, 8.0);
        lp.set_sign(2, VariableSign::Free).unwrap();
        lp.set_integer(0);

        let expected = "Max Z = 3x1 + 2x2\n\
                        Sujeito a:\n  \
                        2x1 + x2 ≤ 10\n  \
                        x1 + 2x2 + x3 ≥ 8\n  \
                        x1, x2 ≥ 0\n  \
                        x3 livre\n  \
                        x1 ∈ ℤ";
        assert_eq!(format_linear_program(&lp), expected);
        assert_eq!(lp.to_string(), expected);
    }
}
