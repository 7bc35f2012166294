//! Tiny arithmetic evaluator for pane layout expressions
//!
//! Layout values such as `"{cols} // 2"` or `"{lines} - 3"` are first
//! substituted with the terminal size and then evaluated here. Only integer
//! literals and the `+ - * / //` operators are understood. Anything else
//! evaluates to `None` instead of failing.
//!
//! The expression is split on the lowest precedence operator first, so
//! `* / //` bind tighter than `+ -`, and each split is folded left to right.

/// Operators, lowest precedence first. `//` must be tried before `/`.
const OPERATORS: [Op; 5] = [Op::Sub, Op::Add, Op::FloorDiv, Op::Div, Op::Mul];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::FloorDiv => "//",
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Option<f64> {
        match self {
            Op::Add => Some(lhs + rhs),
            Op::Sub => Some(lhs - rhs),
            Op::Mul => Some(lhs * rhs),
            Op::Div if rhs == 0.0 => None,
            Op::Div => Some(lhs / rhs),
            Op::FloorDiv if rhs == 0.0 => None,
            Op::FloorDiv => Some((lhs / rhs).floor()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(i64),
    Apply(Op, Vec<Expr>),
}

fn parse(expr: &str, operators: &[Op]) -> Option<Expr> {
    if let Ok(value) = expr.trim().parse::<i64>() {
        return Some(Expr::Num(value));
    }

    let (op, rest) = operators.split_first()?;
    let parts: Vec<&str> = expr.split(op.symbol()).collect();
    if parts.len() == 1 {
        return parse(expr, rest);
    }

    let operands = parts
        .into_iter()
        .map(|part| parse(part, rest))
        .collect::<Option<Vec<_>>>()?;
    Some(Expr::Apply(*op, operands))
}

fn evaluate(expr: &Expr) -> Option<f64> {
    match expr {
        Expr::Num(value) => Some(*value as f64),
        Expr::Apply(op, operands) => {
            let mut values = operands.iter().map(evaluate);
            let first = values.next()??;
            values.try_fold(first, |acc, value| op.apply(acc, value?))
        }
    }
}

/// Evaluate a substituted layout expression.
///
/// Returns `None` for unknown operators, malformed operands or a division by
/// zero.
pub fn eval(expr: &str) -> Option<f64> {
    evaluate(&parse(expr, &OPERATORS)?)
}

/// Replace the `{cols}` and `{lines}` placeholders with the terminal size.
pub fn substitute(template: &str, cols: u16, lines: u16) -> String {
    template
        .replace("{cols}", &cols.to_string())
        .replace("{lines}", &lines.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_matches_arithmetic() {
        let expected = 2.0 + 5.0 * 3.0 + 14.0 / 2.0 + (10.0_f64 / 2.0).floor();
        assert_eq!(eval("2 + 5* 3 + 14/2 + 10//2"), Some(expected));
        assert_eq!(eval("2 + 5*3 + 14/2 + 10//2"), Some(29.0));
    }

    #[test]
    fn test_plain_integer() {
        assert_eq!(eval("42"), Some(42.0));
        assert_eq!(eval("  7 "), Some(7.0));
    }

    #[test]
    fn test_subtraction_folds_left() {
        assert_eq!(eval("10 - 3 - 2"), Some(5.0));
    }

    #[test]
    fn test_true_and_floor_division() {
        assert_eq!(eval("7 / 2"), Some(3.5));
        assert_eq!(eval("7 // 2"), Some(3.0));
    }

    #[test]
    fn test_unknown_operator_is_none() {
        assert_eq!(eval("5 % 2"), None);
        assert_eq!(eval("cols"), None);
        assert_eq!(eval(""), None);
    }

    #[test]
    fn test_division_by_zero_is_none() {
        assert_eq!(eval("1 / 0"), None);
        assert_eq!(eval("1 // 0"), None);
    }

    #[test]
    fn test_substitute_placeholders() {
        let expr = substitute("{cols} // 2", 40, 30);
        assert_eq!(expr, "40 // 2");
        assert_eq!(eval(&expr), Some(20.0));
        assert_eq!(eval(&substitute("{lines} - 3", 40, 30)), Some(27.0));
    }
}
