//! `ifeval::[lhs op rhs]` expressions.
//!
//! Operands are attribute references (`{name}`), numbers, quoted strings,
//! booleans or `nil`. Operators are `==`, `!=`, `<`, `<=`, `>` and `>=`.

use thiserror::Error;

use crate::attributes::AttributeTable;

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// No comparison operator was found.
    #[error("no comparison operator in `{0}`")]
    MissingOperator(String),
    /// The operands cannot be ordered against each other.
    #[error("cannot compare {0} with {1} using `{2}`")]
    TypeMismatch(&'static str, &'static str, &'static str),
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Text(String),
    Number(f64),
    Boolean(bool),
    Nil,
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Nil => "nil",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
        }
    }
}

/// Evaluate an `ifeval` expression against `attributes`.
///
/// # Errors
///
/// Returns [`ExprError`] when the expression has no operator or compares
/// values that have no ordering.
pub fn evaluate(expr: &str, attributes: &AttributeTable) -> Result<bool, ExprError> {
    let (lhs, op, rhs) = split(expr.trim())?;
    let lhs = operand(lhs, attributes);
    let rhs = operand(rhs, attributes);
    compare(&lhs, op, &rhs)
}

fn split(expr: &str) -> Result<(&str, Operator, &str), ExprError> {
    for (symbol, op) in [
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        ("<=", Operator::Le),
        (">=", Operator::Ge),
    ] {
        if let Some(pos) = expr.find(symbol) {
            return Ok((&expr[..pos], op, &expr[pos + 2..]));
        }
    }
    for (symbol, op) in [('<', Operator::Lt), ('>', Operator::Gt)] {
        if let Some(pos) = expr.find(symbol) {
            return Ok((&expr[..pos], op, &expr[pos + 1..]));
        }
    }
    Err(ExprError::MissingOperator(expr.to_string()))
}

fn operand(text: &str, attributes: &AttributeTable) -> Value {
    let text = text.trim();
    if let Some(name) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        return attributes.get(name).map_or(Value::Nil, typed);
    }
    let quoted = ['"', '\'']
        .iter()
        .find_map(|q| text.strip_prefix(*q).and_then(|t| t.strip_suffix(*q)));
    if let Some(inner) = quoted {
        return Value::Text(crate::subs::expand_references(inner, attributes));
    }
    match text.to_ascii_lowercase().as_str() {
        "nil" | "null" => Value::Nil,
        _ => typed(text),
    }
}

fn typed(text: &str) -> Value {
    if text.eq_ignore_ascii_case("true") {
        Value::Boolean(true)
    } else if text.eq_ignore_ascii_case("false") {
        Value::Boolean(false)
    } else if let Ok(n) = text.parse::<f64>() {
        Value::Number(n)
    } else {
        Value::Text(text.to_string())
    }
}

fn compare(lhs: &Value, op: Operator, rhs: &Value) -> Result<bool, ExprError> {
    let equality_only = |equal: bool| match op {
        Operator::Eq => Ok(equal),
        Operator::Ne => Ok(!equal),
        _ => Err(ExprError::TypeMismatch(lhs.type_name(), rhs.type_name(), op.symbol())),
    };
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(a
            .partial_cmp(b)
            .is_some_and(|ordering| op.holds(ordering))),
        (Value::Text(a), Value::Text(b)) => Ok(op.holds(a.cmp(b))),
        (Value::Number(n), Value::Text(s)) | (Value::Text(s), Value::Number(n)) => {
            let number_first = matches!(lhs, Value::Number(_));
            match s.parse::<f64>() {
                Ok(parsed) => {
                    let (a, b) = if number_first { (*n, parsed) } else { (parsed, *n) };
                    Ok(a.partial_cmp(&b).is_some_and(|ordering| op.holds(ordering)))
                }
                Err(_) => {
                    let n = n.to_string();
                    let (a, b) = if number_first {
                        (n.as_str(), s.as_str())
                    } else {
                        (s.as_str(), n.as_str())
                    };
                    Ok(op.holds(a.cmp(b)))
                }
            }
        }
        (Value::Boolean(a), Value::Boolean(b)) => equality_only(a == b),
        (Value::Nil, Value::Nil) => equality_only(true),
        (Value::Nil, _) | (_, Value::Nil) => equality_only(false),
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => equality_only(false),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn table(entries: &[(&str, &str)]) -> AttributeTable {
        let mut table = AttributeTable::new();
        for (name, value) in entries {
            table.apply(name, Some(*value));
        }
        table
    }

    #[rstest]
    #[case("{level} > 2", true)]
    #[case("{level} <= 2", false)]
    #[case("{level} == 3", true)]
    #[case("{level} != 3", false)]
    #[case("{backend} == \"html5\"", true)]
    #[case("'{backend}' == 'html5'", true)]
    #[case("{missing} == nil", true)]
    #[case("{flag} == true", true)]
    #[case("2 < 10", true)]
    #[case("\"abc\" < \"abd\"", true)]
    fn expressions(#[case] expr: &str, #[case] expected: bool) {
        let attrs = table(&[("level", "3"), ("backend", "html5"), ("flag", "true")]);
        assert_eq!(evaluate(expr, &attrs), Ok(expected));
    }

    #[test]
    fn missing_operator() {
        assert!(matches!(
            evaluate("{level}", &AttributeTable::new()),
            Err(ExprError::MissingOperator(_))
        ));
    }

    #[test]
    fn ordering_booleans_is_an_error() {
        let attrs = table(&[("flag", "true")]);
        assert!(matches!(
            evaluate("{flag} > false", &attrs),
            Err(ExprError::TypeMismatch(..))
        ));
    }
}
