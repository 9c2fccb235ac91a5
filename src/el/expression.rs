//! Expression tree, runtime values and evaluation
//!
//! Expressions are evaluated against a [`VariableStore`], normally the
//! key/value attributes of one entity. Attribute values are strings, so
//! comparisons and bitwise operators coerce numeric strings to numbers.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use thiserror::Error;

/// Runtime value of an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of an unset variable or an unmatched switch
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Numeric view of a scalar; numeric strings convert.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
        }
    }

    fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(_), _) | (_, Value::Number(_)) => {
                match (self.as_number(), other.as_number()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => self == other,
        }
    }
}

/// Source of variable values during evaluation
pub trait VariableStore {
    fn value(&self, name: &str) -> Option<Value>;
}

impl<S: BuildHasher> VariableStore for HashMap<String, String, S> {
    fn value(&self, name: &str) -> Option<Value> {
        self.get(name).map(|v| Value::String(v.clone()))
    }
}

impl VariableStore for [(&str, &str)] {
    fn value(&self, name: &str) -> Option<Value> {
        self.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, v)| Value::String(v.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("cannot apply '{operator}' to {value_type} value")]
    TypeMismatch {
        operator: &'static str,
        value_type: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    BitwiseAnd,
    BitwiseOr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::BitwiseOr => "|",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::LessOrEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterOrEqual => 3,
            BinaryOp::BitwiseAnd | BinaryOp::BitwiseOr => 4,
        }
    }
}

/// Model-selector expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Variable(String),
    Array(Vec<Expression>),
    Map(Vec<(String, Expression)>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    /// `condition -> value`, only meaningful inside a switch
    Case(Box<Expression>, Box<Expression>),
    /// `{{ a, b -> c, ... }}`: the first element with a defined value wins
    Switch(Vec<Expression>),
}

impl Expression {
    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal(Value::String(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Expression::Literal(Value::Number(value))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn case(condition: Expression, value: Expression) -> Self {
        Expression::Case(Box::new(condition), Box::new(value))
    }

    pub fn evaluate(&self, store: &dyn VariableStore) -> Result<Value, EvaluationError> {
        match self {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(name) => Ok(store.value(name).unwrap_or(Value::Undefined)),
            Expression::Array(items) => items
                .iter()
                .map(|item| item.evaluate(store))
                .collect::<Result<_, _>>()
                .map(Value::Array),
            Expression::Map(entries) => entries
                .iter()
                .map(|(key, value)| value.evaluate(store).map(|v| (key.clone(), v)))
                .collect::<Result<_, _>>()
                .map(Value::Map),
            Expression::Unary(op, operand) => {
                let value = operand.evaluate(store)?;
                match op {
                    UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
                    UnaryOp::Negate => value
                        .as_number()
                        .map(|n| Value::Number(-n))
                        .ok_or(EvaluationError::TypeMismatch {
                            operator: op.symbol(),
                            value_type: value.type_name(),
                        }),
                }
            }
            Expression::Binary(op, left, right) => evaluate_binary(*op, left, right, store),
            Expression::Case(condition, value) => {
                if condition.evaluate(store)?.is_truthy() {
                    value.evaluate(store)
                } else {
                    Ok(Value::Undefined)
                }
            }
            Expression::Switch(elements) => {
                for element in elements {
                    let value = element.evaluate(store)?;
                    if value != Value::Undefined {
                        return Ok(value);
                    }
                }
                Ok(Value::Undefined)
            }
        }
    }
}

fn evaluate_binary(
    op: BinaryOp,
    left: &Expression,
    right: &Expression,
    store: &dyn VariableStore,
) -> Result<Value, EvaluationError> {
    // logical operators short-circuit
    match op {
        BinaryOp::Or => {
            let result = left.evaluate(store)?.is_truthy() || right.evaluate(store)?.is_truthy();
            return Ok(Value::Boolean(result));
        }
        BinaryOp::And => {
            let result = left.evaluate(store)?.is_truthy() && right.evaluate(store)?.is_truthy();
            return Ok(Value::Boolean(result));
        }
        _ => {}
    }

    let lhs = left.evaluate(store)?;
    let rhs = right.evaluate(store)?;
    let number = |value: &Value| {
        value.as_number().ok_or(EvaluationError::TypeMismatch {
            operator: op.symbol(),
            value_type: value.type_name(),
        })
    };

    let value = match op {
        BinaryOp::Equal => Value::Boolean(lhs.loosely_equals(&rhs)),
        BinaryOp::NotEqual => Value::Boolean(!lhs.loosely_equals(&rhs)),
        BinaryOp::Less => Value::Boolean(number(&lhs)? < number(&rhs)?),
        BinaryOp::LessOrEqual => Value::Boolean(number(&lhs)? <= number(&rhs)?),
        BinaryOp::Greater => Value::Boolean(number(&lhs)? > number(&rhs)?),
        BinaryOp::GreaterOrEqual => Value::Boolean(number(&lhs)? >= number(&rhs)?),
        BinaryOp::BitwiseAnd => Value::Number(((number(&lhs)? as i64) & (number(&rhs)? as i64)) as f64),
        BinaryOp::BitwiseOr => Value::Number(((number(&lhs)? as i64) | (number(&rhs)? as i64)) as f64),
        BinaryOp::Or | BinaryOp::And => unreachable!("handled above"),
    };
    Ok(value)
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined | Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write_number(f, *n),
            Value::String(s) => write_string(f, s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_string(f, key)?;
                    write!(f, ": {value}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl Expression {
    /// Write `self` as an operand of `parent`, parenthesized where needed.
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Expression::Binary(op, _, _) if op.precedence() <= parent => write!(f, "({self})"),
            Expression::Case(_, _) => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

/// Renders the expression-language spelling, which parses back to an equal tree.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{value}"),
            Expression::Variable(name) => f.write_str(name),
            Expression::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Expression::Map(entries) => {
                f.write_str("{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_string(f, key)?;
                    write!(f, ": {value}")?;
                }
                f.write_str(" }")
            }
            Expression::Unary(op, operand) => {
                f.write_str(op.symbol())?;
                match operand.as_ref() {
                    // keep "-(1)" from collapsing into the literal -1
                    Expression::Literal(Value::Number(_)) | Expression::Unary(_, _) => {
                        write!(f, "({operand})")
                    }
                    other => other.fmt_operand(f, u8::MAX),
                }
            }
            Expression::Binary(op, left, right) => {
                left.fmt_operand(f, op.precedence())?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f, op.precedence())
            }
            Expression::Case(condition, value) => write!(f, "{condition} -> {value}"),
            Expression::Switch(elements) => {
                f.write_str("{{ ")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str(" }}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_numeric_string_equality() {
        let expr = Expression::binary(BinaryOp::Equal, Expression::variable("spawnflags"), Expression::number(2.0));
        assert_eq!(expr.evaluate(&attrs(&[("spawnflags", "2")])), Ok(Value::Boolean(true)));
        assert_eq!(expr.evaluate(&attrs(&[("spawnflags", "3")])), Ok(Value::Boolean(false)));
        assert_eq!(expr.evaluate(&attrs(&[])), Ok(Value::Boolean(false)));
    }

    #[test]
    fn test_bitwise_and() {
        let expr = Expression::binary(BinaryOp::BitwiseAnd, Expression::variable("spawnflags"), Expression::number(4.0));
        assert_eq!(expr.evaluate(&attrs(&[("spawnflags", "6")])), Ok(Value::Number(4.0)));
    }

    #[test]
    fn test_comparison_type_mismatch() {
        let expr = Expression::binary(BinaryOp::Less, Expression::string("abc"), Expression::number(1.0));
        assert_eq!(
            expr.evaluate(&attrs(&[])),
            Err(EvaluationError::TypeMismatch {
                operator: "<",
                value_type: "string"
            })
        );
    }

    #[test]
    fn test_switch_takes_first_defined() {
        let expr = Expression::Switch(vec![
            Expression::case(
                Expression::binary(BinaryOp::Equal, Expression::variable("style"), Expression::number(1.0)),
                Expression::string("a.mdl"),
            ),
            Expression::string("b.mdl"),
        ]);
        assert_eq!(expr.evaluate(&attrs(&[("style", "1")])), Ok(Value::String("a.mdl".into())));
        assert_eq!(expr.evaluate(&attrs(&[])), Ok(Value::String("b.mdl".into())));
    }

    #[test]
    fn test_display() {
        let expr = Expression::Switch(vec![
            Expression::case(
                Expression::binary(BinaryOp::Equal, Expression::variable("spawnflags"), Expression::number(1.0)),
                Expression::Map(vec![("path".into(), Expression::string("progs/a.mdl"))]),
            ),
            Expression::Map(vec![
                ("path".into(), Expression::string("progs/b.mdl")),
                ("skin".into(), Expression::number(2.0)),
            ]),
        ]);
        assert_eq!(
            expr.to_string(),
            r#"{{ spawnflags == 1 -> { "path": "progs/a.mdl" }, { "path": "progs/b.mdl", "skin": 2 } }}"#
        );
    }

    #[test]
    fn test_display_parenthesizes_weaker_operands() {
        let expr = Expression::binary(
            BinaryOp::And,
            Expression::binary(BinaryOp::Or, Expression::variable("a"), Expression::variable("b")),
            Expression::variable("c"),
        );
        assert_eq!(expr.to_string(), "(a || b) && c");
    }
}
