//! Runtime values produced by evaluation

use chrono::{DateTime, FixedOffset};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;

/// A number that is either an exact integer or an arbitrary-precision decimal.
///
/// Equality and ordering are numeric, so `Integer(3) == Decimal(3.00)`.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Integer(i64),
    Decimal(Decimal),
}

impl Number {
    /// Widen to a decimal
    pub fn to_decimal(self) -> Decimal {
        match self {
            Number::Integer(i) => Decimal::from(i),
            Number::Decimal(d) => d,
        }
    }

    /// Narrow to an integer when the fractional part is exactly zero
    pub fn narrow(self) -> Number {
        match self {
            Number::Integer(_) => self,
            Number::Decimal(d) => {
                if d.fract().is_zero() {
                    d.to_i64().map_or(self, Number::Integer)
                } else {
                    self
                }
            }
        }
    }

    pub fn is_zero(self) -> bool {
        self.to_decimal().is_zero()
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Number::Integer(_))
    }

    /// Additive inverse
    pub fn negate(self) -> Number {
        match self {
            Number::Integer(i) => i
                .checked_neg()
                .map_or_else(|| Number::Decimal(-Decimal::from(i)), Number::Integer),
            Number::Decimal(d) => Number::Decimal(-d),
        }
    }

    /// Convert from a float, if it is finite and in range
    pub fn from_f64(n: f64) -> Option<Number> {
        Decimal::from_f64(n).map(Number::Decimal)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Integer(l), Number::Integer(r)) => l == r,
            _ => self.to_decimal() == other.to_decimal(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Integer(l), Number::Integer(r)) => l.partial_cmp(r),
            _ => self.to_decimal().partial_cmp(&other.to_decimal()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{i}"),
            Number::Decimal(d) => write!(f, "{}", d.normalize()),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<Decimal> for Number {
    fn from(value: Decimal) -> Self {
        Number::Decimal(value)
    }
}

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Number),
    Text(String),
    Logical(bool),
    DateTime(DateTime<FixedOffset>),
    /// Only ever supplied by variable bindings
    List(Vec<Value>),
    Null,
}

impl Value {
    /// Name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "numeric",
            Value::Text(_) => "string",
            Value::Logical(_) => "logical",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Null => "null",
        }
    }

    /// Everything except `false` and `null` is truthy, including zero
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Logical(false) | Value::Null)
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Logical(true) => f.write_str("true"),
            Value::Logical(false) => f.write_str("false"),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::Integer(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Number::Integer(value.into()))
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(Number::Decimal(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Logical(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}
