//! Operation nodes
//!
//! Arithmetic, bitwise, comparison and logical-combination semantics used by
//! the evaluator's `apply` action and by function bodies. Nodes validate their
//! operands when built: an operand must either depend on an unresolved
//! identifier or already have the right static type.

use crate::error::{FormulaError, FormulaResult, Side};
use crate::token::{Category, Combinator, Comparator, Operator, Token, TokenValue};
use crate::value::{Number, Value};
use lazy_regex::regex_is_match;
use rust_decimal::{Decimal, MathematicalOps};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::str::FromStr;

/// Source of values for identifiers an operand depends on.
///
/// The calculator resolves identifiers before reduction, so the evaluator
/// only sees resolved operands. Hosts that build nodes directly can leave
/// operands dependent and supply the values when evaluating:
///
/// ```rust
/// use reckon_formula::{Arithmetic, ArithmeticOp, Operand, Value};
/// use std::collections::HashMap;
///
/// let node = Arithmetic::new(
///     ArithmeticOp::Multiplication,
///     Operand::Identifier("price".into()),
///     Operand::from(Value::from(3)),
/// )
/// .unwrap();
///
/// let mut prices = HashMap::new();
/// prices.insert("price".to_string(), Value::from(4));
/// assert_eq!(node.value(&prices).unwrap(), Value::from(12));
/// ```
pub trait Context {
    fn resolve(&self, name: &str) -> Option<Value>;
}

impl Context for () {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Names are looked up lower-cased, matching how identifiers are lexed
impl<S: BuildHasher> Context for HashMap<String, Value, S> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(&name.to_lowercase()).cloned()
    }
}

/// Operand of an operation node
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    /// Depends on a variable that is resolved when the node is evaluated
    Identifier(String),
}

impl Operand {
    /// Data and identifier tokens can be operands
    pub fn from_token(token: &Token) -> Option<Self> {
        match token.value() {
            TokenValue::Data(value) => Some(Operand::Value(value.clone())),
            TokenValue::Identifier(name) => Some(Operand::Identifier(name.clone())),
            _ => None,
        }
    }

    fn is_dependent(&self) -> bool {
        matches!(self, Operand::Identifier(_))
    }

    /// Category the operand would have as a token
    fn static_category(&self) -> Category {
        match self {
            Operand::Value(value) => Token::data(value.clone()).category(),
            Operand::Identifier(_) => Category::Identifier,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Operand::Value(value) => value.type_name(),
            Operand::Identifier(_) => "identifier",
        }
    }

    pub fn value(&self, ctx: &dyn Context) -> FormulaResult<Value> {
        match self {
            Operand::Value(value) => Ok(value.clone()),
            Operand::Identifier(name) => ctx
                .resolve(name)
                .ok_or_else(|| FormulaError::UnboundVariable(name.clone())),
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

fn validate(
    operation: &'static str,
    operand: &Operand,
    expected: Category,
    side: Side,
) -> FormulaResult<()> {
    if operand.is_dependent() || operand.static_category() == expected {
        return Ok(());
    }
    Err(FormulaError::Node {
        operation,
        expected: match expected {
            Category::Logical => "logical",
            _ => "numeric",
        },
        actual: operand.type_name(),
        side,
    })
}

/// Parse a string in the strict numeric-literal format: optional leading
/// `-`, digits, optional fractional part
pub fn parse_numeric_str(s: &str) -> FormulaResult<Number> {
    if !regex_is_match!(r"^-?(\d+(\.\d+)?|\.\d+)$", s) {
        return Err(FormulaError::InvalidValue {
            value: s.to_string(),
        });
    }
    let normalized = s.replacen("-.", "-0.", 1);
    let normalized = if normalized.starts_with('.') {
        format!("0{normalized}")
    } else {
        normalized
    };
    Decimal::from_str(&normalized)
        .map(Number::Decimal)
        .map_err(|_| FormulaError::InvalidValue {
            value: s.to_string(),
        })
}

/// Coerce a runtime value for an arithmetic-style operator.
///
/// Strings must look like numbers; anything else that is not a number does
/// not support the operator. Integer-valued results narrow to integers when
/// `prefer_integer` is set.
pub fn coerce(
    value: &Value,
    prefer_integer: bool,
    operation: &'static str,
    operator: &'static str,
) -> FormulaResult<Number> {
    let number = match value {
        Value::Text(s) => parse_numeric_str(s)?,
        Value::Number(n) => Number::Decimal(n.to_decimal()),
        other => {
            return Err(FormulaError::InvalidOperator {
                operation,
                operator,
                actual: other.type_name(),
            })
        }
    };
    Ok(if prefer_integer { number.narrow() } else { number })
}

/// Binary numeric operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    Exponentiation,
}

impl ArithmeticOp {
    pub fn from_operator(op: Operator) -> Option<Self> {
        Some(match op {
            Operator::Add => ArithmeticOp::Addition,
            Operator::Subtract => ArithmeticOp::Subtraction,
            Operator::Multiply => ArithmeticOp::Multiplication,
            Operator::Divide => ArithmeticOp::Division,
            Operator::Mod => ArithmeticOp::Modulo,
            Operator::Pow => ArithmeticOp::Exponentiation,
            Operator::BitOr | Operator::BitAnd | Operator::Negate => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Addition => "Addition",
            ArithmeticOp::Subtraction => "Subtraction",
            ArithmeticOp::Multiplication => "Multiplication",
            ArithmeticOp::Division => "Division",
            ArithmeticOp::Modulo => "Modulo",
            ArithmeticOp::Exponentiation => "Exponentiation",
        }
    }

    pub fn operator_symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Addition => "+",
            ArithmeticOp::Subtraction => "-",
            ArithmeticOp::Multiplication => "*",
            ArithmeticOp::Division => "/",
            ArithmeticOp::Modulo => "%",
            ArithmeticOp::Exponentiation => "^",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            ArithmeticOp::Addition | ArithmeticOp::Subtraction => 10,
            ArithmeticOp::Multiplication | ArithmeticOp::Division | ArithmeticOp::Modulo => 20,
            ArithmeticOp::Exponentiation => 30,
        }
    }

    fn cast(self, value: &Value, prefer_integer: bool) -> FormulaResult<Number> {
        coerce(value, prefer_integer, self.name(), self.operator_symbol())
    }

    /// Apply to already-resolved operands
    pub fn apply(self, left: &Value, right: &Value) -> FormulaResult<Number> {
        if self == ArithmeticOp::Division {
            // the divisor keeps its decimal form so an exact zero is caught
            let divisor = self.cast(right, false)?;
            if divisor.is_zero() {
                return Err(FormulaError::DivisionByZero);
            }
            let dividend = self.cast(left, true)?;
            let quotient = dividend
                .to_decimal()
                .checked_div(divisor.to_decimal())
                .ok_or(FormulaError::Overflow(self.name()))?;
            return Ok(Number::Decimal(quotient).narrow());
        }

        let l = self.cast(left, true)?;
        let r = self.cast(right, true)?;
        self.compute(l, r)
    }

    fn compute(self, l: Number, r: Number) -> FormulaResult<Number> {
        if self == ArithmeticOp::Modulo && r.is_zero() {
            return Err(FormulaError::DivisionByZero);
        }
        if self == ArithmeticOp::Exponentiation {
            return power(l, r);
        }

        if let (Number::Integer(a), Number::Integer(b)) = (l, r) {
            let exact = match self {
                ArithmeticOp::Addition => a.checked_add(b),
                ArithmeticOp::Subtraction => a.checked_sub(b),
                ArithmeticOp::Multiplication => a.checked_mul(b),
                ArithmeticOp::Modulo => a
                    .checked_rem(b)
                    .map(|rem| if rem != 0 && (rem < 0) != (b < 0) { rem + b } else { rem }),
                ArithmeticOp::Exponentiation | ArithmeticOp::Division => None,
            };
            if let Some(n) = exact {
                return Ok(Number::Integer(n));
            }
        }

        let (a, b) = (l.to_decimal(), r.to_decimal());
        let result = match self {
            ArithmeticOp::Addition => a.checked_add(b),
            ArithmeticOp::Subtraction => a.checked_sub(b),
            ArithmeticOp::Multiplication => a.checked_mul(b),
            ArithmeticOp::Division => a.checked_div(b),
            // floored: the result takes the sign of the divisor
            ArithmeticOp::Modulo => a.checked_rem(b).map(|rem| {
                if !rem.is_zero() && rem.is_sign_negative() != b.is_sign_negative() {
                    rem + b
                } else {
                    rem
                }
            }),
            ArithmeticOp::Exponentiation => None,
        };
        result
            .map(Number::Decimal)
            .ok_or(FormulaError::Overflow(self.name()))
    }
}

/// `base ^ exponent` over the reals
fn power(base: Number, exponent: Number) -> FormulaResult<Number> {
    const NAME: &str = "Exponentiation";

    if let (Number::Integer(a), Number::Integer(b)) = (base, exponent) {
        if let Some(n) = u32::try_from(b).ok().and_then(|e| a.checked_pow(e)) {
            return Ok(Number::Integer(n));
        }
    }

    let (a, e) = (base.to_decimal(), exponent.to_decimal());
    if a.is_zero() && e.is_sign_negative() && !e.is_zero() {
        return Err(FormulaError::DivisionByZero);
    }
    if a.is_sign_negative() && !a.is_zero() && !e.fract().is_zero() {
        return Err(FormulaError::Domain {
            operation: NAME,
            detail: format!("negative base {base} with fractional exponent {exponent}"),
        });
    }

    let result = match exponent {
        Number::Integer(e) => a.checked_powi(e),
        Number::Decimal(e) => a.checked_powd(e),
    };
    match result {
        Some(value) => Ok(Number::Decimal(value)),
        // the magnitude shrinks towards zero when |a| > 1 and e < 0, or |a| < 1 and e > 0
        None if (a.abs() > Decimal::ONE) == e.is_sign_negative() => Err(FormulaError::Underflow(NAME)),
        None => Err(FormulaError::Overflow(NAME)),
    }
}

/// Arithmetic node. A modulo node without a left operand reads as a
/// percentage of its right operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Arithmetic {
    op: ArithmeticOp,
    left: Option<Operand>,
    right: Operand,
}

impl Arithmetic {
    pub fn new(op: ArithmeticOp, left: Operand, right: Operand) -> FormulaResult<Self> {
        validate(op.name(), &left, Category::Numeric, Side::Left)?;
        validate(op.name(), &right, Category::Numeric, Side::Right)?;
        Ok(Self {
            op,
            left: Some(left),
            right,
        })
    }

    /// Unary `%`
    pub fn percent(operand: Operand) -> FormulaResult<Self> {
        let op = ArithmeticOp::Modulo;
        validate(op.name(), &operand, Category::Numeric, Side::Right)?;
        Ok(Self {
            op,
            left: None,
            right: operand,
        })
    }

    pub fn op(&self) -> ArithmeticOp {
        self.op
    }

    pub fn is_percent(&self) -> bool {
        self.left.is_none()
    }

    pub fn value(&self, ctx: &dyn Context) -> FormulaResult<Value> {
        let right = self.right.value(ctx)?;
        let number = match &self.left {
            Some(left) => self.op.apply(&left.value(ctx)?, &right)?,
            None => {
                let n = self.op.cast(&right, true)?;
                let hundredth = Decimal::new(1, 2);
                n.to_decimal()
                    .checked_mul(hundredth)
                    .map(Number::Decimal)
                    .ok_or(FormulaError::Overflow(self.op.name()))?
            }
        };
        Ok(Value::Number(number))
    }
}

/// Unary minus
pub fn negate(value: &Value) -> FormulaResult<Value> {
    match value {
        Value::Number(n) => Ok(Value::Number(n.negate())),
        other => Err(FormulaError::InvalidOperator {
            operation: "Negation",
            operator: "-",
            actual: other.type_name(),
        }),
    }
}

/// `|` and `&` on integer operands
pub fn bitwise(op: Operator, left: &Value, right: &Value) -> FormulaResult<Value> {
    let operation = match op {
        Operator::BitOr => "BitwiseOr",
        Operator::BitAnd => "BitwiseAnd",
        _ => {
            return Err(FormulaError::InvalidOperator {
                operation: "Bitwise",
                operator: op.symbol(),
                actual: left.type_name(),
            })
        }
    };
    let l = integer_operand(left, operation, op.symbol())?;
    let r = integer_operand(right, operation, op.symbol())?;
    Ok(Value::from(if op == Operator::BitOr { l | r } else { l & r }))
}

fn integer_operand(
    value: &Value,
    operation: &'static str,
    operator: &'static str,
) -> FormulaResult<i64> {
    match coerce(value, true, operation, operator)? {
        Number::Integer(i) => Ok(i),
        Number::Decimal(d) => Err(FormulaError::InvalidValue {
            value: d.to_string(),
        }),
    }
}

/// Compare two resolved values.
///
/// Numbers, strings and date-times order within their own type. Any pair
/// may be tested for (in)equality; ordering across types is an error.
pub fn compare(cmp: Comparator, left: &Value, right: &Value) -> FormulaResult<bool> {
    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
        (Value::DateTime(l), Value::DateTime(r)) => Some(l.cmp(r)),
        _ => None,
    };

    match (cmp, ordering) {
        (Comparator::Eq, Some(o)) => Ok(o == Ordering::Equal),
        (Comparator::Ne, Some(o)) => Ok(o != Ordering::Equal),
        (Comparator::Eq, None) => Ok(left == right),
        (Comparator::Ne, None) => Ok(left != right),
        (Comparator::Lt, Some(o)) => Ok(o == Ordering::Less),
        (Comparator::Le, Some(o)) => Ok(o != Ordering::Greater),
        (Comparator::Gt, Some(o)) => Ok(o == Ordering::Greater),
        (Comparator::Ge, Some(o)) => Ok(o != Ordering::Less),
        (_, None) => Err(FormulaError::InvalidOperator {
            operation: "Comparison",
            operator: cmp.symbol(),
            actual: if left.type_name() == right.type_name() {
                left.type_name()
            } else {
                "mixed operands"
            },
        }),
    }
}

/// `and` / `or` node.
///
/// Both sides are always evaluated; the result is whichever operand decides
/// the outcome, not a freshly built boolean.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    op: Combinator,
    left: Operand,
    right: Operand,
}

impl Combination {
    pub fn new(op: Combinator, left: Operand, right: Operand) -> FormulaResult<Self> {
        let operation = match op {
            Combinator::And => "And",
            Combinator::Or => "Or",
        };
        validate(operation, &left, Category::Logical, Side::Left)?;
        validate(operation, &right, Category::Logical, Side::Right)?;
        Ok(Self { op, left, right })
    }

    pub fn value(&self, ctx: &dyn Context) -> FormulaResult<Value> {
        let left = self.left.value(ctx)?;
        let right = self.right.value(ctx)?;
        Ok(match self.op {
            Combinator::And => {
                if left.is_truthy() {
                    right
                } else {
                    left
                }
            }
            Combinator::Or => {
                if left.is_truthy() {
                    left
                } else {
                    right
                }
            }
        })
    }
}
