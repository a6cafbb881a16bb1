//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Which operand of a binary operation an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Errors that can occur during tokenizing or evaluating an expression
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Lexical error: unmatched input, zero-width match or unbalanced parentheses
    #[error("Tokenize error: {0}")]
    Tokenize(String),

    /// An operation was built with an operand of the wrong static type
    #[error("Type error: {operation} requires {expected} {side} operand, got {actual}")]
    Node {
        operation: &'static str,
        expected: &'static str,
        actual: &'static str,
        side: Side,
    },

    /// A string operand does not look like a number
    #[error("Invalid value: '{value}' is not coercible to numeric")]
    InvalidValue { value: String },

    /// An operand does not support the requested operator
    #[error("Invalid operator: {operation} does not support '{operator}' on {actual}")]
    InvalidOperator {
        operation: &'static str,
        operator: &'static str,
        actual: &'static str,
    },

    /// Right operand of a division or modulo is zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Decimal arithmetic left the representable range
    #[error("Numeric overflow in {0}")]
    Overflow(&'static str),

    /// Result is non-zero but smaller than the finest decimal scale
    #[error("Numeric underflow in {0}: result is below the smallest representable decimal")]
    Underflow(&'static str),

    /// The operation has no real-valued result for these operands
    #[error("Domain error: {operation} is undefined for {detail}")]
    Domain {
        operation: &'static str,
        detail: String,
    },

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, given {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Invalid argument passed to a function body
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// No rule applies while more than one token remains
    #[error("Unreducible expression: no rule matches {0}")]
    Unreducible(String),

    /// Identifier without a binding
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    /// The host-imposed reduction budget was exhausted
    #[error("Step limit of {0} reductions exceeded")]
    StepLimit(usize),
}

impl FormulaError {
    /// Create a tokenize error with a message
    pub fn tokenize<S: Into<String>>(msg: S) -> Self {
        FormulaError::Tokenize(msg.into())
    }

    /// Create an arity error for a function that needs at least `min` arguments
    pub fn too_few_arguments(function: &str, min: usize, actual: usize) -> Self {
        FormulaError::ArgumentCount {
            function: function.to_uppercase(),
            expected: format!("at least {min}"),
            actual,
        }
    }

    /// Create an arity error for a function that takes at most `max` arguments
    pub fn too_many_arguments(function: &str, max: usize, actual: usize) -> Self {
        FormulaError::ArgumentCount {
            function: function.to_uppercase(),
            expected: format!("at most {max}"),
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message() {
        let err = FormulaError::too_few_arguments("sum", 1, 0);
        assert_eq!(
            err.to_string(),
            "Wrong number of arguments for SUM: expected at least 1, given 0"
        );
    }

    #[test]
    fn test_node_message_names_side() {
        let err = FormulaError::Node {
            operation: "Addition",
            expected: "numeric",
            actual: "string",
            side: Side::Right,
        };
        assert_eq!(
            err.to_string(),
            "Type error: Addition requires numeric right operand, got string"
        );
    }
}
