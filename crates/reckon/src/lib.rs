//! # reckon
//!
//! An embeddable formula-expression calculator for business rules.
//!
//! Expressions combine arithmetic, comparisons, logical combinators, string
//! and date-time literals, function calls and named variables. A
//! [`Calculator`] keeps variable bindings between evaluations and can be
//! extended with custom functions.
//!
//! ## Example
//!
//! ```rust
//! use reckon::prelude::*;
//!
//! let mut calc = Calculator::new();
//! calc.store("price", 40).store("quantity", 3);
//!
//! let total = calc.evaluate("price * quantity").unwrap();
//! assert_eq!(total, Value::from(120));
//!
//! let discounted = calc
//!     .evaluate_with("if(total > 100, total * 0.9, total)", [("total", total)])
//!     .unwrap();
//! assert_eq!(discounted, Value::from(108));
//! ```

pub mod calculator;
pub mod prelude;

pub use calculator::Calculator;

// Re-export engine types
pub use reckon_formula::functions;
pub use reckon_formula::{
    Category, EvaluatorOptions, FormulaError, FunctionDef, Number, RuleSet, ScannerSet, Token,
    Tokenizer, Value,
};

/// Result type alias using [`FormulaError`]
pub type Result<T> = std::result::Result<T, FormulaError>;

/// Evaluate an expression without any variable bindings
///
/// ```rust
/// assert_eq!(reckon::evaluate("2 + 2").unwrap(), reckon::Value::from(4));
/// ```
pub fn evaluate(expression: &str) -> Result<Value> {
    Calculator::new().evaluate(expression)
}
