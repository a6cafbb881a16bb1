//! # reckon-formula
//!
//! Formula tokenizer and rewrite evaluator for reckon.
//!
//! This crate provides:
//! - Tokenizing (text → tokens) with an ordered, replaceable scanner set
//! - Evaluation by repeated pattern rewriting over the token stream, where
//!   rule order alone decides operator precedence
//! - Built-in functions (`SUM`, `MIN`, `MAX`, `AVG`, `ROUND`, ...) and
//!   registration of custom ones
//!
//! ## Example
//!
//! ```rust
//! use reckon_formula::{evaluate, RuleSet, Tokenizer, Value};
//!
//! let tokens = Tokenizer::default().tokenize("1 + 1 * 5").unwrap();
//! let result = evaluate(tokens, &RuleSet::new()).unwrap();
//! assert_eq!(result, Value::from(6));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod matcher;
pub mod rules;
pub mod scanner;
pub mod token;
pub mod tokenizer;
pub mod value;

pub use ast::{Arithmetic, ArithmeticOp, Combination, Context, Operand};
pub use error::{FormulaError, FormulaResult, Side};
pub use evaluator::{evaluate, Evaluator, EvaluatorOptions, RuleMatch};
pub use functions::{FunctionDef, FunctionRegistry, Signature};
pub use matcher::TokenMatcher;
pub use rules::{Action, Rule, RuleSet};
pub use scanner::{Scanner, ScannerSet};
pub use token::{Category, Symbol, Token, TokenValue};
pub use tokenizer::Tokenizer;
pub use value::{Number, Value};
