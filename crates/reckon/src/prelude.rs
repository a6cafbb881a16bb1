//! Prelude module - common imports for reckon users
//!
//! ```rust
//! use reckon::prelude::*;
//! ```

pub use crate::{
    // Main types
    Calculator,
    // Error types
    FormulaError,
    FunctionDef,
    Number,
    Result,
    Token,
    Value,
};
