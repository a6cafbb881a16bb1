//! Function definitions and the registry that backs function-call rules

pub mod math;

use crate::ast::parse_numeric_str;
use crate::error::{FormulaError, FormulaResult};
use crate::matcher::TokenMatcher;
use crate::value::{Number, Value};
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

/// Function body: receives fully evaluated arguments
pub type FunctionBody = Arc<dyn Fn(&[Value]) -> FormulaResult<Value> + Send + Sync>;

/// How many arguments a function takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// Between `min` and `max` (None = unlimited) arguments
    Variadic { min: usize, max: Option<usize> },
    /// Exactly one argument per named parameter
    Parameters(Vec<String>),
}

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (lowercase)
    name: String,
    signature: Signature,
    body: FunctionBody,
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl FunctionDef {
    /// Built-in taking between `min` and `max` arguments
    pub fn builtin(
        name: &str,
        min: usize,
        max: Option<usize>,
        body: fn(&[Value]) -> FormulaResult<Value>,
    ) -> Self {
        Self {
            name: name.to_lowercase(),
            signature: Signature::Variadic { min, max },
            body: Arc::new(body),
        }
    }

    /// Caller-supplied function with a fixed parameter list
    ///
    /// # Example
    /// ```rust
    /// use reckon_formula::{FunctionDef, Value};
    ///
    /// let double = FunctionDef::custom("double", ["x"], |args| {
    ///     let n = reckon_formula::functions::numeric(&args[0])?;
    ///     Ok(Value::from(n.to_decimal() * rust_decimal::Decimal::TWO))
    /// });
    /// assert_eq!(double.name(), "double");
    /// ```
    pub fn custom<I, S, F>(name: &str, parameters: I, body: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&[Value]) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.to_lowercase(),
            signature: Signature::Parameters(parameters.into_iter().map(Into::into).collect()),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn check_arity(&self, actual: usize) -> FormulaResult<()> {
        match &self.signature {
            Signature::Variadic { min, .. } if actual < *min => {
                Err(FormulaError::too_few_arguments(&self.name, *min, actual))
            }
            Signature::Variadic { max: Some(max), .. } if actual > *max => {
                Err(FormulaError::too_many_arguments(&self.name, *max, actual))
            }
            Signature::Variadic { .. } => Ok(()),
            Signature::Parameters(params) if params.len() != actual => {
                Err(FormulaError::ArgumentCount {
                    function: self.name.to_uppercase(),
                    expected: params.len().to_string(),
                    actual,
                })
            }
            Signature::Parameters(_) => Ok(()),
        }
    }

    /// Validate arity, then run the body
    pub fn call(&self, args: &[Value]) -> FormulaResult<Value> {
        self.check_arity(args.len())?;
        (self.body)(args)
    }

    /// Token pattern for a call to this function.
    ///
    /// Variadic functions take any comma-separated argument span; arity is
    /// checked when called. Fixed-parameter functions only match a call with
    /// exactly that many arguments.
    pub fn pattern(&self) -> Vec<TokenMatcher> {
        let mut pattern = vec![TokenMatcher::function(&self.name), TokenMatcher::fopen()];
        match &self.signature {
            Signature::Variadic { .. } => pattern.push(TokenMatcher::arguments()),
            Signature::Parameters(params) => {
                for i in 0..params.len() {
                    if i > 0 {
                        pattern.push(TokenMatcher::comma());
                    }
                    pattern.push(TokenMatcher::non_group());
                }
            }
        }
        pattern.push(TokenMatcher::close());
        pattern
    }
}

/// Function registry
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_math_functions();
        registry
    }

    /// A registry without any functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_lowercase())
    }

    /// Register a function, returning the definition it replaced
    pub fn register(&mut self, def: FunctionDef) -> Option<FunctionDef> {
        self.functions.insert(def.name.clone(), def)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef::builtin("sum", 1, None, math::fn_sum));
        self.register(FunctionDef::builtin("min", 1, None, math::fn_min));
        self.register(FunctionDef::builtin("max", 1, None, math::fn_max));
        self.register(FunctionDef::builtin("avg", 1, None, math::fn_avg));
        self.register(FunctionDef::builtin("round", 1, Some(2), math::fn_round));
        self.register(FunctionDef::builtin("roundup", 1, Some(2), math::fn_roundup));
        self.register(FunctionDef::builtin("rounddown", 1, Some(2), math::fn_rounddown));
    }
}

/// Coerce one argument to a number: numbers pass through, numeric-looking
/// strings are parsed, anything else is rejected
pub fn numeric(value: &Value) -> FormulaResult<Number> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Text(s) => parse_numeric_str(s).map(Number::narrow),
        other => Err(FormulaError::Argument(format!(
            "expected a numeric value, got {}",
            other.type_name()
        ))),
    }
}

/// Coerce arguments to numbers, flattening (nested) list arguments
pub fn flatten_numeric(args: &[Value]) -> FormulaResult<Vec<Number>> {
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Value::List(items) => numbers.extend(flatten_numeric(items)?),
            other => numbers.push(numeric(other)?),
        }
    }
    Ok(numbers)
}
