//! Calculator: variable memory around the formula engine
//!
//! The engine only reduces token streams made of data and symbols. The
//! calculator owns the tokenizer, the rule set and a memory of named values,
//! and replaces every identifier with the value bound to it before handing
//! the stream to the evaluator.
//!
//! # Example
//!
//! ```rust
//! use reckon::prelude::*;
//!
//! let mut calc = Calculator::new();
//! calc.store("width", 3);
//! assert_eq!(calc.evaluate("width * 2").unwrap(), Value::from(6));
//! assert_eq!(calc.evaluate_with("width * h", [("h", 5)]).unwrap(), Value::from(15));
//!
//! // temporary bindings do not stick
//! assert!(calc.memory("h").is_none());
//! ```

use crate::{FormulaError, Result};
use ahash::AHashMap;
use reckon_formula::{
    Context, Evaluator, EvaluatorOptions, FunctionDef, RuleSet, Token, TokenValue, Tokenizer,
    Value,
};

/// Expression calculator with persistent variable bindings
#[derive(Debug, Clone, Default)]
pub struct Calculator {
    tokenizer: Tokenizer,
    rules: RuleSet,
    options: EvaluatorOptions,
    memory: AHashMap<String, Value>,
}

/// Temporary bindings layered over the calculator's memory
struct Scope<'a> {
    bindings: AHashMap<String, Value>,
    memory: &'a AHashMap<String, Value>,
}

impl Context for Scope<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings
            .get(name)
            .or_else(|| self.memory.get(name))
            .cloned()
    }
}

impl Calculator {
    /// Create a calculator with the default scanners, core rules and
    /// built-in functions
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom tokenizer (e.g. with extra or fewer scanners)
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Bound the number of rewrite steps a single evaluation may take
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.options.max_steps = Some(max_steps);
        self
    }

    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> EvaluatorOptions {
        self.options
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Register a custom function; a later registration under the same name
    /// replaces the earlier one
    pub fn add_function(&mut self, def: FunctionDef) -> &mut Self {
        self.rules.add_function(def);
        self
    }

    /// Bind a value in memory. Names are case-insensitive.
    pub fn store(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let name = name.to_lowercase();
        log::debug!("store {name}");
        self.memory.insert(name, value.into());
        self
    }

    /// Alias for [`Calculator::store`]
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.store(name, value)
    }

    /// Bind several values at once
    pub fn store_all<I, K, V>(&mut self, bindings: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in bindings {
            self.store(name.as_ref(), value);
        }
        self
    }

    /// Value bound to `name`, if any
    pub fn memory(&self, name: &str) -> Option<&Value> {
        self.memory.get(&name.to_lowercase())
    }

    /// Forget all bindings
    pub fn clear(&mut self) -> &mut Self {
        self.memory.clear();
        self
    }

    /// Is memory empty?
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Tokenize without evaluating; identifiers are left unresolved
    pub fn tokenize(&self, expression: &str) -> Result<Vec<Token>> {
        self.tokenizer.tokenize(expression)
    }

    /// Evaluate using the bindings in memory
    pub fn evaluate(&self, expression: &str) -> Result<Value> {
        self.evaluate_with(expression, std::iter::empty::<(&str, Value)>())
    }

    /// Evaluate with extra bindings that only apply to this evaluation and
    /// shadow values in memory
    pub fn evaluate_with<I, K, V>(&self, expression: &str, bindings: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let scope = Scope {
            bindings: bindings
                .into_iter()
                .map(|(name, value)| (name.as_ref().to_lowercase(), value.into()))
                .collect(),
            memory: &self.memory,
        };

        let tokens = self.tokenize(expression)?;
        let tokens = resolve(tokens, &scope)?;

        let mut evaluator = Evaluator::new(&self.rules, self.options);
        let value = evaluator.evaluate(tokens)?;
        log::debug!(
            "evaluated {expression:?} in {} steps",
            evaluator.steps()
        );
        Ok(value)
    }

    /// Identifiers `expression` refers to, in order of first appearance
    pub fn dependencies(&self, expression: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for token in self.tokenize(expression)? {
            if let TokenValue::Identifier(name) = token.value() {
                if !names.contains(name) && self.memory(name).is_none() {
                    names.push(name.clone());
                }
            }
        }
        Ok(names)
    }
}

/// Replace identifier tokens with data tokens holding their bound values
fn resolve(tokens: Vec<Token>, ctx: &dyn Context) -> Result<Vec<Token>> {
    tokens
        .into_iter()
        .map(|token| match token.value() {
            TokenValue::Identifier(name) => ctx
                .resolve(name)
                .map(|value| Token::data(value).with_raw_length(token.raw_length()))
                .ok_or_else(|| FormulaError::UnboundVariable(name.clone())),
            _ => Ok(token),
        })
        .collect()
}
