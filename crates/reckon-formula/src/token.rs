//! Tokens: the atoms the rewrite evaluator works on

use crate::value::{Number, Value};
use std::fmt;

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Numeric,
    String,
    Logical,
    DateTime,
    Identifier,
    Operator,
    Comparator,
    Combinator,
    Grouping,
    Function,
    Case,
    Whitespace,
    Null,
}

/// Arithmetic and bitwise operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Pow,
    BitOr,
    BitAnd,
    /// Unary minus, decided at lex time from the previous token
    Negate,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract | Operator::Negate => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Mod => "%",
            Operator::Pow => "^",
            Operator::BitOr => "|",
            Operator::BitAnd => "&",
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
    Eq,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Ne => "!=",
            Comparator::Eq => "=",
        }
    }
}

/// Logical combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn symbol(self) -> &'static str {
        match self {
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }
}

/// Grouping punctuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grouping {
    Open,
    /// The `(` that directly follows a function name
    FunctionOpen,
    Close,
    Comma,
}

/// Case-statement keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CaseKeyword {
    Case,
    When,
    Then,
    Else,
    End,
}

/// The concrete, non-data values a matcher can ask for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Operator(Operator),
    Comparator(Comparator),
    Combinator(Combinator),
    Grouping(Grouping),
    /// Lower-cased function name
    Function(String),
    Case(CaseKeyword),
}

impl Symbol {
    pub fn category(&self) -> Category {
        match self {
            Symbol::Operator(_) => Category::Operator,
            Symbol::Comparator(_) => Category::Comparator,
            Symbol::Combinator(_) => Category::Combinator,
            Symbol::Grouping(_) => Category::Grouping,
            Symbol::Function(_) => Category::Function,
            Symbol::Case(_) => Category::Case,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Operator(op) => f.write_str(op.symbol()),
            Symbol::Comparator(cmp) => f.write_str(cmp.symbol()),
            Symbol::Combinator(comb) => f.write_str(comb.symbol()),
            Symbol::Grouping(Grouping::Open | Grouping::FunctionOpen) => f.write_str("("),
            Symbol::Grouping(Grouping::Close) => f.write_str(")"),
            Symbol::Grouping(Grouping::Comma) => f.write_str(","),
            Symbol::Function(name) => f.write_str(name),
            Symbol::Case(kw) => write!(f, "{}", format!("{kw:?}").to_lowercase()),
        }
    }
}

/// Semantic value carried by a token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// Numeric, string, logical, datetime, list or null data
    Data(Value),
    /// Lower-cased variable name, resolved before evaluation
    Identifier(String),
    Symbol(Symbol),
    Whitespace,
}

/// An immutable lexical unit.
///
/// Equality is structural over the value only; `raw_length` records how much
/// source text produced the token and does not take part in comparisons.
#[derive(Debug, Clone)]
pub struct Token {
    value: TokenValue,
    raw_length: usize,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Token {
    pub fn new(value: TokenValue, raw_length: usize) -> Self {
        Self { value, raw_length }
    }

    /// A data token that did not come from source text
    pub fn data(value: impl Into<Value>) -> Self {
        Self::new(TokenValue::Data(value.into()), 0)
    }

    pub fn symbol_token(symbol: Symbol) -> Self {
        Self::new(TokenValue::Symbol(symbol), 0)
    }

    pub fn operator(op: Operator) -> Self {
        Self::symbol_token(Symbol::Operator(op))
    }

    pub fn comparator(cmp: Comparator) -> Self {
        Self::symbol_token(Symbol::Comparator(cmp))
    }

    pub fn combinator(comb: Combinator) -> Self {
        Self::symbol_token(Symbol::Combinator(comb))
    }

    pub fn grouping(group: Grouping) -> Self {
        Self::symbol_token(Symbol::Grouping(group))
    }

    pub fn function(name: &str) -> Self {
        Self::symbol_token(Symbol::Function(name.to_lowercase()))
    }

    pub fn identifier(name: &str) -> Self {
        Self::new(TokenValue::Identifier(name.to_lowercase()), 0)
    }

    pub fn with_raw_length(mut self, raw_length: usize) -> Self {
        self.raw_length = raw_length;
        self
    }

    pub fn category(&self) -> Category {
        match &self.value {
            TokenValue::Data(value) => match value {
                // Lists travel with numbers, so arithmetic rules see them and
                // coercion rejects them
                Value::Number(_) | Value::List(_) => Category::Numeric,
                Value::Text(_) => Category::String,
                Value::Logical(_) => Category::Logical,
                Value::DateTime(_) => Category::DateTime,
                Value::Null => Category::Null,
            },
            TokenValue::Identifier(_) => Category::Identifier,
            TokenValue::Symbol(symbol) => symbol.category(),
            TokenValue::Whitespace => Category::Whitespace,
        }
    }

    pub fn value(&self) -> &TokenValue {
        &self.value
    }

    pub fn into_value(self) -> TokenValue {
        self.value
    }

    pub fn raw_length(&self) -> usize {
        self.raw_length
    }

    pub fn is(&self, category: Category) -> bool {
        self.category() == category
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        match &self.value {
            TokenValue::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn is_grouping(&self, group: Grouping) -> bool {
        matches!(&self.value, TokenValue::Symbol(Symbol::Grouping(g)) if *g == group)
    }

    /// Plain or function-call open parenthesis
    pub fn is_open(&self) -> bool {
        self.is_grouping(Grouping::Open) || self.is_grouping(Grouping::FunctionOpen)
    }

    pub fn is_close(&self) -> bool {
        self.is_grouping(Grouping::Close)
    }

    pub fn is_comma(&self) -> bool {
        self.is_grouping(Grouping::Comma)
    }

    pub fn as_data(&self) -> Option<&Value> {
        match &self.value {
            TokenValue::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        self.as_data().and_then(Value::as_number)
    }

    pub fn into_data(self) -> Option<Value> {
        match self.value {
            TokenValue::Data(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for Token {
    fn from(value: Value) -> Self {
        Token::data(value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TokenValue::Data(Value::Text(s)) => write!(f, "\"{s}\""),
            TokenValue::Data(value) => write!(f, "{value}"),
            TokenValue::Identifier(name) => f.write_str(name),
            TokenValue::Symbol(symbol) => write!(f, "{symbol}"),
            TokenValue::Whitespace => f.write_str(" "),
        }
    }
}

/// Render a token stream for error messages and logs
pub fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
