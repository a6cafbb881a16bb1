//! Lexical scanners
//!
//! A scanner pairs an anchored, case-insensitive regular expression with a
//! converter that turns the matched text into tokens, plus an optional
//! condition on the previously emitted token. The tokenizer tries scanners in
//! [`ScannerSet`] order at every input position and takes the first hit.

use crate::error::{FormulaError, FormulaResult};
use crate::token::{
    CaseKeyword, Category, Combinator, Comparator, Grouping, Operator, Symbol, Token, TokenValue,
};
use crate::value::{Number, Value};
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use lazy_regex::regex;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Turns matched text into one or more tokens
pub type Converter = fn(&str) -> FormulaResult<Vec<Token>>;

/// Decides from the previous token whether a scanner may fire
pub type Condition = fn(Option<&Token>) -> bool;

/// Tokens produced by one successful scan
#[derive(Debug, Clone, PartialEq)]
pub struct Scanned {
    pub tokens: Vec<Token>,
    /// Bytes of input consumed
    pub consumed: usize,
}

/// A single lexical recognizer
#[derive(Debug, Clone)]
pub struct Scanner {
    name: &'static str,
    category: Category,
    pattern: Regex,
    converter: Converter,
    condition: Option<Condition>,
}

impl Scanner {
    /// Build a scanner from an unanchored pattern.
    ///
    /// The pattern is anchored to the start of the remaining input and made
    /// case-insensitive.
    pub fn new(
        name: &'static str,
        category: Category,
        pattern: &str,
        converter: Converter,
        condition: Option<Condition>,
    ) -> FormulaResult<Self> {
        let pattern = Regex::new(&format!(r"(?i)\A(?:{pattern})")).map_err(|e| {
            FormulaError::tokenize(format!("invalid pattern for scanner '{name}': {e}"))
        })?;
        Ok(Self::compiled(name, category, pattern, converter, condition))
    }

    fn compiled(
        name: &'static str,
        category: Category,
        pattern: Regex,
        converter: Converter,
        condition: Option<Condition>,
    ) -> Self {
        Self {
            name,
            category,
            pattern,
            converter,
            condition,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Try to recognize a token at the start of `input`
    pub fn scan(&self, input: &str, last: Option<&Token>) -> FormulaResult<Option<Scanned>> {
        let Some(m) = self.pattern.find(input) else {
            return Ok(None);
        };
        if let Some(condition) = self.condition {
            if !condition(last) {
                return Ok(None);
            }
        }
        let tokens = (self.converter)(m.as_str())?;
        Ok(Some(Scanned {
            tokens,
            consumed: m.end(),
        }))
    }
}

/// Ordered collection of scanners
#[derive(Debug, Clone)]
pub struct ScannerSet {
    scanners: Vec<Scanner>,
}

impl Default for ScannerSet {
    fn default() -> Self {
        Self {
            scanners: vec![
                whitespace(),
                null(),
                datetime(),
                numeric(),
                double_quoted_string(),
                single_quoted_string(),
                negate(),
                operator(),
                grouping(),
                case_statement(),
                comparator(),
                combinator(),
                boolean(),
                function(),
                identifier(),
            ],
        }
    }
}

impl ScannerSet {
    /// An empty set, for hosts assembling their own lexicon
    pub fn empty() -> Self {
        Self {
            scanners: Vec::new(),
        }
    }

    /// Add a scanner. A scanner with the same name is replaced in place,
    /// otherwise the new one is tried last.
    pub fn register(&mut self, scanner: Scanner) -> &mut Self {
        match self.scanners.iter_mut().find(|s| s.name == scanner.name) {
            Some(existing) => *existing = scanner,
            None => self.scanners.push(scanner),
        }
        self
    }

    /// Add a scanner that is tried before all others
    pub fn register_first(&mut self, scanner: Scanner) -> &mut Self {
        self.scanners.retain(|s| s.name != scanner.name);
        self.scanners.insert(0, scanner);
        self
    }

    /// Keep only the named scanners, preserving order
    pub fn retain(&mut self, names: &[&str]) -> &mut Self {
        self.scanners.retain(|s| names.contains(&s.name));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scanner> {
        self.scanners.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.scanners.iter().map(Scanner::name).collect()
    }
}

fn single(value: TokenValue, raw: &str) -> Vec<Token> {
    vec![Token::new(value, raw.len())]
}

fn symbol(symbol: Symbol, raw: &str) -> Vec<Token> {
    single(TokenValue::Symbol(symbol), raw)
}

fn unknown_lexeme(kind: &str, raw: &str) -> FormulaError {
    FormulaError::tokenize(format!("unknown {kind} '{raw}'"))
}

fn whitespace() -> Scanner {
    Scanner::compiled(
        "whitespace",
        Category::Whitespace,
        Regex::clone(regex!(r"\A\s+")),
        |raw| Ok(single(TokenValue::Whitespace, raw)),
        None,
    )
}

fn null() -> Scanner {
    Scanner::compiled(
        "null",
        Category::Null,
        Regex::clone(regex!(r"(?i)\Anull\b")),
        |raw| Ok(single(TokenValue::Data(Value::Null), raw)),
        None,
    )
}

fn datetime() -> Scanner {
    Scanner::compiled(
        "datetime",
        Category::DateTime,
        Regex::clone(regex!(
            r"(?i)\A\d{2}\d{2}?-\d{1,2}-\d{1,2}( \d{1,2}:\d{1,2}:\d{1,2})? ?(Z|((\+|-)\d{2}:?\d{2}))?"
        )),
        |raw| Ok(single(TokenValue::Data(parse_datetime(raw)?), raw)),
        None,
    )
}

/// Parse `YYYY-M-D[ H:M:S][ Z|±HH:MM]`. A literal without a zone is UTC.
fn parse_datetime(raw: &str) -> FormulaResult<Value> {
    let parts = regex!(
        r"(?i)^(\d{2,4})-(\d{1,2})-(\d{1,2})(?: (\d{1,2}):(\d{1,2}):(\d{1,2}))? ?(?:(Z)|([+-])(\d{2}):?(\d{2}))?$"
    );
    let invalid = || FormulaError::tokenize(format!("invalid date-time literal '{raw}'"));
    let caps = parts.captures(raw.trim()).ok_or_else(invalid)?;
    let field = |i: usize| -> u32 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let date = NaiveDate::from_ymd_opt(year, field(2), field(3)).ok_or_else(invalid)?;
    let time = NaiveTime::from_hms_opt(field(4), field(5), field(6)).ok_or_else(invalid)?;

    let offset_secs = match caps.get(8) {
        Some(sign) => {
            let secs = (field(9) * 3600 + field(10) * 60) as i32;
            if sign.as_str() == "-" {
                -secs
            } else {
                secs
            }
        }
        None => 0,
    };
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(invalid)?;
    let local = NaiveDateTime::new(date, time);
    offset
        .from_local_datetime(&local)
        .single()
        .map(Value::DateTime)
        .ok_or_else(invalid)
}

fn numeric() -> Scanner {
    Scanner::compiled(
        "numeric",
        Category::Numeric,
        Regex::clone(regex!(r"(?i)\A(\d+(\.\d+)?|\.\d+)(e[+-]?\d+)?\b")),
        |raw| Ok(single(TokenValue::Data(Value::Number(parse_number(raw)?)), raw)),
        None,
    )
}

/// Integer when there is no decimal point or exponent, otherwise decimal
pub(crate) fn parse_number(raw: &str) -> FormulaResult<Number> {
    let invalid = |e: rust_decimal::Error| {
        FormulaError::tokenize(format!("invalid numeric literal '{raw}': {e}"))
    };
    let padded;
    let text = if raw.starts_with('.') {
        padded = format!("0{raw}");
        padded.as_str()
    } else {
        raw
    };

    if text.contains(['e', 'E']) {
        return Decimal::from_scientific(text)
            .map(Number::Decimal)
            .map_err(invalid);
    }
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Number::Integer(i));
        }
    }
    Decimal::from_str(text).map(Number::Decimal).map_err(invalid)
}

fn double_quoted_string() -> Scanner {
    Scanner::compiled(
        "double_quoted_string",
        Category::String,
        Regex::clone(regex!(r#"\A"[^"]*""#)),
        |raw| {
            let text = &raw[1..raw.len() - 1];
            Ok(single(TokenValue::Data(Value::Text(text.to_string())), raw))
        },
        None,
    )
}

fn single_quoted_string() -> Scanner {
    Scanner::compiled(
        "single_quoted_string",
        Category::String,
        Regex::clone(regex!(r"\A'[^']*'")),
        |raw| {
            let text = &raw[1..raw.len() - 1];
            Ok(single(TokenValue::Data(Value::Text(text.to_string())), raw))
        },
        None,
    )
}

/// `-` is unary when nothing that could be a left operand precedes it
fn negate() -> Scanner {
    Scanner::compiled(
        "negate",
        Category::Operator,
        Regex::clone(regex!(r"\A-")),
        |raw| Ok(symbol(Symbol::Operator(Operator::Negate), raw)),
        Some(starts_operand as Condition),
    )
}

fn starts_operand(last: Option<&Token>) -> bool {
    match last {
        None => true,
        Some(token) => {
            matches!(
                token.category(),
                Category::Operator | Category::Comparator | Category::Combinator
            ) || token.is_open()
                || token.is_comma()
        }
    }
}

fn operator() -> Scanner {
    Scanner::compiled(
        "operator",
        Category::Operator,
        Regex::clone(regex!(r"\A(\^|\+|-|\*|/|%|\||&)")),
        |raw| {
            let op = match raw {
                "^" => Operator::Pow,
                "+" => Operator::Add,
                "-" => Operator::Subtract,
                "*" => Operator::Multiply,
                "/" => Operator::Divide,
                "%" => Operator::Mod,
                "|" => Operator::BitOr,
                "&" => Operator::BitAnd,
                _ => return Err(unknown_lexeme("operator", raw)),
            };
            Ok(symbol(Symbol::Operator(op), raw))
        },
        None,
    )
}

fn grouping() -> Scanner {
    Scanner::compiled(
        "grouping",
        Category::Grouping,
        Regex::clone(regex!(r"\A(\(|\)|,)")),
        |raw| {
            let group = match raw {
                "(" => Grouping::Open,
                ")" => Grouping::Close,
                "," => Grouping::Comma,
                _ => return Err(unknown_lexeme("grouping", raw)),
            };
            Ok(symbol(Symbol::Grouping(group), raw))
        },
        None,
    )
}

fn case_statement() -> Scanner {
    Scanner::compiled(
        "case_statement",
        Category::Case,
        Regex::clone(regex!(r"(?i)\A(case|end|then|when|else)\b")),
        |raw| {
            let keyword = match raw.to_lowercase().as_str() {
                "case" => CaseKeyword::Case,
                "end" => CaseKeyword::End,
                "then" => CaseKeyword::Then,
                "when" => CaseKeyword::When,
                "else" => CaseKeyword::Else,
                _ => return Err(unknown_lexeme("keyword", raw)),
            };
            Ok(symbol(Symbol::Case(keyword), raw))
        },
        None,
    )
}

fn comparator() -> Scanner {
    Scanner::compiled(
        "comparator",
        Category::Comparator,
        // two-character lexemes first
        Regex::clone(regex!(r"\A(<=|>=|!=|<>|<|>|==|=)")),
        |raw| {
            let cmp = match raw {
                "<=" => Comparator::Le,
                ">=" => Comparator::Ge,
                "!=" | "<>" => Comparator::Ne,
                "<" => Comparator::Lt,
                ">" => Comparator::Gt,
                "=" | "==" => Comparator::Eq,
                _ => return Err(unknown_lexeme("comparator", raw)),
            };
            Ok(symbol(Symbol::Comparator(cmp), raw))
        },
        None,
    )
}

fn combinator() -> Scanner {
    Scanner::compiled(
        "combinator",
        Category::Combinator,
        Regex::clone(regex!(r"(?i)\A(and|or)\b")),
        |raw| {
            let comb = if raw.eq_ignore_ascii_case("and") {
                Combinator::And
            } else {
                Combinator::Or
            };
            Ok(symbol(Symbol::Combinator(comb), raw))
        },
        None,
    )
}

fn boolean() -> Scanner {
    Scanner::compiled(
        "boolean",
        Category::Logical,
        Regex::clone(regex!(r"(?i)\A(true|false)\b")),
        |raw| {
            let value = raw.eq_ignore_ascii_case("true");
            Ok(single(TokenValue::Data(Value::Logical(value)), raw))
        },
        None,
    )
}

/// `name(` becomes a function token followed by a function-open token
fn function() -> Scanner {
    Scanner::compiled(
        "function",
        Category::Function,
        Regex::clone(regex!(r"(?i)\A\w+!?\s*\(")),
        |raw| {
            let head = &raw[..raw.len() - 1];
            let name = head.trim().to_lowercase();
            Ok(vec![
                Token::new(TokenValue::Symbol(Symbol::Function(name)), head.len()),
                Token::new(TokenValue::Symbol(Symbol::Grouping(Grouping::FunctionOpen)), 1),
            ])
        },
        None,
    )
}

fn identifier() -> Scanner {
    Scanner::compiled(
        "identifier",
        Category::Identifier,
        Regex::clone(regex!(r"(?i)\A[\w.]+\b")),
        |raw| Ok(single(TokenValue::Identifier(raw.trim().to_lowercase()), raw)),
        None,
    )
}
