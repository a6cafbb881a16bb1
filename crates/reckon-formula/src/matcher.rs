//! Token matchers: the pattern language rules are written in

use crate::token::{Category, Combinator, Comparator, Grouping, Operator, Symbol, Token};

/// How many tokens a matcher consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    /// Exactly one token satisfying the predicate
    Single,
    /// A non-empty run up to the next top-level comma or unmatched close
    NonGroup,
    /// Like `NonGroup` but may be empty
    NonGroupStar,
    /// Zero or more comma-separated non-group runs
    Arguments,
}

/// Predicate over a token's category and value.
///
/// Empty `categories` or `values` mean "any". Span matchers ignore both and
/// consume balanced runs of tokens instead.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenMatcher {
    categories: Vec<Category>,
    values: Vec<Symbol>,
    span: Span,
    anchored: bool,
}

impl TokenMatcher {
    pub fn new(
        categories: impl IntoIterator<Item = Category>,
        values: impl IntoIterator<Item = Symbol>,
    ) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            values: values.into_iter().collect(),
            span: Span::Single,
            anchored: false,
        }
    }

    /// Matches any single token
    pub fn any() -> Self {
        Self::new([], [])
    }

    pub fn category(category: Category) -> Self {
        Self::new([category], [])
    }

    fn span(span: Span) -> Self {
        Self {
            span,
            ..Self::any()
        }
    }

    /// Restrict to position 0 of the stream being reduced
    pub fn anchored(mut self) -> Self {
        self.anchored = true;
        self
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Concrete categories this matcher can match
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Concrete values this matcher can match
    pub fn values(&self) -> &[Symbol] {
        &self.values
    }

    /// Single-token predicate
    pub fn matches(&self, token: &Token) -> bool {
        let category_ok = self.categories.is_empty() || self.categories.contains(&token.category());
        let value_ok = self.values.is_empty()
            || token
                .symbol()
                .map_or(false, |symbol| self.values.contains(symbol));
        category_ok && value_ok
    }

    /// Number of tokens matched starting at `offset`, if any
    pub fn match_at(&self, tokens: &[Token], offset: usize) -> Option<usize> {
        if self.anchored && offset != 0 {
            return None;
        }
        match self.span {
            Span::Single => tokens
                .get(offset)
                .filter(|token| self.matches(token))
                .map(|_| 1),
            Span::NonGroup => Some(non_group_len(tokens, offset)).filter(|len| *len > 0),
            Span::NonGroupStar => Some(non_group_len(tokens, offset)),
            Span::Arguments => arguments_len(tokens, offset),
        }
    }

    // === Named matchers used by the core rules ===

    pub fn numeric() -> Self {
        Self::category(Category::Numeric)
    }

    pub fn string() -> Self {
        Self::category(Category::String)
    }

    pub fn logical() -> Self {
        Self::category(Category::Logical)
    }

    pub fn datetime() -> Self {
        Self::category(Category::DateTime)
    }

    fn operators(ops: &[Operator]) -> Self {
        Self::new(
            [Category::Operator],
            ops.iter().map(|op| Symbol::Operator(*op)),
        )
    }

    fn comparators(cmps: &[Comparator]) -> Self {
        Self::new(
            [Category::Comparator],
            cmps.iter().map(|cmp| Symbol::Comparator(*cmp)),
        )
    }

    pub fn addsub() -> Self {
        Self::operators(&[Operator::Add, Operator::Subtract])
    }

    /// Binary or unary minus
    pub fn minus() -> Self {
        Self::operators(&[Operator::Subtract, Operator::Negate])
    }

    /// Minus at the very start of the stream
    pub fn anchored_minus() -> Self {
        Self::minus().anchored()
    }

    pub fn muldiv() -> Self {
        Self::operators(&[Operator::Multiply, Operator::Divide])
    }

    pub fn pow() -> Self {
        Self::operators(&[Operator::Pow])
    }

    pub fn modulo() -> Self {
        Self::operators(&[Operator::Mod])
    }

    pub fn bitwise() -> Self {
        Self::operators(&[Operator::BitOr, Operator::BitAnd])
    }

    pub fn comparator() -> Self {
        Self::category(Category::Comparator)
    }

    pub fn comp_lt() -> Self {
        Self::comparators(&[Comparator::Lt, Comparator::Le])
    }

    pub fn comp_gt() -> Self {
        Self::comparators(&[Comparator::Gt, Comparator::Ge])
    }

    pub fn combinator() -> Self {
        Self::new(
            [Category::Combinator],
            [
                Symbol::Combinator(Combinator::And),
                Symbol::Combinator(Combinator::Or),
            ],
        )
    }

    /// Plain open parenthesis, not the one after a function name
    pub fn open() -> Self {
        Self::new([Category::Grouping], [Symbol::Grouping(Grouping::Open)])
    }

    pub fn fopen() -> Self {
        Self::new(
            [Category::Grouping],
            [Symbol::Grouping(Grouping::FunctionOpen)],
        )
    }

    pub fn close() -> Self {
        Self::new([Category::Grouping], [Symbol::Grouping(Grouping::Close)])
    }

    pub fn comma() -> Self {
        Self::new([Category::Grouping], [Symbol::Grouping(Grouping::Comma)])
    }

    pub fn function(name: &str) -> Self {
        Self::new(
            [Category::Function],
            [Symbol::Function(name.to_lowercase())],
        )
    }

    pub fn non_group() -> Self {
        Self::span(Span::NonGroup)
    }

    pub fn non_group_star() -> Self {
        Self::span(Span::NonGroupStar)
    }

    pub fn arguments() -> Self {
        Self::span(Span::Arguments)
    }
}

/// Length of the run starting at `offset` that stops at a top-level comma or
/// an unmatched close. Nested groups are skipped as balanced pairs.
fn non_group_len(tokens: &[Token], offset: usize) -> usize {
    run_len(tokens, offset, false)
}

fn run_len(tokens: &[Token], offset: usize, through_commas: bool) -> usize {
    let mut depth = 0usize;
    let mut len = 0;
    for token in tokens.iter().skip(offset) {
        if token.is_open() {
            depth += 1;
        } else if token.is_close() {
            if depth == 0 {
                break;
            }
            depth -= 1;
        } else if token.is_comma() && depth == 0 && !through_commas {
            break;
        }
        len += 1;
    }
    len
}

/// An argument list is empty or a comma-separated sequence of non-empty runs
fn arguments_len(tokens: &[Token], offset: usize) -> Option<usize> {
    let total = run_len(tokens, offset, true);
    if total == 0 {
        return Some(0);
    }
    let mut pos = offset;
    let end = offset + total;
    loop {
        let arg = non_group_len(tokens, pos);
        if arg == 0 {
            return None;
        }
        pos += arg;
        if pos == end {
            return Some(total);
        }
        // top-level comma
        pos += 1;
    }
}

/// Split a span at its top-level commas
pub fn split_arguments(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut pos = 0;
    loop {
        let len = non_group_len(tokens, pos);
        args.push(&tokens[pos..pos + len]);
        pos += len;
        if pos >= tokens.len() {
            break;
        }
        pos += 1;
        if pos == tokens.len() {
            args.push(&tokens[pos..]);
            break;
        }
    }
    args
}
