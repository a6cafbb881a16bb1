//! Tokenizer: drives the scanner set over input text

use crate::error::{FormulaError, FormulaResult};
use crate::scanner::{ScannerSet, Scanned};
use crate::token::{Category, Token};

/// Converts expression text into a flat token stream
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    scanners: ScannerSet,
}

impl Tokenizer {
    pub fn new(scanners: ScannerSet) -> Self {
        Self { scanners }
    }

    pub fn scanners(&self) -> &ScannerSet {
        &self.scanners
    }

    pub fn scanners_mut(&mut self) -> &mut ScannerSet {
        &mut self.scanners
    }

    /// Tokenize an expression.
    ///
    /// Whitespace is dropped. Parenthesis nesting is checked as tokens are
    /// produced, so the stream handed to the evaluator is always balanced.
    ///
    /// # Example
    /// ```rust
    /// use reckon_formula::{Category, Tokenizer};
    ///
    /// let tokens = Tokenizer::default().tokenize("1 + 1").unwrap();
    /// let categories: Vec<_> = tokens.iter().map(|t| t.category()).collect();
    /// assert_eq!(categories, [Category::Numeric, Category::Operator, Category::Numeric]);
    /// ```
    pub fn tokenize(&self, input: &str) -> FormulaResult<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut nesting = 0usize;
        let mut offset = 0;

        while offset < input.len() {
            let rest = &input[offset..];
            let scanned = self
                .scan(rest, tokens.last())?
                .ok_or_else(|| FormulaError::tokenize(format!("parse error at: '{rest}'")))?;

            for token in scanned.tokens {
                if token.is_open() {
                    nesting += 1;
                } else if token.is_close() {
                    nesting = nesting
                        .checked_sub(1)
                        .ok_or_else(|| FormulaError::tokenize("too many closing parentheses"))?;
                }
                if !token.is(Category::Whitespace) {
                    tokens.push(token);
                }
            }
            offset += scanned.consumed;
        }

        if nesting > 0 {
            return Err(FormulaError::tokenize("too many opening parentheses"));
        }

        log::trace!("tokenized {input:?} into {} tokens", tokens.len());
        Ok(tokens)
    }

    fn scan(&self, input: &str, last: Option<&Token>) -> FormulaResult<Option<Scanned>> {
        for scanner in self.scanners.iter() {
            if let Some(scanned) = scanner.scan(input, last)? {
                if scanned.consumed == 0 {
                    return Err(FormulaError::tokenize(format!(
                        "unexpected zero-width match ({}) at '{input}'",
                        scanner.name()
                    )));
                }
                return Ok(Some(scanned));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use crate::token::{Comparator, Grouping, Operator, Symbol, TokenValue};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn tokenize(input: &str) -> Vec<Token> {
        Tokenizer::default().tokenize(input).unwrap()
    }

    fn categories(tokens: &[Token]) -> Vec<Category> {
        tokens.iter().map(Token::category).collect()
    }

    fn num(n: i64) -> Token {
        Token::data(n)
    }

    fn op(op: Operator) -> Token {
        Token::operator(op)
    }

    fn group(g: Grouping) -> Token {
        Token::grouping(g)
    }

    #[test]
    fn test_empty_expression() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_addition() {
        assert_eq!(tokenize("1+1"), vec![num(1), op(Operator::Add), num(1)]);
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(tokenize("-5"), vec![op(Operator::Negate), num(5)]);
        assert_eq!(
            tokenize("(-5)"),
            vec![
                group(Grouping::Open),
                op(Operator::Negate),
                num(5),
                group(Grouping::Close)
            ]
        );
        assert_eq!(
            tokenize("2 - -3"),
            vec![num(2), op(Operator::Subtract), op(Operator::Negate), num(3)]
        );
        assert_eq!(
            tokenize("0 * 10 ^ -5"),
            vec![
                num(0),
                op(Operator::Multiply),
                num(10),
                op(Operator::Pow),
                op(Operator::Negate),
                num(5)
            ]
        );
    }

    #[test]
    fn test_unary_minus_in_function_arguments() {
        let tokens = tokenize("if(-5 > x, -7, -8) - 9");
        assert_eq!(
            tokens,
            vec![
                Token::function("if"),
                group(Grouping::FunctionOpen),
                op(Operator::Negate),
                num(5),
                Token::comparator(Comparator::Gt),
                Token::identifier("x"),
                group(Grouping::Comma),
                op(Operator::Negate),
                num(7),
                group(Grouping::Comma),
                op(Operator::Negate),
                num(8),
                group(Grouping::Close),
                op(Operator::Subtract),
                num(9),
            ]
        );
    }

    #[test]
    fn test_comparators() {
        assert_eq!(
            tokenize("perimeter <= 7500"),
            vec![
                Token::identifier("perimeter"),
                Token::comparator(Comparator::Le),
                num(7500)
            ]
        );
        assert_eq!(tokenize("number == 5")[1], Token::comparator(Comparator::Eq));
        assert_eq!(tokenize("number = 5")[1], Token::comparator(Comparator::Eq));
        assert_eq!(tokenize("a <> b")[1], Token::comparator(Comparator::Ne));
        assert_eq!(tokenize("a != b")[1], Token::comparator(Comparator::Ne));
    }

    #[test]
    fn test_bitwise_operators() {
        assert_eq!(tokenize("2 | 3")[1], op(Operator::BitOr));
        assert_eq!(tokenize("2 & 3")[1], op(Operator::BitAnd));
    }

    #[test]
    fn test_strings() {
        let expected = vec![
            Token::identifier("animal"),
            Token::comparator(Comparator::Eq),
            Token::data("giraffe"),
        ];
        assert_eq!(tokenize("animal = \"giraffe\""), expected);
        assert_eq!(tokenize("animal = 'giraffe'"), expected);
    }

    #[test]
    fn test_combinators_and_identifiers() {
        let tokens = tokenize("octopi <= 7500 AND sharks > 1500");
        assert_eq!(
            categories(&tokens),
            vec![
                Category::Identifier,
                Category::Comparator,
                Category::Numeric,
                Category::Combinator,
                Category::Identifier,
                Category::Comparator,
                Category::Numeric
            ]
        );

        let tokens = tokenize("andover < 10");
        assert_eq!(tokens[0], Token::identifier("andover"));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_boolean_literals() {
        assert_eq!(
            categories(&tokenize("true and false")),
            vec![Category::Logical, Category::Combinator, Category::Logical]
        );
        assert_eq!(
            categories(&tokenize("true_lies and falsehoods")),
            vec![
                Category::Identifier,
                Category::Combinator,
                Category::Identifier
            ]
        );
    }

    #[test]
    fn test_decimal_operands() {
        let tokens = tokenize(".5 * 3.7");
        assert_eq!(categories(&tokens)[0], Category::Numeric);
        assert_eq!(
            tokens[0].as_number().unwrap().to_decimal().to_string(),
            "0.5"
        );
    }

    #[test]
    fn test_identifiers_are_lowercased() {
        assert_eq!(tokenize("Sea_Monkeys.Count")[0], Token::identifier("sea_monkeys.count"));
    }

    #[test]
    fn test_functions() {
        let tokens = tokenize("ROUNDUP(8.2)");
        assert_eq!(tokens[0], Token::function("roundup"));
        assert_eq!(tokens[1], group(Grouping::FunctionOpen));
        assert_eq!(tokenize("not (8 < 5)").len(), 6);
        assert_eq!(tokenize("exp!(5 * 3)")[0], Token::function("exp!"));
    }

    #[test]
    fn test_datetime_literals() {
        let tokens = tokenize(
            "2017-01-01 2017-01-2 2017-1-03 2017-01-04 12:23:42 2017-01-07 12:34:56 Z",
        );
        assert_eq!(tokens.len(), 5);
        assert!(tokens.iter().all(|t| t.is(Category::DateTime)));
    }

    #[test]
    fn test_null_and_case_keywords() {
        assert_eq!(tokenize("NULL"), vec![Token::data(Value::Null)]);
        let tokens = tokenize("case x when 1 then 2 else 3 end");
        assert_eq!(tokens[0].category(), Category::Case);
        assert_eq!(tokens.last().unwrap().category(), Category::Case);
        assert_eq!(tokenize("end_date")[0], Token::identifier("end_date"));
    }

    #[test]
    fn test_raw_length() {
        let tokens = tokenize("foo + 'bar'");
        assert_eq!(tokens[0].raw_length(), 3);
        assert_eq!(tokens[2].raw_length(), 5);
        assert!(matches!(
            tokens[1].value(),
            TokenValue::Symbol(Symbol::Operator(Operator::Add))
        ));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = Tokenizer::default().tokenize("(5+3").unwrap_err();
        assert!(err.to_string().contains("too many opening parentheses"));

        let err = Tokenizer::default().tokenize(")").unwrap_err();
        assert!(err.to_string().contains("too many closing parentheses"));

        let err = Tokenizer::default().tokenize("sum(1))").unwrap_err();
        assert!(err.to_string().contains("too many closing parentheses"));
    }

    #[test]
    fn test_unmatched_input() {
        let err = Tokenizer::default().tokenize("1 + $").unwrap_err();
        assert!(matches!(err, FormulaError::Tokenize(_)));
        assert!(err.to_string().contains("parse error at: '$'"));
    }

    #[test]
    fn test_zero_width_match_is_rejected() {
        let mut scanners = ScannerSet::default();
        scanners.register_first(
            Scanner::new("maybe_a", Category::Identifier, "a*", |_| Ok(vec![]), None).unwrap(),
        );
        let err = Tokenizer::new(scanners).tokenize("1").unwrap_err();
        assert!(err.to_string().contains("zero-width"));
    }
}
