//! Formula evaluator
//!
//! Evaluates a token stream by repeated rewriting: find the highest-priority
//! rule that matches somewhere, replace the matched span with the result of
//! its action, and repeat until a single token is left.

use crate::ast::{bitwise, compare, negate, Arithmetic, ArithmeticOp, Combination, Operand};
use crate::error::{FormulaError, FormulaResult};
use crate::matcher::{split_arguments, TokenMatcher};
use crate::rules::{Action, Rule, RuleSet};
use crate::token::{render, Combinator, Symbol, Token, TokenValue};
use crate::value::Value;

/// Host-imposed limits on a single evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// Maximum number of rewrite steps, counted across nested groups and
    /// arguments. `None` means unlimited.
    pub max_steps: Option<usize>,
}

/// Where a rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    /// Index in [`RuleSet::rules`] order
    pub rule: usize,
    pub start: usize,
    pub len: usize,
}

/// Evaluate a complete token stream with the default options
pub fn evaluate(tokens: Vec<Token>, rules: &RuleSet) -> FormulaResult<Value> {
    Evaluator::new(rules, EvaluatorOptions::default()).evaluate(tokens)
}

/// Match `pattern` against `tokens` starting at `start`, returning the number
/// of tokens consumed
pub fn match_pattern(pattern: &[TokenMatcher], tokens: &[Token], start: usize) -> Option<usize> {
    let mut offset = start;
    for matcher in pattern {
        offset += matcher.match_at(tokens, offset)?;
    }
    Some(offset - start)
}

/// Leftmost match of a single pattern
pub fn find_match(pattern: &[TokenMatcher], tokens: &[Token]) -> Option<(usize, usize)> {
    let anchored = pattern.first().is_some_and(TokenMatcher::is_anchored);
    let last = if anchored { 1 } else { tokens.len() };
    (0..last).find_map(|start| match_pattern(pattern, tokens, start).map(|len| (start, len)))
}

/// Rewrite-loop evaluator over a rule set
#[derive(Debug)]
pub struct Evaluator<'r> {
    rules: &'r RuleSet,
    options: EvaluatorOptions,
    steps: usize,
}

impl<'r> Evaluator<'r> {
    pub fn new(rules: &'r RuleSet, options: EvaluatorOptions) -> Self {
        Self {
            rules,
            options,
            steps: 0,
        }
    }

    /// Rewrite steps performed so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Reduce the stream and extract the resulting value
    pub fn evaluate(&mut self, tokens: Vec<Token>) -> FormulaResult<Value> {
        let token = self.reduce(tokens)?;
        into_value(token)
    }

    /// Reduce the stream to a single token.
    ///
    /// An empty stream reduces to the number zero.
    pub fn reduce(&mut self, mut tokens: Vec<Token>) -> FormulaResult<Token> {
        loop {
            if tokens.len() <= 1 {
                return Ok(tokens.pop().unwrap_or_else(|| Token::data(0)));
            }

            let found = self
                .find_rule_match(&tokens)
                .ok_or_else(|| FormulaError::Unreducible(render(&tokens)))?;
            tokens = self.evaluate_step(tokens, found)?;
        }
    }

    /// First rule in precedence order with any match; leftmost match within it
    pub fn find_rule_match(&self, tokens: &[Token]) -> Option<RuleMatch> {
        self.rules.filter(tokens).iter().find_map(|&rule| {
            let pattern = self.rules.rule(rule)?.pattern();
            find_match(pattern, tokens).map(|(start, len)| RuleMatch { rule, start, len })
        })
    }

    fn evaluate_step(&mut self, mut tokens: Vec<Token>, found: RuleMatch) -> FormulaResult<Vec<Token>> {
        self.steps += 1;
        if let Some(max) = self.options.max_steps {
            if self.steps > max {
                return Err(FormulaError::StepLimit(max));
            }
        }

        let rule = self
            .rules
            .rule(found.rule)
            .ok_or_else(|| FormulaError::Unreducible(render(&tokens)))?;

        let mut tail = tokens.split_off(found.start);
        let rest = tail.split_off(found.len);
        let matched = tail;

        log::trace!(
            "step {}: {} ({:?}) on `{}`",
            self.steps,
            rule.name(),
            rule.action(),
            render(&matched)
        );

        let replacement = self.apply_action(rule, &matched)?;
        tokens.extend(replacement);
        tokens.extend(rest);
        Ok(tokens)
    }

    fn apply_action(&mut self, rule: &Rule, matched: &[Token]) -> FormulaResult<Vec<Token>> {
        let value = match rule.action() {
            Action::If => self.evaluate_if(matched)?,
            Action::Round | Action::RoundInt | Action::Function => self.call_function(matched)?,
            Action::Not => {
                let inner = self.evaluate_span(inner_span(matched, 2))?;
                Value::from(!inner.is_truthy())
            }
            Action::EvaluateGroup => self.evaluate_span(inner_span(matched, 1))?,
            Action::Negate => negate(&data(&matched[matched.len() - 1])?)?,
            Action::Apply => apply(matched)?,
            Action::PowNegate | Action::MulNegate => apply_negated(matched)?,
            Action::Percentage => {
                let operand = operand(&matched[0])?;
                Arithmetic::percent(operand)?.value(&())?
            }
            Action::ExpandRange => return expand_range(matched),
        };
        Ok(vec![Token::data(value)])
    }

    /// Evaluate a sub-span as its own expression, sharing the step budget
    fn evaluate_span(&mut self, span: &[Token]) -> FormulaResult<Value> {
        let token = self.reduce(span.to_vec())?;
        into_value(token)
    }

    fn evaluate_if(&mut self, matched: &[Token]) -> FormulaResult<Value> {
        let args = split_arguments(inner_span(matched, 2));
        let [condition, then_branch, else_branch] = args.as_slice() else {
            return Err(arity_error("if", 3, args.len()));
        };
        let branch = if self.evaluate_span(condition)?.is_truthy() {
            then_branch
        } else {
            else_branch
        };
        self.evaluate_span(branch)
    }

    fn call_function(&mut self, matched: &[Token]) -> FormulaResult<Value> {
        let name = match matched.first().and_then(Token::symbol) {
            Some(Symbol::Function(name)) => name.clone(),
            _ => return Err(FormulaError::Unreducible(render(matched))),
        };

        let args = split_arguments(inner_span(matched, 2))
            .into_iter()
            .map(|arg| self.evaluate_span(arg))
            .collect::<FormulaResult<Vec<_>>>()?;

        match self.rules.function(&name) {
            Some(def) => def.call(&args),
            None => match name.as_str() {
                "if" => Err(arity_error("if", 3, args.len())),
                "not" => Err(arity_error("not", 1, args.len())),
                _ => Err(FormulaError::UnknownFunction(name.to_uppercase())),
            },
        }
    }
}

/// Strip `prefix` leading tokens (function name and/or open) and the closing
/// token
fn inner_span(matched: &[Token], prefix: usize) -> &[Token] {
    let end = matched.len().saturating_sub(1).max(prefix);
    matched.get(prefix..end).unwrap_or(&[])
}

fn arity_error(function: &str, expected: usize, actual: usize) -> FormulaError {
    FormulaError::ArgumentCount {
        function: function.to_uppercase(),
        expected: expected.to_string(),
        actual,
    }
}

fn into_value(token: Token) -> FormulaResult<Value> {
    match token.into_value() {
        TokenValue::Data(value) => Ok(value),
        TokenValue::Identifier(name) => Err(FormulaError::UnboundVariable(name)),
        other => Err(FormulaError::Unreducible(Token::new(other, 0).to_string())),
    }
}

fn operand(token: &Token) -> FormulaResult<Operand> {
    Operand::from_token(token).ok_or_else(|| FormulaError::Unreducible(token.to_string()))
}

fn data(token: &Token) -> FormulaResult<Value> {
    operand(token)?.value(&())
}

/// `left op right` for arithmetic, bitwise, comparison and combinator
/// operators
fn apply(matched: &[Token]) -> FormulaResult<Value> {
    let [left, op, right] = matched else {
        return Err(FormulaError::Unreducible(render(matched)));
    };
    let (left, right) = (operand(left)?, operand(right)?);

    match op.symbol() {
        Some(Symbol::Operator(o)) => match ArithmeticOp::from_operator(*o) {
            Some(arith) => Arithmetic::new(arith, left, right)?.value(&()),
            None => bitwise(*o, &left.value(&())?, &right.value(&())?),
        },
        Some(Symbol::Comparator(c)) => {
            compare(*c, &left.value(&())?, &right.value(&())?).map(Value::from)
        }
        Some(Symbol::Combinator(c)) => Combination::new(*c, left, right)?.value(&()),
        _ => Err(FormulaError::Unreducible(render(matched))),
    }
}

/// `left op - right`: apply `op` with the negated right operand
fn apply_negated(matched: &[Token]) -> FormulaResult<Value> {
    let [left, op, _minus, right] = matched else {
        return Err(FormulaError::Unreducible(render(matched)));
    };
    let right = negate(&data(right)?)?;
    apply(&[left.clone(), op.clone(), Token::data(right)])
}

fn expand_range(matched: &[Token]) -> FormulaResult<Vec<Token>> {
    let [a, op1, b, op2, c] = matched else {
        return Err(FormulaError::Unreducible(render(matched)));
    };
    Ok(vec![
        a.clone(),
        op1.clone(),
        b.clone(),
        Token::combinator(Combinator::And),
        b.clone(),
        op2.clone(),
        c.clone(),
    ])
}
