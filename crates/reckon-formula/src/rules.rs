//! Rewrite rules and the rule set the evaluator draws from
//!
//! Rule order is precedence: the evaluator applies the first rule (in
//! [`RuleSet::rules`] order) that matches anywhere in the stream. Custom
//! function rules come before every core rule.

use crate::functions::{FunctionDef, FunctionRegistry};
use crate::matcher::TokenMatcher;
use crate::token::{Category, Symbol, Token};
use ahash::AHashMap;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

/// What to do with a matched span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Conditional select; only the chosen branch is evaluated
    If,
    /// Decimal rounding (`ROUND`)
    Round,
    /// Rounding towards an integer boundary (`ROUNDUP`, `ROUNDDOWN`)
    RoundInt,
    /// Logical negation
    Not,
    /// Call a registered function by the name in the first token
    Function,
    /// Evaluate a parenthesized interior as its own expression
    EvaluateGroup,
    /// Unary minus
    Negate,
    /// Binary operator in the middle of a three-token span
    Apply,
    /// `a ^ - b`
    PowNegate,
    /// `a * - b`, `a / - b`
    MulNegate,
    /// Unary `%`
    Percentage,
    /// `a < b <= c` into `a < b and b <= c`
    ExpandRange,
}

/// An ordered token pattern and the action applied to its match
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    pattern: Vec<TokenMatcher>,
    action: Action,
    categories: BTreeSet<Category>,
    values: BTreeSet<Symbol>,
}

impl Rule {
    pub fn new(name: impl Into<String>, pattern: Vec<TokenMatcher>, action: Action) -> Self {
        let categories = pattern
            .iter()
            .flat_map(|m| m.categories().iter().copied())
            .collect();
        let values = pattern
            .iter()
            .flat_map(|m| m.values().iter().cloned())
            .collect();
        Self {
            name: name.into(),
            pattern,
            action,
            categories,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &[TokenMatcher] {
        &self.pattern
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Could this rule match anything in a stream with these categories and
    /// values?
    fn applies_to(&self, key: &PruneKey) -> bool {
        let category_hit = !self.categories.is_disjoint(&key.categories);
        let value_hit = self.values.is_empty() || !self.values.is_disjoint(&key.values);
        category_hit && value_hit
    }

    fn calls(&self, function: &str) -> bool {
        self.action == Action::Function
            && self.values.contains(&Symbol::Function(function.to_string()))
    }
}

/// Categories and symbol values present in a token stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PruneKey {
    categories: BTreeSet<Category>,
    values: BTreeSet<Symbol>,
}

impl PruneKey {
    fn of(tokens: &[Token]) -> Self {
        Self {
            categories: tokens.iter().map(Token::category).collect(),
            values: tokens.iter().filter_map(Token::symbol).cloned().collect(),
        }
    }
}

/// Core rules, custom function rules and the functions behind them
#[derive(Debug)]
pub struct RuleSet {
    custom_rules: Vec<Rule>,
    core_rules: Vec<Rule>,
    functions: FunctionRegistry,
    cache: RwLock<AHashMap<PruneKey, Arc<[usize]>>>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RuleSet {
    fn clone(&self) -> Self {
        Self {
            custom_rules: self.custom_rules.clone(),
            core_rules: self.core_rules.clone(),
            functions: self.functions.clone(),
            cache: RwLock::new(AHashMap::new()),
        }
    }
}

impl RuleSet {
    /// Core rules with the built-in function registry
    pub fn new() -> Self {
        Self {
            custom_rules: Vec::new(),
            core_rules: core_rules(),
            functions: FunctionRegistry::new(),
            cache: RwLock::new(AHashMap::new()),
        }
    }

    /// All rules in precedence order: custom rules, then core rules
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.custom_rules.iter().chain(self.core_rules.iter())
    }

    pub fn len(&self) -> usize {
        self.custom_rules.len() + self.core_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rule by position in [`RuleSet::rules`] order
    pub fn rule(&self, index: usize) -> Option<&Rule> {
        match index.checked_sub(self.custom_rules.len()) {
            None => self.custom_rules.get(index),
            Some(core) => self.core_rules.get(core),
        }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Indices of the rules that could match somewhere in `tokens`, in
    /// precedence order. Memoized per distinct set of categories and values.
    pub fn filter(&self, tokens: &[Token]) -> Arc<[usize]> {
        let key = PruneKey::of(tokens);

        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(hit);
        }

        let indices: Arc<[usize]> = self
            .rules()
            .enumerate()
            .filter(|(_, rule)| rule.applies_to(&key))
            .map(|(i, _)| i)
            .collect();

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&indices));
        indices
    }

    /// Register a function and the rule that calls it.
    ///
    /// The rule goes in front of every other rule; re-registering a name
    /// replaces both the earlier rule and the earlier definition.
    pub fn add_function(&mut self, def: FunctionDef) {
        let name = def.name().to_string();
        self.custom_rules.retain(|rule| !rule.calls(&name));
        self.custom_rules
            .insert(0, Rule::new(name.clone(), def.pattern(), Action::Function));
        if self.functions.register(def).is_some() {
            log::debug!("replaced function {name}");
        } else {
            log::debug!("registered function {name}");
        }

        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        log::debug!("cleared rule pruning cache");
    }

    #[cfg(test)]
    fn cached_keys(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn function_call(name: &str, args: TokenMatcher) -> Vec<TokenMatcher> {
    vec![
        TokenMatcher::function(name),
        TokenMatcher::fopen(),
        args,
        TokenMatcher::close(),
    ]
}

fn core_rules() -> Vec<Rule> {
    use TokenMatcher as M;

    vec![
        Rule::new(
            "if",
            vec![
                M::function("if"),
                M::fopen(),
                M::non_group(),
                M::comma(),
                M::non_group(),
                M::comma(),
                M::non_group(),
                M::close(),
            ],
            Action::If,
        ),
        Rule::new("round", function_call("round", M::arguments()), Action::Round),
        Rule::new("roundup", function_call("roundup", M::arguments()), Action::RoundInt),
        Rule::new("rounddown", function_call("rounddown", M::arguments()), Action::RoundInt),
        Rule::new("not", function_call("not", M::non_group()), Action::Not),
        Rule::new(
            "function",
            vec![
                M::category(Category::Function),
                M::fopen(),
                M::arguments(),
                M::close(),
            ],
            Action::Function,
        ),
        Rule::new(
            "group",
            vec![M::open(), M::non_group_star(), M::close()],
            Action::EvaluateGroup,
        ),
        Rule::new("start_neg", vec![M::anchored_minus(), M::numeric()], Action::Negate),
        Rule::new("math_pow", vec![M::numeric(), M::pow(), M::numeric()], Action::Apply),
        Rule::new(
            "math_neg_pow",
            vec![M::numeric(), M::pow(), M::minus(), M::numeric()],
            Action::PowNegate,
        ),
        Rule::new("math_mod", vec![M::numeric(), M::modulo(), M::numeric()], Action::Apply),
        Rule::new("math_mul", vec![M::numeric(), M::muldiv(), M::numeric()], Action::Apply),
        Rule::new(
            "math_neg_mul",
            vec![M::numeric(), M::muldiv(), M::minus(), M::numeric()],
            Action::MulNegate,
        ),
        Rule::new("math_add", vec![M::numeric(), M::addsub(), M::numeric()], Action::Apply),
        Rule::new("math_bit", vec![M::numeric(), M::bitwise(), M::numeric()], Action::Apply),
        Rule::new("percentage", vec![M::numeric(), M::modulo()], Action::Percentage),
        Rule::new("negation", vec![M::minus(), M::numeric()], Action::Negate),
        Rule::new(
            "range_asc",
            vec![M::numeric(), M::comp_lt(), M::numeric(), M::comp_lt(), M::numeric()],
            Action::ExpandRange,
        ),
        Rule::new(
            "range_desc",
            vec![M::numeric(), M::comp_gt(), M::numeric(), M::comp_gt(), M::numeric()],
            Action::ExpandRange,
        ),
        Rule::new("num_comp", vec![M::numeric(), M::comparator(), M::numeric()], Action::Apply),
        Rule::new("str_comp", vec![M::string(), M::comparator(), M::string()], Action::Apply),
        Rule::new(
            "time_comp",
            vec![M::datetime(), M::comparator(), M::datetime()],
            Action::Apply,
        ),
        Rule::new("combine", vec![M::logical(), M::combinator(), M::logical()], Action::Apply),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Grouping, Operator};
    use crate::value::Value;

    fn names(rules: &RuleSet, tokens: &[Token]) -> Vec<String> {
        rules
            .filter(tokens)
            .iter()
            .filter_map(|&i| rules.rule(i))
            .map(|rule| rule.name().to_string())
            .collect()
    }

    #[test]
    fn test_rule_index_unions() {
        let rule = Rule::new(
            "math_add",
            vec![TokenMatcher::numeric(), TokenMatcher::addsub(), TokenMatcher::numeric()],
            Action::Apply,
        );
        assert_eq!(
            rule.categories.iter().copied().collect::<Vec<_>>(),
            vec![Category::Numeric, Category::Operator]
        );
        assert_eq!(rule.values.len(), 2);
    }

    #[test]
    fn test_filter_prunes_by_category_and_value() {
        let rules = RuleSet::new();
        let tokens = vec![Token::data(1), Token::operator(Operator::Add), Token::data(2)];
        let kept = names(&rules, &tokens);
        assert!(kept.contains(&"math_add".to_string()));
        assert!(kept.contains(&"num_comp".to_string()));
        assert!(!kept.contains(&"math_mul".to_string()));
        assert!(!kept.contains(&"group".to_string()));
        assert!(!kept.contains(&"str_comp".to_string()));
        assert!(!kept.contains(&"if".to_string()));
    }

    #[test]
    fn test_filter_preserves_order() {
        let rules = RuleSet::new();
        let tokens = vec![
            Token::data(1),
            Token::operator(Operator::Add),
            Token::data(2),
            Token::operator(Operator::Multiply),
            Token::data(3),
        ];
        let kept = names(&rules, &tokens);
        let mul = kept.iter().position(|n| n == "math_mul").unwrap();
        let add = kept.iter().position(|n| n == "math_add").unwrap();
        assert!(mul < add);
    }

    #[test]
    fn test_filter_is_memoized() {
        let rules = RuleSet::new();
        let a = vec![Token::data(1), Token::operator(Operator::Add), Token::data(2)];
        let b = vec![Token::data(7), Token::operator(Operator::Add), Token::data(9)];
        let first = rules.filter(&a);
        let second = rules.filter(&b);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(rules.cached_keys(), 1);
    }

    #[test]
    fn test_add_function_prepends_and_invalidates() {
        let mut rules = RuleSet::new();
        let tokens = vec![
            Token::function("double"),
            Token::grouping(Grouping::FunctionOpen),
            Token::data(2),
            Token::grouping(Grouping::Close),
        ];
        rules.filter(&tokens);
        assert_eq!(rules.cached_keys(), 1);

        rules.add_function(FunctionDef::custom("double", ["x"], |args| Ok(args[0].clone())));
        assert_eq!(rules.cached_keys(), 0);
        assert_eq!(rules.rule(0).map(Rule::name), Some("double"));
        assert_eq!(names(&rules, &tokens)[0], "double");

        rules.add_function(FunctionDef::custom("triple", ["x"], |_| Ok(Value::Null)));
        assert_eq!(rules.rule(0).map(Rule::name), Some("triple"));
        assert_eq!(rules.rule(1).map(Rule::name), Some("double"));
    }

    #[test]
    fn test_add_function_replaces_existing() {
        let mut rules = RuleSet::new();
        let before = rules.len();
        rules.add_function(FunctionDef::custom("f", ["x"], |_| Ok(Value::from(1))));
        rules.add_function(FunctionDef::custom("f", ["x", "y"], |_| Ok(Value::from(2))));
        assert_eq!(rules.len(), before + 1);
        assert_eq!(rules.rule(0).map(|r| r.pattern().len()), Some(6));
        let f = rules.function("f").unwrap();
        assert_eq!(f.call(&[Value::Null, Value::Null]).unwrap(), Value::from(2));
    }

    #[test]
    fn test_clone_starts_with_empty_cache() {
        let rules = RuleSet::new();
        rules.filter(&[Token::data(1)]);
        let copy = rules.clone();
        assert_eq!(copy.cached_keys(), 0);
        assert_eq!(copy.len(), rules.len());
    }
}
