//! End-to-end evaluation through the calculator

use chrono::{FixedOffset, TimeZone};
use pretty_assertions::assert_eq;
use reckon::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

fn eval(expression: &str) -> Result<Value> {
    Calculator::new().evaluate(expression)
}

fn dec(s: &str) -> Value {
    Value::from(Decimal::from_str(s).unwrap())
}

/// Test basic arithmetic and operator precedence
#[test]
fn test_evaluate_arithmetic() {
    assert_eq!(eval("1 + 1 * 5").unwrap(), Value::from(6));
    assert_eq!(eval("(1 + 1) * 5").unwrap(), Value::from(10));
    assert_eq!(eval("2 + 10 % 2").unwrap(), Value::from(2));
    assert_eq!(eval("5 / 4").unwrap(), dec("1.25"));
    assert_eq!(eval("2 ^ 10").unwrap(), Value::from(1024));
    assert_eq!(eval("((2 + 3) * (4 - 1)) / 5").unwrap(), Value::from(3));
}

/// Test empty expressions
#[test]
fn test_evaluate_empty() {
    assert_eq!(eval("").unwrap(), Value::from(0));
    assert!(eval("").unwrap().is_truthy());
}

/// Test unary minus in all positions
#[test]
fn test_evaluate_negation() {
    assert_eq!(eval("-1").unwrap(), Value::from(-1));
    assert_eq!(eval("1 - -1").unwrap(), Value::from(2));
    assert_eq!(eval("1---1").unwrap(), Value::from(0));
    assert_eq!(eval("-1 + 1").unwrap(), Value::from(0));
    assert_eq!(eval("3 + 0 * -3").unwrap(), Value::from(3));
    assert_eq!(eval("0 * 10 ^ -5").unwrap(), Value::from(0));
    assert_eq!(eval("(-5)").unwrap(), Value::from(-5));
}

/// Test percentages
#[test]
fn test_evaluate_percentage() {
    assert_eq!(eval("50%").unwrap(), dec("0.5"));
    assert_eq!(eval("50% * 100").unwrap(), Value::from(50));
}

/// Test comparisons, chained ranges and combinators
#[test]
fn test_evaluate_logic() {
    assert_eq!(eval("5 < 10 <= 10").unwrap(), Value::from(true));
    assert_eq!(eval("3 > 5 >= 1").unwrap(), Value::from(false));
    assert_eq!(eval("1 = 1.0").unwrap(), Value::from(true));
    assert_eq!(eval("'a' <> 'b'").unwrap(), Value::from(true));
    assert_eq!(eval("1 < 2 AND 2 < 3").unwrap(), Value::from(true));
    assert_eq!(eval("1 > 2 OR 2 > 3").unwrap(), Value::from(false));

    let err = eval("3 > 2 < 1").unwrap_err();
    assert!(matches!(err, FormulaError::Unreducible(_)));
}

/// Test built-in functions
#[test]
fn test_evaluate_functions() {
    assert_eq!(eval("round(5 / 3.0)").unwrap(), Value::from(2));
    assert_eq!(eval("round(5 / 3.0, 2)").unwrap(), dec("1.67"));
    assert_eq!(eval("ROUNDUP(5 / 1.2)").unwrap(), Value::from(5));
    assert_eq!(eval("rounddown(5 / 1.2)").unwrap(), Value::from(4));
    assert_eq!(eval("not(5 > 1 or false)").unwrap(), Value::from(false));
    assert_eq!(eval("SUM(1, 2, 3, 4, 5)").unwrap(), Value::from(15));
    assert_eq!(eval("AVG(1, 2)").unwrap(), dec("1.5"));
    assert_eq!(eval("IF(1 > 0, 'Yes', 'No')").unwrap(), Value::from("Yes"));
}

/// Test function arguments coming from bindings
#[test]
fn test_evaluate_functions_with_bindings() {
    let calc = Calculator::new();
    assert_eq!(
        calc.evaluate_with("MIN(1, x, 1.8)", [("x", Value::from("0.3"))])
            .unwrap(),
        dec("0.3")
    );
    assert_eq!(
        calc.evaluate_with(
            "MIN(1, x, 1.8)",
            [("x", Value::from(vec![dec("1.5"), dec("0.3"), dec("1.7")]))]
        )
        .unwrap(),
        dec("0.3")
    );
    assert_eq!(
        calc.evaluate_with("sum(x) / 2", [("x", vec![2, 4, 6])]).unwrap(),
        Value::from(6)
    );
}

/// Test that IF only evaluates the selected branch
#[test]
fn test_evaluate_if_is_lazy() {
    let calc = Calculator::new();
    let guarded = "if(d = 0, 0, n / d)";
    assert_eq!(
        calc.evaluate_with(guarded, [("n", 10), ("d", 0)]).unwrap(),
        Value::from(0)
    );
    assert_eq!(
        calc.evaluate_with(guarded, [("n", 10), ("d", 4)]).unwrap(),
        dec("2.5")
    );
}

/// Test string coercion of bound values
#[test]
fn test_evaluate_string_coercion() {
    let calc = Calculator::new();
    // bound strings stay strings, so arithmetic rules do not apply to them
    let err = calc.evaluate_with("x + 1", [("x", "41")]).unwrap_err();
    assert!(matches!(err, FormulaError::Unreducible(_)));

    assert_eq!(
        calc.evaluate_with("SUM(x, 1)", [("x", "41")]).unwrap(),
        Value::from(42)
    );
    let err = calc.evaluate_with("SUM(x, 1)", [("x", "41abc")]).unwrap_err();
    assert!(matches!(err, FormulaError::InvalidValue { .. }));

    assert_eq!(
        calc.evaluate_with("x = 'abc'", [("x", "abc")]).unwrap(),
        Value::from(true)
    );
}

/// Test date-time literals and comparisons
#[test]
fn test_evaluate_datetime() {
    let utc = FixedOffset::east_opt(0).unwrap();
    let expected = utc.with_ymd_and_hms(2017, 1, 4, 12, 23, 42).unwrap();
    assert_eq!(eval("2017-01-04 12:23:42").unwrap(), Value::from(expected));

    assert_eq!(eval("2017-01-01 < 2017-01-02").unwrap(), Value::from(true));
    assert_eq!(
        eval("2017-01-01 12:00:00 +02:00 = 2017-01-01 10:00:00 Z").unwrap(),
        Value::from(true)
    );

    let calc = Calculator::new();
    let deadline = utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
    assert_eq!(
        calc.evaluate_with("due <= 2020-06-01", [("due", deadline)])
            .unwrap(),
        Value::from(true)
    );
}

/// Test the error kinds surfaced to callers
#[test]
fn test_evaluate_errors() {
    assert!(matches!(eval("5 / 0"), Err(FormulaError::DivisionByZero)));
    assert!(matches!(eval("5 % 0"), Err(FormulaError::DivisionByZero)));
    assert!(matches!(eval("(1 + 2"), Err(FormulaError::Tokenize(_))));
    assert!(matches!(eval("1 + 2)"), Err(FormulaError::Tokenize(_))));
    assert!(matches!(eval("1 # 2"), Err(FormulaError::Tokenize(_))));
    assert!(matches!(eval("unknown * 2"), Err(FormulaError::UnboundVariable(_))));
    assert!(matches!(eval("nope(1)"), Err(FormulaError::UnknownFunction(_))));

    let err = eval("sum()").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Wrong number of arguments for SUM: expected at least 1, given 0"
    );
}

/// Test powers that have no representable real result
#[test]
fn test_evaluate_power_errors() {
    assert_eq!(eval("2 ^ -1").unwrap(), dec("0.5"));
    assert_eq!(eval("(-2) ^ 3").unwrap(), Value::from(-8));

    let err = eval("(-8) ^ 0.5").unwrap_err();
    assert!(matches!(err, FormulaError::Domain { .. }));
    assert!(matches!(eval("0 ^ -1"), Err(FormulaError::DivisionByZero)));
    assert!(matches!(eval("10 ^ -30"), Err(FormulaError::Underflow(_))));
    assert!(matches!(eval("10 ^ 30"), Err(FormulaError::Overflow(_))));
}

/// Test operands of the wrong type
#[test]
fn test_evaluate_type_errors() {
    let calc = Calculator::new();
    let err = calc
        .evaluate_with("x * 2", [("x", vec![1, 2])])
        .unwrap_err();
    assert!(matches!(err, FormulaError::InvalidOperator { .. }));

    assert!(matches!(eval("'a' + 1"), Err(FormulaError::Unreducible(_))));
}

/// Test the bitwise operators
#[test]
fn test_evaluate_bitwise() {
    assert_eq!(eval("6 & 3").unwrap(), Value::from(2));
    assert_eq!(eval("6 | 3").unwrap(), Value::from(7));
    assert!(matches!(eval("1.5 | 1"), Err(FormulaError::InvalidValue { .. })));
}

/// Test that logical combinators return the deciding operand
#[test]
fn test_evaluate_combinator_result() {
    let calc = Calculator::new();
    assert_eq!(
        calc.evaluate_with("a or b", [("a", false), ("b", true)]).unwrap(),
        Value::from(true)
    );
    assert_eq!(
        calc.evaluate_with("a and b", [("a", false), ("b", true)]).unwrap(),
        Value::from(false)
    );
}
