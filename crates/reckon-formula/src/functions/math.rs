//! Math functions

use super::{flatten_numeric, numeric};
use crate::ast::ArithmeticOp;
use crate::error::{FormulaError, FormulaResult};
use crate::value::{Number, Value};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

/// Largest scale a decimal can carry
const MAX_PLACES: u32 = 28;

/// SUM function
pub fn fn_sum(args: &[Value]) -> FormulaResult<Value> {
    let mut total = Value::from(0);
    for n in flatten_numeric(args)? {
        total = Value::from(ArithmeticOp::Addition.apply(&total, &Value::from(n))?);
    }
    Ok(total)
}

/// AVG function
pub fn fn_avg(args: &[Value]) -> FormulaResult<Value> {
    let numbers = flatten_numeric(args)?;
    if numbers.is_empty() {
        return Err(FormulaError::Argument("AVG of an empty list".to_string()));
    }
    let total = fn_sum(args)?;
    let count = Value::from(numbers.len() as i64);
    Ok(Value::from(ArithmeticOp::Division.apply(&total, &count)?))
}

/// MIN function
pub fn fn_min(args: &[Value]) -> FormulaResult<Value> {
    extreme(args, "MIN", |candidate, best| candidate < best)
}

/// MAX function
pub fn fn_max(args: &[Value]) -> FormulaResult<Value> {
    extreme(args, "MAX", |candidate, best| candidate > best)
}

fn extreme(
    args: &[Value],
    name: &str,
    better: fn(&Number, &Number) -> bool,
) -> FormulaResult<Value> {
    let mut numbers = flatten_numeric(args)?.into_iter();
    let first = numbers
        .next()
        .ok_or_else(|| FormulaError::Argument(format!("{name} of an empty list")))?;
    let best = numbers.fold(first, |best, n| if better(&n, &best) { n } else { best });
    Ok(Value::from(best))
}

/// ROUND function: half away from zero
pub fn fn_round(args: &[Value]) -> FormulaResult<Value> {
    round_with(args, RoundingStrategy::MidpointAwayFromZero)
}

/// ROUNDUP function: towards positive infinity
pub fn fn_roundup(args: &[Value]) -> FormulaResult<Value> {
    round_with(args, RoundingStrategy::ToPositiveInfinity)
}

/// ROUNDDOWN function: towards negative infinity
pub fn fn_rounddown(args: &[Value]) -> FormulaResult<Value> {
    round_with(args, RoundingStrategy::ToNegativeInfinity)
}

fn round_with(args: &[Value], strategy: RoundingStrategy) -> FormulaResult<Value> {
    let number = match args.first() {
        Some(value) => numeric(value)?,
        None => return Err(FormulaError::too_few_arguments("round", 1, 0)),
    };
    let places = match args.get(1) {
        Some(Value::Null) | None => 0,
        Some(value) => precision(value)?,
    };
    Ok(Value::from(round_number(number, places, strategy)?))
}

/// Number of decimal places; must be a whole number
fn precision(value: &Value) -> FormulaResult<i64> {
    match numeric(value)?.narrow() {
        Number::Integer(places) => Ok(places),
        Number::Decimal(d) => Err(FormulaError::Argument(format!(
            "precision must be a whole number, got {d}"
        ))),
    }
}

/// Round to `places` decimal places. Negative places round to the left of
/// the decimal point; zero or fewer places yield an integer.
pub fn round_number(number: Number, places: i64, strategy: RoundingStrategy) -> FormulaResult<Number> {
    let d = number.to_decimal();
    let rounded = if places >= 0 {
        let dp = u32::try_from(places).unwrap_or(u32::MAX).min(MAX_PLACES);
        d.round_dp_with_strategy(dp, strategy)
    } else {
        let scale = u32::try_from(places.unsigned_abs())
            .ok()
            .and_then(|exp| Decimal::TEN.checked_powi(i64::from(exp)))
            .ok_or(FormulaError::Overflow("Rounding"))?;
        let shifted = d.checked_div(scale).ok_or(FormulaError::Overflow("Rounding"))?;
        shifted
            .round_dp_with_strategy(0, strategy)
            .checked_mul(scale)
            .ok_or(FormulaError::Overflow("Rounding"))?
    };

    if places > 0 {
        return Ok(Number::Decimal(rounded));
    }
    Ok(rounded
        .to_i64()
        .map_or(Number::Decimal(rounded), Number::Integer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Value {
        Value::from(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_sum() {
        assert_eq!(fn_sum(&[Value::from(1), Value::from(2)]).unwrap(), Value::from(3));
        assert_eq!(
            fn_sum(&[Value::from(1), Value::from(vec![Value::from("2.5"), Value::from(3)])]).unwrap(),
            dec("6.5")
        );
        assert!(fn_sum(&[Value::from("ten")]).is_err());
    }

    #[test]
    fn test_avg() {
        assert_eq!(fn_avg(&[Value::from(1), Value::from(2)]).unwrap(), dec("1.5"));
        assert_eq!(fn_avg(&[Value::from(vec![2, 4])]).unwrap(), Value::from(3));
        assert!(fn_avg(&[Value::from(Vec::<i64>::new())]).is_err());
    }

    #[test]
    fn test_min_max() {
        let args = [Value::from(1), Value::from("0.3"), dec("1.8")];
        assert_eq!(fn_min(&args).unwrap(), dec("0.3"));
        assert_eq!(fn_max(&args).unwrap(), dec("1.8"));

        let args = [Value::from(1), Value::from(vec![dec("1.5"), dec("0.3"), dec("1.7")]), dec("1.8")];
        assert_eq!(fn_min(&args).unwrap(), dec("0.3"));
    }

    #[test]
    fn test_round() {
        assert_eq!(fn_round(&[dec("2.5")]).unwrap(), Value::from(3));
        assert_eq!(fn_round(&[dec("-2.5")]).unwrap(), Value::from(-3));
        assert_eq!(fn_round(&[dec("1.666"), Value::from(2)]).unwrap(), dec("1.67"));
        assert_eq!(fn_round(&[Value::from(1250), Value::from(-2)]).unwrap(), Value::from(1300));
        assert!(matches!(fn_round(&[dec("2.4")]).unwrap(), Value::Number(Number::Integer(2))));
    }

    #[test]
    fn test_roundup_rounddown() {
        assert_eq!(fn_roundup(&[dec("4.1")]).unwrap(), Value::from(5));
        assert_eq!(fn_rounddown(&[dec("4.9")]).unwrap(), Value::from(4));
        assert_eq!(fn_roundup(&[dec("-4.1")]).unwrap(), Value::from(-4));
        assert_eq!(fn_rounddown(&[dec("-4.1")]).unwrap(), Value::from(-5));
        assert_eq!(fn_rounddown(&[dec("1.239"), Value::from(2)]).unwrap(), dec("1.23"));
    }

    #[test]
    fn test_precision_must_be_whole() {
        let err = fn_round(&[dec("1.5"), dec("1.5")]).unwrap_err();
        assert!(matches!(err, FormulaError::Argument(_)));
    }
}
