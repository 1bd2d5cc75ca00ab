//! Arithmetic and numeric functions
//!
//! `+ - * / %` are registered here under their own names so that they show up
//! in `functions` and `help`; without this plugin they still work as
//! intrinsics.

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::plugins::{eval_n, expect_min, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::convert::parse_big;
use crate::runtime::{arithmetic, BigDecimal, Environment, Evaluator, Value};

/// Arithmetic, rounding and BigNumber construction
pub struct MathPlugin;

impl Plugin for MathPlugin {
    fn name(&self) -> &str {
        "math"
    }

    fn description(&self) -> &str {
        "Arithmetic with Number and BigNumber promotion"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Basic arithmetic
        for (op, help) in [
            ("+", "Sum of the arguments; 0 when empty"),
            ("-", "Negation, or first argument minus the rest"),
            ("*", "Product of the arguments; 1 when empty"),
            ("/", "Reciprocal, or first argument divided by the rest"),
            ("%", "Remainder of truncated division"),
        ] {
            registry.define(op, "math", Arity::Variadic, help, move |ev, args, env| {
                let values = ev.eval_all(args, env)?;
                arithmetic::apply(op, &values)
            })?;
        }
        registry.define("mod", "math", Arity::Fixed(2), "Modulus; the sign follows the divisor", |ev, args, env| {
            let [a, b] = eval_n::<2>("mod", ev, args, env)?;
            floored_mod(&a, &b)
        })?;
        registry.define("inc", "math", Arity::Fixed(1), "Add one", |ev, args, env| {
            let [n] = eval_n::<1>("inc", ev, args, env)?;
            arithmetic::apply("+", &[n, Value::Number(1.0)])
        })?;
        registry.define("dec", "math", Arity::Fixed(1), "Subtract one", |ev, args, env| {
            let [n] = eval_n::<1>("dec", ev, args, env)?;
            arithmetic::apply("-", &[n, Value::Number(1.0)])
        })?;

        // Magnitude
        registry.define("abs", "math", Arity::Fixed(1), "Absolute value", |ev, args, env| {
            let [n] = eval_n::<1>("abs", ev, args, env)?;
            match n {
                Value::BigNumber(b) => Ok(Value::BigNumber(b.abs())),
                other => Ok(Value::Number(other.as_number()?.abs())),
            }
        })?;
        registry.define("min", "math", Arity::Variadic, "Smallest argument", |ev, args, env| {
            extremum("min", ev, args, env, std::cmp::Ordering::Less)
        })?;
        registry.define("max", "math", Arity::Variadic, "Largest argument", |ev, args, env| {
            extremum("max", ev, args, env, std::cmp::Ordering::Greater)
        })?;

        // Powers
        registry.define("sqrt", "math", Arity::Fixed(1), "Square root", |ev, args, env| {
            let [n] = eval_n::<1>("sqrt", ev, args, env)?;
            let x = n.as_number()?;
            if x < 0.0 {
                return Err(Error::invalid_args("sqrt", "argument must not be negative"));
            }
            Ok(Value::Number(x.sqrt()))
        })?;
        registry.define("pow", "math", Arity::Fixed(2), "Base raised to the exponent", |ev, args, env| {
            let [base, exponent] = eval_n::<2>("pow", ev, args, env)?;
            match (&base, exponent.as_int()) {
                (Value::BigNumber(b), Ok(e)) if (0..=u32::MAX as i64).contains(&e) => {
                    Ok(Value::BigNumber(b.pow(e as u32)))
                }
                _ => Ok(Value::Number(base.as_number()?.powf(exponent.as_number()?))),
            }
        })?;

        // Rounding
        registry.define("floor", "math", Arity::Fixed(1), "Round toward negative infinity", |ev, args, env| {
            let [n] = eval_n::<1>("floor", ev, args, env)?;
            round_with(n, f64::floor, BigDecimal::floor)
        })?;
        registry.define("ceil", "math", Arity::Fixed(1), "Round toward positive infinity", |ev, args, env| {
            let [n] = eval_n::<1>("ceil", ev, args, env)?;
            round_with(n, f64::ceil, BigDecimal::ceil)
        })?;
        registry.define("round", "math", Arity::Fixed(1), "Round to nearest, halves away from zero", |ev, args, env| {
            let [n] = eval_n::<1>("round", ev, args, env)?;
            round_with(n, f64::round, BigDecimal::round)
        })?;

        // BigNumber
        registry.define(
            "bignum",
            "math",
            Arity::Fixed(1),
            "Arbitrary precision number from a number or decimal string",
            |ev, args, env| {
                let [n] = eval_n::<1>("bignum", ev, args, env)?;
                match n {
                    Value::BigNumber(_) => Ok(n),
                    Value::Number(x) => Ok(Value::BigNumber(BigDecimal::from_f64(x)?)),
                    Value::String(s) => Ok(Value::BigNumber(parse_big(&s)?)),
                    other => Err(Error::type_error("number or string", other.type_name())),
                }
            },
        )?;
        registry.define("number?", "math", Arity::Fixed(1), "True for Number and BigNumber", |ev, args, env| {
            let [n] = eval_n::<1>("number?", ev, args, env)?;
            Ok(Value::Boolean(matches!(n, Value::Number(_) | Value::BigNumber(_))))
        })?;

        Ok(())
    }
}

fn floored_mod(a: &Value, b: &Value) -> Result<Value> {
    let rem = arithmetic::apply("%", &[a.clone(), b.clone()])?;
    let divisor_negative = match b {
        Value::BigNumber(d) => d.signum() < 0,
        other => other.as_number()? < 0.0,
    };
    let adjust = match &rem {
        Value::Number(r) => *r != 0.0 && (*r < 0.0) != divisor_negative,
        Value::BigNumber(r) => r.signum() != 0 && (r.signum() < 0) != divisor_negative,
        _ => false,
    };
    if adjust {
        arithmetic::apply("+", &[rem, b.clone()])
    } else {
        Ok(rem)
    }
}

fn extremum(
    name: &str,
    ev: &Evaluator,
    args: &[Expr],
    env: &Environment,
    wanted: std::cmp::Ordering,
) -> Result<Value> {
    expect_min(name, args, 1)?;
    let mut values = ev.eval_all(args, env)?.into_iter();
    let mut best = values.next().unwrap_or(Value::Nil);
    best.as_number()?;
    for value in values {
        value.as_number()?;
        if super::comparison::compare_values(&value, &best)? == Some(wanted) {
            best = value;
        }
    }
    Ok(best)
}

fn round_with(n: Value, float: fn(f64) -> f64, big: fn(&BigDecimal) -> BigDecimal) -> Result<Value> {
    match n {
        Value::BigNumber(b) => Ok(Value::BigNumber(big(&b))),
        other => Ok(Value::Number(float(other.as_number()?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::eval_lisp;

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(eval_lisp("(+ 1 2 3)").unwrap(), Value::Number(6.0));
        assert_eq!(eval_lisp("(- 10 4 1)").unwrap(), Value::Number(5.0));
        assert_eq!(eval_lisp("(- 3)").unwrap(), Value::Number(-3.0));
        assert_eq!(eval_lisp("(/ 10 4)").unwrap(), Value::Number(2.5));
        assert!(matches!(eval_lisp("(/ 1 0)"), Err(Error::DivisionByZero)));
        assert_eq!(eval_lisp("(inc 41)").unwrap(), Value::Number(42.0));
        assert_eq!(eval_lisp("(dec 1)").unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_mod_sign_follows_divisor() {
        assert_eq!(eval_lisp("(% -7 2)").unwrap(), Value::Number(-1.0));
        assert_eq!(eval_lisp("(mod -7 2)").unwrap(), Value::Number(1.0));
        assert_eq!(eval_lisp("(mod 7 -2)").unwrap(), Value::Number(-1.0));
        assert_eq!(eval_lisp("(mod 6 3)").unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_min_max_abs() {
        assert_eq!(eval_lisp("(min 3 1 2)").unwrap(), Value::Number(1.0));
        assert_eq!(eval_lisp("(max 3 1 2)").unwrap(), Value::Number(3.0));
        assert_eq!(eval_lisp("(abs -2.5)").unwrap(), Value::Number(2.5));
        assert!(eval_lisp("(max)").is_err());
        assert!(eval_lisp("(min 1 \"a\")").is_err());
    }

    #[test]
    fn test_rounding_and_powers() {
        assert_eq!(eval_lisp("(floor 2.7)").unwrap(), Value::Number(2.0));
        assert_eq!(eval_lisp("(ceil 2.1)").unwrap(), Value::Number(3.0));
        assert_eq!(eval_lisp("(round -2.5)").unwrap(), Value::Number(-3.0));
        assert_eq!(eval_lisp("(sqrt 16)").unwrap(), Value::Number(4.0));
        assert_eq!(eval_lisp("(pow 2 10)").unwrap(), Value::Number(1024.0));
        assert!(eval_lisp("(sqrt -1)").is_err());
    }

    #[test]
    fn test_bignumbers() {
        assert_eq!(
            eval_lisp("(+ 0.1N 0.2N)").unwrap().to_string(),
            "0.3N"
        );
        assert_eq!(
            eval_lisp(r#"(* (bignum "12345678901234567890") 10)"#).unwrap().to_string(),
            "123456789012345678900N"
        );
        assert_eq!(eval_lisp("(pow 1.5N 2)").unwrap().to_string(), "2.25N");
        assert_eq!(eval_lisp("(number? 1N)").unwrap(), Value::Boolean(true));
        assert_eq!(eval_lisp("(number? \"1\")").unwrap(), Value::Boolean(false));
        assert!(matches!(
            eval_lisp(r#"(bignum "abc")"#),
            Err(Error::InvalidBigNumber(_))
        ));
    }
}
