//! Equality, ordering and numeric predicates

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::plugins::{eval_n, expect_min, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::{values_equal, BigDecimal, Environment, Evaluator, Value};

/// `= not= < > <= >=` and numeric predicates
pub struct ComparisonPlugin;

impl Plugin for ComparisonPlugin {
    fn name(&self) -> &str {
        "comparison"
    }

    fn description(&self) -> &str {
        "Equality, ordering and numeric predicates"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Equality
        registry.define("=", "comparison", Arity::Variadic, "True if all arguments are equal", |ev, args, env| {
            expect_min("=", args, 1)?;
            let values = ev.eval_all(args, env)?;
            Ok(Value::Boolean(values.windows(2).all(|w| values_equal(&w[0], &w[1]))))
        })?;
        registry.define("not=", "comparison", Arity::Variadic, "Negation of =", |ev, args, env| {
            expect_min("not=", args, 1)?;
            let values = ev.eval_all(args, env)?;
            Ok(Value::Boolean(!values.windows(2).all(|w| values_equal(&w[0], &w[1]))))
        })?;

        // Ordering
        for (name, help, accept) in ORDERINGS {
            registry.define(name, "comparison", Arity::Variadic, help, move |ev, args, env| {
                monotonic(name, ev, args, env, accept)
            })?;
        }

        // Predicates
        registry.define("zero?", "comparison", Arity::Fixed(1), "True if the number is zero", |ev, args, env| {
            let [n] = eval_n::<1>("zero?", ev, args, env)?;
            Ok(Value::Boolean(sign_of(&n)? == Ordering::Equal))
        })?;
        registry.define("pos?", "comparison", Arity::Fixed(1), "True if the number is positive", |ev, args, env| {
            let [n] = eval_n::<1>("pos?", ev, args, env)?;
            Ok(Value::Boolean(sign_of(&n)? == Ordering::Greater))
        })?;
        registry.define("neg?", "comparison", Arity::Fixed(1), "True if the number is negative", |ev, args, env| {
            let [n] = eval_n::<1>("neg?", ev, args, env)?;
            Ok(Value::Boolean(sign_of(&n)? == Ordering::Less))
        })?;
        registry.define("even?", "comparison", Arity::Fixed(1), "True if the integer is even", |ev, args, env| {
            let [n] = eval_n::<1>("even?", ev, args, env)?;
            Ok(Value::Boolean(n.as_int()? % 2 == 0))
        })?;
        registry.define("odd?", "comparison", Arity::Fixed(1), "True if the integer is odd", |ev, args, env| {
            let [n] = eval_n::<1>("odd?", ev, args, env)?;
            Ok(Value::Boolean(n.as_int()? % 2 != 0))
        })?;

        Ok(())
    }
}

type Accept = fn(Ordering) -> bool;

const ORDERINGS: [(&str, &str, Accept); 4] = [
    ("<", "True if arguments are strictly increasing", |o| o == Ordering::Less),
    (">", "True if arguments are strictly decreasing", |o| o == Ordering::Greater),
    ("<=", "True if arguments are non-decreasing", |o| o != Ordering::Greater),
    (">=", "True if arguments are non-increasing", |o| o != Ordering::Less),
];

fn monotonic(
    name: &str,
    ev: &Evaluator,
    args: &[Expr],
    env: &Environment,
    accept: Accept,
) -> Result<Value> {
    expect_min(name, args, 1)?;
    let values = ev.eval_all(args, env)?;
    for pair in values.windows(2) {
        match compare_values(&pair[0], &pair[1])? {
            Some(ordering) if accept(ordering) => {}
            _ => return Ok(Value::Boolean(false)),
        }
    }
    Ok(Value::Boolean(true))
}

/// Order two numbers, or two strings lexicographically
///
/// `None` when the numbers are unordered (NaN).
pub(crate) fn compare_values(a: &Value, b: &Value) -> Result<Option<Ordering>> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(x.partial_cmp(y)),
        (Value::BigNumber(_), _) | (_, Value::BigNumber(_)) => {
            match (to_big(a), to_big(b)) {
                (Ok(x), Ok(y)) => Ok(Some(x.cmp(&y))),
                // Non-finite floats against a BigNumber
                _ => Ok(a.as_number()?.partial_cmp(&b.as_number()?)),
            }
        }
        (Value::String(x), Value::String(y)) => Ok(Some(x.cmp(y))),
        (Value::Number(_) | Value::String(_), other) | (other, _) => {
            Err(Error::type_error("comparable number or string", other.type_name()))
        }
    }
}

fn to_big(value: &Value) -> Result<BigDecimal> {
    match value {
        Value::BigNumber(b) => Ok(b.clone()),
        Value::Number(n) => BigDecimal::from_f64(*n),
        other => Err(Error::type_error("number", other.type_name())),
    }
}

fn sign_of(value: &Value) -> Result<Ordering> {
    match value {
        Value::BigNumber(b) => Ok(b.signum().cmp(&0)),
        other => Ok(other.as_number()?.partial_cmp(&0.0).unwrap_or(Ordering::Equal)),
    }
}
