//! Intrinsic arithmetic operators
//!
//! `+ - * / %` resolve to these even when no plugin registers them, which is
//! what lets `(def op +)` work in a bare interpreter. Mixing a BigNumber into
//! an operation promotes every operand to BigNumber.

use crate::error::{Error, Result};
use crate::runtime::{BigDecimal, Value};

/// Operator names handled here
pub const OPERATORS: [&str; 5] = ["+", "-", "*", "/", "%"];

/// Whether `name` is an intrinsic arithmetic operator
pub fn is_operator(name: &str) -> bool {
    OPERATORS.contains(&name)
}

enum Num {
    Float(f64),
    Big(BigDecimal),
}

impl Num {
    fn from_value(value: &Value) -> Result<Num> {
        match value {
            Value::Number(n) => Ok(Num::Float(*n)),
            Value::BigNumber(b) => Ok(Num::Big(b.clone())),
            other => Err(Error::type_error("number", other.type_name())),
        }
    }

    fn into_big(self) -> Result<BigDecimal> {
        match self {
            Num::Float(n) => BigDecimal::from_f64(n),
            Num::Big(b) => Ok(b),
        }
    }
}

/// Apply operator `op` to already-evaluated arguments
pub fn apply(op: &str, args: &[Value]) -> Result<Value> {
    let nums = args.iter().map(Num::from_value).collect::<Result<Vec<_>>>()?;

    if nums.iter().any(|n| matches!(n, Num::Big(_))) {
        let bigs = nums
            .into_iter()
            .map(Num::into_big)
            .collect::<Result<Vec<_>>>()?;
        return apply_big(op, &bigs).map(Value::BigNumber);
    }

    let floats: Vec<f64> = nums
        .into_iter()
        .map(|n| match n {
            Num::Float(f) => f,
            Num::Big(b) => b.to_f64(),
        })
        .collect();
    apply_float(op, &floats).map(Value::Number)
}

fn divide(a: f64, b: f64) -> Result<f64> {
    if b == 0.0 {
        Err(Error::DivisionByZero)
    } else {
        Ok(a / b)
    }
}

fn apply_float(op: &str, xs: &[f64]) -> Result<f64> {
    match op {
        "+" => Ok(xs.iter().sum()),
        "*" => Ok(xs.iter().product()),
        "-" => match xs {
            [] => Err(Error::arity("-", "at least 1", 0)),
            [x] => Ok(-x),
            [first, rest @ ..] => Ok(rest.iter().fold(*first, |acc, x| acc - x)),
        },
        "/" => match xs {
            [] => Err(Error::arity("/", "at least 1", 0)),
            [x] => divide(1.0, *x),
            [first, rest @ ..] => rest.iter().try_fold(*first, |acc, x| divide(acc, *x)),
        },
        "%" => match xs {
            [_, b] if *b == 0.0 => Err(Error::DivisionByZero),
            [a, b] => Ok(a % b),
            _ => Err(Error::arity("%", "2", xs.len())),
        },
        _ => Err(Error::runtime(format!("Unknown arithmetic operator: {}", op))),
    }
}

fn apply_big(op: &str, xs: &[BigDecimal]) -> Result<BigDecimal> {
    match op {
        "+" => Ok(xs.iter().fold(BigDecimal::zero(), |acc, x| acc.add(x))),
        "*" => Ok(xs
            .iter()
            .fold(BigDecimal::new(1.into(), 0), |acc, x| acc.mul(x))),
        "-" => match xs {
            [] => Err(Error::arity("-", "at least 1", 0)),
            [x] => Ok(x.neg()),
            [first, rest @ ..] => Ok(rest.iter().fold(first.clone(), |acc, x| acc.sub(x))),
        },
        "/" => match xs {
            [] => Err(Error::arity("/", "at least 1", 0)),
            [x] => BigDecimal::new(1.into(), 0).div(x),
            [first, rest @ ..] => rest.iter().try_fold(first.clone(), |acc, x| acc.div(x)),
        },
        "%" => match xs {
            [a, b] => a.rem(b),
            _ => Err(Error::arity("%", "2", xs.len())),
        },
        _ => Err(Error::runtime(format!("Unknown arithmetic operator: {}", op))),
    }
}
