//! Conditionals and loops
//!
//! The branch bodies of `if`, `when`, `unless` and `cond` are tail positions.
//! Loop bodies are not: each iteration is run to completion.

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::plugins::{expect_min, expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::{Environment, Evaluator, Value};

/// `if`, `when`, `unless`, `cond`, `while`, `dotimes`
pub struct ControlPlugin;

impl Plugin for ControlPlugin {
    fn name(&self) -> &str {
        "control"
    }

    fn description(&self) -> &str {
        "Conditionals and loops"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["logical".to_string()]
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Conditionals
        registry.define(
            "if",
            "control",
            Arity::Variadic,
            "(if test then else?) - else defaults to nil",
            |ev, args, env| {
                expect_range("if", args, 2, 3)?;
                if ev.eval(&args[0], env)?.is_truthy() {
                    ev.eval_tail(&args[1], env)
                } else {
                    match args.get(2) {
                        Some(otherwise) => ev.eval_tail(otherwise, env),
                        None => Ok(Value::Nil),
                    }
                }
            },
        )?;
        registry.define("when", "control", Arity::Variadic, "(when test body...)", |ev, args, env| {
            expect_min("when", args, 1)?;
            if ev.eval(&args[0], env)?.is_truthy() {
                ev.eval_body(&args[1..], env)
            } else {
                Ok(Value::Nil)
            }
        })?;
        registry.define("unless", "control", Arity::Variadic, "(unless test body...)", |ev, args, env| {
            expect_min("unless", args, 1)?;
            if ev.eval(&args[0], env)?.is_truthy() {
                Ok(Value::Nil)
            } else {
                ev.eval_body(&args[1..], env)
            }
        })?;
        registry.define(
            "cond",
            "control",
            Arity::Variadic,
            "(cond test expr ... :else expr) - first truthy test wins",
            eval_cond,
        )?;

        // Loops
        registry.define("while", "control", Arity::Variadic, "(while test body...) - returns nil", |ev, args, env| {
            expect_min("while", args, 1)?;
            while ev.eval(&args[0], env)?.is_truthy() {
                for form in &args[1..] {
                    ev.eval(form, env)?;
                }
            }
            Ok(Value::Nil)
        })?;
        registry.define(
            "dotimes",
            "control",
            Arity::Variadic,
            "(dotimes [i n] body...) - runs body with i from 0 below n",
            eval_dotimes,
        )?;

        Ok(())
    }
}

fn eval_cond(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    if args.len() % 2 != 0 {
        return Err(Error::invalid_args("cond", "expected test/expression pairs"));
    }
    for pair in args.chunks(2) {
        let is_else = matches!(&pair[0], Expr::Keyword(k) if k == "else");
        if is_else || ev.eval(&pair[0], env)?.is_truthy() {
            return ev.eval_tail(&pair[1], env);
        }
    }
    Ok(Value::Nil)
}

fn eval_dotimes(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_min("dotimes", args, 1)?;
    let (var, count) = match &args[0] {
        Expr::Bracket(binding) => match binding.as_slice() {
            [Expr::Symbol(var), count] => (var.clone(), count),
            _ => return Err(Error::invalid_args("dotimes", "binding must be [name count]")),
        },
        other => {
            return Err(Error::invalid_args(
                "dotimes",
                format!("binding must be a vector, got {}", other.kind_name()),
            ))
        }
    };
    let n = ev.eval(count, env)?.as_int()?;
    for i in 0..n.max(0) {
        let scope = env.new_child();
        scope.set(var.clone(), Value::Number(i as f64));
        for form in &args[1..] {
            ev.eval(form, &scope)?;
        }
    }
    Ok(Value::Nil)
}
