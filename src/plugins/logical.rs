//! Short-circuiting boolean forms

use crate::error::Result;
use crate::plugins::{expect_args, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::Value;

/// `and`, `or`, `not`
pub struct LogicalPlugin;

impl Plugin for LogicalPlugin {
    fn name(&self) -> &str {
        "logical"
    }

    fn description(&self) -> &str {
        "Short-circuiting and/or and boolean negation"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        registry.define(
            "and",
            "logical",
            Arity::Variadic,
            "First falsy value, or the last value; true when empty",
            |ev, args, env| {
                let Some((last, init)) = args.split_last() else {
                    return Ok(Value::Boolean(true));
                };
                for arg in init {
                    let value = ev.eval(arg, env)?;
                    if !value.is_truthy() {
                        return Ok(value);
                    }
                }
                ev.eval_tail(last, env)
            },
        )?;

        registry.define(
            "or",
            "logical",
            Arity::Variadic,
            "First truthy value, or the last value; nil when empty",
            |ev, args, env| {
                let Some((last, init)) = args.split_last() else {
                    return Ok(Value::Nil);
                };
                for arg in init {
                    let value = ev.eval(arg, env)?;
                    if value.is_truthy() {
                        return Ok(value);
                    }
                }
                ev.eval_tail(last, env)
            },
        )?;

        registry.define("not", "logical", Arity::Fixed(1), "Boolean negation", |ev, args, env| {
            expect_args("not", args, 1)?;
            Ok(Value::Boolean(!ev.eval(&args[0], env)?.is_truthy()))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::parser::parse;
    use crate::runtime::{Environment, Evaluator};
    use std::sync::Arc;

    fn run(source: &str) -> Result<Value> {
        let registry = Arc::new(FunctionRegistry::new());
        LogicalPlugin.register_functions(&registry)?;
        let ev = Evaluator::new(registry);
        let form = parse(source)?.remove(0);
        ev.eval(&form, &Environment::new())
    }

    #[test]
    fn test_short_circuit() {
        // The undefined symbol is never evaluated
        assert_eq!(run("(and false undefined)").unwrap(), Value::Boolean(false));
        assert_eq!(run("(or 1 undefined)").unwrap(), Value::Number(1.0));
        assert!(matches!(
            run("(and true undefined)"),
            Err(Error::UndefinedSymbol { .. })
        ));
    }

    #[test]
    fn test_identities() {
        assert_eq!(run("(and)").unwrap(), Value::Boolean(true));
        assert_eq!(run("(or)").unwrap(), Value::Nil);
        assert_eq!(run("(and 1 2)").unwrap(), Value::Number(2.0));
        assert_eq!(run("(not 0)").unwrap(), Value::Boolean(false));
        assert_eq!(run("(not false)").unwrap(), Value::Boolean(true));
    }
}
