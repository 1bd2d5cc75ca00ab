//! Higher-order functions and function combinators

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::plugins::{eval_n, expect_min, expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::{Environment, Evaluator, Value};

/// `map filter reduce` and the `partial comp juxt complement constantly` combinators
pub struct FunctionalPlugin;

impl Plugin for FunctionalPlugin {
    fn name(&self) -> &str {
        "functional"
    }

    fn description(&self) -> &str {
        "Higher-order sequence functions and combinators"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["core".to_string()]
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Sequence functions
        registry.define(
            "map",
            "functional",
            Arity::Variadic,
            "(map f coll & colls) - f applied to items in step, stops at the shortest",
            eval_map,
        )?;
        registry.define("filter", "functional", Arity::Fixed(2), "Items for which pred is truthy", |ev, args, env| {
            let [pred, coll] = eval_n::<2>("filter", ev, args, env)?;
            let mut kept = Vec::new();
            for item in coll.as_seq()? {
                if ev.apply_values(&pred, vec![item.clone()], env)?.is_truthy() {
                    kept.push(item.clone());
                }
            }
            Ok(Value::list(kept))
        })?;
        registry.define(
            "reduce",
            "functional",
            Arity::Variadic,
            "(reduce f coll) or (reduce f init coll)",
            eval_reduce,
        )?;
        registry.define("every?", "functional", Arity::Fixed(2), "True if pred holds for every item", |ev, args, env| {
            let [pred, coll] = eval_n::<2>("every?", ev, args, env)?;
            for item in coll.as_seq()? {
                if !ev.apply_values(&pred, vec![item.clone()], env)?.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
            }
            Ok(Value::Boolean(true))
        })?;
        registry.define("some", "functional", Arity::Fixed(2), "First truthy pred result, or nil", |ev, args, env| {
            let [pred, coll] = eval_n::<2>("some", ev, args, env)?;
            for item in coll.as_seq()? {
                let result = ev.apply_values(&pred, vec![item.clone()], env)?;
                if result.is_truthy() {
                    return Ok(result);
                }
            }
            Ok(Value::Nil)
        })?;

        // Combinators
        registry.define("partial", "functional", Arity::Variadic, "f with leading arguments bound", |ev, args, env| {
            expect_min("partial", args, 1)?;
            let mut values = ev.eval_all(args, env)?;
            let func = callable("partial", values.remove(0))?;
            Ok(Value::Partial {
                func: Arc::new(func),
                bound: Arc::new(values),
            })
        })?;
        registry.define(
            "comp",
            "functional",
            Arity::Variadic,
            "Composition, applied right to left; (comp) is identity",
            |ev, args, env| Ok(Value::Comp(Arc::new(callables("comp", ev, args, env)?))),
        )?;
        registry.define(
            "juxt",
            "functional",
            Arity::Variadic,
            "Function returning a vector of every f applied to the same arguments",
            |ev, args, env| {
                expect_min("juxt", args, 1)?;
                Ok(Value::Juxt(Arc::new(callables("juxt", ev, args, env)?)))
            },
        )?;
        registry.define("complement", "functional", Arity::Fixed(1), "Predicate with negated truthiness", |ev, args, env| {
            let [f] = eval_n::<1>("complement", ev, args, env)?;
            Ok(Value::Complement(Arc::new(callable("complement", f)?)))
        })?;
        registry.define(
            "constantly",
            "functional",
            Arity::Fixed(1),
            "Function that ignores its arguments and returns x",
            |ev, args, env| {
                let [x] = eval_n::<1>("constantly", ev, args, env)?;
                let params = Expr::Bracket(vec![Expr::symbol("&"), Expr::symbol("_")]);
                let closure = ev.make_closure(
                    "constantly",
                    Some("constantly".to_string()),
                    &params,
                    &[Expr::quoted(x)],
                    env,
                )?;
                Ok(Value::Function(closure))
            },
        )?;

        Ok(())
    }
}

fn callable(form: &str, value: Value) -> Result<Value> {
    if value.is_callable() {
        Ok(value)
    } else {
        Err(Error::invalid_args(
            form,
            format!("expected a function, got {}", value.type_name()),
        ))
    }
}

fn callables(form: &str, ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Vec<Value>> {
    ev.eval_all(args, env)?
        .into_iter()
        .map(|v| callable(form, v))
        .collect()
}

fn eval_map(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_min("map", args, 2)?;
    let mut values = ev.eval_all(args, env)?;
    let func = values.remove(0);
    let colls = values
        .iter()
        .map(Value::as_seq)
        .collect::<Result<Vec<_>>>()?;
    let len = colls.iter().map(|c| c.len()).min().unwrap_or(0);

    let mut results = Vec::with_capacity(len);
    for i in 0..len {
        let call_args = colls.iter().map(|c| c[i].clone()).collect();
        results.push(ev.apply_values(&func, call_args, env)?);
    }
    Ok(Value::list(results))
}

fn eval_reduce(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_range("reduce", args, 2, 3)?;
    let mut values = ev.eval_all(args, env)?;
    let coll = values.pop().unwrap_or(Value::Nil);
    let func = values.remove(0);
    let items = coll.as_seq()?;

    let (mut acc, rest) = match values.pop() {
        Some(init) => (init, items),
        None => match items.split_first() {
            Some((first, rest)) => (first.clone(), rest),
            // (reduce f []) is (f)
            None => return ev.apply_values(&func, Vec::new(), env),
        },
    };
    for item in rest {
        acc = ev.apply_values(&func, vec![acc, item.clone()], env)?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::eval_lisp;

    fn show(source: &str) -> String {
        eval_lisp(source).unwrap().to_string()
    }

    #[test]
    fn test_map_filter_reduce() {
        assert_eq!(show("(map (fn [x] (* x 2)) [1 2 3])"), "(2 4 6)");
        assert_eq!(show("(map + [1 2 3] [10 20])"), "(11 22)");
        assert_eq!(show("(filter even? (range 6))"), "(0 2 4)");
        assert_eq!(show("(reduce + [1 2 3 4])"), "10");
        assert_eq!(show("(reduce + 100 [1 2])"), "103");
        assert_eq!(show("(reduce + [])"), "0");
        assert_eq!(show("(reduce (fn [acc x] (conj acc x)) [] '(1 2))"), "[1 2]");
    }

    #[test]
    fn test_every_and_some() {
        assert_eq!(show("(every? pos? [1 2])"), "true");
        assert_eq!(show("(every? pos? [])"), "true");
        assert_eq!(show("(some neg? [1 -2])"), "true");
        assert_eq!(show("(some (fn [x] (when (> x 1) (* x 10))) [1 2 3])"), "20");
        assert_eq!(show("(some neg? [1 2])"), "nil");
    }

    #[test]
    fn test_partial() {
        assert_eq!(show("((partial + 10) 5)"), "15");
        assert_eq!(show("((partial - 10 1) 2)"), "7");
        assert!(matches!(
            eval_lisp("(partial 1)"),
            Err(Error::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_comp_complement_juxt() {
        assert_eq!(show("((comp inc (fn [x] (* x 2))) 5)"), "11");
        assert_eq!(show("((comp) 7)"), "7");
        assert_eq!(show("((complement even?) 3)"), "true");
        assert_eq!(show("((complement (fn [x] nil)) 3)"), "true");
        assert_eq!(show("((juxt inc dec) 5)"), "[6 4]");
        assert_eq!(show("(map (juxt first last) [[1 2 3]])"), "([1 3])");
    }

    #[test]
    fn test_constantly() {
        assert_eq!(show("((constantly 42) 1 2 3)"), "42");
        assert_eq!(show("((constantly :k))"), ":k");
    }
}
