//! Core special forms: quoting, definitions, closures, macros and errors

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::plugins::{expect_args, expect_min, expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::convert::{quote_expr, value_to_code};
use crate::runtime::{Environment, Evaluator, Value};

/// Quoting, definitions, closures, macros and error handling
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn name(&self) -> &str {
        "core"
    }

    fn description(&self) -> &str {
        "Special forms: quote, def, fn, defmacro, do, try and friends"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Quoting
        registry.define("quote", "core", Arity::Fixed(1), "Return the argument unevaluated", |_, args, _| {
            expect_args("quote", args, 1)?;
            quote_expr(&args[0])
        })?;
        registry.define(
            "quasiquote",
            "core",
            Arity::Fixed(1),
            "Quote a template, evaluating (unquote x) and splicing (unquote-splicing xs)",
            |ev, args, env| {
                expect_args("quasiquote", args, 1)?;
                quasiquote(ev, &args[0], env)
            },
        )?;

        // Definitions
        registry.define("def", "core", Arity::Fixed(2), "Bind a name in the current scope", eval_def)?;
        registry.define("fn", "core", Arity::Variadic, "Create a closure: (fn [params] body...)", eval_fn)?;
        registry.define(
            "defn",
            "core",
            Arity::Variadic,
            "Define a named function: (defn name [params] body...)",
            |ev, args, env| eval_defn("defn", ev, args, env),
        )?;
        registry.define(
            "defmacro",
            "core",
            Arity::Variadic,
            "Define a macro: (defmacro name [params] body...)",
            |ev, args, env| eval_defn("defmacro", ev, args, env),
        )?;

        // Evaluation
        registry.define("do", "core", Arity::Variadic, "Evaluate forms in order, returning the last", |ev, args, env| {
            ev.eval_body(args, env)
        })?;
        registry.define("eval", "core", Arity::Fixed(1), "Evaluate a data structure as code", |ev, args, env| {
            expect_args("eval", args, 1)?;
            let form = ev.eval(&args[0], env)?;
            ev.eval_tail(&value_to_code(&form), env)
        })?;
        registry.define("apply", "core", Arity::Variadic, "Call f with args, the last being a sequence", eval_apply)?;
        registry.define("identity", "core", Arity::Fixed(1), "Return the argument", |ev, args, env| {
            expect_args("identity", args, 1)?;
            ev.eval(&args[0], env)
        })?;
        registry.define("type", "core", Arity::Fixed(1), "Type name of a value", |ev, args, env| {
            expect_args("type", args, 1)?;
            Ok(Value::string(ev.eval(&args[0], env)?.type_name()))
        })?;

        // Macros
        registry.define("gensym", "core", Arity::Variadic, "Fresh unique symbol", |ev, args, env| {
            expect_range("gensym", args, 0, 1)?;
            let prefix = match args.first() {
                Some(arg) => ev.eval(arg, env)?.to_display_string(),
                None => "G".to_string(),
            };
            Ok(Value::Symbol(ev.gensym(&prefix)))
        })?;
        registry.define(
            "macroexpand",
            "core",
            Arity::Fixed(1),
            "Expand a macro call form once without evaluating the result",
            eval_macroexpand,
        )?;

        // Errors
        registry.define("throw", "core", Arity::Fixed(1), "Raise a user error", |ev, args, env| {
            expect_args("throw", args, 1)?;
            let message = ev.eval(&args[0], env)?.to_display_string();
            Err(Error::UserError(message))
        })?;
        registry.define(
            "try",
            "core",
            Arity::Variadic,
            "(try body... (catch e handler...) (finally cleanup...))",
            eval_try,
        )?;

        Ok(())
    }
}

// =============================================================================
// Quasiquote
// =============================================================================

fn quasiquote(ev: &Evaluator, template: &Expr, env: &Environment) -> Result<Value> {
    match template {
        Expr::List(items) => {
            if let Some(inner) = unquoted(items, "unquote") {
                return ev.eval(inner, env);
            }
            Ok(Value::list(quasiquote_items(ev, items, env)?))
        }
        Expr::Bracket(items) => Ok(Value::vector(quasiquote_items(ev, items, env)?)),
        other => quote_expr(other),
    }
}

fn quasiquote_items(ev: &Evaluator, items: &[Expr], env: &Environment) -> Result<Vec<Value>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if let Expr::List(inner) = item {
            if let Some(spliced) = unquoted(inner, "unquote-splicing") {
                out.extend(ev.eval(spliced, env)?.as_seq()?.iter().cloned());
                continue;
            }
        }
        out.push(quasiquote(ev, item, env)?);
    }
    Ok(out)
}

/// `(marker x)` => `x`
fn unquoted<'a>(items: &'a [Expr], marker: &str) -> Option<&'a Expr> {
    match items {
        [head, inner] if head.as_symbol() == Some(marker) => Some(inner),
        _ => None,
    }
}

// =============================================================================
// Definitions
// =============================================================================

fn symbol_arg<'a>(form: &str, expr: &'a Expr) -> Result<&'a str> {
    expr.as_symbol().ok_or_else(|| {
        Error::invalid_args(form, format!("expected a symbol name, got {}", expr))
    })
}

fn eval_def(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_args("def", args, 2)?;
    let name = symbol_arg("def", &args[0])?;
    let value = ev.eval(&args[1], env)?;
    env.set(name, value.clone());
    Ok(value)
}

/// `(fn [params] body...)` or `(fn name [params] body...)`
fn eval_fn(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_min("fn", args, 1)?;
    let (name, rest) = match &args[0] {
        Expr::Symbol(name) if args.len() > 1 => (Some(name.clone()), &args[1..]),
        _ => (None, args),
    };
    let closure = ev.make_closure("fn", name, &rest[0], &rest[1..], env)?;
    Ok(Value::Function(closure))
}

/// Shared by `defn` and `defmacro`; a docstring after the name is skipped
fn eval_defn(form: &str, ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_min(form, args, 2)?;
    let name = symbol_arg(form, &args[0])?;
    let mut rest = &args[1..];
    if let [Expr::String(_), params, ..] = rest {
        if matches!(params, Expr::Bracket(_) | Expr::List(_)) {
            rest = &rest[1..];
        }
    }
    let closure = ev.make_closure(form, Some(name.to_string()), &rest[0], &rest[1..], env)?;
    let value = if form == "defmacro" {
        Value::Macro(closure)
    } else {
        Value::Function(closure)
    };
    env.set(name, value.clone());
    Ok(value)
}

// =============================================================================
// Evaluation helpers
// =============================================================================

fn eval_apply(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_min("apply", args, 2)?;
    let func = ev.eval(&args[0], env)?;
    let mut values = ev.eval_all(&args[1..], env)?;
    let last = values.pop().unwrap_or(Value::Nil);
    values.extend(last.as_seq()?.iter().cloned());
    let exprs: Vec<Expr> = values.into_iter().map(Expr::quoted).collect();
    ev.call_function_tail(&func, &exprs, env)
}

fn eval_macroexpand(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_args("macroexpand", args, 1)?;
    let form = ev.eval(&args[0], env)?;
    let Value::List(items) = &form else {
        return Ok(form);
    };
    let Some((Value::Symbol(head), call_args)) = items.split_first() else {
        return Ok(form);
    };
    match env.get(head) {
        Some(Value::Macro(closure)) => {
            let exprs: Vec<Expr> = call_args.iter().map(value_to_code).collect();
            ev.expand_macro(&closure, &exprs)
        }
        _ => Ok(form),
    }
}

// =============================================================================
// try / catch / finally
// =============================================================================

fn eval_try(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    let mut body: &[Expr] = args;
    let mut finally: Option<&[Expr]> = None;
    let mut catch: Option<(&str, &[Expr])> = None;

    if let Some(Expr::List(items)) = body.last() {
        if items.first().and_then(Expr::as_symbol) == Some("finally") {
            finally = Some(&items[1..]);
            body = &body[..body.len() - 1];
        }
    }
    if let Some(Expr::List(items)) = body.last() {
        if items.first().and_then(Expr::as_symbol) == Some("catch") {
            let var = items
                .get(1)
                .ok_or_else(|| Error::invalid_args("try", "catch requires an error variable"))?;
            catch = Some((symbol_arg("catch", var)?, &items[2..]));
            body = &body[..body.len() - 1];
        }
    }

    // Not in tail position: errors from pending calls must surface here
    let result = ev.eval_body(body, env).and_then(|v| ev.force(v));
    let result = match (result, catch) {
        (Err(error), Some((var, handler))) => {
            let scope = env.new_child();
            scope.set(var, Value::string(error_message(&error)));
            ev.eval_body(handler, &scope).and_then(|v| ev.force(v))
        }
        (result, _) => result,
    };

    if let Some(cleanup) = finally {
        ev.eval_body(cleanup, env).and_then(|v| ev.force(v))?;
    }
    result
}

/// Text bound to the catch variable; thrown messages are passed through as-is
fn error_message(error: &Error) -> String {
    match error.root() {
        Error::UserError(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::sync::Arc;

    fn run(source: &str) -> Result<Value> {
        let registry = Arc::new(FunctionRegistry::new());
        CorePlugin.register_functions(&registry)?;
        let ev = Evaluator::new(registry);
        let env = Environment::new();
        let mut last = Value::Nil;
        for form in parse(source)? {
            last = ev.eval(&form, &env)?;
        }
        Ok(last)
    }

    #[test]
    fn test_quote_and_quasiquote() {
        assert_eq!(run("'(a b 1)").unwrap().to_string(), "(a b 1)");
        assert_eq!(
            run("(def xs [2 3]) (def y 9) `(1 ~y ~@xs [~y])").unwrap().to_string(),
            "(1 9 2 3 [9])"
        );
    }

    #[test]
    fn test_defn_and_docstring() {
        assert_eq!(
            run(r#"(defn sq "squares" [x] (* x x)) (sq 7)"#).unwrap(),
            Value::Number(49.0)
        );
        assert_eq!(run("(defn f [] 1)").unwrap().to_string(), "#<fn f>");
        assert!(matches!(
            run("(defn f [a & b c] a)"),
            Err(Error::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_named_fn() {
        assert_eq!(run("((fn twice [n] (* n 2)) 4)").unwrap(), Value::Number(8.0));
        assert_eq!(run("(fn twice [n] n)").unwrap().to_string(), "#<fn twice>");
    }

    #[test]
    fn test_defmacro_and_macroexpand() {
        let src = "(defmacro unless2 [c body] (list 'if c 0 body))";
        assert_eq!(
            run(&format!("(def list (fn [& xs] xs)) {} (macroexpand '(unless2 false 1))", src))
                .unwrap()
                .to_string(),
            "(if false 0 1)"
        );
    }

    #[test]
    fn test_try_catch_finally() {
        assert_eq!(
            run(r#"(try (throw "boom") (catch e e))"#).unwrap(),
            Value::string("boom")
        );
        assert_eq!(
            run("(def log 0) (try 1 (finally (def log 5))) log").unwrap(),
            Value::Number(5.0)
        );
        assert!(matches!(
            run(r#"(try (throw "x"))"#),
            Err(Error::UserError(m)) if m == "x"
        ));
        assert_eq!(
            run("(try (undefined-thing) (catch e \"caught\"))").unwrap(),
            Value::string("caught")
        );
    }

    #[test]
    fn test_apply_eval_and_type() {
        assert_eq!(run("(apply + 1 2 [3 4])").unwrap(), Value::Number(10.0));
        assert_eq!(run("(eval '(+ 1 2))").unwrap(), Value::Number(3.0));
        assert_eq!(run("(type \"s\")").unwrap(), Value::string("string"));
        assert!(matches!(run("(gensym)").unwrap(), Value::Symbol(s) if s.starts_with("G__")));
    }
}
