//! Local bindings

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::plugins::{expect_min, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::{Environment, Evaluator, Value};

/// `let`
pub struct BindingPlugin;

impl Plugin for BindingPlugin {
    fn name(&self) -> &str {
        "binding"
    }

    fn description(&self) -> &str {
        "Lexically scoped local bindings"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["core".to_string()]
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        registry.define(
            "let",
            "binding",
            Arity::Variadic,
            "(let [name value ...] body...) - bindings are sequential",
            eval_let,
        )
    }
}

/// Each value is evaluated in the scope holding the bindings before it
fn eval_let(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_min("let", args, 1)?;
    let bindings = match &args[0] {
        Expr::Bracket(items) | Expr::List(items) => items,
        other => {
            return Err(Error::invalid_args(
                "let",
                format!("bindings must be a vector, got {}", other.kind_name()),
            ))
        }
    };
    if bindings.len() % 2 != 0 {
        return Err(Error::invalid_args(
            "let",
            "bindings must contain an even number of forms",
        ));
    }

    let scope = env.new_child();
    for pair in bindings.chunks(2) {
        let name = pair[0].as_symbol().ok_or_else(|| {
            Error::invalid_args("let", format!("binding name must be a symbol, got {}", pair[0]))
        })?;
        let value = ev.eval(&pair[1], &scope)?;
        scope.set(name, value);
    }
    ev.eval_body(&args[1..], &scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::eval_lisp;

    #[test]
    fn test_let() {
        assert_eq!(
            eval_lisp("(let [a 10 b 20] (+ a b))").unwrap(),
            Value::Number(30.0)
        );
        assert_eq!(
            eval_lisp("(let [a 1 b (+ a 1)] b)").unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(eval_lisp("(let [])").unwrap(), Value::Nil);
    }

    #[test]
    fn test_let_shadows_without_leaking() {
        assert_eq!(
            eval_lisp("(def x 1) (let [x 2] x)").unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            eval_lisp("(def x 1) (let [x 2] x) x").unwrap(),
            Value::Number(1.0)
        );
        assert!(matches!(
            eval_lisp("(let [y 1] y) y"),
            Err(Error::UndefinedSymbol { .. })
        ));
    }

    #[test]
    fn test_let_errors() {
        assert!(matches!(
            eval_lisp("(let [a] a)"),
            Err(Error::InvalidArguments { .. })
        ));
        assert!(matches!(
            eval_lisp("(let [1 2] 3)"),
            Err(Error::InvalidArguments { .. })
        ));
        assert!(eval_lisp("(let x 1)").is_err());
    }
}
