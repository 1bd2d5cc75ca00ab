//! Calling values: closures, builtin references and composite functions

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::runtime::convert::{quote_expr, value_to_code};
use crate::runtime::{arithmetic, Closure, Environment, Evaluator, PendingCall, Value};

impl Evaluator {
    /// Call `func` with unevaluated argument expressions
    ///
    /// Arguments are evaluated in `env` when the callee wants them evaluated;
    /// builtins and macros receive them as written.
    pub fn call_function(&self, func: &Value, args: &[Expr], env: &Environment) -> Result<Value> {
        let value = self.call_function_tail(func, args, env)?;
        self.force(value)
    }

    /// Call `func` with values that are already evaluated
    pub fn apply_values(&self, func: &Value, args: Vec<Value>, env: &Environment) -> Result<Value> {
        let exprs: Vec<Expr> = args.into_iter().map(Expr::quoted).collect();
        self.call_function(func, &exprs, env)
    }

    /// [`Evaluator::call_function`] in tail position; may return a pending call
    pub fn call_function_tail(
        &self,
        func: &Value,
        args: &[Expr],
        env: &Environment,
    ) -> Result<Value> {
        match func {
            Value::Function(closure) => {
                let values = self.eval_all(args, env)?;
                if !closure.accepts(values.len()) {
                    return Err(Error::arity(
                        closure.display_name(),
                        closure.arity_description(),
                        values.len(),
                    ));
                }
                Ok(Value::TailCall(Box::new(PendingCall {
                    closure: Arc::clone(closure),
                    args: values,
                })))
            }

            Value::Builtin(name) => {
                let handler = self
                    .registry()
                    .handler(name)
                    .ok_or_else(|| Error::UnknownFunction { name: name.clone() })?;
                handler(self, args, env)
            }

            Value::Arithmetic(op) => {
                let values = self.eval_all(args, env)?;
                arithmetic::apply(op, &values)
            }

            Value::Partial { func, bound } => {
                let mut combined: Vec<Expr> = bound.iter().cloned().map(Expr::quoted).collect();
                for arg in args {
                    combined.push(Expr::quoted(self.eval(arg, env)?));
                }
                self.call_function_tail(func, &combined, env)
            }

            Value::Complement(pred) => {
                let result = self.call_function(pred, args, env)?;
                Ok(Value::Boolean(match result {
                    Value::Boolean(b) => !b,
                    Value::Nil => true,
                    _ => false,
                }))
            }

            Value::Juxt(fns) => {
                let values: Vec<Expr> = self
                    .eval_all(args, env)?
                    .into_iter()
                    .map(Expr::quoted)
                    .collect();
                let results = fns
                    .iter()
                    .map(|f| self.call_function(f, &values, env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::vector(results))
            }

            Value::Comp(fns) => {
                let Some((innermost, outer)) = fns.split_last() else {
                    return match self.eval_all(args, env)?.as_slice() {
                        [single] => Ok(single.clone()),
                        other => Err(Error::arity("comp", "1", other.len())),
                    };
                };
                let mut result = self.call_function(innermost, args, env)?;
                for (i, f) in outer.iter().enumerate().rev() {
                    let arg = [Expr::quoted(result)];
                    if i == 0 {
                        return self.call_function_tail(f, &arg, env);
                    }
                    result = self.call_function(f, &arg, env)?;
                }
                Ok(result)
            }

            Value::Macro(closure) => {
                let expansion = self.expand_macro(closure, args)?;
                self.eval_tail(&value_to_code(&expansion), env)
            }

            other => Err(Error::NotCallable {
                type_name: other.type_name().to_string(),
            }),
        }
    }

    /// First stage of a macro call: bind the argument forms as data and run
    /// the body, producing the code to evaluate in the caller's environment
    pub fn expand_macro(&self, closure: &Closure, args: &[Expr]) -> Result<Value> {
        let quoted = args.iter().map(quote_expr).collect::<Result<Vec<_>>>()?;
        let frame = closure.env.new_child();
        self.bind_params(closure, quoted, &frame)?;
        let body = self.eval_body(&closure.body, &frame)?;
        self.force(body)
    }

    /// Build a closure from a parameter vector and body
    ///
    /// Parameters are symbols; `& name` collects remaining arguments and must
    /// come last.
    pub fn make_closure(
        &self,
        form: &str,
        name: Option<String>,
        params: &Expr,
        body: &[Expr],
        env: &Environment,
    ) -> Result<Arc<Closure>> {
        let (params, rest) = parse_params(form, params)?;
        Ok(Arc::new(Closure {
            name,
            params,
            rest,
            body: Arc::new(body.to_vec()),
            env: env.clone(),
        }))
    }
}

fn parse_params(form: &str, params: &Expr) -> Result<(Vec<String>, Option<String>)> {
    let items = match params {
        Expr::Bracket(items) | Expr::List(items) => items,
        other => {
            return Err(Error::invalid_args(
                form,
                format!("parameters must be a vector, got {}", other.kind_name()),
            ))
        }
    };

    let mut names = Vec::with_capacity(items.len());
    for item in items {
        match item.as_symbol() {
            Some(name) => names.push(name.to_string()),
            None => {
                return Err(Error::invalid_args(
                    form,
                    format!("parameter must be a symbol, got {}", item),
                ))
            }
        }
    }

    match names.iter().position(|n| n == "&") {
        None => Ok((names, None)),
        Some(pos) if pos + 2 == names.len() && names[pos + 1] != "&" => {
            let rest = names.pop();
            names.pop();
            Ok((names, rest))
        }
        Some(_) => Err(Error::invalid_args(
            form,
            "`&` must be followed by exactly one parameter",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::registry::FunctionRegistry;

    fn form(source: &str) -> Expr {
        parse(source).unwrap().remove(0)
    }

    fn closure(ev: &Evaluator, env: &Environment, params: &str, body: &str) -> Value {
        let body = parse(body).unwrap();
        Value::Function(ev.make_closure("fn", None, &form(params), &body, env).unwrap())
    }

    fn setup() -> (Evaluator, Environment) {
        (
            Evaluator::new(Arc::new(FunctionRegistry::new())),
            Environment::new(),
        )
    }

    #[test]
    fn test_parse_params() {
        assert_eq!(
            parse_params("fn", &form("[a b]")).unwrap(),
            (vec!["a".to_string(), "b".to_string()], None)
        );
        assert_eq!(
            parse_params("fn", &form("[a & more]")).unwrap(),
            (vec!["a".to_string()], Some("more".to_string()))
        );
        assert!(parse_params("fn", &form("[a & b c]")).is_err());
        assert!(parse_params("fn", &form("[a &]")).is_err());
        assert!(parse_params("fn", &form("[1]")).is_err());
        assert!(parse_params("fn", &form("x")).is_err());
    }

    #[test]
    fn test_closure_call_and_arity() {
        let (ev, env) = setup();
        let add = closure(&ev, &env, "[a b]", "(+ a b)");
        let args = parse("1 2").unwrap();
        assert_eq!(ev.call_function(&add, &args, &env).unwrap(), Value::Number(3.0));

        let err = ev.call_function(&add, &parse("1").unwrap(), &env).unwrap_err();
        assert!(matches!(err, Error::Arity { got: 1, .. }));
    }

    #[test]
    fn test_rest_params() {
        let (ev, env) = setup();
        let f = closure(&ev, &env, "[a & more]", "more");
        let args = vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)];
        assert_eq!(ev.apply_values(&f, args, &env).unwrap().to_string(), "(2 3)");
        let empty = ev.apply_values(&f, vec![Value::Number(1.0)], &env).unwrap();
        assert_eq!(empty.to_string(), "()");
    }

    #[test]
    fn test_partial_and_complement() {
        let (ev, env) = setup();
        let partial = Value::Partial {
            func: Arc::new(Value::Arithmetic("-".to_string())),
            bound: Arc::new(vec![Value::Number(10.0)]),
        };
        assert_eq!(
            ev.apply_values(&partial, vec![Value::Number(3.0)], &env).unwrap(),
            Value::Number(7.0)
        );

        let identity = closure(&ev, &env, "[x]", "x");
        let negate = Value::Complement(Arc::new(identity));
        let check = |v: Value| ev.apply_values(&negate, vec![v], &env).unwrap();
        assert_eq!(check(Value::Nil), Value::Boolean(true));
        assert_eq!(check(Value::Boolean(true)), Value::Boolean(false));
        assert_eq!(check(Value::Number(0.0)), Value::Boolean(false));
    }

    #[test]
    fn test_comp_and_juxt() {
        let (ev, env) = setup();
        let inc = closure(&ev, &env, "[x]", "(+ x 1)");
        let double = closure(&ev, &env, "[x]", "(* x 2)");

        let comp = Value::Comp(Arc::new(vec![inc.clone(), double.clone()]));
        // inc(double(5))
        assert_eq!(
            ev.apply_values(&comp, vec![Value::Number(5.0)], &env).unwrap(),
            Value::Number(11.0)
        );

        let juxt = Value::Juxt(Arc::new(vec![inc, double]));
        assert_eq!(
            ev.apply_values(&juxt, vec![Value::Number(5.0)], &env)
                .unwrap()
                .to_string(),
            "[6 10]"
        );
    }

    #[test]
    fn test_not_callable() {
        let (ev, env) = setup();
        assert!(matches!(
            ev.apply_values(&Value::string("f"), vec![], &env),
            Err(Error::NotCallable { type_name }) if type_name == "string"
        ));
    }

    #[test]
    fn test_macro_expansion_uses_caller_env() {
        let (ev, env) = setup();
        let identity_macro = Value::Macro(
            ev.make_closure("defmacro", None, &form("[x]"), &parse("x").unwrap(), &env)
                .unwrap(),
        );
        env.set("y", Value::Number(9.0));
        // The argument form `y` comes back as code and runs in the caller's env
        assert_eq!(
            ev.call_function(&identity_macro, &parse("y").unwrap(), &env).unwrap(),
            Value::Number(9.0)
        );
        let expansion = match &identity_macro {
            Value::Macro(c) => ev.expand_macro(c, &parse("(+ y 1)").unwrap()).unwrap(),
            _ => unreachable!(),
        };
        assert_eq!(expansion.to_string(), "(+ y 1)");
    }
}
