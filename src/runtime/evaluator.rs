//! The evaluator
//!
//! `eval` dispatches on the kind of expression:
//!
//! - literals evaluate to themselves
//! - symbols resolve through module access, the registry, the arithmetic
//!   intrinsics and finally the environment chain
//! - lists are calls; a head naming a registered function gets its argument
//!   expressions unevaluated, anything else is evaluated and called
//! - `[...]` and `{...}` evaluate their elements into new collections
//!
//! # Tail calls
//!
//! Calls to user closures do not recurse on the native stack. In tail position
//! they produce a [`Value::TailCall`] marker holding the closure and its
//! evaluated arguments; the nearest enclosing `eval` or `call_function` runs
//! these in a loop. Handlers for forms with tail positions (`if`, `do`, `let`,
//! ...) use [`Evaluator::eval_tail`] for those positions and return its result
//! unchanged. Everything else uses [`Evaluator::eval`], which never returns a
//! marker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{CallFrame, Error, Result};
use crate::parser::Expr;
use crate::registry::FunctionRegistry;
use crate::runtime::convert::parse_big;
use crate::runtime::{
    arithmetic, ensure_sufficient_stack, Closure, Environment, PendingCall, Value,
};

/// Evaluation settings
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Decorate errors with the chain of calls they propagated through
    pub trace_calls: bool,
}

/// Evaluator for rulisp expressions
///
/// Holds no per-evaluation state: the environment is passed to every call, so
/// one evaluator (or cheap clones of it) can serve several threads at once.
#[derive(Clone)]
pub struct Evaluator {
    registry: Arc<FunctionRegistry>,
    options: EvalOptions,
    gensym_counter: Arc<AtomicU64>,
}

impl Evaluator {
    /// Creates an evaluator over a function registry
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self::with_options(registry, EvalOptions::default())
    }

    /// Creates an evaluator with explicit options
    pub fn with_options(registry: Arc<FunctionRegistry>, options: EvalOptions) -> Self {
        Evaluator {
            registry,
            options,
            gensym_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Function registry consulted for calls by name
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Evaluation settings
    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Unique symbol name, e.g. `G__12`
    pub fn gensym(&self, prefix: &str) -> String {
        let n = self.gensym_counter.fetch_add(1, Ordering::Relaxed);
        format!("{}__{}", prefix, n)
    }

    /// Evaluate an expression to a value
    pub fn eval(&self, expr: &Expr, env: &Environment) -> Result<Value> {
        let value = self.eval_tail(expr, env)?;
        self.force(value)
    }

    /// Evaluate an expression in tail position
    ///
    /// May return a [`Value::TailCall`]; callers must either hand it back to
    /// their own caller or pass it to [`Evaluator::force`].
    pub fn eval_tail(&self, expr: &Expr, env: &Environment) -> Result<Value> {
        ensure_sufficient_stack(|| match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::BigNumber(text) => Ok(Value::BigNumber(parse_big(text)?)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Keyword(k) => Ok(Value::Keyword(k.clone())),
            Expr::Value(v) => Ok(v.clone()),
            Expr::Symbol(name) => self.resolve_symbol(name, env),
            Expr::List(items) => self.eval_list(items, env),
            Expr::Bracket(items) => Ok(Value::vector(self.eval_all(items, env)?)),
            Expr::HashMap(items) => self.eval_map_literal(items, env),
        })
    }

    /// Evaluate body forms in order; the last one is in tail position
    pub fn eval_body(&self, body: &[Expr], env: &Environment) -> Result<Value> {
        match body.split_last() {
            None => Ok(Value::Nil),
            Some((last, init)) => {
                for expr in init {
                    self.eval(expr, env)?;
                }
                self.eval_tail(last, env)
            }
        }
    }

    /// Evaluate expressions left to right
    pub fn eval_all(&self, exprs: &[Expr], env: &Environment) -> Result<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e, env)).collect()
    }

    /// Run pending tail calls until a plain value results
    pub fn force(&self, value: Value) -> Result<Value> {
        let mut current = value;
        let mut iterations: u64 = 0;
        loop {
            match current {
                Value::TailCall(call) => {
                    iterations += 1;
                    let PendingCall { closure, args } = *call;
                    current = self.enter_closure(&closure, args)?;
                }
                value => {
                    if iterations > 1 {
                        tracing::trace!(iterations, "tail-call loop finished");
                    }
                    return Ok(value);
                }
            }
        }
    }

    /// Bind arguments in a fresh child of the closure's environment and run its body
    ///
    /// Returns the body's tail value, which may itself be a pending call.
    fn enter_closure(&self, closure: &Arc<Closure>, args: Vec<Value>) -> Result<Value> {
        let frame = closure.env.new_child();
        let rendered = self
            .options
            .trace_calls
            .then(|| render_call(closure.display_name(), &args));

        let result = self
            .bind_params(closure, args, &frame)
            .and_then(|()| self.eval_body(&closure.body, &frame));

        match (result, rendered) {
            (Err(e), Some(form)) => Err(e.with_frame(CallFrame {
                name: closure.display_name().to_string(),
                form,
            })),
            (result, _) => result,
        }
    }

    /// Bind positional parameters and the `& rest` list
    pub(super) fn bind_params(
        &self,
        closure: &Closure,
        args: Vec<Value>,
        frame: &Environment,
    ) -> Result<()> {
        if !closure.accepts(args.len()) {
            return Err(Error::arity(
                closure.display_name(),
                closure.arity_description(),
                args.len(),
            ));
        }
        let mut args = args.into_iter();
        for (param, arg) in closure.params.iter().zip(args.by_ref()) {
            frame.set(param.clone(), arg);
        }
        if let Some(rest) = &closure.rest {
            frame.set(rest.clone(), Value::list(args.collect()));
        }
        Ok(())
    }

    fn resolve_symbol(&self, name: &str, env: &Environment) -> Result<Value> {
        if name.contains('.') {
            return self.resolve_module_member(name, env);
        }
        if self.registry.has(name) {
            return Ok(Value::Builtin(name.to_string()));
        }
        if arithmetic::is_operator(name) {
            return Ok(Value::Arithmetic(name.to_string()));
        }
        env.get(name).ok_or_else(|| Error::UndefinedSymbol {
            name: name.to_string(),
        })
    }

    /// `module.member` lookup; exactly one dot with non-empty sides
    fn resolve_module_member(&self, name: &str, env: &Environment) -> Result<Value> {
        let parts: Vec<&str> = name.split('.').collect();
        let (module_name, member) = match parts.as_slice() {
            [module, member] if !module.is_empty() && !member.is_empty() => (*module, *member),
            _ => {
                return Err(Error::InvalidModuleAccess {
                    name: name.to_string(),
                })
            }
        };
        let module = env
            .get_module(module_name)
            .ok_or_else(|| Error::UndefinedModule {
                name: module_name.to_string(),
            })?;
        module.get(member).ok_or_else(|| Error::UndefinedModuleSymbol {
            module: module_name.to_string(),
            name: member.to_string(),
        })
    }

    fn eval_list(&self, items: &[Expr], env: &Environment) -> Result<Value> {
        let (head, args) = items.split_first().ok_or(Error::EmptyList)?;

        if let Expr::Symbol(name) = head {
            if let Some(handler) = self.registry.handler(name) {
                let result = handler(self, args, env);
                return match result {
                    Err(e) if self.options.trace_calls => Err(e.with_frame(CallFrame {
                        name: name.clone(),
                        form: Expr::List(items.to_vec()).to_string(),
                    })),
                    other => other,
                };
            }
        }

        let func = self.eval(head, env)?;
        self.call_function_tail(&func, args, env)
    }

    fn eval_map_literal(&self, items: &[Expr], env: &Environment) -> Result<Value> {
        let mut entries = BTreeMap::new();
        for pair in items.chunks(2) {
            let [key, val] = pair else {
                return Err(Error::ParseError(
                    "Map literal must contain an even number of forms".to_string(),
                ));
            };
            let key = self.eval(key, env)?.as_key()?;
            let val = self.eval(val, env)?;
            entries.insert(key, val);
        }
        Ok(Value::map(entries))
    }
}

/// `(name arg ...)` for trace frames
fn render_call(name: &str, args: &[Value]) -> String {
    let mut form = format!("({}", name);
    for arg in args {
        form.push(' ');
        form.push_str(&arg.to_string());
    }
    form.push(')');
    form
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}
