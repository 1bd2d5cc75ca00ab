//! Namespaced modules
//!
//! ```text
//! (module geometry
//!   (export area)
//!   (def pi 3.14159)
//!   (defn area [r] (* pi r r)))
//!
//! (geometry.area 2)
//! ```
//!
//! The body runs in its own scope, so private helpers stay private. Members
//! named by `export` become reachable as `module.member`; a module that
//! exports nothing exposes every binding of its body.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::plugins::{expect_min, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::{Environment, Evaluator, Module, Value};

/// `module` and `export`
pub struct ModulePlugin;

impl Plugin for ModulePlugin {
    fn name(&self) -> &str {
        "module"
    }

    fn description(&self) -> &str {
        "Modules with exported members"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["core".to_string()]
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        registry.define(
            "module",
            "module",
            Arity::Variadic,
            "(module name body...) - define a module in the current scope",
            eval_module,
        )?;
        registry.define(
            "export",
            "module",
            Arity::Variadic,
            "(export name...) - mark names of the enclosing module as public",
            |_, args, env| {
                for arg in args {
                    env.mark_exported(symbol_name("export", arg)?);
                }
                Ok(Value::Nil)
            },
        )?;
        Ok(())
    }
}

fn eval_module(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_min("module", args, 1)?;
    let name = symbol_name("module", &args[0])?;
    if name.contains('.') {
        return Err(Error::invalid_args("module", "module names cannot contain '.'"));
    }

    let scope = env.new_child();
    ev.eval_all(&args[1..], &scope)?;

    let mut exported = scope.exports();
    if exported.is_empty() {
        exported = scope.local_names();
    }
    let mut members = BTreeMap::new();
    for member in exported {
        let value = scope.get(&member).ok_or_else(|| Error::UndefinedModuleSymbol {
            module: name.to_string(),
            name: member.clone(),
        })?;
        members.insert(member, value);
    }

    tracing::debug!(module = %name, members = members.len(), "module defined");
    env.define_module(Module::new(name, members));
    Ok(Value::Nil)
}

fn symbol_name<'a>(form: &str, expr: &'a Expr) -> Result<&'a str> {
    expr.as_symbol()
        .ok_or_else(|| Error::invalid_args(form, format!("expected a symbol, got {}", expr.kind_name())))
}
