//! Batteries-included front end
//!
//! [`Interpreter`] wires a registry, a plugin manager, an evaluator and a
//! global environment together:
//!
//! ```
//! use rulisp::{Interpreter, Value};
//!
//! let interp = Interpreter::new().unwrap();
//! assert_eq!(interp.eval_str("(+ 1 2 3)").unwrap(), Value::Number(6.0));
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::parser::{parse, Expr};
use crate::plugins::{standard_plugins, Plugin, PluginManager};
use crate::registry::FunctionRegistry;
use crate::runtime::{EvalOptions, Environment, Evaluator, Value};

/// Interpreter settings
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// Builtin plugins to load by name; `None` loads all of them
    pub plugins: Option<Vec<String>>,
    /// Attach call-stack traces to errors
    pub trace_calls: bool,
}

/// Registry, plugins, evaluator and global scope in one place
pub struct Interpreter {
    plugins: PluginManager,
    evaluator: Evaluator,
    global: Environment,
}

impl Interpreter {
    /// Interpreter with every standard plugin loaded
    pub fn new() -> Result<Self> {
        Self::with_config(InterpreterConfig::default())
    }

    /// Interpreter built from `config`
    ///
    /// Named plugins are loaded in dependency order. A name that matches no
    /// builtin plugin fails with `UnknownPlugin`; leaving out a plugin that a
    /// named one depends on fails with `MissingDependency`.
    pub fn with_config(config: InterpreterConfig) -> Result<Self> {
        let registry = Arc::new(FunctionRegistry::new());
        let plugins = PluginManager::new(Arc::clone(&registry));

        let available = standard_plugins();
        let selected = match &config.plugins {
            None => available,
            Some(names) => select_plugins(available, names)?,
        };
        plugins.load_all(selected)?;

        let evaluator = Evaluator::with_options(
            registry,
            EvalOptions {
                trace_calls: config.trace_calls,
            },
        );
        let global = Environment::new();
        global.set("nil", Value::Nil);

        tracing::debug!(
            plugins = plugins.list_plugins().len(),
            functions = plugins.registry().len(),
            "interpreter ready"
        );
        Ok(Interpreter {
            plugins,
            evaluator,
            global,
        })
    }

    /// Evaluate every top-level form of `source`, returning the last value
    pub fn eval_str(&self, source: &str) -> Result<Value> {
        let mut last = Value::Nil;
        for expr in parse(source)? {
            last = self.eval_expr(&expr)?;
        }
        Ok(last)
    }

    /// Evaluate one expression in the global scope
    pub fn eval_expr(&self, expr: &Expr) -> Result<Value> {
        self.evaluator.eval(expr, &self.global)
    }

    /// Evaluate a source file; failures are wrapped in `InFile`
    pub fn eval_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let in_file = |source: Error| Error::InFile {
            path: path.display().to_string(),
            source: Box::new(source),
        };
        let source = std::fs::read_to_string(path).map_err(|e| in_file(e.into()))?;
        self.eval_str(&source).map_err(in_file)
    }

    /// Plugin manager
    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// Function registry shared by the plugins and the evaluator
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        self.plugins.registry()
    }

    /// The evaluator
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Global scope
    pub fn global_env(&self) -> &Environment {
        &self.global
    }

    /// Load an additional plugin
    pub fn load_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        self.plugins.load_plugin(plugin)
    }

    /// Unload a plugin by name
    pub fn unload_plugin(&self, name: &str) -> Result<()> {
        self.plugins.unload_plugin(name)
    }
}

fn select_plugins(available: Vec<Arc<dyn Plugin>>, names: &[String]) -> Result<Vec<Arc<dyn Plugin>>> {
    if let Some(unknown) = names
        .iter()
        .find(|name| !available.iter().any(|p| p.name() == name.as_str()))
    {
        return Err(Error::UnknownPlugin {
            name: unknown.clone(),
        });
    }
    Ok(available
        .into_iter()
        .filter(|p| names.iter().any(|name| name == p.name()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(names: &[&str]) -> InterpreterConfig {
        InterpreterConfig {
            plugins: Some(names.iter().map(|n| n.to_string()).collect()),
            trace_calls: false,
        }
    }

    #[test]
    fn test_eval_str_returns_last_value() {
        let interp = Interpreter::new().unwrap();
        assert_eq!(interp.eval_str("(def x 2) (* x 21)").unwrap(), Value::Number(42.0));
        assert_eq!(interp.eval_str("").unwrap(), Value::Nil);
        assert_eq!(interp.eval_str("nil").unwrap(), Value::Nil);
    }

    #[test]
    fn test_state_persists_between_calls() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(defn sq [x] (* x x))").unwrap();
        assert_eq!(interp.eval_str("(sq 7)").unwrap(), Value::Number(49.0));
        assert!(interp.global_env().has_local("sq"));
    }

    #[test]
    fn test_plugin_selection() {
        let interp = Interpreter::with_config(only(&["logical", "control", "math"])).unwrap();
        assert_eq!(interp.eval_str("(if (not false) (+ 1 1) 0)").unwrap(), Value::Number(2.0));
        assert!(!interp.registry().has("map"));
        assert!(matches!(
            interp.eval_str("(map inc [1])"),
            Err(Error::UndefinedSymbol { .. })
        ));

        assert!(matches!(
            Interpreter::with_config(only(&["math", "bogus"])),
            Err(Error::UnknownPlugin { name }) if name == "bogus"
        ));
        assert!(matches!(
            Interpreter::with_config(only(&["control"])),
            Err(Error::MissingDependency { dependency, .. }) if dependency == "logical"
        ));
    }

    #[test]
    fn test_unload_removes_functions() {
        let interp = Interpreter::new().unwrap();
        interp.unload_plugin("encoding").unwrap();
        assert!(!interp.registry().has("sha256"));
        assert!(interp.unload_plugin("core").is_err());
    }

    #[test]
    fn test_trace_calls_records_frames() {
        let interp = Interpreter::with_config(InterpreterConfig {
            plugins: None,
            trace_calls: true,
        })
        .unwrap();
        let err = interp
            .eval_str("(defn inner [] (undefined-thing)) (defn outer [] (inner) 1) (outer)")
            .unwrap_err();
        let names: Vec<&str> = err.frames().iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"inner"));
        assert!(names.contains(&"outer"));
        assert!(matches!(err.root(), Error::UndefinedSymbol { .. }));
    }

    #[test]
    fn test_eval_file_wraps_errors() {
        let interp = Interpreter::new().unwrap();
        let err = interp.eval_file("/definitely/not/here.lisp").unwrap_err();
        assert!(matches!(err, Error::InFile { .. }));
        assert!(matches!(err.root(), Error::Io(_)));
    }
}
