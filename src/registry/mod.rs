//! Function registry for rulisp
//!
//! The single table of named builtins. Plugins fill it, the evaluator reads
//! it on every call by name. Lookups take a shared lock and may run
//! concurrently; registration and removal take the exclusive lock.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::runtime::{Environment, Evaluator, Value};

/// Builtin calling convention
///
/// Handlers receive their argument expressions unevaluated together with the
/// calling environment, and decide themselves what to evaluate and when. This
/// is what lets special forms such as `if`, `def` and `and` be ordinary
/// registry entries.
pub type Handler = Arc<dyn Fn(&Evaluator, &[Expr], &Environment) -> Result<Value> + Send + Sync>;

/// Declared argument count; informational only, handlers validate their own arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Fixed(usize),
    /// Any number of arguments
    Variadic,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic => write!(f, "variadic"),
        }
    }
}

/// Registered function
#[derive(Clone)]
pub struct FunctionDescriptor {
    /// Name the function is called by
    pub name: String,
    /// Grouping used by `functions` and `list_by_category`
    pub category: String,
    /// Declared arity
    pub arity: Arity,
    /// One-line help text
    pub help: String,
    /// Implementation
    pub handler: Handler,
}

impl FunctionDescriptor {
    /// Build a descriptor from a plain function or closure
    pub fn new<F>(
        name: impl Into<String>,
        category: impl Into<String>,
        arity: Arity,
        help: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(&Evaluator, &[Expr], &Environment) -> Result<Value> + Send + Sync + 'static,
    {
        FunctionDescriptor {
            name: name.into(),
            category: category.into(),
            arity,
            help: help.into(),
            handler: Arc::new(handler),
        }
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Function registry
#[derive(Default)]
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, FunctionDescriptor>>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function; fails if the name is taken
    pub fn register(&self, descriptor: FunctionDescriptor) -> Result<()> {
        let mut functions = self.functions.write();
        if functions.contains_key(&descriptor.name) {
            return Err(Error::DuplicateFunction {
                name: descriptor.name,
            });
        }
        functions.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Shorthand for [`FunctionRegistry::register`] with a fresh descriptor
    pub fn define<F>(&self, name: &str, category: &str, arity: Arity, help: &str, handler: F) -> Result<()>
    where
        F: Fn(&Evaluator, &[Expr], &Environment) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(FunctionDescriptor::new(name, category, arity, help, handler))
    }

    /// Register `alias` as a second name for `target`, sharing its handler
    pub fn register_alias(&self, alias: &str, target: &str) -> Result<()> {
        let original = self.get(target).ok_or_else(|| Error::UnknownFunction {
            name: target.to_string(),
        })?;
        self.register(FunctionDescriptor {
            name: alias.to_string(),
            help: format!("Alias for {}. {}", target, original.help),
            ..original
        })
    }

    /// Get function by name
    pub fn get(&self, name: &str) -> Option<FunctionDescriptor> {
        self.functions.read().get(name).cloned()
    }

    /// Handler for `name`, without cloning the rest of the descriptor
    pub fn handler(&self, name: &str) -> Option<Handler> {
        self.functions.read().get(name).map(|d| Arc::clone(&d.handler))
    }

    /// Check if a function exists
    pub fn has(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }

    /// Remove a function; fails if it is not registered
    pub fn unregister(&self, name: &str) -> Result<FunctionDescriptor> {
        self.functions
            .write()
            .remove(name)
            .ok_or_else(|| Error::UnknownFunction {
                name: name.to_string(),
            })
    }

    /// All function names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Function names in one category, sorted
    pub fn list_by_category(&self, category: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .read()
            .values()
            .filter(|d| d.category == category)
            .map(|d| d.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Distinct categories, sorted
    pub fn categories(&self) -> Vec<String> {
        self.functions
            .read()
            .values()
            .map(|d| d.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Help line for a function: `name (arity) - text`
    pub fn help(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|d| format!("{} ({}) - {}", d.name, d.arity, d.help))
    }

    /// Get function count
    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.len())
            .finish()
    }
}
