//! Plugin system for rulisp builtins
//!
//! A plugin is a named, versioned bundle of registry entries with declared
//! dependencies on other plugins. The [`PluginManager`] loads plugins in
//! dependency order, records exactly which names each one registered, and
//! removes those names again on unload.
//!
//! ```
//! use std::sync::Arc;
//! use rulisp::plugins::{standard_plugins, PluginManager};
//! use rulisp::registry::FunctionRegistry;
//!
//! let manager = PluginManager::new(Arc::new(FunctionRegistry::new()));
//! manager.load_all(standard_plugins()).unwrap();
//! assert!(manager.is_loaded("core"));
//! assert!(manager.registry().has("map"));
//! ```

mod atom;
mod binding;
mod comparison;
mod concurrency;
mod control;
mod core;
mod encoding;
mod functional;
mod hashmap;
#[cfg(feature = "http")]
mod http;
mod io;
mod json;
mod list;
mod logical;
mod math;
mod module;
mod string;
mod system;

pub use self::atom::AtomPlugin;
pub use self::binding::BindingPlugin;
pub use self::comparison::ComparisonPlugin;
pub use self::concurrency::ConcurrencyPlugin;
pub use self::control::ControlPlugin;
pub use self::core::CorePlugin;
pub use self::encoding::EncodingPlugin;
pub use self::functional::FunctionalPlugin;
pub use self::hashmap::HashMapPlugin;
#[cfg(feature = "http")]
pub use self::http::HttpPlugin;
pub use self::io::IoPlugin;
pub use self::json::JsonPlugin;
pub use self::list::ListPlugin;
pub use self::logical::LogicalPlugin;
pub use self::math::MathPlugin;
pub use self::module::ModulePlugin;
pub use self::string::StringPlugin;
pub use self::system::SystemPlugin;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::registry::FunctionRegistry;
use crate::runtime::{Environment, Evaluator, Value};

/// Plugin trait - every builtin bundle implements this
pub trait Plugin: Send + Sync {
    /// Unique plugin name
    fn name(&self) -> &str;

    /// Plugin version
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// One-line description
    fn description(&self) -> &str;

    /// Plugins that must be loaded first
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// One-time setup, run before registration
    fn initialize(&self, _registry: &FunctionRegistry) -> Result<()> {
        Ok(())
    }

    /// Teardown, run on unload and after a failed load
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Register this plugin's functions
    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()>;
}

/// Introspection record returned by [`PluginManager::list_plugins`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    /// Plugin name
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Plugin description
    pub description: String,
    /// Declared dependencies
    pub dependencies: Vec<String>,
    /// Names this plugin registered, sorted
    pub functions: Vec<String>,
}

struct LoadedPlugin {
    plugin: Arc<dyn Plugin>,
    functions: Vec<String>,
}

/// Loads and unloads plugins against a shared registry
pub struct PluginManager {
    registry: Arc<FunctionRegistry>,
    loaded: RwLock<BTreeMap<String, LoadedPlugin>>,
}

impl PluginManager {
    /// Create a manager for `registry`
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        PluginManager {
            registry,
            loaded: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry this manager writes to
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Load a plugin
    ///
    /// Fails if the name is empty, already loaded, or a dependency is missing.
    /// If initialization or registration fails, every name the plugin managed
    /// to register is removed again and `shutdown` is called before the error
    /// is returned.
    pub fn load_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let mut loaded = self.loaded.write();
        self.load_locked(&mut loaded, plugin)
    }

    fn load_locked(
        &self,
        loaded: &mut BTreeMap<String, LoadedPlugin>,
        plugin: Arc<dyn Plugin>,
    ) -> Result<()> {
        let name = plugin.name().to_string();
        if name.is_empty() {
            return Err(Error::InvalidPluginName);
        }
        if loaded.contains_key(&name) {
            return Err(Error::DuplicatePlugin { name });
        }
        if let Some(dependency) = plugin
            .dependencies()
            .into_iter()
            .find(|dep| !loaded.contains_key(dep))
        {
            return Err(Error::MissingDependency {
                plugin: name,
                dependency,
            });
        }

        let before: HashSet<String> = self.registry.list().into_iter().collect();
        let outcome = plugin
            .initialize(&self.registry)
            .and_then(|()| plugin.register_functions(&self.registry));
        let functions: Vec<String> = self
            .registry
            .list()
            .into_iter()
            .filter(|n| !before.contains(n))
            .collect();

        if let Err(e) = outcome {
            for function in &functions {
                if let Err(unregister_err) = self.registry.unregister(function) {
                    tracing::warn!(plugin = %name, %function, error = %unregister_err, "function already gone during rollback");
                }
            }
            if let Err(shutdown_err) = plugin.shutdown() {
                tracing::warn!(plugin = %name, error = %shutdown_err, "shutdown after failed load also failed");
            }
            tracing::debug!(plugin = %name, error = %e, "plugin load rolled back");
            return Err(e);
        }

        tracing::debug!(plugin = %name, functions = functions.len(), "plugin loaded");
        loaded.insert(name, LoadedPlugin { plugin, functions });
        Ok(())
    }

    /// Unload a plugin by name
    ///
    /// Fails if it is not loaded or another loaded plugin depends on it.
    /// A failing `shutdown` is logged and does not stop the unload.
    pub fn unload_plugin(&self, name: &str) -> Result<()> {
        let mut loaded = self.loaded.write();
        self.unload_locked(&mut loaded, name).map(|_| ())
    }

    fn unload_locked(
        &self,
        loaded: &mut BTreeMap<String, LoadedPlugin>,
        name: &str,
    ) -> Result<Arc<dyn Plugin>> {
        if !loaded.contains_key(name) {
            return Err(Error::PluginNotLoaded {
                name: name.to_string(),
            });
        }
        let dependents: Vec<String> = loaded
            .iter()
            .filter(|(_, p)| p.plugin.dependencies().iter().any(|d| d == name))
            .map(|(n, _)| n.clone())
            .collect();
        if !dependents.is_empty() {
            return Err(Error::PluginInUse {
                plugin: name.to_string(),
                dependents,
            });
        }

        let Some(entry) = loaded.remove(name) else {
            return Err(Error::PluginNotLoaded {
                name: name.to_string(),
            });
        };
        for function in &entry.functions {
            if let Err(e) = self.registry.unregister(function) {
                tracing::warn!(plugin = %name, %function, error = %e, "function already gone at unload");
            }
        }
        if let Err(e) = entry.plugin.shutdown() {
            tracing::warn!(plugin = %name, error = %e, "plugin shutdown failed");
        }
        tracing::debug!(plugin = %name, functions = entry.functions.len(), "plugin unloaded");
        Ok(entry.plugin)
    }

    /// Unload and load the same plugin again without releasing the lock in between
    pub fn reload_plugin(&self, name: &str) -> Result<()> {
        let mut loaded = self.loaded.write();
        let plugin = self.unload_locked(&mut loaded, name)?;
        self.load_locked(&mut loaded, plugin)
    }

    /// Load a set of plugins, ordering them so dependencies come first
    ///
    /// Plugins already loaded satisfy dependencies. Returns
    /// `MissingDependency` if some dependency is neither loaded nor in the set.
    pub fn load_all(&self, plugins: Vec<Arc<dyn Plugin>>) -> Result<()> {
        let mut loaded = self.loaded.write();
        let mut pending = plugins;
        while !pending.is_empty() {
            let ready = pending.iter().position(|p| {
                p.dependencies()
                    .iter()
                    .all(|dep| loaded.contains_key(dep))
            });
            match ready {
                Some(index) => {
                    let plugin = pending.remove(index);
                    self.load_locked(&mut loaded, plugin)?;
                }
                None => {
                    let pending_names: BTreeSet<&str> = pending.iter().map(|p| p.name()).collect();
                    let (plugin, dependency) = pending
                        .iter()
                        .find_map(|p| {
                            p.dependencies()
                                .into_iter()
                                .find(|d| !loaded.contains_key(d) && !pending_names.contains(d.as_str()))
                                .map(|d| (p.name().to_string(), d))
                        })
                        .or_else(|| {
                            // Only cycles remain
                            pending.first().and_then(|p| {
                                p.dependencies()
                                    .into_iter()
                                    .find(|d| !loaded.contains_key(d))
                                    .map(|d| (p.name().to_string(), d))
                            })
                        })
                        .unwrap_or_default();
                    return Err(Error::MissingDependency { plugin, dependency });
                }
            }
        }
        Ok(())
    }

    /// Loaded plugins, sorted by name
    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.loaded
            .read()
            .iter()
            .map(|(name, entry)| {
                let mut functions = entry.functions.clone();
                functions.sort();
                PluginInfo {
                    name: name.clone(),
                    version: entry.plugin.version().to_string(),
                    description: entry.plugin.description().to_string(),
                    dependencies: entry.plugin.dependencies(),
                    functions,
                }
            })
            .collect()
    }

    /// Whether a plugin is loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.read().contains_key(name)
    }

    /// Names registered by a loaded plugin, sorted
    pub fn plugin_functions(&self, name: &str) -> Option<Vec<String>> {
        self.loaded.read().get(name).map(|entry| {
            let mut functions = entry.functions.clone();
            functions.sort();
            functions
        })
    }
}

/// Every builtin plugin shipped with rulisp, in no particular order
pub fn standard_plugins() -> Vec<Arc<dyn Plugin>> {
    let mut plugins: Vec<Arc<dyn Plugin>> = vec![
        Arc::new(CorePlugin),
        Arc::new(LogicalPlugin),
        Arc::new(ControlPlugin),
        Arc::new(BindingPlugin),
        Arc::new(MathPlugin),
        Arc::new(ComparisonPlugin),
        Arc::new(ListPlugin),
        Arc::new(FunctionalPlugin),
        Arc::new(StringPlugin),
        Arc::new(HashMapPlugin),
        Arc::new(JsonPlugin),
        Arc::new(IoPlugin),
        Arc::new(AtomPlugin),
        Arc::new(ConcurrencyPlugin),
        Arc::new(ModulePlugin),
        Arc::new(EncodingPlugin),
        Arc::new(SystemPlugin),
    ];
    #[cfg(feature = "http")]
    plugins.push(Arc::new(HttpPlugin));
    plugins
}

// =============================================================================
// Helpers shared by the builtin plugins
// =============================================================================

/// Fail with an arity error unless exactly `n` arguments were given
pub(crate) fn expect_args(name: &str, args: &[Expr], n: usize) -> Result<()> {
    if args.len() == n {
        Ok(())
    } else {
        Err(Error::arity(name, n.to_string(), args.len()))
    }
}

/// Fail with an arity error unless `min..=max` arguments were given
pub(crate) fn expect_range(name: &str, args: &[Expr], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else if min == max {
        expect_args(name, args, min)
    } else {
        Err(Error::arity(name, format!("{} to {}", min, max), args.len()))
    }
}

/// Fail with an arity error unless at least `min` arguments were given
pub(crate) fn expect_min(name: &str, args: &[Expr], min: usize) -> Result<()> {
    if args.len() >= min {
        Ok(())
    } else {
        Err(Error::arity(name, format!("at least {}", min), args.len()))
    }
}

/// Evaluate exactly `N` arguments
pub(crate) fn eval_n<const N: usize>(
    name: &str,
    evaluator: &Evaluator,
    args: &[Expr],
    env: &Environment,
) -> Result<[Value; N]> {
    expect_args(name, args, N)?;
    let values = evaluator.eval_all(args, env)?;
    values
        .try_into()
        .map_err(|_| Error::arity(name, N.to_string(), args.len()))
}

/// Evaluate `source` with every standard plugin loaded, returning the last value
#[cfg(test)]
pub(crate) fn eval_lisp(source: &str) -> Result<Value> {
    let manager = PluginManager::new(Arc::new(FunctionRegistry::new()));
    manager.load_all(standard_plugins())?;
    let evaluator = Evaluator::new(Arc::clone(manager.registry()));
    let env = Environment::new();
    env.set("nil", Value::Nil);
    let mut last = Value::Nil;
    for form in crate::parser::parse(source)? {
        last = evaluator.eval(&form, &env)?;
    }
    Ok(last)
}
