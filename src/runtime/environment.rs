use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::runtime::Value;

/// Environment for variable scoping
///
/// A cheap, cloneable handle to one frame of a parent-linked scope chain.
/// Closures hold a handle to their defining frame, so later bindings made in
/// that frame are visible to them. Frames are shared between threads and
/// guarded by read/write locks.
#[derive(Clone)]
pub struct Environment {
    frame: Arc<Frame>,
}

/// Single scope in the environment
struct Frame {
    /// Variables defined in this scope
    vars: RwLock<HashMap<String, Value>>,
    /// Modules defined in this scope
    modules: RwLock<HashMap<String, Module>>,
    /// Names marked with `export` while this scope was a module body
    exports: RwLock<Vec<String>>,
    /// Enclosing scope (None for the global scope)
    parent: Option<Environment>,
}

/// Flat namespace reachable through `module.member` symbols
#[derive(Debug, Clone)]
pub struct Module {
    /// Module name
    pub name: String,
    /// Exported members
    pub exports: Arc<BTreeMap<String, Value>>,
}

impl Module {
    /// Creates a module from its exported members
    pub fn new(name: impl Into<String>, exports: BTreeMap<String, Value>) -> Self {
        Module {
            name: name.into(),
            exports: Arc::new(exports),
        }
    }

    /// Looks up an exported member
    pub fn get(&self, member: &str) -> Option<Value> {
        self.exports.get(member).cloned()
    }
}

impl Environment {
    /// Creates a new global environment
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<Environment>) -> Self {
        Environment {
            frame: Arc::new(Frame {
                vars: RwLock::new(HashMap::new()),
                modules: RwLock::new(HashMap::new()),
                exports: RwLock::new(Vec::new()),
                parent,
            }),
        }
    }

    /// Creates a scope whose parent is this one
    pub fn new_child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    /// Gets the value of a variable, walking the scope chain outward
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = self;
        loop {
            if let Some(val) = env.frame.vars.read().get(name) {
                return Some(val.clone());
            }
            match &env.frame.parent {
                Some(parent) => env = parent,
                None => return None,
            }
        }
    }

    /// Binds a variable in this scope
    ///
    /// Never walks up the chain: a binding of the same name in an enclosing
    /// scope is shadowed, not modified. `def` and `let` rely on this.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.frame.vars.write().insert(name.into(), value);
    }

    /// Whether this scope itself binds `name`
    pub fn has_local(&self, name: &str) -> bool {
        self.frame.vars.read().contains_key(name)
    }

    /// Names bound directly in this scope, sorted
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.frame.vars.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of enclosing scopes (0 for the global scope)
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut env = self;
        while let Some(parent) = &env.frame.parent {
            depth += 1;
            env = parent;
        }
        depth
    }

    /// Looks up a module, walking the scope chain outward
    pub fn get_module(&self, name: &str) -> Option<Module> {
        let mut env = self;
        loop {
            if let Some(module) = env.frame.modules.read().get(name) {
                return Some(module.clone());
            }
            match &env.frame.parent {
                Some(parent) => env = parent,
                None => return None,
            }
        }
    }

    /// Defines (or replaces) a module in this scope
    pub fn define_module(&self, module: Module) {
        self.frame
            .modules
            .write()
            .insert(module.name.clone(), module);
    }

    /// Records `name` as exported from this scope
    pub fn mark_exported(&self, name: impl Into<String>) {
        let name = name.into();
        let mut exports = self.frame.exports.write();
        if !exports.contains(&name) {
            exports.push(name);
        }
    }

    /// Names exported from this scope, in export order
    pub fn exports(&self) -> Vec<String> {
        self.frame.exports.read().clone()
    }

    /// Whether both handles point at the same scope
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.frame, &other.frame)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Environment")
            .field("depth", &self.depth())
            .field("locals", &self.local_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_define_and_get() {
        let env = Environment::new();
        env.set("x", Value::Number(42.0));
        assert_eq!(env.get("x"), Some(Value::Number(42.0)));
        assert_eq!(env.get("y"), None);
    }

    #[test]
    fn test_child_sees_parent() {
        let global = Environment::new();
        global.set("x", Value::Number(1.0));
        let child = global.new_child();
        let grandchild = child.new_child();
        assert_eq!(grandchild.get("x"), Some(Value::Number(1.0)));
        assert_eq!(grandchild.depth(), 2);
    }

    #[test]
    fn test_set_shadows_instead_of_mutating() {
        let global = Environment::new();
        global.set("x", Value::Number(1.0));

        let child = global.new_child();
        child.set("x", Value::Number(2.0));

        assert_eq!(child.get("x"), Some(Value::Number(2.0)));
        assert_eq!(global.get("x"), Some(Value::Number(1.0)));
        assert!(child.has_local("x"));
        assert!(!global.new_child().has_local("x"));
    }

    #[test]
    fn test_shared_frame_sees_later_bindings() {
        let global = Environment::new();
        let captured = global.clone();
        global.set("late", Value::Boolean(true));
        assert_eq!(captured.get("late"), Some(Value::Boolean(true)));
        assert!(captured.ptr_eq(&global));
    }

    #[test]
    fn test_modules_and_exports() {
        let global = Environment::new();
        let mut members = BTreeMap::new();
        members.insert("pi".to_string(), Value::Number(3.0));
        global.define_module(Module::new("m", members));

        let child = global.new_child();
        let module = child.get_module("m").unwrap();
        assert_eq!(module.get("pi"), Some(Value::Number(3.0)));
        assert!(module.get("tau").is_none());
        assert!(child.get_module("other").is_none());

        child.mark_exported("a");
        child.mark_exported("b");
        child.mark_exported("a");
        assert_eq!(child.exports(), vec!["a", "b"]);
    }

    #[test]
    fn test_local_names_sorted() {
        let env = Environment::new();
        env.set("b", Value::Nil);
        env.set("a", Value::Nil);
        assert_eq!(env.local_names(), vec!["a", "b"]);
    }
}
