use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::bignum::BigDecimal;
use super::concurrency::{Channel, Future, WaitGroup};
use super::environment::Environment;
use crate::error::{Error, Result};
use crate::parser::Expr;

/// Runtime value representation
///
/// Collections are reference-counted and never mutated in place; every
/// collection operation builds a new value. `Atom` is the only mutable cell.
#[derive(Debug, Clone)]
pub enum Value {
    // Primitives
    /// Absence of a value
    Nil,
    /// Boolean value
    Boolean(bool),
    /// Number with float semantics
    Number(f64),
    /// Arbitrary precision decimal
    BigNumber(BigDecimal),
    /// String value
    String(String),
    /// Keyword, stored without the leading colon
    Keyword(String),
    /// Symbol as data (produced by `quote` and seen by macros)
    Symbol(String),

    // Collections
    /// List of values (reference-counted)
    List(Arc<Vec<Value>>),
    /// Vector of values (reference-counted)
    Vector(Arc<Vec<Value>>),
    /// Map with string keys, kept sorted for stable printing
    HashMap(Arc<BTreeMap<String, Value>>),

    // Callables
    /// User closure
    Function(Arc<Closure>),
    /// User macro; arguments are bound unevaluated
    Macro(Arc<Closure>),
    /// Reference to a registry function by name
    Builtin(String),
    /// Reference to an intrinsic arithmetic operator (`+ - * / %`)
    Arithmetic(String),
    /// Function with leading arguments already bound
    Partial {
        /// Wrapped callable
        func: Arc<Value>,
        /// Arguments prepended on every call
        bound: Arc<Vec<Value>>,
    },
    /// Logical negation of a predicate
    Complement(Arc<Value>),
    /// Calls every function with the same arguments
    Juxt(Arc<Vec<Value>>),
    /// Right-to-left composition
    Comp(Arc<Vec<Value>>),

    // Mutable state and concurrency
    /// Single mutable slot
    Atom(Arc<Atom>),
    /// Blocking channel
    Channel(Arc<Channel>),
    /// Result handle of a `go` block
    Future(Arc<Future>),
    /// Counter that blocks waiters until it reaches zero
    WaitGroup(Arc<WaitGroup>),

    /// Call in tail position awaiting execution by the trampoline
    ///
    /// Only produced by `Evaluator::eval_tail`; `eval` and `call_function`
    /// never return it.
    #[doc(hidden)]
    TailCall(Box<PendingCall>),
}

/// Closure: parameters and body paired with the environment they were defined in
pub struct Closure {
    /// Name given by `defn`/`defmacro`, if any
    pub name: Option<String>,
    /// Positional parameter names
    pub params: Vec<String>,
    /// Name bound to the remaining arguments after `&`
    pub rest: Option<String>,
    /// Body forms, evaluated in order
    pub body: Arc<Vec<Expr>>,
    /// Defining environment, shared by reference
    pub env: Environment,
}

impl Closure {
    /// Name used in traces and error messages
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Human readable arity, e.g. `2` or `at least 1`
    pub fn arity_description(&self) -> String {
        match self.rest {
            Some(_) => format!("at least {}", self.params.len()),
            None => self.params.len().to_string(),
        }
    }

    /// Whether `count` arguments satisfy this closure's parameter list
    pub fn accepts(&self, count: usize) -> bool {
        match self.rest {
            Some(_) => count >= self.params.len(),
            None => count == self.params.len(),
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // The captured environment may contain this closure
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("rest", &self.rest)
            .finish_non_exhaustive()
    }
}

/// Mutable cell behind `atom`
///
/// Every write bumps a version number, so `swap!` detects a concurrent update
/// by version rather than by comparing values.
pub struct Atom {
    slot: RwLock<(u64, Value)>,
}

impl Atom {
    /// New atom holding `value`
    pub fn new(value: Value) -> Self {
        Atom {
            slot: RwLock::new((0, value)),
        }
    }

    /// Current value
    pub fn get(&self) -> Value {
        self.slot.read().1.clone()
    }

    /// Current version and value
    pub fn snapshot(&self) -> (u64, Value) {
        self.slot.read().clone()
    }

    /// Replace the value unconditionally
    pub fn set(&self, value: Value) {
        let mut slot = self.slot.write();
        slot.0 = slot.0.wrapping_add(1);
        slot.1 = value;
    }

    /// Replace the value only if no write happened since `version` was read
    pub fn compare_and_set(&self, version: u64, value: Value) -> bool {
        let mut slot = self.slot.write();
        if slot.0 != version {
            return false;
        }
        slot.0 = slot.0.wrapping_add(1);
        slot.1 = value;
        true
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (version, value) = self.snapshot();
        f.debug_struct("Atom")
            .field("version", &version)
            .field("value", &value)
            .finish()
    }
}

/// Closure call deferred to the caller's trampoline
#[derive(Debug, Clone)]
pub struct PendingCall {
    /// Closure to enter
    pub closure: Arc<Closure>,
    /// Evaluated arguments
    pub args: Vec<Value>,
}

impl Value {
    /// Creates a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Creates a keyword value
    pub fn keyword(k: impl Into<String>) -> Self {
        Value::Keyword(k.into())
    }

    /// Creates a list value from a vector of values
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Arc::new(values))
    }

    /// Creates a vector value
    pub fn vector(values: Vec<Value>) -> Self {
        Value::Vector(Arc::new(values))
    }

    /// Creates a hashmap value
    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::HashMap(Arc::new(entries))
    }

    /// Creates an atom holding `value`
    pub fn atom(value: Value) -> Self {
        Value::Atom(Arc::new(Atom::new(value)))
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigNumber(_) => "bignumber",
            Value::String(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::HashMap(_) => "hashmap",
            Value::Function(_) => "function",
            Value::Macro(_) => "macro",
            Value::Builtin(_) => "builtin",
            Value::Arithmetic(_) => "arithmetic",
            Value::Partial { .. } => "partial",
            Value::Complement(_) => "complement",
            Value::Juxt(_) => "juxt",
            Value::Comp(_) => "comp",
            Value::Atom(_) => "atom",
            Value::Channel(_) => "channel",
            Value::Future(_) => "future",
            Value::WaitGroup(_) => "waitgroup",
            Value::TailCall(_) => "tail-call",
        }
    }

    /// Only `nil` and `false` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Whether this value can appear in call position
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_)
                | Value::Macro(_)
                | Value::Builtin(_)
                | Value::Arithmetic(_)
                | Value::Partial { .. }
                | Value::Complement(_)
                | Value::Juxt(_)
                | Value::Comp(_)
        )
    }

    // Type conversion methods

    /// Numeric value as a float
    pub fn as_number(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::BigNumber(b) => Ok(b.to_f64()),
            _ => Err(Error::type_error("number", self.type_name())),
        }
    }

    /// Integral numeric value
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(*n as i64),
            Value::BigNumber(b) if b.is_integer() => b
                .to_i64()
                .ok_or_else(|| Error::type_error("integer", "bignumber out of range")),
            Value::Number(_) | Value::BigNumber(_) => {
                Err(Error::type_error("integer", "fractional number"))
            }
            _ => Err(Error::type_error("integer", self.type_name())),
        }
    }

    /// Returns a reference to the string value
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(Error::type_error("string", self.type_name())),
        }
    }

    /// Elements of a list or vector; `nil` is the empty sequence
    pub fn as_seq(&self) -> Result<&[Value]> {
        match self {
            Value::List(items) | Value::Vector(items) => Ok(items),
            Value::Nil => Ok(&[]),
            _ => Err(Error::type_error("list or vector", self.type_name())),
        }
    }

    /// Returns a reference to the map entries
    pub fn as_map(&self) -> Result<&BTreeMap<String, Value>> {
        match self {
            Value::HashMap(entries) => Ok(entries),
            _ => Err(Error::type_error("hashmap", self.type_name())),
        }
    }

    /// String form of a map key; only strings and keywords qualify
    pub fn as_key(&self) -> Result<String> {
        match self {
            Value::String(s) | Value::Keyword(s) => Ok(s.clone()),
            _ => Err(Error::type_error("string or keyword key", self.type_name())),
        }
    }

    /// Text for `str`/`println`: strings raw, nil empty, the rest readable
    pub fn to_display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Nil => String::new(),
            other => other.to_string(),
        }
    }
}

/// Render a float, dropping the fractional part of integral values
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn write_seq(f: &mut fmt::Formatter, open: &str, items: &[Value], close: &str) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::BigNumber(b) => write!(f, "{}N", b),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Keyword(k) => write!(f, ":{}", k),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::List(items) => write_seq(f, "(", items, ")"),
            Value::Vector(items) => write_seq(f, "[", items, "]"),
            Value::HashMap(entries) => {
                write!(f, "{{")?;
                for (i, (key, val)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, ":{} {}", key, val)?;
                }
                write!(f, "}}")
            }
            Value::Function(c) => match &c.name {
                Some(name) => write!(f, "#<fn {}>", name),
                None => write!(f, "#<fn>"),
            },
            Value::Macro(c) => write!(f, "#<macro {}>", c.display_name()),
            Value::Builtin(name) => write!(f, "#<builtin {}>", name),
            Value::Arithmetic(op) => write!(f, "#<builtin {}>", op),
            Value::Partial { func, bound } => write!(f, "#<partial {} +{}>", func, bound.len()),
            Value::Complement(pred) => write!(f, "#<complement {}>", pred),
            Value::Juxt(fns) => write!(f, "#<juxt {}>", fns.len()),
            Value::Comp(fns) => write!(f, "#<comp {}>", fns.len()),
            Value::Atom(cell) => write!(f, "#<atom {}>", cell.get()),
            Value::Channel(ch) => write!(f, "#<chan {}>", ch.capacity()),
            Value::Future(fut) => write!(f, "#<future {}>", fut.id()),
            Value::WaitGroup(_) => write!(f, "#<wait-group>"),
            Value::TailCall(call) => write!(f, "#<tail-call {}>", call.closure.display_name()),
        }
    }
}

/// Structural equality; numbers compare by value across representations and
/// lists equal vectors with the same elements. Reference types compare by identity.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::BigNumber(x), Value::BigNumber(y)) => x == y,
        (Value::Number(x), Value::BigNumber(y)) | (Value::BigNumber(y), Value::Number(x)) => {
            BigDecimal::from_f64(*x).map(|x| &x == y).unwrap_or(false)
        }
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Keyword(x), Value::Keyword(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (
            Value::List(x) | Value::Vector(x),
            Value::List(y) | Value::Vector(y),
        ) => x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b)),
        (Value::HashMap(x), Value::HashMap(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        (Value::Function(x), Value::Function(y)) | (Value::Macro(x), Value::Macro(y)) => {
            Arc::ptr_eq(x, y)
        }
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        (Value::Arithmetic(x), Value::Arithmetic(y)) => x == y,
        (Value::Atom(x), Value::Atom(y)) => Arc::ptr_eq(x, y),
        (Value::Channel(x), Value::Channel(y)) => Arc::ptr_eq(x, y),
        (Value::Future(x), Value::Future(y)) => Arc::ptr_eq(x, y),
        (Value::WaitGroup(x), Value::WaitGroup(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::Boolean(true).type_name(), "boolean");
        assert_eq!(Value::Number(42.0).type_name(), "number");
        assert_eq!(Value::string("test").type_name(), "string");
        assert_eq!(Value::vector(vec![]).type_name(), "vector");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::list(vec![]).is_truthy());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::Number(42.0).as_int().unwrap(), 42);
        assert!(Value::Number(4.5).as_int().is_err());
        assert_eq!(Value::string("x").as_str().unwrap(), "x");
        assert!(Value::Nil.as_seq().unwrap().is_empty());
        assert!(matches!(
            Value::Number(1.0).as_key(),
            Err(Error::TypeError { .. })
        ));
        assert_eq!(Value::keyword("age").as_key().unwrap(), "age");
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(6.0).to_string(), "6");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(
            Value::list(vec![Value::Number(1.0), Value::string("a")]).to_string(),
            r#"(1 "a")"#
        );
        assert_eq!(
            Value::vector(vec![Value::keyword("k"), Value::Boolean(false)]).to_string(),
            "[:k false]"
        );
        let mut entries = BTreeMap::new();
        entries.insert("name".to_string(), Value::string("John"));
        entries.insert("age".to_string(), Value::Number(30.0));
        assert_eq!(Value::map(entries).to_string(), r#"{:age 30 :name "John"}"#);
        assert_eq!(Value::string("raw").to_display_string(), "raw");
    }

    #[test]
    fn test_equality() {
        let one_big = Value::BigNumber("1".parse().unwrap());
        assert_eq!(Value::Number(1.0), one_big);
        assert_eq!(
            Value::list(vec![Value::Number(1.0)]),
            Value::vector(vec![Value::Number(1.0)])
        );
        assert_ne!(Value::string("a"), Value::keyword("a"));

        let a = Value::atom(Value::Nil);
        assert_eq!(a.clone(), a);
        assert_ne!(a, Value::atom(Value::Nil));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }
}
