//! # rulisp - a Clojure-flavoured Lisp interpreter
//!
//! A tree-walking interpreter whose builtins all live in a shared
//! [`FunctionRegistry`], filled by loadable [`plugins`]. Even special forms
//! such as `if`, `def` and `let` are ordinary registry entries: handlers
//! receive their arguments unevaluated and decide what to evaluate.
//!
//! ## Quick Start
//!
//! ```rust
//! use rulisp::{Interpreter, Value};
//!
//! # fn main() -> rulisp::Result<()> {
//! let interp = Interpreter::new()?;
//!
//! let result = interp.eval_str(r#"
//!     (defn fact [n acc]
//!       (if (<= n 1) acc (fact (- n 1) (* n acc))))
//!     (fact 10 1)
//! "#)?;
//! assert_eq!(result, Value::Number(3628800.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Source -> Scanner -> Tokens -> Reader -> Expr -> Evaluator -> Value
//!                                               |
//!                                  FunctionRegistry <- PluginManager <- plugins
//! ```
//!
//! - [`lexer`] - tokens with line and column
//! - [`parser`] - tokens to [`Expr`] trees
//! - [`runtime`] - [`Value`], [`Environment`] and the [`Evaluator`]
//! - [`registry`] - named builtins and their calling convention
//! - [`plugins`] - the [`Plugin`] trait, [`PluginManager`] and the standard set
//! - [`interpreter`] - everything wired together
//!
//! ## Language Overview
//!
//! - **Data**: numbers (`42`, `1.5`), exact decimals (`0.1N`), strings,
//!   keywords (`:name`), lists, vectors `[1 2 3]`, maps `{:a 1}`
//! - **Definitions**: `(def x 1)`, `(defn f [a & more] ...)`, `(fn [x] ...)`
//! - **Control flow**: `if`, `when`, `cond`, `do`, `let`, `while`, `try`
//! - **Functions**: `map`, `filter`, `reduce`, `partial`, `comp`, `juxt`
//! - **Macros**: `defmacro` with quasiquote, `~` and `~@`
//! - **Modules**: `(module m (export f) (defn f [] ...))`, then `(m.f)`
//! - **Concurrency**: `go`, channels, wait groups and atoms
//!
//! Calls in tail position run in constant native stack, so loops written as
//! self-recursion do not overflow.

#![warn(missing_docs)]

pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod plugins;
pub mod registry;
pub mod runtime;

pub use error::{Error, Result};
pub use interpreter::{Interpreter, InterpreterConfig};
pub use lexer::{Scanner, Token, TokenKind};
pub use parser::{parse, Expr};
pub use plugins::{Plugin, PluginInfo, PluginManager};
pub use registry::{Arity, FunctionDescriptor, FunctionRegistry, Handler};
pub use runtime::{BigDecimal, Environment, EvalOptions, Evaluator, Module, Value};
