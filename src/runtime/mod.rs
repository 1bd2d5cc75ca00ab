//! Runtime for rulisp programs: values, environments and the evaluator

pub mod arithmetic;
mod bignum;
mod call;
pub mod concurrency;
pub mod convert;
mod environment;
mod evaluator;
mod value;

pub use bignum::{BigDecimal, DIV_SCALE};
pub use concurrency::{Channel, Future, WaitGroup};
pub use environment::{Environment, Module};
pub use evaluator::{EvalOptions, Evaluator};
pub use value::{format_number, values_equal, Atom, Closure, PendingCall, Value};

/// Stack left before growing onto a new segment
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each additional stack segment
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// Run `f`, switching to a fresh stack segment first if the current one is nearly exhausted
///
/// Wraps every recursive step of reading and evaluation so that deeply nested
/// (non-tail) code cannot overflow the native stack.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, f)
}
