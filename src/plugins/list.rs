//! Sequence functions over lists and vectors
//!
//! Every operation returns a new collection. Functions that Clojure defines
//! as returning a sequence (`rest`, `concat`, `take`, ...) return lists;
//! `conj` keeps the collection kind. `nil` acts as the empty sequence.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::plugins::comparison::compare_values;
use crate::plugins::{eval_n, expect_min, expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::{Environment, Evaluator, Value};

/// Construction, access and transformation of lists and vectors
pub struct ListPlugin;

impl Plugin for ListPlugin {
    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "Lists, vectors and sequence operations"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Construction
        registry.define("list", "list", Arity::Variadic, "List of the arguments", |ev, args, env| {
            Ok(Value::list(ev.eval_all(args, env)?))
        })?;
        registry.define("vector", "list", Arity::Variadic, "Vector of the arguments", |ev, args, env| {
            Ok(Value::vector(ev.eval_all(args, env)?))
        })?;
        registry.define("cons", "list", Arity::Fixed(2), "List with x in front of coll", |ev, args, env| {
            let [x, coll] = eval_n::<2>("cons", ev, args, env)?;
            let mut items = Vec::with_capacity(coll.as_seq()?.len() + 1);
            items.push(x);
            items.extend_from_slice(coll.as_seq()?);
            Ok(Value::list(items))
        })?;
        registry.define(
            "conj",
            "list",
            Arity::Variadic,
            "Add items: to the front of a list, the end of a vector",
            |ev, args, env| {
                expect_min("conj", args, 1)?;
                let mut values = ev.eval_all(args, env)?;
                let coll = values.remove(0);
                conj(coll, values)
            },
        )?;
        registry.define(
            "range",
            "list",
            Arity::Variadic,
            "(range end), (range start end) or (range start end step)",
            |ev, args, env| {
                expect_range("range", args, 1, 3)?;
                let values = ev.eval_all(args, env)?;
                range(&values)
            },
        )?;

        // Access
        registry.define("first", "list", Arity::Fixed(1), "First element, or nil", |ev, args, env| {
            let [coll] = eval_n::<1>("first", ev, args, env)?;
            Ok(coll.as_seq()?.first().cloned().unwrap_or(Value::Nil))
        })?;
        registry.define("rest", "list", Arity::Fixed(1), "All but the first element; () when empty", |ev, args, env| {
            let [coll] = eval_n::<1>("rest", ev, args, env)?;
            Ok(Value::list(coll.as_seq()?.iter().skip(1).cloned().collect()))
        })?;
        registry.define("next", "list", Arity::Fixed(1), "All but the first element; nil when empty", |ev, args, env| {
            let [coll] = eval_n::<1>("next", ev, args, env)?;
            let items = coll.as_seq()?;
            if items.len() <= 1 {
                Ok(Value::Nil)
            } else {
                Ok(Value::list(items[1..].to_vec()))
            }
        })?;
        registry.define("last", "list", Arity::Fixed(1), "Last element, or nil", |ev, args, env| {
            let [coll] = eval_n::<1>("last", ev, args, env)?;
            Ok(coll.as_seq()?.last().cloned().unwrap_or(Value::Nil))
        })?;
        registry.define(
            "nth",
            "list",
            Arity::Variadic,
            "(nth coll index default?) - out of range without a default is an error",
            |ev, args, env| {
                expect_range("nth", args, 2, 3)?;
                let mut values = ev.eval_all(args, env)?;
                let default = if values.len() == 3 { values.pop() } else { None };
                let index = values[1].as_int()?;
                let items = values[0].as_seq()?;
                match usize::try_from(index).ok().and_then(|i| items.get(i)) {
                    Some(item) => Ok(item.clone()),
                    None => default.ok_or(Error::IndexOutOfBounds {
                        index,
                        length: items.len(),
                    }),
                }
            },
        )?;
        registry.define("count", "list", Arity::Fixed(1), "Number of elements", |ev, args, env| {
            let [coll] = eval_n::<1>("count", ev, args, env)?;
            Ok(Value::Number(count(&coll)? as f64))
        })?;
        registry.define("empty?", "list", Arity::Fixed(1), "True if there are no elements", |ev, args, env| {
            let [coll] = eval_n::<1>("empty?", ev, args, env)?;
            Ok(Value::Boolean(count(&coll)? == 0))
        })?;

        // Transformation
        registry.define("concat", "list", Arity::Variadic, "Elements of every collection in order", |ev, args, env| {
            let mut items = Vec::new();
            for coll in ev.eval_all(args, env)? {
                items.extend_from_slice(coll.as_seq()?);
            }
            Ok(Value::list(items))
        })?;
        registry.define("reverse", "list", Arity::Fixed(1), "Elements in reverse order", |ev, args, env| {
            let [coll] = eval_n::<1>("reverse", ev, args, env)?;
            Ok(Value::list(coll.as_seq()?.iter().rev().cloned().collect()))
        })?;
        registry.define("take", "list", Arity::Fixed(2), "First n elements", |ev, args, env| {
            let [n, coll] = eval_n::<2>("take", ev, args, env)?;
            let n = n.as_int()?.max(0) as usize;
            Ok(Value::list(coll.as_seq()?.iter().take(n).cloned().collect()))
        })?;
        registry.define("drop", "list", Arity::Fixed(2), "All but the first n elements", |ev, args, env| {
            let [n, coll] = eval_n::<2>("drop", ev, args, env)?;
            let n = n.as_int()?.max(0) as usize;
            Ok(Value::list(coll.as_seq()?.iter().skip(n).cloned().collect()))
        })?;
        registry.define(
            "sort",
            "list",
            Arity::Variadic,
            "(sort coll) or (sort comparator coll); stable",
            |ev, args, env| {
                expect_range("sort", args, 1, 2)?;
                let mut values = ev.eval_all(args, env)?;
                let coll = values.pop().unwrap_or(Value::Nil);
                let comparator = values.pop();
                sort(ev, env, comparator, &coll)
            },
        )?;
        registry.define("seq", "list", Arity::Fixed(1), "Elements as a list, or nil when empty", |ev, args, env| {
            let [coll] = eval_n::<1>("seq", ev, args, env)?;
            seq(&coll)
        })?;

        // Predicates
        registry.define("list?", "list", Arity::Fixed(1), "True for lists", |ev, args, env| {
            let [v] = eval_n::<1>("list?", ev, args, env)?;
            Ok(Value::Boolean(matches!(v, Value::List(_))))
        })?;
        registry.define("vector?", "list", Arity::Fixed(1), "True for vectors", |ev, args, env| {
            let [v] = eval_n::<1>("vector?", ev, args, env)?;
            Ok(Value::Boolean(matches!(v, Value::Vector(_))))
        })?;

        Ok(())
    }
}

fn conj(coll: Value, items: Vec<Value>) -> Result<Value> {
    match coll {
        Value::Vector(existing) => {
            let mut out = existing.as_ref().clone();
            out.extend(items);
            Ok(Value::vector(out))
        }
        Value::List(_) | Value::Nil => {
            let mut out: Vec<Value> = items.into_iter().rev().collect();
            out.extend_from_slice(coll.as_seq()?);
            Ok(Value::list(out))
        }
        other => Err(Error::type_error("list or vector", other.type_name())),
    }
}

/// Upper bound on the length of an eagerly built range
const MAX_RANGE_LEN: usize = 10_000_000;

fn range(values: &[Value]) -> Result<Value> {
    let nums = values
        .iter()
        .map(Value::as_number)
        .collect::<Result<Vec<f64>>>()?;
    let (start, end, step) = match nums.as_slice() {
        [end] => (0.0, *end, 1.0),
        [start, end] => (*start, *end, 1.0),
        [start, end, step] => (*start, *end, *step),
        _ => return Err(Error::arity("range", "1 to 3", values.len())),
    };
    if step == 0.0 || !step.is_finite() {
        return Err(Error::invalid_args("range", "step must be a non-zero number"));
    }
    let count = ((end - start) / step).ceil().max(0.0);
    if !count.is_finite() || count > MAX_RANGE_LEN as f64 {
        return Err(Error::invalid_args(
            "range",
            format!("more than {} elements", MAX_RANGE_LEN),
        ));
    }
    let items = (0..count as usize)
        .map(|i| Value::Number(start + i as f64 * step))
        .collect();
    Ok(Value::list(items))
}

fn count(coll: &Value) -> Result<usize> {
    match coll {
        Value::String(s) => Ok(s.chars().count()),
        Value::HashMap(entries) => Ok(entries.len()),
        other => Ok(other.as_seq()?.len()),
    }
}

fn seq(coll: &Value) -> Result<Value> {
    let items: Vec<Value> = match coll {
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        Value::HashMap(entries) => entries
            .iter()
            .map(|(k, v)| Value::vector(vec![Value::keyword(k.clone()), v.clone()]))
            .collect(),
        other => other.as_seq()?.to_vec(),
    };
    if items.is_empty() {
        Ok(Value::Nil)
    } else {
        Ok(Value::list(items))
    }
}

fn sort(ev: &Evaluator, env: &Environment, comparator: Option<Value>, coll: &Value) -> Result<Value> {
    let items = coll.as_seq()?.to_vec();
    let mut compare = |a: &Value, b: &Value| -> Result<Ordering> {
        match &comparator {
            None => Ok(compare_values(a, b)?.unwrap_or(Ordering::Equal)),
            Some(f) => {
                let result = ev.apply_values(f, vec![a.clone(), b.clone()], env)?;
                match result {
                    Value::Boolean(_) | Value::Nil => {
                        if result.is_truthy() {
                            Ok(Ordering::Less)
                        } else if ev.apply_values(f, vec![b.clone(), a.clone()], env)?.is_truthy() {
                            Ok(Ordering::Greater)
                        } else {
                            Ok(Ordering::Equal)
                        }
                    }
                    other => Ok(other.as_number()?.partial_cmp(&0.0).unwrap_or(Ordering::Equal)),
                }
            }
        }
    };
    Ok(Value::list(merge_sort(items, &mut compare)?))
}

/// Stable merge sort with a comparison that may fail
fn merge_sort<F>(mut items: Vec<Value>, compare: &mut F) -> Result<Vec<Value>>
where
    F: FnMut(&Value, &Value) -> Result<Ordering>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare)?;
    let right = merge_sort(right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(r, l)? == Ordering::Less,
            _ => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::eval_lisp;

    fn show(source: &str) -> String {
        eval_lisp(source).unwrap().to_string()
    }

    #[test]
    fn test_construction() {
        assert_eq!(show("(list 1 2 3)"), "(1 2 3)");
        assert_eq!(show("(vector 1 2)"), "[1 2]");
        assert_eq!(show("(cons 0 [1 2])"), "(0 1 2)");
        assert_eq!(show("(conj [1 2] 3 4)"), "[1 2 3 4]");
        assert_eq!(show("(conj '(1 2) 3 4)"), "(4 3 1 2)");
        assert_eq!(show("(conj nil 1)"), "(1)");
    }

    #[test]
    fn test_access() {
        assert_eq!(show("(first [1 2 3])"), "1");
        assert_eq!(show("(first [])"), "nil");
        assert_eq!(show("(rest [1 2 3])"), "(2 3)");
        assert_eq!(show("(rest [])"), "()");
        assert_eq!(show("(next [1])"), "nil");
        assert_eq!(show("(last [1 2 3])"), "3");
        assert_eq!(show("(nth [1 2 3] 1)"), "2");
        assert_eq!(show("(nth [1 2 3] 5 :none)"), ":none");
        assert!(matches!(
            eval_lisp("(nth [1 2 3] 5)"),
            Err(Error::IndexOutOfBounds { index: 5, length: 3 })
        ));
        assert_eq!(show(r#"(count "héllo")"#), "5");
        assert_eq!(show("(count {:a 1})"), "1");
        assert_eq!(show("(empty? nil)"), "true");
    }

    #[test]
    fn test_transformation() {
        assert_eq!(show("(concat [1] '(2 3) nil)"), "(1 2 3)");
        assert_eq!(show("(reverse [1 2 3])"), "(3 2 1)");
        assert_eq!(show("(take 2 [1 2 3])"), "(1 2)");
        assert_eq!(show("(drop 2 [1 2 3])"), "(3)");
        assert_eq!(show("(range 4)"), "(0 1 2 3)");
        assert_eq!(show("(range 5 0 -2)"), "(5 3 1)");
        assert!(eval_lisp("(range 0 5 0)").is_err());
        assert_eq!(show("(range 0 1 0.25)"), "(0 0.25 0.5 0.75)");
        assert_eq!(show("(range 3 1)"), "()");
        assert_eq!(show("(seq [])"), "nil");
        assert_eq!(show("(seq {:a 1})"), "([:a 1])");
    }

    #[test]
    fn test_range_beyond_exact_float_integers() {
        // Past 2^53 adding 1.0 is absorbed; each element is start + i*step
        assert_eq!(show("(count (range 1e17 (+ 1e17 64)))"), "64");
        assert!(matches!(
            eval_lisp("(range 1e300)"),
            Err(Error::InvalidArguments { .. })
        ));
        assert!(eval_lisp("(range 0 (* 1e308 10))").is_err());
    }

    #[test]
    fn test_sort() {
        assert_eq!(show("(sort [3 1 2])"), "(1 2 3)");
        assert_eq!(show(r#"(sort ["b" "a"])"#), r#"("a" "b")"#);
        assert_eq!(show("(sort > [3 1 2])"), "(3 2 1)");
        assert!(eval_lisp("(sort [1 :a])").is_err());
    }

    #[test]
    fn test_predicates() {
        assert_eq!(show("(list? '(1))"), "true");
        assert_eq!(show("(list? [1])"), "false");
        assert_eq!(show("(vector? [1])"), "true");
    }
}
