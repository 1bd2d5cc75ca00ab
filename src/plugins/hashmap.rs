//! Hash map functions
//!
//! Keys are strings; a keyword key and a string key with the same text are
//! the same key. `keys` returns keywords.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::plugins::{eval_n, expect_min, expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::Value;

/// Map construction, lookup and update
pub struct HashMapPlugin;

impl Plugin for HashMapPlugin {
    fn name(&self) -> &str {
        "hashmap"
    }

    fn description(&self) -> &str {
        "Hash maps keyed by strings and keywords"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Construction
        registry.define("hash-map", "hashmap", Arity::Variadic, "Map from alternating keys and values", |ev, args, env| {
            let values = ev.eval_all(args, env)?;
            insert_pairs("hash-map", BTreeMap::new(), &values).map(Value::map)
        })?;
        registry.define("merge", "hashmap", Arity::Variadic, "Maps merged left to right; nil is skipped", |ev, args, env| {
            let mut merged = BTreeMap::new();
            for value in ev.eval_all(args, env)? {
                match value {
                    Value::Nil => {}
                    other => merged.extend(other.as_map()?.iter().map(|(k, v)| (k.clone(), v.clone()))),
                }
            }
            Ok(Value::map(merged))
        })?;

        // Lookup
        registry.define(
            "get",
            "hashmap",
            Arity::Variadic,
            "(get coll key default?) - maps by key, vectors by index",
            |ev, args, env| {
                expect_range("get", args, 2, 3)?;
                let values = ev.eval_all(args, env)?;
                let default = values.get(2).cloned().unwrap_or(Value::Nil);
                Ok(lookup(&values[0], &values[1])?.unwrap_or(default))
            },
        )?;
        registry.define(
            "get-in",
            "hashmap",
            Arity::Variadic,
            "(get-in coll [keys...] default?) - nested lookup",
            |ev, args, env| {
                expect_range("get-in", args, 2, 3)?;
                let values = ev.eval_all(args, env)?;
                let default = values.get(2).cloned().unwrap_or(Value::Nil);
                let mut current = values[0].clone();
                for key in values[1].as_seq()? {
                    match lookup(&current, key)? {
                        Some(next) => current = next,
                        None => return Ok(default),
                    }
                }
                Ok(current)
            },
        )?;
        registry.define("contains?", "hashmap", Arity::Fixed(2), "True if the key (or index) is present", |ev, args, env| {
            let [coll, key] = eval_n::<2>("contains?", ev, args, env)?;
            Ok(Value::Boolean(lookup(&coll, &key)?.is_some()))
        })?;
        registry.define("keys", "hashmap", Arity::Fixed(1), "Keys as keywords, sorted", |ev, args, env| {
            let [m] = eval_n::<1>("keys", ev, args, env)?;
            Ok(Value::list(m.as_map()?.keys().map(|k| Value::keyword(k.clone())).collect()))
        })?;
        registry.define("vals", "hashmap", Arity::Fixed(1), "Values in key order", |ev, args, env| {
            let [m] = eval_n::<1>("vals", ev, args, env)?;
            Ok(Value::list(m.as_map()?.values().cloned().collect()))
        })?;

        // Update
        registry.define(
            "assoc",
            "hashmap",
            Arity::Variadic,
            "(assoc coll key value ...) - new map (or vector) with the entries set",
            |ev, args, env| {
                expect_min("assoc", args, 3)?;
                let values = ev.eval_all(args, env)?;
                match &values[0] {
                    Value::Vector(items) => assoc_vector(items, &values[1..]),
                    Value::Nil => insert_pairs("assoc", BTreeMap::new(), &values[1..]).map(Value::map),
                    other => insert_pairs("assoc", other.as_map()?.clone(), &values[1..]).map(Value::map),
                }
            },
        )?;
        registry.define("dissoc", "hashmap", Arity::Variadic, "New map without the given keys", |ev, args, env| {
            expect_min("dissoc", args, 1)?;
            let values = ev.eval_all(args, env)?;
            let mut entries = values[0].as_map()?.clone();
            for key in &values[1..] {
                entries.remove(&key.as_key()?);
            }
            Ok(Value::map(entries))
        })?;

        // Keywords and names
        registry.define("map?", "hashmap", Arity::Fixed(1), "True for hash maps", |ev, args, env| {
            let [v] = eval_n::<1>("map?", ev, args, env)?;
            Ok(Value::Boolean(matches!(v, Value::HashMap(_))))
        })?;
        registry.define("keyword", "hashmap", Arity::Fixed(1), "Keyword from a string", |ev, args, env| {
            let [v] = eval_n::<1>("keyword", ev, args, env)?;
            match v {
                Value::Keyword(_) => Ok(v),
                other => Ok(Value::keyword(other.as_str()?.trim_start_matches(':'))),
            }
        })?;
        registry.define("name", "hashmap", Arity::Fixed(1), "Name of a keyword, symbol or string", |ev, args, env| {
            let [v] = eval_n::<1>("name", ev, args, env)?;
            match v {
                Value::Keyword(s) | Value::Symbol(s) | Value::String(s) => Ok(Value::String(s)),
                other => Err(Error::type_error("keyword, symbol or string", other.type_name())),
            }
        })?;

        Ok(())
    }
}

fn insert_pairs(
    form: &str,
    mut entries: BTreeMap<String, Value>,
    pairs: &[Value],
) -> Result<BTreeMap<String, Value>> {
    if pairs.len() % 2 != 0 {
        return Err(Error::invalid_args(form, "expected key/value pairs"));
    }
    for pair in pairs.chunks(2) {
        entries.insert(pair[0].as_key()?, pair[1].clone());
    }
    Ok(entries)
}

fn assoc_vector(items: &[Value], pairs: &[Value]) -> Result<Value> {
    if pairs.len() % 2 != 0 {
        return Err(Error::invalid_args("assoc", "expected index/value pairs"));
    }
    let mut out = items.to_vec();
    for pair in pairs.chunks(2) {
        let index = pair[0].as_int()?;
        match usize::try_from(index) {
            Ok(i) if i < out.len() => out[i] = pair[1].clone(),
            Ok(i) if i == out.len() => out.push(pair[1].clone()),
            _ => {
                return Err(Error::IndexOutOfBounds {
                    index,
                    length: out.len(),
                })
            }
        }
    }
    Ok(Value::vector(out))
}

/// `Some(value)` if `key` is present in `coll`
fn lookup(coll: &Value, key: &Value) -> Result<Option<Value>> {
    match coll {
        Value::HashMap(entries) => match key {
            Value::String(k) | Value::Keyword(k) => Ok(entries.get(k).cloned()),
            _ => Ok(None),
        },
        Value::Vector(items) | Value::List(items) => Ok(key
            .as_int()
            .ok()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i).cloned())),
        Value::Nil => Ok(None),
        other => Err(Error::type_error("hashmap or vector", other.type_name())),
    }
}
