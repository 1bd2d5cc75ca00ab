//! JSON encoding and decoding

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{Error, Result};
use crate::plugins::{eval_n, expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::Value;

/// `json-encode` and `json-decode`
pub struct JsonPlugin;

impl Plugin for JsonPlugin {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "JSON encoding and decoding"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["hashmap".to_string()]
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        registry.define(
            "json-encode",
            "json",
            Arity::Variadic,
            "(json-encode value pretty?) - JSON text",
            |ev, args, env| {
                expect_range("json-encode", args, 1, 2)?;
                let values = ev.eval_all(args, env)?;
                let json = to_json(&values[0])?;
                let pretty = values.get(1).is_some_and(Value::is_truthy);
                let text = if pretty {
                    serde_json::to_string_pretty(&json)?
                } else {
                    serde_json::to_string(&json)?
                };
                Ok(Value::String(text))
            },
        )?;
        registry.define(
            "json-decode",
            "json",
            Arity::Fixed(1),
            "Parse JSON text; objects become maps, arrays become vectors",
            |ev, args, env| {
                let [text] = eval_n::<1>("json-decode", ev, args, env)?;
                let json: JsonValue = serde_json::from_str(text.as_str()?)?;
                Ok(from_json(json))
            },
        )?;

        registry.register_alias("to-json", "json-encode")?;
        registry.register_alias("from-json", "json-decode")?;
        Ok(())
    }
}

/// Convert a value to JSON; BigNumbers are written as decimal strings
pub fn to_json(value: &Value) -> Result<JsonValue> {
    Ok(match value {
        Value::Nil => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 => {
            JsonValue::Number(Number::from(*n as i64))
        }
        Value::Number(n) => JsonValue::Number(
            Number::from_f64(*n)
                .ok_or_else(|| Error::Json(format!("cannot encode {} as JSON", n)))?,
        ),
        Value::BigNumber(b) => JsonValue::String(b.to_string()),
        Value::String(s) | Value::Keyword(s) | Value::Symbol(s) => JsonValue::String(s.clone()),
        Value::List(items) | Value::Vector(items) => {
            JsonValue::Array(items.iter().map(to_json).collect::<Result<_>>()?)
        }
        Value::HashMap(entries) => {
            let mut object = Map::new();
            for (k, v) in entries.iter() {
                object.insert(k.clone(), to_json(v)?);
            }
            JsonValue::Object(object)
        }
        other => {
            return Err(Error::Json(format!(
                "cannot encode {} as JSON",
                other.type_name()
            )))
        }
    })
}

/// Convert parsed JSON to a value
pub fn from_json(json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Nil,
        JsonValue::Bool(b) => Value::Boolean(b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Value::String(s),
        JsonValue::Array(items) => Value::vector(items.into_iter().map(from_json).collect()),
        JsonValue::Object(object) => {
            let entries: BTreeMap<String, Value> = object
                .into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect();
            Value::map(entries)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::eval_lisp;

    #[test]
    fn test_encode() {
        assert_eq!(
            eval_lisp(r#"(json-encode {:name "Ann" :tags [:a 1.5] :n nil})"#).unwrap(),
            Value::string(r#"{"n":null,"name":"Ann","tags":["a",1.5]}"#)
        );
        assert_eq!(eval_lisp("(to-json 3)").unwrap(), Value::string("3"));
        assert_eq!(eval_lisp("(json-encode 1.25N)").unwrap(), Value::string(r#""1.25""#));
        assert!(matches!(
            eval_lisp("(json-encode (atom 1))"),
            Err(Error::Json(_))
        ));
        assert!(eval_lisp("(json-encode [1] true)")
            .unwrap()
            .to_display_string()
            .contains('\n'));
    }

    #[test]
    fn test_decode() {
        let decoded = eval_lisp(r#"(json-decode "{\"a\": [1, true, null], \"b\": {\"c\": \"d\"}}")"#).unwrap();
        assert_eq!(decoded.to_string(), r#"{:a [1 true nil] :b {:c "d"}}"#);
        assert_eq!(
            eval_lisp(r#"(get (from-json "{\"age\": 30}") "age")"#).unwrap(),
            Value::Number(30.0)
        );
        assert!(matches!(
            eval_lisp(r#"(json-decode "{oops")"#),
            Err(Error::Json(_))
        ));
    }
}
