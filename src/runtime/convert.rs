//! Conversions between code and data
//!
//! `quote_expr` turns syntax into the value a macro or `quote` sees;
//! `value_to_code` turns a macro's result back into syntax to evaluate.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::runtime::{BigDecimal, Value};

/// Syntax as data: symbols stay symbols, brackets become vectors
pub fn quote_expr(expr: &Expr) -> Result<Value> {
    Ok(match expr {
        Expr::Number(n) => Value::Number(*n),
        Expr::BigNumber(text) => Value::BigNumber(parse_big(text)?),
        Expr::String(s) => Value::String(s.clone()),
        Expr::Boolean(b) => Value::Boolean(*b),
        Expr::Keyword(k) => Value::Keyword(k.clone()),
        Expr::Symbol(s) if s == "nil" => Value::Nil,
        Expr::Symbol(s) => Value::Symbol(s.clone()),
        Expr::List(items) => Value::list(quote_all(items)?),
        Expr::Bracket(items) => Value::vector(quote_all(items)?),
        Expr::HashMap(items) => {
            let mut entries = BTreeMap::new();
            for pair in items.chunks(2) {
                if let [key, val] = pair {
                    entries.insert(quote_expr(key)?.as_key()?, quote_expr(val)?);
                }
            }
            Value::map(entries)
        }
        Expr::Value(v) => v.clone(),
    })
}

fn quote_all(items: &[Expr]) -> Result<Vec<Value>> {
    items.iter().map(quote_expr).collect()
}

/// Parse the text of a BigNumber literal
pub fn parse_big(text: &str) -> Result<BigDecimal> {
    text.parse()
        .map_err(|_| Error::InvalidBigNumber(text.to_string()))
}

/// Data as syntax; values without a literal form are embedded as-is
pub fn value_to_code(value: &Value) -> Expr {
    match value {
        Value::Number(n) => Expr::Number(*n),
        Value::String(s) => Expr::String(s.clone()),
        Value::Boolean(b) => Expr::Boolean(*b),
        Value::Keyword(k) => Expr::Keyword(k.clone()),
        Value::Symbol(s) => Expr::Symbol(s.clone()),
        Value::List(items) => Expr::List(items.iter().map(value_to_code).collect()),
        Value::Vector(items) => Expr::Bracket(items.iter().map(value_to_code).collect()),
        Value::HashMap(entries) => Expr::HashMap(
            entries
                .iter()
                .flat_map(|(k, v)| [Expr::Keyword(k.clone()), value_to_code(v)])
                .collect(),
        ),
        other => Expr::Value(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn first_form(source: &str) -> Expr {
        parse(source).unwrap().remove(0)
    }

    #[test]
    fn test_quote_keeps_symbols() {
        let quoted = quote_expr(&first_form("(+ a [1 :k] nil)")).unwrap();
        assert_eq!(quoted.to_string(), "(+ a [1 :k] nil)");
        let items = quoted.as_seq().unwrap();
        assert!(matches!(&items[0], Value::Symbol(s) if s == "+"));
        assert!(matches!(&items[2], Value::Vector(_)));
        assert!(matches!(&items[3], Value::Nil));
    }

    #[test]
    fn test_quote_map_keys() {
        let quoted = quote_expr(&first_form(r#"{:a 1 "b" 2}"#)).unwrap();
        let map = quoted.as_map().unwrap();
        assert_eq!(map.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(map.get("b"), Some(&Value::Number(2.0)));
        assert!(quote_expr(&first_form("{1 2}")).is_err());
    }

    #[test]
    fn test_value_to_code() {
        let value = Value::list(vec![
            Value::Symbol("if".to_string()),
            Value::Boolean(true),
            Value::vector(vec![Value::Number(1.0)]),
            Value::atom(Value::Nil),
        ]);
        let code = value_to_code(&value);
        match code {
            Expr::List(items) => {
                assert_eq!(items[0].as_symbol(), Some("if"));
                assert!(matches!(items[2], Expr::Bracket(_)));
                assert!(matches!(items[3], Expr::Value(Value::Atom(_))));
            }
            other => panic!("expected list, got {}", other),
        }
    }

    #[test]
    fn test_invalid_big_literal() {
        assert!(matches!(parse_big("1.2.3"), Err(Error::InvalidBigNumber(_))));
    }
}
