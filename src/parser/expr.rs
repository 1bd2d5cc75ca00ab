use std::fmt;

use crate::runtime::Value;

/// Parsed syntax node
///
/// Produced once by the reader and never mutated afterwards. The evaluator
/// decides what each node means; a `Bracket` for example is a vector literal
/// in expression position and a parameter list inside `fn`.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Number literal (float semantics)
    Number(f64),
    /// Arbitrary precision literal, kept as text until evaluated
    BigNumber(String),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// Keyword literal, stored without the leading colon
    Keyword(String),
    /// Symbol, possibly dotted for module access
    Symbol(String),
    /// `( ... )`
    List(Vec<Expr>),
    /// `[ ... ]`
    Bracket(Vec<Expr>),
    /// `{ ... }`, flattened key/value pairs
    HashMap(Vec<Expr>),
    /// Already-evaluated value; evaluates to itself
    ///
    /// Used when evaluated arguments must be fed back through the
    /// expression-based calling convention (partial application, composition).
    Value(Value),
}

impl Expr {
    /// Wrap an evaluated value so that evaluating it yields the value unchanged
    pub fn quoted(value: Value) -> Self {
        Expr::Value(value)
    }

    /// Symbol constructor
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    /// Returns the symbol name, if this is a symbol
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Short description of the node kind, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Number(_) => "number",
            Expr::BigNumber(_) => "bignumber",
            Expr::String(_) => "string",
            Expr::Boolean(_) => "boolean",
            Expr::Keyword(_) => "keyword",
            Expr::Symbol(_) => "symbol",
            Expr::List(_) => "list",
            Expr::Bracket(_) => "vector",
            Expr::HashMap(_) => "hashmap",
            Expr::Value(v) => v.type_name(),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter, open: &str, items: &[Expr], close: &str) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", crate::runtime::format_number(*n)),
            Expr::BigNumber(s) => write!(f, "{}N", s),
            Expr::String(s) => write!(f, "{:?}", s),
            Expr::Boolean(b) => write!(f, "{}", b),
            Expr::Keyword(k) => write!(f, ":{}", k),
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::List(items) => write_seq(f, "(", items, ")"),
            Expr::Bracket(items) => write_seq(f, "[", items, "]"),
            Expr::HashMap(items) => write_seq(f, "{", items, "}"),
            Expr::Value(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_syntax() {
        let expr = Expr::List(vec![
            Expr::symbol("assoc"),
            Expr::HashMap(vec![Expr::Keyword("a".to_string()), Expr::Number(1.0)]),
            Expr::Bracket(vec![Expr::String("x".to_string()), Expr::Boolean(false)]),
            Expr::BigNumber("1.5".to_string()),
        ]);
        assert_eq!(expr.to_string(), r#"(assoc {:a 1} ["x" false] 1.5N)"#);
    }

    #[test]
    fn test_quoted_value_display() {
        let expr = Expr::quoted(Value::Keyword("k".to_string()));
        assert_eq!(expr.to_string(), ":k");
        assert_eq!(expr.kind_name(), "keyword");
    }
}
