//! String manipulation functions
//!
//! Indices count characters, not bytes.

use regex::Regex;

use crate::error::{Error, Result};
use crate::plugins::{eval_n, expect_min, expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::Value;

/// String building, slicing, searching and regular expressions
pub struct StringPlugin;

impl Plugin for StringPlugin {
    fn name(&self) -> &str {
        "string"
    }

    fn description(&self) -> &str {
        "String functions and regular expressions"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Construction
        registry.define("str", "string", Arity::Variadic, "Concatenate the display form of every argument", |ev, args, env| {
            let mut out = String::new();
            for value in ev.eval_all(args, env)? {
                out.push_str(&value.to_display_string());
            }
            Ok(Value::String(out))
        })?;
        registry.define(
            "format",
            "string",
            Arity::Variadic,
            "printf-style formatting: %s %d %f %.Nf %%",
            |ev, args, env| {
                expect_min("format", args, 1)?;
                let values = ev.eval_all(args, env)?;
                format_string(values[0].as_str()?, &values[1..]).map(Value::String)
            },
        )?;
        registry.define(
            "join",
            "string",
            Arity::Variadic,
            "(join coll) or (join separator coll)",
            |ev, args, env| {
                expect_range("join", args, 1, 2)?;
                let values = ev.eval_all(args, env)?;
                let (separator, coll) = match values.as_slice() {
                    [coll] => (String::new(), coll),
                    [sep, coll] => (sep.to_display_string(), coll),
                    _ => return Err(Error::arity("join", "1 to 2", values.len())),
                };
                let parts: Vec<String> = coll.as_seq()?.iter().map(Value::to_display_string).collect();
                Ok(Value::String(parts.join(&separator)))
            },
        )?;

        // Case and whitespace
        registry.define("string-upper", "string", Arity::Fixed(1), "Upper-case copy", |ev, args, env| {
            let [s] = eval_n::<1>("string-upper", ev, args, env)?;
            Ok(Value::String(s.as_str()?.to_uppercase()))
        })?;
        registry.define("string-lower", "string", Arity::Fixed(1), "Lower-case copy", |ev, args, env| {
            let [s] = eval_n::<1>("string-lower", ev, args, env)?;
            Ok(Value::String(s.as_str()?.to_lowercase()))
        })?;
        registry.define("string-trim", "string", Arity::Fixed(1), "Copy without surrounding whitespace", |ev, args, env| {
            let [s] = eval_n::<1>("string-trim", ev, args, env)?;
            Ok(Value::string(s.as_str()?.trim()))
        })?;

        // Slicing and searching
        registry.define("split", "string", Arity::Fixed(2), "Vector of the pieces between separators", |ev, args, env| {
            let [s, sep] = eval_n::<2>("split", ev, args, env)?;
            let (s, sep) = (s.as_str()?, sep.as_str()?);
            let pieces: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep).map(Value::string).collect()
            };
            Ok(Value::vector(pieces))
        })?;
        registry.define(
            "substring",
            "string",
            Arity::Variadic,
            "(substring s start end?) - characters from start up to end",
            |ev, args, env| {
                expect_range("substring", args, 2, 3)?;
                let values = ev.eval_all(args, env)?;
                let chars: Vec<char> = values[0].as_str()?.chars().collect();
                let start = values[1].as_int()?;
                let end = match values.get(2) {
                    Some(end) => end.as_int()?,
                    None => chars.len() as i64,
                };
                for index in [start, end] {
                    if index < 0 || index as usize > chars.len() {
                        return Err(Error::IndexOutOfBounds {
                            index,
                            length: chars.len(),
                        });
                    }
                }
                if start > end {
                    return Err(Error::invalid_args("substring", "start is after end"));
                }
                Ok(Value::String(chars[start as usize..end as usize].iter().collect()))
            },
        )?;
        registry.define("string-contains?", "string", Arity::Fixed(2), "True if s contains the substring", |ev, args, env| {
            let [s, sub] = eval_n::<2>("string-contains?", ev, args, env)?;
            Ok(Value::Boolean(s.as_str()?.contains(sub.as_str()?)))
        })?;
        registry.define("string-replace", "string", Arity::Fixed(3), "Replace every occurrence of from with to", |ev, args, env| {
            let [s, from, to] = eval_n::<3>("string-replace", ev, args, env)?;
            Ok(Value::String(s.as_str()?.replace(from.as_str()?, to.as_str()?)))
        })?;
        registry.define("string-length", "string", Arity::Fixed(1), "Number of characters", |ev, args, env| {
            let [s] = eval_n::<1>("string-length", ev, args, env)?;
            Ok(Value::Number(s.as_str()?.chars().count() as f64))
        })?;

        // Regular expressions
        registry.define(
            "re-find",
            "string",
            Arity::Fixed(2),
            "First match of the pattern; a vector of groups when the pattern has any",
            |ev, args, env| {
                let [pattern, s] = eval_n::<2>("re-find", ev, args, env)?;
                let re = compile("re-find", pattern.as_str()?)?;
                Ok(match re.captures(s.as_str()?) {
                    Some(caps) => captures_value(&caps),
                    None => Value::Nil,
                })
            },
        )?;
        registry.define(
            "re-matches",
            "string",
            Arity::Fixed(2),
            "Match of the pattern against the whole string, or nil",
            |ev, args, env| {
                let [pattern, s] = eval_n::<2>("re-matches", ev, args, env)?;
                let re = compile("re-matches", &format!("^(?:{})$", pattern.as_str()?))?;
                Ok(match re.captures(s.as_str()?) {
                    Some(caps) => captures_value(&caps),
                    None => Value::Nil,
                })
            },
        )?;

        // Clojure names
        registry.register_alias("upper-case", "string-upper")?;
        registry.register_alias("lower-case", "string-lower")?;
        registry.register_alias("trim", "string-trim")?;

        Ok(())
    }
}

fn compile(form: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::invalid_args(form, format!("bad pattern: {}", e)))
}

fn captures_value(caps: &regex::Captures) -> Value {
    let group = |m: Option<regex::Match>| m.map(|m| Value::string(m.as_str())).unwrap_or(Value::Nil);
    if caps.len() == 1 {
        group(caps.get(0))
    } else {
        Value::vector(caps.iter().map(group).collect())
    }
}

/// Expand `%s`, `%d`, `%f`, `%.Nf` and `%%` against `args`
fn format_string(template: &str, args: &[Value]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    let mut next_arg = |spec: &str| {
        args.next()
            .ok_or_else(|| Error::invalid_args("format", format!("missing argument for %{}", spec)))
    };

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut precision: Option<usize> = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            precision = Some(
                digits
                    .parse()
                    .map_err(|_| Error::invalid_args("format", "bad precision"))?,
            );
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => out.push_str(&next_arg("s")?.to_display_string()),
            Some('d') => out.push_str(&next_arg("d")?.as_int()?.to_string()),
            Some('f') => {
                let n = next_arg("f")?.as_number()?;
                out.push_str(&format!("{:.*}", precision.unwrap_or(6), n));
            }
            Some(other) => {
                return Err(Error::invalid_args(
                    "format",
                    format!("unknown directive %{}", other),
                ))
            }
            None => return Err(Error::invalid_args("format", "template ends with %")),
        }
    }
    Ok(out)
}
