//! Clock, ids, environment variables and registry introspection

use chrono::{SecondsFormat, Utc};

use crate::error::{Error, Result};
use crate::plugins::{eval_n, expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::Value;

/// `now uuid env-var help functions`
pub struct SystemPlugin;

impl Plugin for SystemPlugin {
    fn name(&self) -> &str {
        "system"
    }

    fn description(&self) -> &str {
        "Time, ids, environment variables and function help"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        registry.define(
            "now",
            "system",
            Arity::Variadic,
            "(now) - milliseconds since the Unix epoch; (now :iso) - RFC 3339 timestamp",
            |ev, args, env| {
                expect_range("now", args, 0, 1)?;
                let now = Utc::now();
                match ev.eval_all(args, env)?.first() {
                    None => Ok(Value::Number(now.timestamp_millis() as f64)),
                    Some(Value::Keyword(k)) if k == "iso" => {
                        Ok(Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)))
                    }
                    Some(other) => Err(Error::invalid_args(
                        "now",
                        format!("unknown format {}", other),
                    )),
                }
            },
        )?;
        registry.define("uuid", "system", Arity::Fixed(0), "Random (v4) UUID string", |_, args, _| {
            expect_range("uuid", args, 0, 0)?;
            Ok(Value::String(uuid::Uuid::new_v4().to_string()))
        })?;
        registry.define(
            "env-var",
            "system",
            Arity::Variadic,
            "(env-var name default?) - environment variable, or default (nil) when unset",
            |ev, args, env| {
                expect_range("env-var", args, 1, 2)?;
                let values = ev.eval_all(args, env)?;
                let fallback = values.get(1).cloned().unwrap_or(Value::Nil);
                match std::env::var(values[0].as_str()?) {
                    Ok(value) => Ok(Value::String(value)),
                    Err(_) => Ok(fallback),
                }
            },
        )?;

        // Introspection
        registry.define("help", "system", Arity::Fixed(1), "(help f) - help line for a builtin, or nil", |ev, args, env| {
            let [target] = eval_n::<1>("help", ev, args, env)?;
            let name = match &target {
                Value::Builtin(name) | Value::String(name) | Value::Symbol(name) | Value::Keyword(name) => name,
                Value::Function(closure) | Value::Macro(closure) => {
                    return Ok(Value::String(format!(
                        "{} ({}) - user defined",
                        closure.display_name(),
                        closure.arity_description()
                    )))
                }
                other => return Err(Error::type_error("function or name", other.type_name())),
            };
            Ok(ev.registry().help(name).map(Value::String).unwrap_or(Value::Nil))
        })?;
        registry.define(
            "functions",
            "system",
            Arity::Variadic,
            "(functions category?) - sorted names of registered functions",
            |ev, args, env| {
                expect_range("functions", args, 0, 1)?;
                let names = match ev.eval_all(args, env)?.first() {
                    None => ev.registry().list(),
                    Some(category) => ev.registry().list_by_category(&category.as_key()?),
                };
                Ok(Value::vector(names.into_iter().map(Value::String).collect()))
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::eval_lisp;

    #[test]
    fn test_now() {
        let Value::Number(ms) = eval_lisp("(now)").unwrap() else {
            panic!("expected a number");
        };
        assert!(ms > 1.6e12);
        let iso = eval_lisp("(now :iso)").unwrap();
        assert!(iso.as_str().unwrap().ends_with('Z'));
        assert!(eval_lisp("(now :unix)").is_err());
    }

    #[test]
    fn test_uuid_is_unique() {
        let a = eval_lisp("(uuid)").unwrap();
        let b = eval_lisp("(uuid)").unwrap();
        assert_eq!(a.as_str().unwrap().len(), 36);
        assert_ne!(a, b);
    }

    #[test]
    fn test_env_var() {
        assert_eq!(
            eval_lisp(r#"(env-var "RULISP_SURELY_UNSET_VARIABLE")"#).unwrap(),
            Value::Nil
        );
        assert_eq!(
            eval_lisp(r#"(env-var "RULISP_SURELY_UNSET_VARIABLE" "dflt")"#).unwrap(),
            Value::string("dflt")
        );
    }

    #[test]
    fn test_help_and_functions() {
        let help = eval_lisp("(help map)").unwrap();
        assert!(help.as_str().unwrap().starts_with("map (variadic) - "));
        assert_eq!(eval_lisp(r#"(help "no-such-fn")"#).unwrap(), Value::Nil);
        assert!(eval_lisp("(help (fn [x] x))")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("user defined"));

        let atom_fns = eval_lisp("(functions :atom)").unwrap();
        assert_eq!(
            atom_fns.to_string(),
            r#"["atom" "atom?" "deref" "reset!" "swap!"]"#
        );
        assert!(matches!(
            eval_lisp("(count (functions))").unwrap(),
            Value::Number(n) if n > 100.0
        ));
    }
}
