//! Console output, files and logging

use std::io::Write;

use crate::error::{Error, Result};
use crate::parser::{parse, Expr};
use crate::plugins::{eval_n, expect_min, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::{Environment, Evaluator, Value};

/// Printing, file access, `load-file` and `log`
pub struct IoPlugin;

impl Plugin for IoPlugin {
    fn name(&self) -> &str {
        "io"
    }

    fn description(&self) -> &str {
        "Console output, file access and logging"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Console
        registry.define("print", "io", Arity::Variadic, "Print arguments separated by spaces", |ev, args, env| {
            let line = display_joined(ev, args, env)?;
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{}", line)?;
            stdout.flush()?;
            Ok(Value::Nil)
        })?;
        registry.define("println", "io", Arity::Variadic, "Print arguments followed by a newline", |ev, args, env| {
            let line = display_joined(ev, args, env)?;
            writeln!(std::io::stdout().lock(), "{}", line)?;
            Ok(Value::Nil)
        })?;
        registry.define("pr-str", "io", Arity::Variadic, "Readable representation of the arguments", |ev, args, env| {
            let parts: Vec<String> = ev.eval_all(args, env)?.iter().map(Value::to_string).collect();
            Ok(Value::String(parts.join(" ")))
        })?;

        // Files
        registry.define("read-file", "io", Arity::Fixed(1), "Contents of a file as a string", |ev, args, env| {
            let [path] = eval_n::<1>("read-file", ev, args, env)?;
            Ok(Value::String(std::fs::read_to_string(path.as_str()?)?))
        })?;
        registry.define("write-file", "io", Arity::Fixed(2), "Write a string to a file, replacing it", |ev, args, env| {
            let [path, content] = eval_n::<2>("write-file", ev, args, env)?;
            std::fs::write(path.as_str()?, content.to_display_string())?;
            Ok(Value::Nil)
        })?;
        registry.define("file-exists?", "io", Arity::Fixed(1), "True if the path exists", |ev, args, env| {
            let [path] = eval_n::<1>("file-exists?", ev, args, env)?;
            Ok(Value::Boolean(std::path::Path::new(path.as_str()?).exists()))
        })?;
        registry.define(
            "load-file",
            "io",
            Arity::Fixed(1),
            "Evaluate every form of a source file in the current scope",
            eval_load_file,
        )?;

        // Logging
        registry.define(
            "log",
            "io",
            Arity::Variadic,
            "(log :level message...) - emit a tracing event; level defaults to :info",
            eval_log,
        )?;

        Ok(())
    }
}

fn display_joined(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<String> {
    let parts: Vec<String> = ev
        .eval_all(args, env)?
        .iter()
        .map(Value::to_display_string)
        .collect();
    Ok(parts.join(" "))
}

fn eval_load_file(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    let [path] = eval_n::<1>("load-file", ev, args, env)?;
    let path = path.as_str()?.to_string();
    let in_file = |e: Error| Error::InFile {
        path: path.clone(),
        source: Box::new(e),
    };

    let source = std::fs::read_to_string(&path).map_err(|e| in_file(e.into()))?;
    let mut last = Value::Nil;
    for form in parse(&source).map_err(in_file)? {
        last = ev.eval(&form, env).map_err(in_file)?;
    }
    tracing::debug!(%path, "file loaded");
    Ok(last)
}

fn eval_log(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    expect_min("log", args, 1)?;
    let mut values = ev.eval_all(args, env)?;
    let explicit = match values.first() {
        Some(Value::Keyword(level)) if values.len() > 1 => Some(level.clone()),
        _ => None,
    };
    let level = match explicit {
        Some(level) => {
            values.remove(0);
            level
        }
        None => "info".to_string(),
    };
    let message: Vec<String> = values.iter().map(Value::to_display_string).collect();
    let message = message.join(" ");

    match level.as_str() {
        "trace" => tracing::trace!(target: "rulisp::script", "{}", message),
        "debug" => tracing::debug!(target: "rulisp::script", "{}", message),
        "info" => tracing::info!(target: "rulisp::script", "{}", message),
        "warn" => tracing::warn!(target: "rulisp::script", "{}", message),
        "error" => tracing::error!(target: "rulisp::script", "{}", message),
        other => {
            return Err(Error::invalid_args(
                "log",
                format!("unknown level :{}", other),
            ))
        }
    }
    Ok(Value::Nil)
}
