//! `go` blocks, channels and wait groups

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::parser::Expr;
use crate::plugins::{eval_n, expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::{Channel, Environment, Evaluator, Future, Value, WaitGroup};

/// Background evaluation and the primitives to coordinate it
pub struct ConcurrencyPlugin;

impl Plugin for ConcurrencyPlugin {
    fn name(&self) -> &str {
        "concurrency"
    }

    fn description(&self) -> &str {
        "go blocks, channels and wait groups"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["core".to_string()]
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        // Futures
        registry.define(
            "go",
            "concurrency",
            Arity::Variadic,
            "(go body...) - evaluate body on a new thread, returning a future",
            eval_go,
        )?;
        registry.define(
            "go-wait",
            "concurrency",
            Arity::Variadic,
            "(go-wait future timeout-ms?) - result of the go block; nil on timeout",
            |ev, args, env| {
                expect_range("go-wait", args, 1, 2)?;
                let values = ev.eval_all(args, env)?;
                let future = future(&values[0])?;
                match timeout(values.get(1))? {
                    None => future.wait(),
                    Some(limit) => future.wait_timeout(limit).unwrap_or(Ok(Value::Nil)),
                }
            },
        )?;
        registry.define("go-done?", "concurrency", Arity::Fixed(1), "True once the go block has finished", |ev, args, env| {
            let [f] = eval_n::<1>("go-done?", ev, args, env)?;
            Ok(Value::Boolean(future(&f)?.is_done()))
        })?;

        // Channels
        registry.define(
            "chan",
            "concurrency",
            Arity::Variadic,
            "(chan capacity?) - new channel; capacity 0 (the default) is a rendezvous",
            |ev, args, env| {
                expect_range("chan", args, 0, 1)?;
                let capacity = match args.first() {
                    Some(arg) => non_negative("chan", ev.eval(arg, env)?.as_int()?)?,
                    None => 0,
                };
                Ok(Value::Channel(Arc::new(Channel::new(capacity))))
            },
        )?;
        registry.define(
            "chan-send!",
            "concurrency",
            Arity::Fixed(2),
            "Send a value, blocking while the channel is full",
            |ev, args, env| {
                let [ch, value] = eval_n::<2>("chan-send!", ev, args, env)?;
                channel(&ch)?.send(value)?;
                Ok(Value::Boolean(true))
            },
        )?;
        registry.define(
            "chan-recv!",
            "concurrency",
            Arity::Variadic,
            "(chan-recv! ch timeout-ms?) - next value; nil once closed and drained, or on timeout",
            |ev, args, env| {
                expect_range("chan-recv!", args, 1, 2)?;
                let values = ev.eval_all(args, env)?;
                let limit = timeout(values.get(1))?;
                Ok(channel(&values[0])?.recv(limit).unwrap_or(Value::Nil))
            },
        )?;
        registry.define(
            "chan-try-recv!",
            "concurrency",
            Arity::Fixed(1),
            "Next value if one is ready, otherwise nil",
            |ev, args, env| {
                let [ch] = eval_n::<1>("chan-try-recv!", ev, args, env)?;
                Ok(channel(&ch)?.try_recv())
            },
        )?;
        registry.define("chan-close!", "concurrency", Arity::Fixed(1), "Close the channel", |ev, args, env| {
            let [ch] = eval_n::<1>("chan-close!", ev, args, env)?;
            channel(&ch)?.close();
            Ok(Value::Nil)
        })?;
        registry.define("chan-closed?", "concurrency", Arity::Fixed(1), "True once the channel is closed", |ev, args, env| {
            let [ch] = eval_n::<1>("chan-closed?", ev, args, env)?;
            Ok(Value::Boolean(channel(&ch)?.is_closed()))
        })?;

        // Wait groups
        registry.define("wait-group", "concurrency", Arity::Fixed(0), "New wait group", |_, args, _| {
            expect_range("wait-group", args, 0, 0)?;
            Ok(Value::WaitGroup(Arc::new(WaitGroup::new())))
        })?;
        registry.define(
            "wg-add!",
            "concurrency",
            Arity::Variadic,
            "(wg-add! wg n?) - add n (default 1) to the counter",
            |ev, args, env| {
                expect_range("wg-add!", args, 1, 2)?;
                let values = ev.eval_all(args, env)?;
                let delta = match values.get(1) {
                    Some(n) => n.as_int()?,
                    None => 1,
                };
                wait_group(&values[0])?.add(delta)?;
                Ok(Value::Nil)
            },
        )?;
        registry.define("wg-done!", "concurrency", Arity::Fixed(1), "Decrement the counter", |ev, args, env| {
            let [wg] = eval_n::<1>("wg-done!", ev, args, env)?;
            wait_group(&wg)?.done()?;
            Ok(Value::Nil)
        })?;
        registry.define("wg-wait!", "concurrency", Arity::Fixed(1), "Block until the counter is zero", |ev, args, env| {
            let [wg] = eval_n::<1>("wg-wait!", ev, args, env)?;
            wait_group(&wg)?.wait();
            Ok(Value::Nil)
        })?;

        registry.define("sleep", "concurrency", Arity::Fixed(1), "Pause the current thread for ms milliseconds", |ev, args, env| {
            let [ms] = eval_n::<1>("sleep", ev, args, env)?;
            let ms = non_negative("sleep", ms.as_int()?)?;
            std::thread::sleep(Duration::from_millis(ms as u64));
            Ok(Value::Nil)
        })?;

        Ok(())
    }
}

/// The body runs in the calling environment itself; only the evaluator is cloned
fn eval_go(ev: &Evaluator, args: &[Expr], env: &Environment) -> Result<Value> {
    let evaluator = ev.clone();
    let scope = env.clone();
    let body = args.to_vec();
    let future = Future::spawn(move || {
        let value = evaluator.eval_body(&body, &scope)?;
        evaluator.force(value)
    })?;
    tracing::trace!(future = %future.id(), "go block started");
    Ok(Value::Future(future))
}

fn future(value: &Value) -> Result<&Arc<Future>> {
    match value {
        Value::Future(f) => Ok(f),
        other => Err(Error::type_error("future", other.type_name())),
    }
}

fn channel(value: &Value) -> Result<&Arc<Channel>> {
    match value {
        Value::Channel(c) => Ok(c),
        other => Err(Error::type_error("channel", other.type_name())),
    }
}

fn wait_group(value: &Value) -> Result<&Arc<WaitGroup>> {
    match value {
        Value::WaitGroup(wg) => Ok(wg),
        other => Err(Error::type_error("wait group", other.type_name())),
    }
}

fn non_negative(form: &str, n: i64) -> Result<usize> {
    usize::try_from(n).map_err(|_| Error::invalid_args(form, "expected a non-negative integer"))
}

/// Optional millisecond timeout argument; nil means wait forever
fn timeout(arg: Option<&Value>) -> Result<Option<Duration>> {
    match arg {
        None | Some(Value::Nil) => Ok(None),
        Some(ms) => {
            let ms = non_negative("timeout", ms.as_int()?)?;
            Ok(Some(Duration::from_millis(ms as u64)))
        }
    }
}
