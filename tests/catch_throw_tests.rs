//! Tests for throw, try/catch/finally and error decoration

use rulisp::{Error, Interpreter, InterpreterConfig, Value};

fn eval(code: &str) -> Result<Value, Error> {
    Interpreter::new()?.eval_str(code)
}

fn assert_eval(code: &str, expected: Value) {
    let result = eval(code);
    assert!(result.is_ok(), "Failed to evaluate: {:?}", result);
    assert_eq!(result.unwrap(), expected);
}

#[test]
fn test_try_without_error() {
    assert_eval("(try (+ 1 2) (catch e :unused))", Value::Number(3.0));
}

#[test]
fn test_catch_thrown_value() {
    assert_eval(r#"(try (throw "done") (catch e e))"#, Value::string("done"));
    assert_eval(
        "(try (throw (str \"code \" 42)) (catch e (string-length e)))",
        Value::Number(7.0),
    );
}

#[test]
fn test_catch_runtime_errors() {
    assert_eval(
        "(try (first 5) (catch e (string-contains? e \"Type error\")))",
        Value::Boolean(true),
    );
    assert_eval(
        "(try (undefined-thing) (catch e :recovered))",
        Value::keyword("recovered"),
    );
}

#[test]
fn test_throw_from_nested_calls() {
    let code = r#"
        (defn validate [x] (if (neg? x) (throw "negative") x))
        (defn process [xs] (map validate xs))
        [(try (process [1 2]) (catch e e))
         (try (process [1 -2]) (catch e e))]
    "#;
    assert_eq!(eval(code).unwrap().to_string(), r#"[(1 2) "negative"]"#);
}

#[test]
fn test_throw_from_tail_position_is_caught() {
    let code = r#"
        (defn loop-until [n] (if (= n 0) (throw "bottom") (loop-until (- n 1))))
        (try (loop-until 1000) (catch e e))
    "#;
    assert_eval(code, Value::string("bottom"));
}

#[test]
fn test_nested_try_rethrow() {
    let code = r#"
        (try
          (try (throw "inner") (catch e (throw (str e "+outer"))))
          (catch e e))
    "#;
    assert_eval(code, Value::string("inner+outer"));
}

#[test]
fn test_finally_always_runs() {
    let code = "
        (def cleaned (atom 0))
        (try (throw \"x\") (catch e nil) (finally (swap! cleaned inc)))
        (try 1 (finally (swap! cleaned inc)))
        (deref cleaned)";
    assert_eval(code, Value::Number(2.0));

    // Without a catch the error still propagates after cleanup
    let code = "
        (def cleaned (atom false))
        (try (throw \"x\") (finally (reset! cleaned true)))";
    assert!(matches!(eval(code), Err(Error::UserError(m)) if m == "x"));
}

#[test]
fn test_catch_variable_is_scoped() {
    assert!(matches!(
        eval(r#"(try (throw "a") (catch err err)) err"#),
        Err(Error::UndefinedSymbol { .. })
    ));
}

#[test]
fn test_uncaught_throw() {
    assert!(matches!(eval(r#"(throw "nobody home")"#), Err(Error::UserError(_))));
    assert!(matches!(eval("(throw)"), Err(Error::Arity { .. })));
}

#[test]
fn test_traced_errors_keep_control_flow() {
    let interp = Interpreter::with_config(InterpreterConfig {
        plugins: None,
        trace_calls: true,
    })
    .unwrap();
    assert_eq!(
        interp
            .eval_str(r#"(defn boom [] (throw "b")) (try (boom) (catch e e))"#)
            .unwrap(),
        Value::string("b")
    );
    let err = interp.eval_str("(defn div0 [x] (/ x 0)) (div0 1)").unwrap_err();
    assert!(matches!(err.root(), Error::DivisionByZero));
    assert!(err.to_string().contains("div0"));
}
