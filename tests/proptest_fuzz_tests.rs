//! Property-based tests for the reader and evaluator
//!
//! 1. The scanner and parser never panic on arbitrary input
//! 2. Evaluating arbitrary token soup returns an error instead of panicking
//! 3. Arithmetic and the composite callables obey their algebraic laws

use proptest::prelude::*;
use rulisp::{parse, Interpreter, Scanner, Value};

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

/// Generate tokens that look like S-expression elements
fn sexp_token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("(".to_string()),
        Just(")".to_string()),
        Just("[".to_string()),
        Just("]".to_string()),
        Just("{".to_string()),
        Just("}".to_string()),
        Just("'".to_string()),
        Just("`".to_string()),
        Just("~".to_string()),
        Just("~@".to_string()),
        Just("if".to_string()),
        Just("let".to_string()),
        Just("fn".to_string()),
        Just("do".to_string()),
        Just("+".to_string()),
        Just("first".to_string()),
        Just("nil".to_string()),
        Just(":k".to_string()),
        Just("\"s\"".to_string()),
        (-1000i64..1000).prop_map(|n| n.to_string()),
        (-100.0f64..100.0).prop_map(|f| format!("{:.3}", f)),
    ]
}

fn sexp_like_string() -> impl Strategy<Value = String> {
    prop::collection::vec(sexp_token(), 0..40).prop_map(|tokens| tokens.join(" "))
}

// =============================================================================
// READER
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn scanner_never_panics(source in "[\\x00-\\x7F]{0,300}") {
        let _ = Scanner::new(&source).scan_tokens();
    }

    #[test]
    fn parser_never_panics(source in sexp_like_string()) {
        let _ = parse(&source);
    }

    #[test]
    fn balanced_lists_parse(depth in 1usize..40) {
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        prop_assert_eq!(parse(&source).unwrap().len(), 1);
    }
}

// =============================================================================
// EVALUATOR
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn evaluation_never_panics(source in sexp_like_string()) {
        let interp = Interpreter::new().unwrap();
        let _ = interp.eval_str(&source);
    }

    #[test]
    fn addition_matches_host(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let interp = Interpreter::new().unwrap();
        let result = interp.eval_str(&format!("(+ {} {})", a, b)).unwrap();
        prop_assert_eq!(result, Value::Number((a + b) as f64));
    }

    #[test]
    fn multiplication_matches_host(a in -1000i64..1000, b in -1000i64..1000) {
        let interp = Interpreter::new().unwrap();
        let result = interp.eval_str(&format!("(* {} {})", a, b)).unwrap();
        prop_assert_eq!(result, Value::Number((a * b) as f64));
    }

    #[test]
    fn floored_mod_is_non_negative_for_positive_divisor(a in -10_000i64..10_000, b in 1i64..100) {
        let interp = Interpreter::new().unwrap();
        let result = interp.eval_str(&format!("(mod {} {})", a, b)).unwrap();
        prop_assert_eq!(result, Value::Number(a.rem_euclid(b) as f64));
    }

    #[test]
    fn comp_law(x in -500i64..500) {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(defn f [n] (* n 3)) (defn g [n] (- n 7))").unwrap();
        let composed = interp.eval_str(&format!("((comp f g) {})", x)).unwrap();
        let nested = interp.eval_str(&format!("(f (g {}))", x)).unwrap();
        prop_assert_eq!(composed, nested);
    }

    #[test]
    fn complement_law(x in -500i64..500) {
        let interp = Interpreter::new().unwrap();
        let negated = interp.eval_str(&format!("((complement even?) {})", x)).unwrap();
        let expected = interp.eval_str(&format!("(not (even? {}))", x)).unwrap();
        prop_assert_eq!(negated, expected);
    }

    #[test]
    fn bignumber_addition_is_exact(a in 0u32..10_000, b in 0u32..10_000) {
        let interp = Interpreter::new().unwrap();
        let result = interp.eval_str(&format!("(= (+ 0.{:04}N 0.{:04}N) (/ {}N 10000))", a, b, a + b)).unwrap();
        prop_assert_eq!(result, Value::Boolean(true));
    }
}
