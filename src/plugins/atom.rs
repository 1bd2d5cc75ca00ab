//! Atoms: the single mutable reference type

use crate::error::{Error, Result};
use crate::plugins::{eval_n, expect_min, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::{Atom, Value};

/// `atom deref reset! swap! atom?`
pub struct AtomPlugin;

impl Plugin for AtomPlugin {
    fn name(&self) -> &str {
        "atom"
    }

    fn description(&self) -> &str {
        "Mutable atoms shared between closures and threads"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        registry.define("atom", "atom", Arity::Fixed(1), "New atom holding the value", |ev, args, env| {
            let [value] = eval_n::<1>("atom", ev, args, env)?;
            Ok(Value::atom(value))
        })?;
        registry.define("deref", "atom", Arity::Fixed(1), "Current value of an atom", |ev, args, env| {
            let [value] = eval_n::<1>("deref", ev, args, env)?;
            let current = cell(&value)?.get();
            Ok(current)
        })?;
        registry.define("reset!", "atom", Arity::Fixed(2), "Set the atom's value; returns it", |ev, args, env| {
            let [atom, value] = eval_n::<2>("reset!", ev, args, env)?;
            cell(&atom)?.set(value.clone());
            Ok(value)
        })?;
        registry.define(
            "swap!",
            "atom",
            Arity::Variadic,
            "(swap! atom f args...) - set to (f current args...); returns the new value",
            |ev, args, env| {
                expect_min("swap!", args, 2)?;
                let mut values = ev.eval_all(args, env)?;
                let extra = values.split_off(2);
                let func = values.pop().unwrap_or(Value::Nil);
                let atom = values.pop().unwrap_or(Value::Nil);
                let slot = cell(&atom)?;

                // f runs unlocked; retry if another write landed meanwhile
                loop {
                    let (version, current) = slot.snapshot();
                    let mut call_args = Vec::with_capacity(extra.len() + 1);
                    call_args.push(current);
                    call_args.extend(extra.iter().cloned());
                    let next = ev.apply_values(&func, call_args, env)?;

                    if slot.compare_and_set(version, next.clone()) {
                        return Ok(next);
                    }
                }
            },
        )?;
        registry.define("atom?", "atom", Arity::Fixed(1), "True for atoms", |ev, args, env| {
            let [value] = eval_n::<1>("atom?", ev, args, env)?;
            Ok(Value::Boolean(matches!(value, Value::Atom(_))))
        })?;
        Ok(())
    }
}

fn cell(value: &Value) -> Result<&Atom> {
    match value {
        Value::Atom(cell) => Ok(cell.as_ref()),
        other => Err(Error::type_error("atom", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::eval_lisp;

    #[test]
    fn test_atom_lifecycle() {
        assert_eq!(
            eval_lisp("(def a (atom 1)) (swap! a + 10) (deref a)").unwrap(),
            Value::Number(11.0)
        );
        assert_eq!(
            eval_lisp("(def a (atom 1)) (reset! a :x)").unwrap(),
            Value::keyword("x")
        );
        assert_eq!(eval_lisp("(atom? (atom nil))").unwrap(), Value::Boolean(true));
        assert!(matches!(eval_lisp("(deref 1)"), Err(Error::TypeError { .. })));
    }

    #[test]
    fn test_swap_function_may_read_the_atom() {
        assert_eq!(
            eval_lisp("(def a (atom 2)) (swap! a (fn [x] (* x (deref a))))").unwrap(),
            Value::Number(4.0)
        );
    }

    #[test]
    fn test_swap_on_values_unequal_to_themselves() {
        let source = "
            (def big (* 1e308 10))
            (def a (atom (- big big)))
            (swap! a identity)
            (def b (atom [1 (- big big)]))
            (swap! b count)
            [(swap! a (constantly 1)) (deref b)]";
        assert_eq!(eval_lisp(source).unwrap().to_string(), "[1 2]");
    }

    #[test]
    fn test_atom_version_detects_intervening_write() {
        let atom = Atom::new(Value::Number(1.0));
        let (version, _) = atom.snapshot();
        atom.set(Value::Number(2.0));
        assert!(!atom.compare_and_set(version, Value::Number(3.0)));
        assert_eq!(atom.get(), Value::Number(2.0));
        let (version, _) = atom.snapshot();
        assert!(atom.compare_and_set(version, Value::Number(3.0)));
        assert_eq!(atom.get(), Value::Number(3.0));
    }

    #[test]
    fn test_shared_through_closures() {
        let source = "
            (def counter (atom 0))
            (defn bump [] (swap! counter inc))
            (bump) (bump) (bump)
            (deref counter)";
        assert_eq!(eval_lisp(source).unwrap(), Value::Number(3.0));
    }
}
