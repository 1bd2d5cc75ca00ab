//! go blocks, channels, wait groups and atoms across threads

use std::sync::Arc;
use std::thread;

use rulisp::{Error, Interpreter, Value};

fn eval_lisp(source: &str) -> Result<Value, Error> {
    Interpreter::new()?.eval_str(source)
}

#[test]
fn test_go_blocks_run_in_parallel_and_join() {
    let source = "
        (defn slow-square [x] (sleep 20) (* x x))
        (def futures (map (fn [x] (go (slow-square x))) [1 2 3 4]))
        (map go-wait futures)";
    assert_eq!(eval_lisp(source).unwrap().to_string(), "(1 4 9 16)");
}

#[test]
fn test_go_sees_enclosing_bindings() {
    let source = "
        (def base 100)
        (let [offset 5] (go-wait (go (+ base offset))))";
    assert_eq!(eval_lisp(source).unwrap(), Value::Number(105.0));
}

#[test]
fn test_go_definitions_land_in_the_calling_frame() {
    let source = "
        (def f (go (def from-go :visible) (defn helper [x] (* x 3))))
        (go-wait f)
        [from-go (helper 4)]";
    assert_eq!(eval_lisp(source).unwrap().to_string(), "[:visible 12]");

    // Inside a let, the go block writes to the let frame, not the globals
    let source = "
        (let [x 1]
          (go-wait (go (def x 2)))
          x)";
    assert_eq!(eval_lisp(source).unwrap(), Value::Number(2.0));
}

#[test]
fn test_producer_consumer() {
    let source = "
        (def jobs (chan 4))
        (def results (chan 16))
        (def wg (wait-group))
        (wg-add! wg 2)
        (defn work []
          (let [job (chan-recv! jobs)]
            (when (not (= job nil))
              (chan-send! results (* job 10))
              (work))))
        (dotimes [w 2]
          (go (work) (wg-done! wg)))
        (dotimes [i 6] (chan-send! jobs (+ i 1)))
        (chan-close! jobs)
        (wg-wait! wg)
        (chan-close! results)
        (def total (atom 0))
        (def r (chan-recv! results))
        (while (not (= r nil))
          (swap! total + r)
          (def r (chan-recv! results)))
        (deref total)";
    assert_eq!(eval_lisp(source).unwrap(), Value::Number(210.0));
}

#[test]
fn test_atom_updates_are_not_lost() {
    let source = "
        (def counter (atom 0))
        (def wg (wait-group))
        (wg-add! wg 8)
        (dotimes [i 8]
          (go (dotimes [j 50] (swap! counter inc)) (wg-done! wg)))
        (wg-wait! wg)
        (deref counter)";
    assert_eq!(eval_lisp(source).unwrap(), Value::Number(400.0));
}

#[test]
fn test_channel_state() {
    assert_eq!(
        eval_lisp("(def c (chan 2)) (chan-send! c 1) (chan-close! c) [(chan-closed? c) (chan-recv! c) (chan-recv! c)]")
            .unwrap()
            .to_string(),
        "[true 1 nil]"
    );
}

#[test]
fn test_interpreter_shared_between_threads() {
    let interp = Arc::new(Interpreter::new().unwrap());
    interp.eval_str("(def hits (atom 0)) (defn hit [] (swap! hits inc))").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let interp = Arc::clone(&interp);
            thread::spawn(move || {
                for _ in 0..25 {
                    interp.eval_str("(hit)").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(interp.eval_str("(deref hits)").unwrap(), Value::Number(100.0));
}
