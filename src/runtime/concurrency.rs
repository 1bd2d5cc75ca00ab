//! Concurrency primitives behind the `go`/`chan` builtins
//!
//! - **Futures**: the handle returned by `go`; work runs on its own OS thread
//!   and the outcome is cached so it can be awaited any number of times
//! - **Channels**: blocking FIFO queues with an optional buffer; capacity 0
//!   makes every send wait for a matching receive
//! - **Wait groups**: counters that block waiters until they drop to zero
//!
//! All primitives use `parking_lot` locks, so none of them can be poisoned.
//!
//! ```lisp
//! (def c (chan 1))
//! (def f (go (chan-send! c 42) :sent))
//! (chan-recv! c)   ; => 42
//! (go-wait f)      ; => :sent
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::runtime::Value;

// =============================================================================
// Futures
// =============================================================================

/// Handle to a computation running on a background thread
pub struct Future {
    id: String,
    outcome: Mutex<Option<Result<Value>>>,
    finished: Condvar,
}

impl Future {
    /// Start `work` on a new named thread
    ///
    /// A panic inside `work` is caught and stored as a `ThreadError`, so
    /// waiting on the future reports it instead of tearing down the process.
    pub fn spawn<F>(work: F) -> Result<Arc<Future>>
    where
        F: FnOnce() -> Result<Value> + Send + 'static,
    {
        let id = uuid::Uuid::new_v4().to_string();
        let future = Arc::new(Future {
            id: id.clone(),
            outcome: Mutex::new(None),
            finished: Condvar::new(),
        });

        let worker = Arc::clone(&future);
        thread::Builder::new()
            .name(format!("rulisp-go-{}", &id[..8]))
            .spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    tracing::debug!(future = %worker.id, %message, "recovered panic in go block");
                    Err(Error::ThreadError { message })
                });
                worker.complete(outcome);
            })
            .map_err(|e| Error::ThreadError {
                message: format!("failed to spawn thread: {}", e),
            })?;

        Ok(future)
    }

    fn complete(&self, outcome: Result<Value>) {
        *self.outcome.lock() = Some(outcome);
        self.finished.notify_all();
    }

    /// Unique identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the work has finished (never blocks)
    pub fn is_done(&self) -> bool {
        self.outcome.lock().is_some()
    }

    /// Block until the work finishes and return its outcome
    pub fn wait(&self) -> Result<Value> {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            self.finished.wait(&mut outcome);
        }
    }

    /// Like [`Future::wait`], giving up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Value>> {
        let deadline = Instant::now() + timeout;
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(result) = outcome.as_ref() {
                return Some(result.clone());
            }
            if self.finished.wait_until(&mut outcome, deadline).timed_out() {
                return outcome.as_ref().cloned();
            }
        }
    }
}

impl std::fmt::Debug for Future {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Future")
            .field("id", &self.id)
            .field("done", &self.is_done())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic in background evaluation".to_string()
    }
}

// =============================================================================
// Channels
// =============================================================================

/// Blocking FIFO channel
pub struct Channel {
    capacity: usize,
    state: Mutex<ChannelState>,
    changed: Condvar,
}

#[derive(Default)]
struct ChannelState {
    queue: VecDeque<Value>,
    closed: bool,
    /// Values taken by receivers so far; rendezvous senders wait on it
    received: u64,
    /// Values handed over by senders so far
    sent: u64,
}

impl Channel {
    /// Creates a channel; capacity 0 is unbuffered
    pub fn new(capacity: usize) -> Self {
        Channel {
            capacity,
            state: Mutex::new(ChannelState::default()),
            changed: Condvar::new(),
        }
    }

    /// Buffer size (0 for unbuffered)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values waiting to be received
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Whether no value is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send a value, blocking while the buffer is full
    ///
    /// On an unbuffered channel this returns once a receiver has taken the
    /// value, or once the channel is closed.
    pub fn send(&self, value: Value) -> Result<()> {
        let slots = self.capacity.max(1);
        let mut state = self.state.lock();
        while !state.closed && state.queue.len() >= slots {
            self.changed.wait(&mut state);
        }
        if state.closed {
            return Err(Error::ChannelClosed);
        }

        state.queue.push_back(value);
        state.sent += 1;
        let ticket = state.sent;
        self.changed.notify_all();

        if self.capacity == 0 {
            while !state.closed && state.received < ticket {
                self.changed.wait(&mut state);
            }
        }
        Ok(())
    }

    /// Receive a value, blocking until one is available
    ///
    /// Returns `nil` once the channel is closed and drained. With a timeout,
    /// `None` means it expired first.
    pub fn recv(&self, timeout: Option<Duration>) -> Option<Value> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        loop {
            if let Some(value) = state.queue.pop_front() {
                state.received += 1;
                self.changed.notify_all();
                return Some(value);
            }
            if state.closed {
                return Some(Value::Nil);
            }
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut state, deadline).timed_out()
                        && state.queue.is_empty()
                        && !state.closed
                    {
                        return None;
                    }
                }
                None => self.changed.wait(&mut state),
            }
        }
    }

    /// Receive without blocking; `nil` when nothing is waiting
    pub fn try_recv(&self) -> Value {
        let mut state = self.state.lock();
        match state.queue.pop_front() {
            Some(value) => {
                state.received += 1;
                self.changed.notify_all();
                value
            }
            None => Value::Nil,
        }
    }

    /// Close the channel; closing twice is a no-op
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            self.changed.notify_all();
        }
    }

    /// Whether the channel has been closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Channel")
            .field("capacity", &self.capacity)
            .field("queued", &state.queue.len())
            .field("closed", &state.closed)
            .finish()
    }
}

// =============================================================================
// Wait groups
// =============================================================================

/// Counter that releases waiters when it reaches zero
#[derive(Default)]
pub struct WaitGroup {
    count: Mutex<i64>,
    zero: Condvar,
}

impl WaitGroup {
    /// Creates a wait group with a zero counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the counter by `delta`
    pub fn add(&self, delta: i64) -> Result<()> {
        let mut count = self.count.lock();
        let next = *count + delta;
        if next < 0 {
            return Err(Error::runtime("wait group counter went negative"));
        }
        *count = next;
        if next == 0 {
            self.zero.notify_all();
        }
        Ok(())
    }

    /// Decrement the counter by one
    pub fn done(&self) -> Result<()> {
        self.add(-1)
    }

    /// Current counter value
    pub fn count(&self) -> i64 {
        *self.count.lock()
    }

    /// Block until the counter is zero
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.zero.wait(&mut count);
        }
    }
}

impl std::fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("WaitGroup").field("count", &self.count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_future_returns_result() {
        let future = Future::spawn(|| Ok(Value::Number(6.0))).unwrap();
        assert_eq!(future.wait().unwrap(), Value::Number(6.0));
        // Cached after the first wait
        assert_eq!(future.wait().unwrap(), Value::Number(6.0));
        assert!(future.is_done());
    }

    #[test]
    fn test_future_recovers_panic() {
        let future = Future::spawn(|| panic!("boom")).unwrap();
        match future.wait() {
            Err(Error::ThreadError { message }) => assert_eq!(message, "boom"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_future_timeout() {
        let gate = Arc::new(Channel::new(0));
        let inner = Arc::clone(&gate);
        let future = Future::spawn(move || Ok(inner.recv(None).unwrap_or(Value::Nil))).unwrap();
        assert!(future.wait_timeout(Duration::from_millis(20)).is_none());
        gate.send(Value::Boolean(true)).unwrap();
        assert_eq!(future.wait().unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_buffered_channel() {
        let ch = Channel::new(2);
        ch.send(Value::Number(1.0)).unwrap();
        ch.send(Value::Number(2.0)).unwrap();
        assert_eq!(ch.len(), 2);
        assert_eq!(ch.recv(None), Some(Value::Number(1.0)));
        assert_eq!(ch.try_recv(), Value::Number(2.0));
        assert_eq!(ch.try_recv(), Value::Nil);
    }

    #[test]
    fn test_closed_channel() {
        let ch = Channel::new(1);
        ch.send(Value::string("last")).unwrap();
        ch.close();
        ch.close();
        assert!(ch.is_closed());
        assert!(matches!(ch.send(Value::Nil), Err(Error::ChannelClosed)));
        // Drains before reporting nil
        assert_eq!(ch.recv(None), Some(Value::string("last")));
        assert_eq!(ch.recv(None), Some(Value::Nil));
    }

    #[test]
    fn test_recv_timeout() {
        let ch = Channel::new(1);
        assert_eq!(ch.recv(Some(Duration::from_millis(10))), None);
    }

    #[test]
    fn test_rendezvous_channel() {
        let ch = Arc::new(Channel::new(0));
        let producer = Arc::clone(&ch);
        let future = Future::spawn(move || {
            for i in 0..3 {
                producer.send(Value::Number(i as f64))?;
            }
            Ok(Value::Nil)
        })
        .unwrap();

        let received: Vec<Value> = (0..3).filter_map(|_| ch.recv(None)).collect();
        assert_eq!(
            received,
            vec![Value::Number(0.0), Value::Number(1.0), Value::Number(2.0)]
        );
        future.wait().unwrap();
    }

    #[test]
    fn test_wait_group() {
        let wg = Arc::new(WaitGroup::new());
        wg.add(3).unwrap();
        let futures: Vec<_> = (0..3)
            .map(|_| {
                let wg = Arc::clone(&wg);
                Future::spawn(move || {
                    wg.done()?;
                    Ok(Value::Nil)
                })
                .unwrap()
            })
            .collect();
        wg.wait();
        assert_eq!(wg.count(), 0);
        for f in futures {
            f.wait().unwrap();
        }
        assert!(wg.done().is_err());
    }
}
