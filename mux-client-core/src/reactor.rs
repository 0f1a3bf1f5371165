//! The reactor/I/O engine contract (§6, consumed) and the cross-thread
//! signal that wakes it.
//!
//! The reactor's internal polling mechanism is out of scope for this
//! specification (§1); what the core depends on is the shape: a blocking
//! `run_for(tick)` call the reactor thread suspends inside, and a signal any
//! producer thread can use to end that suspension early once it has pushed
//! work onto the submission stack.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// A reactor I/O failure (§7: "reactor I/O errors are fatal and terminate
/// the process with a diagnostic"). Kernel-level faults underneath the
/// reactor's polling mechanism are not something this client can recover
/// from, so this type exists only to be logged on the way to
/// `std::process::abort()` in the reactor loop — it is never matched on or
/// recovered from.
#[derive(Debug)]
pub struct ReactorError(pub std::io::Error);

impl fmt::Display for ReactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reactor I/O error: {}", self.0)
    }
}

impl std::error::Error for ReactorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// A cross-thread wake-up primitive attached to a reactor's blocking wait.
///
/// `notify` is wait-free with respect to the reactor (§5): it never blocks,
/// it only ever takes a short-held mutex to flip a flag and wake a waiter.
#[derive(Clone)]
pub struct Signal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    /// Wake any thread currently inside [`Self::wait_timeout`], or arm the
    /// next call to return immediately if nothing is waiting yet.
    pub fn notify(&self) {
        let (lock, condvar) = &*self.inner;
        let mut pending = lock.lock().unwrap();
        *pending = true;
        condvar.notify_one();
    }

    /// Block for up to `timeout`, returning early if [`Self::notify`] is
    /// called. Consumes the pending notification so repeated calls without
    /// an intervening `notify` each wait the full timeout.
    pub fn wait_timeout(&self, timeout: Duration) {
        let (lock, condvar) = &*self.inner;
        let pending = lock.lock().unwrap();
        if *pending {
            // Already notified since the last wait; don't block at all.
            drop(pending);
            self.clear();
            return;
        }
        let (mut pending, _timeout_result) = condvar.wait_timeout(pending, timeout).unwrap();
        *pending = false;
    }

    fn clear(&self) {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap() = false;
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

/// The reactor/I/O engine capability the core is driven by.
///
/// `run_for` is called once per iteration of the reactor loop (§4.7) and is
/// expected to return after roughly `tick` has elapsed, or sooner if its
/// [`Signal`] was notified. An `Err` return is a kernel-level I/O fault in
/// the reactor's own polling mechanism (not a protocol or application
/// error) and is fatal: the reactor loop logs it and aborts the process
/// (§7).
pub trait Reactor {
    /// Block for up to `tick`.
    fn run_for(&mut self, tick: Duration) -> Result<(), ReactorError>;

    /// A clone of the signal this reactor's `run_for` suspends on.
    fn signal(&self) -> Signal;
}

/// Minimal reactor: suspends purely on its [`Signal`], with no I/O polling
/// of its own. Adequate here because the reactor's actual I/O engine is out
/// of scope for this specification (§1) — this default exists so the core
/// has something concrete to run against outside of tests.
pub struct IdleReactor {
    signal: Signal,
}

impl IdleReactor {
    pub fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }
}

impl Default for IdleReactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor for IdleReactor {
    fn run_for(&mut self, tick: Duration) -> Result<(), ReactorError> {
        self.signal.wait_timeout(tick);
        Ok(())
    }

    fn signal(&self) -> Signal {
        self.signal.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn notify_wakes_waiter_before_timeout() {
        let signal = Signal::new();
        let waiter = signal.clone();
        let handle = thread::spawn(move || {
            let start = std::time::Instant::now();
            waiter.wait_timeout(Duration::from_secs(5));
            start.elapsed()
        });
        thread::sleep(Duration::from_millis(20));
        signal.notify();
        let elapsed = handle.join().unwrap();
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn wait_without_notify_times_out() {
        let signal = Signal::new();
        let start = std::time::Instant::now();
        signal.wait_timeout(Duration::from_millis(30));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }
}
