//! Binary events for cross-thread completion signaling.
//!
//! Two reset policies are provided:
//!
//! - [`ManualResetEvent`]: stays signaled until explicitly [`reset`].
//! - [`AutoResetEvent`]: clears itself when a single wait succeeds.
//!
//! Events carry a name used for diagnostics. The reset policy is encoded in
//! the type: `AutoResetEvent` has no `reset` method, so resetting an
//! auto-reset event is unrepresentable rather than a runtime error.
//!
//! [`reset`]: ManualResetEvent::reset

use std::sync::{Condvar, Mutex};
use tracing::trace;
use std::time::{Duration, Instant};

/// Shared state for both event flavors.
#[derive(Debug)]
struct EventInner {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl EventInner {
    fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn notify(&self) {
        let mut signaled = self.signaled.lock().expect("event lock poisoned");
        *signaled = true;
        drop(signaled);
        self.condvar.notify_all();
    }

    fn is_signaled(&self) -> bool {
        *self.signaled.lock().expect("event lock poisoned")
    }

    /// Blocks until signaled. Clears the flag on return when `consume` is set.
    fn wait(&self, consume: bool) {
        let mut signaled = self.signaled.lock().expect("event lock poisoned");
        while !*signaled {
            signaled = self.condvar.wait(signaled).expect("event lock poisoned");
        }
        if consume {
            *signaled = false;
        }
    }

    /// Waits until signaled or the timeout elapses. Returns `true` on signal.
    fn wait_for(&self, timeout: Duration, consume: bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock().expect("event lock poisoned");
        while !*signaled {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _timed_out) = self
                .condvar
                .wait_timeout(signaled, remaining)
                .expect("event lock poisoned");
            signaled = guard;
        }
        if consume {
            *signaled = false;
        }
        true
    }

    fn reset(&self) {
        *self.signaled.lock().expect("event lock poisoned") = false;
    }
}

/// An event that remains signaled until explicitly reset.
///
/// All threads blocked in [`wait`](Self::wait) are released when the event is
/// notified, and late waiters return immediately until [`reset`](Self::reset)
/// clears the signal.
#[derive(Debug)]
pub struct ManualResetEvent {
    name: String,
    inner: EventInner,
}

impl ManualResetEvent {
    /// Creates a new unsignaled event with the given diagnostic name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: EventInner::new(),
        }
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the event to signaled, releasing all current and future waiters.
    pub fn notify(&self) {
        trace!(event = %self.name, "notify");
        self.inner.notify();
    }

    /// Returns `true` if the event is currently signaled.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        self.inner.is_signaled()
    }

    /// Blocks the calling thread until the event is signaled.
    pub fn wait(&self) {
        self.inner.wait(false);
    }

    /// Waits until the event is signaled or `timeout` elapses.
    ///
    /// Returns `true` if the event was signaled, `false` on timeout.
    #[must_use]
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.inner.wait_for(timeout, false)
    }

    /// Clears the signal; subsequent waiters block until the next notify.
    pub fn reset(&self) {
        trace!(event = %self.name, "reset");
        self.inner.reset();
    }
}

/// An event that clears itself when a single wait succeeds.
///
/// Exactly one waiter observes each notification; there is no `reset`.
#[derive(Debug)]
pub struct AutoResetEvent {
    name: String,
    inner: EventInner,
}

impl AutoResetEvent {
    /// Creates a new unsignaled event with the given diagnostic name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: EventInner::new(),
        }
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the event to signaled, releasing at most one waiter.
    pub fn notify(&self) {
        trace!(event = %self.name, "notify");
        self.inner.notify();
    }

    /// Blocks until signaled, atomically clearing the signal on return.
    pub fn wait(&self) {
        self.inner.wait(true);
    }

    /// Waits until signaled or `timeout` elapses, clearing the signal when
    /// the wait succeeds. Returns `true` if the event was signaled.
    #[must_use]
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.inner.wait_for(timeout, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::Arc;
    use std::thread;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn manual_event_stays_signaled() {
        init_test("manual_event_stays_signaled");
        let event = ManualResetEvent::new("test-manual");
        event.notify();
        assert!(event.is_signaled());

        // Several waits in a row all pass through.
        event.wait();
        event.wait();
        assert!(event.wait_for(Duration::from_millis(1)));
        crate::test_complete!("manual_event_stays_signaled");
    }

    #[test]
    fn manual_event_reset_clears_signal() {
        init_test("manual_event_reset_clears_signal");
        let event = ManualResetEvent::new("test-reset");
        event.notify();
        event.reset();
        assert!(!event.is_signaled());
        assert!(!event.wait_for(Duration::from_millis(10)));
        crate::test_complete!("manual_event_reset_clears_signal");
    }

    #[test]
    fn auto_event_clears_on_wait() {
        init_test("auto_event_clears_on_wait");
        let event = AutoResetEvent::new("test-auto");
        event.notify();
        event.wait();
        // The first wait consumed the signal.
        assert!(!event.wait_for(Duration::from_millis(10)));
        crate::test_complete!("auto_event_clears_on_wait");
    }

    #[test]
    fn wait_for_times_out_when_unsignaled() {
        init_test("wait_for_times_out_when_unsignaled");
        let event = ManualResetEvent::new("test-timeout");
        let start = Instant::now();
        assert!(!event.wait_for(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        crate::test_complete!("wait_for_times_out_when_unsignaled");
    }

    #[test]
    fn notify_releases_blocked_waiter() {
        init_test("notify_releases_blocked_waiter");
        let event = Arc::new(ManualResetEvent::new("test-cross-thread"));
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || event.wait())
        };
        thread::sleep(Duration::from_millis(10));
        event.notify();
        waiter.join().expect("waiter panicked");
        crate::test_complete!("notify_releases_blocked_waiter");
    }

    #[test]
    fn auto_event_wakes_one_waiter_per_notify() {
        init_test("auto_event_wakes_one_waiter_per_notify");
        let event = Arc::new(AutoResetEvent::new("test-single-wake"));
        let woken = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut waiters = Vec::new();
        for _ in 0..2 {
            let event = Arc::clone(&event);
            let woken = Arc::clone(&woken);
            waiters.push(thread::spawn(move || {
                if event.wait_for(Duration::from_millis(200)) {
                    woken.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            }));
        }

        thread::sleep(Duration::from_millis(20));
        event.notify();
        for waiter in waiters {
            waiter.join().expect("waiter panicked");
        }
        assert_eq!(woken.load(std::sync::atomic::Ordering::Relaxed), 1);
        crate::test_complete!("auto_event_wakes_one_waiter_per_notify");
    }
}
