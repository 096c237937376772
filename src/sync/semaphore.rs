//! Counting semaphore used for worker wake/sleep signaling.
//!
//! Unlike an async permit system, this is a plain blocking semaphore: tokens
//! are released with [`notify`](Semaphore::notify) and acquired with
//! [`wait`](Semaphore::wait) / [`try_wait`](Semaphore::try_wait). The count
//! saturates at the maximum given at construction, which makes a
//! `Semaphore::new(name, 0, 1)` a binary wake flag: redundant notifications
//! collapse into a single token.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::trace;

/// A blocking counting semaphore with a saturating maximum.
#[derive(Debug)]
pub struct Semaphore {
    name: String,
    count: Mutex<usize>,
    max_count: usize,
    condvar: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `initial` tokens, saturating at `max`.
    ///
    /// # Panics
    ///
    /// Panics if `max` is zero or `initial` exceeds `max`.
    #[must_use]
    pub fn new(name: impl Into<String>, initial: usize, max: usize) -> Self {
        assert!(max > 0, "semaphore max count must be at least 1");
        assert!(
            initial <= max,
            "semaphore initial count exceeds max ({initial} > {max})"
        );
        Self {
            name: name.into(),
            count: Mutex::new(initial),
            max_count: max,
            condvar: Condvar::new(),
        }
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the maximum token count.
    #[must_use]
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Returns the number of currently available tokens.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.count.lock().expect("semaphore lock poisoned")
    }

    /// Releases `n` tokens, saturating at the maximum.
    pub fn notify(&self, n: usize) {
        let mut count = self.count.lock().expect("semaphore lock poisoned");
        *count = (*count + n).min(self.max_count);
        trace!(semaphore = %self.name, count = *count, "notify");
        drop(count);
        if n == 1 {
            self.condvar.notify_one();
        } else {
            self.condvar.notify_all();
        }
    }

    /// Releases tokens up to the maximum, waking every waiter.
    pub fn notify_all(&self) {
        let mut count = self.count.lock().expect("semaphore lock poisoned");
        *count = self.max_count;
        drop(count);
        self.condvar.notify_all();
    }

    /// Acquires one token without blocking. Returns `true` on success.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock().expect("semaphore lock poisoned");
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Blocks until a token is available, then acquires it.
    pub fn wait(&self) {
        let mut count = self.count.lock().expect("semaphore lock poisoned");
        while *count == 0 {
            count = self.condvar.wait(count).expect("semaphore lock poisoned");
        }
        *count -= 1;
    }

    /// Waits up to `timeout` for a token. Returns `true` if one was acquired.
    #[must_use]
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock().expect("semaphore lock poisoned");
        while *count == 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _timed_out) = self
                .condvar
                .wait_timeout(count, remaining)
                .expect("semaphore lock poisoned");
            count = guard;
        }
        *count -= 1;
        true
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
    fn initial_count_is_available() {
        init_test("initial_count_is_available");
        let sem = Semaphore::new("test", 3, 8);
        assert_eq!(sem.available(), 3);
        assert_eq!(sem.max_count(), 8);
        crate::test_complete!("initial_count_is_available");
    }

    #[test]
    fn try_wait_consumes_tokens() {
        init_test("try_wait_consumes_tokens");
        let sem = Semaphore::new("test", 2, 4);
        assert!(sem.try_wait());
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
        crate::test_complete!("try_wait_consumes_tokens");
    }

    #[test]
    fn notify_saturates_at_max() {
        init_test("notify_saturates_at_max");
        let sem = Semaphore::new("test", 0, 2);
        sem.notify(10);
        assert_eq!(sem.available(), 2);
        sem.notify_all();
        assert_eq!(sem.available(), 2);
        crate::test_complete!("notify_saturates_at_max");
    }

    #[test]
    fn binary_semaphore_collapses_notifications() {
        init_test("binary_semaphore_collapses_notifications");
        let sem = Semaphore::new("test-wake", 0, 1);
        sem.notify(1);
        sem.notify(1);
        sem.notify(1);
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
        crate::test_complete!("binary_semaphore_collapses_notifications");
    }

    #[test]
    fn wait_for_times_out_without_tokens() {
        init_test("wait_for_times_out_without_tokens");
        let sem = Semaphore::new("test", 0, 1);
        let start = Instant::now();
        assert!(!sem.wait_for(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        crate::test_complete!("wait_for_times_out_without_tokens");
    }

    #[test]
    fn notify_releases_blocked_waiter() {
        init_test("notify_releases_blocked_waiter");
        let sem = Arc::new(Semaphore::new("test", 0, 1));
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.wait())
        };
        thread::sleep(Duration::from_millis(10));
        sem.notify(1);
        waiter.join().expect("waiter panicked");
        assert_eq!(sem.available(), 0);
        crate::test_complete!("notify_releases_blocked_waiter");
    }
}
