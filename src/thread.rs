//! Named OS threads with affinity and priority control.
//!
//! [`Thread::spawn`] wraps `std::thread::Builder` and applies the requested
//! core-affinity mask and OS thread priority from inside the new thread
//! before the user body runs. Platform calls that fail are surfaced as fatal
//! logs with the underlying OS error code; there is no recovery path.
//!
//! Dropping a [`Thread`] that was neither joined nor detached aborts the
//! process. A silently detached worker thread is a correctness hazard for the
//! scheduler, so the wrapper refuses to let one leak.

use crate::config::ThreadAttributes;
use crate::error::Error;
use std::thread::JoinHandle;
use tracing::{debug, error};

/// OS thread priority levels, ordered lowest to highest.
///
/// On Unix these map to nice values (negative levels need elevated
/// privileges; failures are logged and the thread keeps the inherited
/// priority). On other platforms the setting is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ThreadPriority {
    /// Lowest scheduling priority.
    Lowest,
    /// Below the default priority.
    BelowNormal,
    /// The default priority for new threads.
    #[default]
    Normal,
    /// Above the default priority.
    AboveNormal,
    /// Highest regular priority.
    Highest,
    /// Time-critical priority; use sparingly.
    TimeCritical,
}

impl ThreadPriority {
    /// Nice value for this priority level.
    #[cfg(target_os = "linux")]
    fn nice_value(self) -> i32 {
        match self {
            Self::Lowest => 19,
            Self::BelowNormal => 10,
            Self::Normal => 0,
            Self::AboveNormal => -5,
            Self::Highest => -10,
            Self::TimeCritical => -20,
        }
    }
}

/// A core-affinity bitmask; bit `n` allows the thread to run on core `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreAffinity(pub u64);

impl CoreAffinity {
    /// Mask allowing every core.
    pub const ALL_CORES: Self = Self(u64::MAX);

    /// Mask pinning to a single core.
    #[must_use]
    pub fn single(core: u32) -> Self {
        Self(1 << core)
    }

    /// Returns `true` if the mask covers every core.
    #[must_use]
    pub fn is_all(self) -> bool {
        self == Self::ALL_CORES
    }
}

impl Default for CoreAffinity {
    fn default() -> Self {
        Self::ALL_CORES
    }
}

/// Number of logical cores available to this process.
#[must_use]
pub fn hardware_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// An owned OS thread that must be joined or detached before drop.
#[derive(Debug)]
pub struct Thread {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl Thread {
    /// Spawns a thread with the given attributes.
    ///
    /// The new thread sets its affinity and priority, then runs `f`. The
    /// thread name comes from `attributes.name`.
    pub fn spawn<F>(attributes: &ThreadAttributes, f: F) -> Result<Self, Error>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = attributes.name.clone();
        let affinity = attributes.core_affinity;
        let priority = attributes.priority;

        let mut builder = std::thread::Builder::new().name(name.clone());
        if attributes.stack_size > 0 {
            builder = builder.stack_size(attributes.stack_size);
        }

        let entry_name = name.clone();
        let handle = builder
            .spawn(move || {
                if let Err(err) = this_thread::set_affinity_mask(affinity) {
                    error!(thread = %entry_name, %err, "failed to set core affinity");
                }
                if let Err(err) = this_thread::set_priority(priority) {
                    error!(thread = %entry_name, %err, "failed to set thread priority");
                }
                debug!(thread = %entry_name, "thread started");
                f();
            })
            .map_err(|source| {
                error!(thread = %name, %source, "thread creation failed");
                Error::ThreadSpawn {
                    name: name.clone(),
                    source,
                }
            })?;

        Ok(Self {
            name,
            handle: Some(handle),
        })
    }

    /// Returns the thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the thread has not been joined or detached.
    #[must_use]
    pub fn is_joinable(&self) -> bool {
        self.handle.is_some()
    }

    /// OS-assigned id of the thread, while it is still joinable.
    #[must_use]
    pub fn id(&self) -> Option<std::thread::ThreadId> {
        self.handle.as_ref().map(|handle| handle.thread().id())
    }

    /// Blocks until the thread finishes.
    ///
    /// A panic on the target thread propagates to the joiner.
    pub fn join(&mut self) {
        match self.handle.take() {
            Some(handle) => {
                if let Err(payload) = handle.join() {
                    error!(thread = %self.name, "joined thread had panicked");
                    std::panic::resume_unwind(payload);
                }
            }
            None => {
                tracing::warn!(thread = %self.name, "join on a non-joinable thread");
            }
        }
    }

    /// Releases ownership; the thread keeps running unobserved.
    pub fn detach(&mut self) {
        if self.handle.take().is_none() {
            tracing::warn!(thread = %self.name, "detach on a non-joinable thread");
        }
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            error!(thread = %self.name, "thread dropped while joinable; aborting");
            std::process::abort();
        }
    }
}

/// Operations on the calling thread, mirroring the spawn-time attributes.
pub mod this_thread {
    use super::{CoreAffinity, ThreadPriority};
    use crate::error::Error;
    use std::time::Duration;

    /// Yields execution to another ready thread.
    pub fn yield_now() {
        std::thread::yield_now();
    }

    /// Sleeps for at least the given duration.
    pub fn sleep_for(duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Applies a core-affinity mask to the calling thread.
    ///
    /// A full mask is a no-op (the OS default). A single-bit mask pins to
    /// that core. Multi-core masks use the platform scheduler interface on
    /// Linux and are ignored with a warning elsewhere.
    pub fn set_affinity_mask(mask: CoreAffinity) -> Result<(), Error> {
        if mask.is_all() {
            return Ok(());
        }
        if mask.0.count_ones() == 1 {
            let core = mask.0.trailing_zeros() as usize;
            if core_affinity::set_for_current(core_affinity::CoreId { id: core }) {
                return Ok(());
            }
            return Err(Error::Platform {
                source: std::io::Error::other(format!("failed to pin to core {core}")),
            });
        }
        platform::set_affinity_mask(mask.0)
    }

    /// Applies an OS priority to the calling thread.
    pub fn set_priority(priority: ThreadPriority) -> Result<(), Error> {
        platform::set_priority(priority)
    }

    #[cfg(target_os = "linux")]
    mod platform {
        use super::{Error, ThreadPriority};
        use std::io;

        #[allow(unsafe_code)]
        pub(super) fn set_affinity_mask(mask: u64) -> Result<(), Error> {
            // SAFETY: cpu_set_t is a plain bitset; zeroed is its empty state.
            unsafe {
                let mut set: libc::cpu_set_t = std::mem::zeroed();
                libc::CPU_ZERO(&mut set);
                for core in 0..64 {
                    if mask & (1u64 << core) != 0 {
                        libc::CPU_SET(core as usize, &mut set);
                    }
                }
                if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) != 0 {
                    return Err(Error::Platform {
                        source: io::Error::last_os_error(),
                    });
                }
            }
            Ok(())
        }

        #[allow(unsafe_code)]
        pub(super) fn set_priority(priority: ThreadPriority) -> Result<(), Error> {
            let nice = priority.nice_value();
            // SAFETY: setpriority with PRIO_PROCESS and pid 0 targets the
            // calling thread under the Linux thread model.
            let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, nice) };
            if rc != 0 {
                return Err(Error::Platform {
                    source: io::Error::last_os_error(),
                });
            }
            Ok(())
        }
    }

    #[cfg(not(target_os = "linux"))]
    mod platform {
        use super::{Error, ThreadPriority};

        pub(super) fn set_affinity_mask(_mask: u64) -> Result<(), Error> {
            tracing::warn!("multi-core affinity masks are not supported on this platform");
            Ok(())
        }

        pub(super) fn set_priority(_priority: ThreadPriority) -> Result<(), Error> {
            tracing::warn!("thread priority is not supported on this platform");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThreadAttributes;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn hardware_concurrency_is_positive() {
        init_test("hardware_concurrency_is_positive");
        assert!(hardware_concurrency() >= 1);
        crate::test_complete!("hardware_concurrency_is_positive");
    }

    #[test]
    fn spawned_thread_runs_body_and_sees_name() {
        init_test("spawned_thread_runs_body_and_sees_name");
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let attributes = ThreadAttributes {
            name: "taskpool-test-thread".to_string(),
            ..ThreadAttributes::default()
        };
        let mut thread = Thread::spawn(&attributes, move || {
            let current = std::thread::current();
            assert_eq!(current.name(), Some("taskpool-test-thread"));
            ran_clone.store(true, Ordering::Release);
        })
        .expect("spawn failed");

        assert!(thread.is_joinable());
        assert!(thread.id().is_some());
        thread.join();
        assert!(!thread.is_joinable());
        assert!(thread.id().is_none());
        assert!(ran.load(Ordering::Acquire));
        crate::test_complete!("spawned_thread_runs_body_and_sees_name");
    }

    #[test]
    fn detach_consumes_handle() {
        init_test("detach_consumes_handle");
        let attributes = ThreadAttributes::default();
        let mut thread = Thread::spawn(&attributes, || {}).expect("spawn failed");
        thread.detach();
        assert!(!thread.is_joinable());
        crate::test_complete!("detach_consumes_handle");
    }

    #[test]
    fn single_core_affinity_applies() {
        init_test("single_core_affinity_applies");
        let attributes = ThreadAttributes {
            name: "taskpool-pinned".to_string(),
            core_affinity: CoreAffinity::single(0),
            ..ThreadAttributes::default()
        };
        // Pinning to core 0 should succeed on any machine with one core.
        let mut thread = Thread::spawn(&attributes, || {
            this_thread::sleep_for(Duration::from_millis(1));
        })
        .expect("spawn failed");
        thread.join();
        crate::test_complete!("single_core_affinity_applies");
    }
}
