//! Worker and thread configuration.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic** — values set on [`WorkerConfig`] / [`ThreadAttributes`]
//! 2. **Environment variables** — `TASKPOOL_*` overrides, consulted by the
//!    default-scheduler facade
//! 3. **Defaults** — [`WorkerConfig::default`] and friends
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `TASKPOOL_WORKERS` | `usize` | worker count of the default scheduler |

use crate::task::WorkerPriority;
use crate::thread::{CoreAffinity, ThreadPriority};
use tracing::warn;

/// Environment variable overriding the default scheduler's worker count.
pub const ENV_WORKERS: &str = "TASKPOOL_WORKERS";

/// Attributes applied to an OS thread at spawn time.
#[derive(Debug, Clone)]
pub struct ThreadAttributes {
    /// Thread name; workers append their id to this template.
    pub name: String,
    /// Stack size in bytes; 0 uses the platform default.
    pub stack_size: usize,
    /// Core-affinity mask for the thread.
    pub core_affinity: CoreAffinity,
    /// OS scheduling priority for the thread.
    pub priority: ThreadPriority,
}

impl Default for ThreadAttributes {
    fn default() -> Self {
        Self {
            name: "taskpool-thread".to_string(),
            stack_size: 0,
            core_affinity: CoreAffinity::ALL_CORES,
            priority: ThreadPriority::Normal,
        }
    }
}

/// Configuration for a batch of identical workers.
///
/// Passed to `Scheduler::register_worker`; the scheduler instantiates
/// `count` workers sharing these settings, each with a unique id.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Attributes for each worker's OS thread.
    pub thread_attributes: ThreadAttributes,
    /// Task priorities these workers are willing to execute.
    pub worker_priority: WorkerPriority,
    /// Number of workers to register with this configuration.
    pub count: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_attributes: ThreadAttributes::default(),
            worker_priority: WorkerPriority::ANY,
            count: 1,
        }
    }
}

/// Reads the worker-count override from the environment.
///
/// Returns `default` when the variable is unset. A set-but-unparseable or
/// zero value is ignored with a warning rather than failing startup.
#[must_use]
pub fn worker_count_from_env(default: usize) -> usize {
    match std::env::var(ENV_WORKERS) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(count) if count > 0 => count,
            Ok(_) => {
                warn!(var = ENV_WORKERS, value = %raw, "ignoring zero worker-count override");
                default
            }
            Err(_) => {
                warn!(var = ENV_WORKERS, value = %raw, "ignoring unparseable worker-count override");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{env_lock, init_test_logging};

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn default_worker_config_services_all_priorities() {
        init_test("default_worker_config_services_all_priorities");
        let config = WorkerConfig::default();
        assert_eq!(config.count, 1);
        assert_eq!(config.worker_priority, WorkerPriority::ANY);
        assert_eq!(config.thread_attributes.stack_size, 0);
        crate::test_complete!("default_worker_config_services_all_priorities");
    }

    #[test]
    fn env_override_parses_positive_count() {
        init_test("env_override_parses_positive_count");
        let _guard = env_lock();
        std::env::set_var(ENV_WORKERS, "6");
        assert_eq!(worker_count_from_env(2), 6);
        std::env::remove_var(ENV_WORKERS);
        crate::test_complete!("env_override_parses_positive_count");
    }

    #[test]
    fn env_override_rejects_garbage_and_zero() {
        init_test("env_override_rejects_garbage_and_zero");
        let _guard = env_lock();
        std::env::set_var(ENV_WORKERS, "not-a-number");
        assert_eq!(worker_count_from_env(3), 3);
        std::env::set_var(ENV_WORKERS, "0");
        assert_eq!(worker_count_from_env(3), 3);
        std::env::remove_var(ENV_WORKERS);
        crate::test_complete!("env_override_rejects_garbage_and_zero");
    }

    #[test]
    fn env_override_unset_uses_default() {
        init_test("env_override_unset_uses_default");
        let _guard = env_lock();
        std::env::remove_var(ENV_WORKERS);
        assert_eq!(worker_count_from_env(4), 4);
        crate::test_complete!("env_override_unset_uses_default");
    }
}
