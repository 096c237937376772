//! Taskpool: a priority-aware task-scheduling runtime on OS threads.
//!
//! # Overview
//!
//! Client code expresses computation as a graph of tasks — standalone leaf
//! tasks, parallel groups (fan-out/fan-in), sequence groups (serial chains)
//! and data-parallel loops — and hands roots to a scheduler that dispatches
//! them to a pool of worker threads under priority and affinity constraints.
//!
//! # Core Guarantees
//!
//! - **Single execution**: every task is grabbed at most once; the grab is an
//!   atomic claim and the grabber runs the body exactly once
//! - **Completion propagation**: a group is done iff all its children are
//!   done, and its completion notification fires exactly once
//! - **Priority dispatch**: within a level FIFO, across levels strictly
//!   higher-before-lower, and no worker ever receives a priority outside its
//!   eligibility mask
//! - **Deadlock-resistant waiting**: `active_wait` steals ungrabbed leaf
//!   work onto the waiting thread instead of blocking on it
//!
//! # Module Structure
//!
//! - [`sync`]: events and the counting semaphore the workers sleep on
//! - [`thread`]: named OS threads with affinity and priority
//! - [`task`]: the task object model (leaf tasks, groups, handles, priorities)
//! - [`context`]: lifecycle augmentation hooks for tasks, groups and workers
//! - [`scheduler`]: worker pool, priority queues and the dispatch protocol
//! - [`parallel_for`]: partitioners and data-parallel loops
//! - [`helpers`]: convenience facade over a process-wide scheduler
//! - [`config`]: worker/thread configuration and environment overrides
//! - [`error`]: error types
//!
//! # Example
//!
//! ```no_run
//! use taskpool::{helpers, TaskPriority};
//!
//! helpers::start_default_scheduler().expect("scheduler start failed");
//!
//! let task = helpers::make_task("answer", TaskPriority::Normal, || 6 * 7);
//! helpers::schedule_task(task.handle());
//! assert_eq!(task.wait_for_result(), 42);
//!
//! helpers::stop_scheduler();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;
pub mod helpers;
pub mod parallel_for;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod test_utils;
pub mod thread;

// Re-exports for convenient access to core types
pub use config::{ThreadAttributes, WorkerConfig};
pub use error::{Error, Result};
pub use parallel_for::{Partitioner, SimplePartitioner};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use task::{
    GroupHandle, TaskHandle, TaskId, TaskKind, TaskPriority, TypedTaskHandle, WorkerPriority,
};
pub use thread::{CoreAffinity, ThreadPriority};
