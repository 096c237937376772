//! The task object model: leaf tasks, composite groups and shared handles.
//!
//! The set of task variants is closed — a leaf task, a parallel group or a
//! sequence group — and all of them implement [`Task`] behind an
//! `Arc<dyn Task>`. Groups additionally implement [`Group`], which is what a
//! completing child calls to drive its parent forward. Since a group is
//! itself a task, graphs nest arbitrarily.
//!
//! Lifecycle: a task is *created*, *grabbed* exactly once by whoever wins the
//! atomic claim, *executed* by the grabber, and finally marked *done*. Groups
//! have no explicit executing flag; their outstanding-children counter drives
//! the `done` transition.

mod base;
mod group;
mod handle;
mod leaf;
mod parallel;
mod priority;
mod sequence;

pub use base::TaskCore;
pub use group::GroupHandle;
pub use handle::TaskHandle;
pub use leaf::{LeafTask, TypedTaskHandle};
pub use parallel::ParallelGroup;
pub use priority::{TaskPriority, WorkerPriority};
pub use sequence::SequenceGroup;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide monotonic task id counter; 0 is reserved for invalid ids.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a task within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// The reserved invalid id.
    pub const INVALID: Self = Self(0);

    /// Allocates the next process-wide id.
    pub(crate) fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns `true` unless this is the reserved invalid id.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Whether a task's completion is observable.
///
/// Waitable tasks carry a completion event; fire-and-forget tasks carry
/// nothing and cannot be waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskKind {
    /// Completion can be awaited through the task's event.
    #[default]
    Waitable,
    /// Completion is not observable; waiting is a contract violation.
    FireAndForget,
}

/// Common interface of every schedulable unit.
pub trait Task: Send + Sync {
    /// Shared lifecycle state.
    fn core(&self) -> &TaskCore;

    /// Runs the task on the current thread.
    ///
    /// The caller must have won the grab. Leaf tasks run their body and
    /// complete; groups dispatch their children and complete asynchronously
    /// when the last child finishes.
    fn execute(self: Arc<Self>);

    /// Serial debug replay: grab if possible and run inline, without the
    /// completion signaling of the normal path.
    fn execute_single_threaded(self: Arc<Self>);

    /// Waits for completion, stealing the work onto the calling thread when
    /// the task has not been grabbed yet. Groups cannot be inline-executed
    /// safely and fall back to a plain wait.
    fn active_wait(self: Arc<Self>);

    /// Context hook relay: the task was adopted by `parent`.
    fn on_added_to_group(&self, parent: &TaskHandle);
}

/// Interface of composite tasks, called by children and by handle adapters.
pub trait Group: Task {
    /// Adds a child; see `GroupHandle::add_task` for the validation rules.
    fn add_child(self: Arc<Self>, child: TaskHandle);

    /// A child completed. Drives dispatch of further children and, on the
    /// last child, the group's own completion.
    fn one_task_done(self: Arc<Self>);

    /// Upcast to the plain task interface.
    fn into_task(self: Arc<Self>) -> Arc<dyn Task>;
}
