//! Lifecycle augmentation hooks for tasks, groups and workers.
//!
//! Each task, group and worker owns a context object whose hooks fire at
//! well-defined lifecycle points. The default contexts are zero-sized no-ops;
//! custom contexts capture whatever state they need at construction (an
//! owning pointer, a metrics sink, a profiler scope) and override only the
//! hooks they care about. To stack several policies, wrap one context in
//! another and forward.

use crate::task::TaskHandle;

/// Hooks observed by a leaf task.
pub trait TaskContext: Send + Sync {
    /// The task was adopted by `parent`.
    fn on_added_to_group(&self, _parent: &TaskHandle) {}
    /// The task body is about to run on the current thread.
    fn on_pre_execute(&self) {}
    /// The task body returned.
    fn on_post_execute(&self) {}
}

/// Hooks observed by a task group.
pub trait GroupContext: Send + Sync {
    /// The group itself was adopted by `parent`.
    fn on_added_to_group(&self, _parent: &TaskHandle) {}
    /// `child` was added to the group.
    fn on_task_added(&self, _child: &TaskHandle) {}
    /// The group is being dispatched.
    fn on_pre_execute(&self) {}
    /// The last child finished; the group is complete.
    fn on_post_execute(&self) {}
}

/// Hooks observed by a worker thread.
pub trait WorkerContext: Send + Sync {
    /// The worker thread started.
    fn on_start(&self) {}
    /// The worker thread is about to exit.
    fn on_stop(&self) {}
    /// The worker is about to wait for an assignment.
    fn on_idle(&self) {}
    /// The worker woke up with (or without) an assignment.
    fn on_active(&self) {}
    /// The worker is about to execute `task`.
    fn on_pre_execute(&self, _task: &TaskHandle) {}
    /// The worker finished executing `task`.
    fn on_post_execute(&self, _task: &TaskHandle) {}
}

/// No-op task context.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTaskContext;

impl TaskContext for DefaultTaskContext {}

/// No-op group context.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGroupContext;

impl GroupContext for DefaultGroupContext {}

/// No-op worker context.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultWorkerContext;

impl WorkerContext for DefaultWorkerContext {}
