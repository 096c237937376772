//! Convenience facade over a process-wide scheduler.
//!
//! The facade owns a lazily created global [`Scheduler`]. Clients that want
//! explicit ownership can ignore this module entirely and drive their own
//! scheduler instance; the semantics are identical.

use crate::config::{self, ThreadAttributes, WorkerConfig};
use crate::context::TaskContext;
use crate::error::Error;
use crate::parallel_for::{self, ForBody, Partitioner};
use crate::scheduler::{Scheduler, SchedulerHandle};
use crate::task::{
    GroupHandle, LeafTask, ParallelGroup, SequenceGroup, TaskHandle, TaskKind, TaskPriority,
    TypedTaskHandle,
};
use crate::thread::{self, ThreadPriority};
use std::ops::Range;
use std::sync::{Arc, OnceLock};

static GLOBAL_SCHEDULER: OnceLock<Scheduler> = OnceLock::new();

fn global() -> &'static Scheduler {
    GLOBAL_SCHEDULER.get_or_init(Scheduler::new)
}

/// A submission handle to the process-wide scheduler.
#[must_use]
pub fn scheduler() -> SchedulerHandle {
    global().handle()
}

/// Starts the global scheduler with the default worker configuration: one
/// worker per hardware thread at normal OS priority, full affinity mask,
/// servicing every task priority. The worker count honors the
/// `TASKPOOL_WORKERS` environment override.
///
/// # Panics
///
/// Panics if the global scheduler was already started.
pub fn start_default_scheduler() -> Result<(), Error> {
    let scheduler = global();
    let count = config::worker_count_from_env(thread::hardware_concurrency());
    scheduler.register_worker(WorkerConfig {
        thread_attributes: ThreadAttributes {
            name: "taskpool-worker-".to_string(),
            priority: ThreadPriority::Normal,
            ..ThreadAttributes::default()
        },
        worker_priority: crate::task::WorkerPriority::ANY,
        count,
    });
    scheduler.start()
}

/// Stops the global scheduler, joining all workers. Idempotent.
pub fn stop_scheduler() {
    global().stop();
}

/// Creates a waitable leaf task. The task is *not* scheduled.
#[must_use]
pub fn make_task<R, F>(name: &str, priority: TaskPriority, body: F) -> TypedTaskHandle<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    LeafTask::build(name.to_string(), priority, TaskKind::Waitable, body)
}

/// Creates a waitable leaf task with an explicit context. Not scheduled.
#[must_use]
pub fn make_task_with_context<R, F>(
    name: &str,
    priority: TaskPriority,
    context: Box<dyn TaskContext>,
    body: F,
) -> TypedTaskHandle<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    LeafTask::build_with_context(name.to_string(), priority, TaskKind::Waitable, context, body)
}

/// Creates a fire-and-forget leaf task. Not scheduled; completion is not
/// observable, so only the untyped handle is returned.
#[must_use]
pub fn make_task_item<F>(name: &str, priority: TaskPriority, body: F) -> TaskHandle
where
    F: FnOnce() + Send + 'static,
{
    LeafTask::build(name.to_string(), priority, TaskKind::FireAndForget, body).handle()
}

/// Schedules a task on the global scheduler and returns its handle.
pub fn schedule_task(handle: impl Into<TaskHandle>) -> TaskHandle {
    scheduler().add(handle)
}

/// Creates a fire-and-forget task and schedules it right away.
pub fn fire_and_forget_task<F>(name: &str, priority: TaskPriority, body: F)
where
    F: FnOnce() + Send + 'static,
{
    let _ = schedule_task(make_task_item(name, priority, body));
}

/// Creates a parallel group bound to the global scheduler. Not scheduled.
///
/// `reserve` pre-sizes the child collection; `max_simultaneous` of 0 means
/// unbounded fan-out.
#[must_use]
pub fn make_parallel_group(
    name: &str,
    kind: TaskKind,
    priority: TaskPriority,
    reserve: usize,
    max_simultaneous: usize,
) -> GroupHandle {
    ParallelGroup::build(&scheduler(), name, kind, priority, reserve, max_simultaneous)
}

/// Creates a sequence group bound to the global scheduler. Not scheduled.
#[must_use]
pub fn make_sequence_group(name: &str, kind: TaskKind, priority: TaskPriority) -> GroupHandle {
    SequenceGroup::build(&scheduler(), name, kind, priority)
}

/// Builds a waitable parallel group from `tasks` and schedules it.
pub fn fork_tasks(
    name: &str,
    priority: TaskPriority,
    tasks: impl IntoIterator<Item = TaskHandle>,
) -> TaskHandle {
    let tasks: Vec<TaskHandle> = tasks.into_iter().collect();
    let group = make_parallel_group(name, TaskKind::Waitable, priority, tasks.len(), 0);
    for task in tasks {
        group.add_task(task);
    }
    schedule_task(group)
}

/// Builds a waitable sequence group from `tasks`, in order, and schedules it.
pub fn sequence_tasks(
    name: &str,
    priority: TaskPriority,
    tasks: impl IntoIterator<Item = TaskHandle>,
) -> TaskHandle {
    let group = make_sequence_group(name, TaskKind::Waitable, priority);
    for task in tasks {
        group.add_task(task);
    }
    schedule_task(group)
}

/// Runs `body` for every index in `range` on the global scheduler, blocking
/// until all elements are processed. The range is split across as many
/// batches as there are workers eligible at `priority`.
pub fn parallel_for<M, F>(name: &str, range: Range<usize>, priority: TaskPriority, body: F)
where
    F: ForBody<M>,
{
    let handle = scheduler();
    let partitioner = parallel_for::default_partitioner(&handle, range.start, range.end, priority);
    parallel_for::parallel_for(&handle, name, partitioner, priority, body);
}

/// [`parallel_for`] with an explicit partitioner.
pub fn parallel_for_with_partitioner<P, M, F>(
    name: &str,
    partitioner: P,
    priority: TaskPriority,
    body: F,
) where
    P: Partitioner,
    F: ForBody<M>,
{
    parallel_for::parallel_for(&scheduler(), name, partitioner, priority, body);
}

/// Runs `body` over every element of a shared container on the global
/// scheduler, blocking until done.
pub fn parallel_for_each<T, F>(name: &str, items: Arc<Vec<T>>, priority: TaskPriority, body: F)
where
    T: Send + Sync + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    parallel_for::parallel_for_each(&scheduler(), name, items, priority, body);
}
