//! The scheduler: owns the workers and the priority queues, assigns tasks.
//!
//! Lifecycle is registering → running → stopped: workers are registered
//! before [`start`](Scheduler::start), which launches one OS thread per
//! worker; [`stop`](Scheduler::stop) flips the running flag, wakes every
//! worker and joins them. Tasks queued but not started when `stop` is called
//! are lost: residual handles stay in the queues and are dropped with the
//! scheduler.
//!
//! Ownership follows the pool/handle split: [`Scheduler`] owns the shared
//! state and stops it on drop, while the cloneable [`SchedulerHandle`] is
//! what groups and the facade hold to submit work.

mod queue;
mod worker;

pub use worker::Worker;

use crate::config::WorkerConfig;
use crate::context::{DefaultWorkerContext, WorkerContext};
use crate::error::Error;
use crate::task::{Task, TaskHandle, TaskPriority};
use queue::PriorityQueueSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Shared scheduler state; workers and handles keep it alive.
pub(crate) struct SchedulerInner {
    queues: PriorityQueueSet,
    workers: Mutex<Vec<Arc<Worker>>>,
    workers_per_priority: Mutex<[usize; TaskPriority::COUNT]>,
    running: AtomicBool,
}

impl SchedulerInner {
    fn new() -> Self {
        Self {
            queues: PriorityQueueSet::new(),
            workers: Mutex::new(Vec::new()),
            workers_per_priority: Mutex::new([0; TaskPriority::COUNT]),
            running: AtomicBool::new(false),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn register_worker_with_context<F>(&self, config: WorkerConfig, mut context_for: F)
    where
        F: FnMut(i32) -> Box<dyn WorkerContext>,
    {
        assert!(
            !self.is_running(),
            "workers must be registered before the scheduler starts"
        );
        let mut workers = self.workers.lock().expect("scheduler workers lock poisoned");
        let base = workers.len() as i32;
        for offset in 0..config.count {
            // A lone worker keeps the bare thread-name template.
            let id = if config.count == 1 {
                -1
            } else {
                base + offset as i32
            };
            workers.push(Arc::new(Worker::new(id, config.clone(), context_for(id))));
        }
        drop(workers);

        let mut table = self
            .workers_per_priority
            .lock()
            .expect("scheduler worker table lock poisoned");
        for level in config.worker_priority.levels() {
            table[level.queue_index()] += config.count;
        }
    }

    fn workers_count(&self, priority: TaskPriority) -> usize {
        self.workers_per_priority
            .lock()
            .expect("scheduler worker table lock poisoned")[priority.queue_index()]
    }

    fn start(self: Arc<Self>) -> Result<(), Error> {
        assert!(!self.is_running(), "scheduler already started");
        {
            let table = self
                .workers_per_priority
                .lock()
                .expect("scheduler worker table lock poisoned");
            for level in TaskPriority::DISPATCH_ORDER {
                assert!(
                    table[level.queue_index()] > 0,
                    "no worker registered for priority {level:?}; \
                     submissions at this level would never be serviced"
                );
            }
        }
        self.running.store(true, Ordering::Release);

        let workers = self
            .workers
            .lock()
            .expect("scheduler workers lock poisoned")
            .clone();
        debug!(count = workers.len(), "starting scheduler workers");
        for worker in workers {
            worker.start(Arc::clone(&self))?;
        }
        Ok(())
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let workers = self
            .workers
            .lock()
            .expect("scheduler workers lock poisoned")
            .clone();
        debug!(count = workers.len(), "stopping scheduler workers");
        for worker in &workers {
            worker.request_stop();
        }
        for worker in &workers {
            worker.notify();
        }
        for worker in &workers {
            worker.join();
        }
    }

    fn add(&self, handle: TaskHandle) -> TaskHandle {
        let Some(task) = handle.task() else {
            return handle;
        };
        if task.core().is_grabbed() || task.core().is_done() {
            return handle;
        }

        let priority = resolve_priority(task);
        trace!(task = %handle.name(), id = ?handle.id(), ?priority, "enqueue");
        self.queues.push(priority, handle.clone());

        let workers = self.workers.lock().expect("scheduler workers lock poisoned");
        for worker in workers.iter() {
            if worker.can_work_on(priority) {
                worker.notify();
            }
        }
        handle
    }

    /// The worker availability protocol. Called by an idle worker; returns
    /// once a task has been assigned to it or the scheduler is stopping.
    pub(crate) fn signal_available_worker(&self, worker: &Arc<Worker>) {
        loop {
            // Collapse spurious wakeups before scanning.
            while worker.try_wait() {}
            if !self.is_running() || !worker.is_running() {
                return;
            }

            while let Some(handle) = self.queues.pop_masked(worker.priority_mask()) {
                // A handle may lose its grab to an active waiter, and a group
                // can complete without ever being grabbed; both are discarded.
                if handle.try_grab() && !handle.is_done() {
                    trace!(worker = worker.id(), task = %handle.name(), "assign");
                    worker.assign(handle);
                    return;
                }
            }

            worker.wait();
            if !worker.is_running() {
                return;
            }
        }
    }
}

/// Resolves `Inherit` by walking the parent chain at enqueue time; a chain
/// that reaches the root without a concrete priority defaults to `Normal`.
fn resolve_priority(task: &Arc<dyn Task>) -> TaskPriority {
    let mut priority = task.core().priority();
    let mut parent = task.core().parent();
    while priority == TaskPriority::Inherit {
        match parent {
            Some(group) => {
                priority = group.core().priority();
                parent = group.core().parent();
            }
            None => return TaskPriority::Normal,
        }
    }
    priority
}

/// The owning scheduler. Stops and joins its workers on drop.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.inner.is_running())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates a stopped scheduler with no workers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SchedulerInner::new()),
        }
    }

    /// A cloneable submission handle to this scheduler.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Registers `config.count` workers with the default (no-op) context.
    ///
    /// # Panics
    ///
    /// Panics if the scheduler has already been started.
    pub fn register_worker(&self, config: WorkerConfig) {
        self.inner
            .register_worker_with_context(config, |_| Box::new(DefaultWorkerContext));
    }

    /// Registers workers with per-worker contexts built by `context_for`.
    pub fn register_worker_with_context<F>(&self, config: WorkerConfig, context_for: F)
    where
        F: FnMut(i32) -> Box<dyn WorkerContext>,
    {
        self.inner.register_worker_with_context(config, context_for);
    }

    /// Number of registered workers eligible for `priority`.
    #[must_use]
    pub fn workers_count(&self, priority: TaskPriority) -> usize {
        self.inner.workers_count(priority)
    }

    /// Launches every registered worker.
    ///
    /// # Panics
    ///
    /// Panics on a second `start`, or when some priority level has no
    /// eligible worker — such a level would deadlock submissions.
    pub fn start(&self) -> Result<(), Error> {
        Arc::clone(&self.inner).start()
    }

    /// Stops and joins every worker. Safe to call more than once; in-flight
    /// tasks finish, queued-but-unstarted tasks are lost.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Returns `true` between `start` and `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Schedules a task; see [`SchedulerHandle::add`].
    pub fn add(&self, handle: impl Into<TaskHandle>) -> TaskHandle {
        self.inner.add(handle.into())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

/// A cloneable submission handle; groups and the facade hold one.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("running", &self.inner.is_running())
            .finish()
    }
}

impl SchedulerHandle {
    /// Schedules a task and returns its handle.
    ///
    /// Invalid, already-grabbed and already-done handles are returned
    /// unchanged without being enqueued. Otherwise the task's priority is
    /// resolved, the handle is pushed to the matching queue, and every
    /// eligible worker is signaled. Once `add` returns, the task is
    /// enqueued and workers have been woken (modulo their wake latency).
    pub fn add(&self, handle: impl Into<TaskHandle>) -> TaskHandle {
        self.inner.add(handle.into())
    }

    /// Number of registered workers eligible for `priority`.
    #[must_use]
    pub fn workers_count(&self, priority: TaskPriority) -> usize {
        self.inner.workers_count(priority)
    }

    /// Returns `true` between `start` and `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }
}
