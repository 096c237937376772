//! Worker threads: one OS thread bound to a subset of task priorities.

use crate::config::WorkerConfig;
use crate::context::WorkerContext;
use crate::error::Error;
use crate::scheduler::SchedulerInner;
use crate::sync::Semaphore;
use crate::task::{TaskHandle, TaskPriority, WorkerPriority};
use crate::thread::Thread;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// A pool worker awaiting assignments from the scheduler.
///
/// The wake semaphore is binary: however many times the scheduler signals an
/// idle worker, it wakes once and drains the tokens before scanning the
/// queues. The `assigned` slot is non-invalid only between the scheduler's
/// assign call and the worker's post-run reset.
pub struct Worker {
    id: i32,
    config: WorkerConfig,
    wake: Semaphore,
    running: AtomicBool,
    assigned: Mutex<TaskHandle>,
    thread: Mutex<Option<Thread>>,
    context: Box<dyn WorkerContext>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .field("priority_mask", &self.config.worker_priority)
            .finish()
    }
}

impl Worker {
    pub(crate) fn new(id: i32, config: WorkerConfig, context: Box<dyn WorkerContext>) -> Self {
        let name = if id < 0 {
            config.thread_attributes.name.clone()
        } else {
            format!("{}{}", config.thread_attributes.name, id)
        };
        Self {
            id,
            config,
            wake: Semaphore::new(name, 0, 1),
            running: AtomicBool::new(false),
            assigned: Mutex::new(TaskHandle::invalid()),
            thread: Mutex::new(None),
            context,
        }
    }

    /// Worker id; −1 for single-worker configurations.
    #[must_use]
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Thread name of this worker (the config template plus its id).
    #[must_use]
    pub fn name(&self) -> &str {
        self.wake.name()
    }

    /// The set of task priorities this worker services.
    #[must_use]
    pub fn priority_mask(&self) -> WorkerPriority {
        self.config.worker_priority
    }

    /// Returns `true` if this worker may execute tasks at `priority`.
    #[must_use]
    pub fn can_work_on(&self, priority: TaskPriority) -> bool {
        self.config.worker_priority.can_work_on(priority)
    }

    /// Returns `true` while the worker loop should keep going.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Releases one wake token.
    pub(crate) fn notify(&self) {
        self.wake.notify(1);
    }

    /// Non-blocking acquire of one wake token.
    pub(crate) fn try_wait(&self) -> bool {
        self.wake.try_wait()
    }

    /// Blocks on the wake semaphore.
    pub(crate) fn wait(&self) {
        self.wake.wait();
    }

    /// Stores the task this worker must execute next.
    pub(crate) fn assign(&self, handle: TaskHandle) {
        *self.assigned.lock().expect("worker assignment lock poisoned") = handle;
    }

    /// Clears and returns the assignment slot.
    fn take_assigned(&self) -> TaskHandle {
        std::mem::take(&mut *self.assigned.lock().expect("worker assignment lock poisoned"))
    }

    /// Flags the worker to stop and wakes it so it observes the flag.
    pub(crate) fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
        self.wake.notify(1);
    }

    /// Spawns the worker's OS thread.
    pub(crate) fn start(self: Arc<Self>, scheduler: Arc<SchedulerInner>) -> Result<(), Error> {
        self.running.store(true, Ordering::Release);

        let mut attributes = self.config.thread_attributes.clone();
        attributes.name = self.name().to_string();

        let worker = Arc::clone(&self);
        let thread = Thread::spawn(&attributes, move || run_loop(&worker, &scheduler))?;
        *self.thread.lock().expect("worker thread lock poisoned") = Some(thread);
        Ok(())
    }

    /// Joins the worker's OS thread, if it was started.
    pub(crate) fn join(&self) {
        let thread = self.thread.lock().expect("worker thread lock poisoned").take();
        if let Some(mut thread) = thread {
            thread.join();
        }
    }
}

/// The worker thread body: idle → await assignment → execute, until stopped.
fn run_loop(worker: &Arc<Worker>, scheduler: &Arc<SchedulerInner>) {
    debug!(worker = worker.id(), "worker loop started");
    worker.context.on_start();
    while worker.is_running() {
        worker.context.on_idle();
        scheduler.signal_available_worker(worker);
        worker.context.on_active();
        if !worker.is_running() {
            break;
        }
        let assigned = worker.take_assigned();
        if assigned.is_valid() {
            trace!(worker = worker.id(), task = %assigned.name(), "executing");
            worker.context.on_pre_execute(&assigned);
            assigned.execute();
            worker.context.on_post_execute(&assigned);
        }
    }
    worker.context.on_stop();
    debug!(worker = worker.id(), "worker loop stopped");
}
