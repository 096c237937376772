//! Leaf tasks: a single callable with lifecycle state and result storage.

use crate::context::{DefaultTaskContext, TaskContext};
use crate::task::{Task, TaskCore, TaskHandle, TaskId, TaskKind, TaskPriority};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// A single unit of work.
///
/// The body is a boxed `FnOnce` consumed by whoever wins the grab; its
/// return value lands in the result slot before `done` is published, so any
/// thread that observes completion may retrieve it.
pub struct LeafTask<R> {
    core: TaskCore,
    context: Box<dyn TaskContext>,
    body: Mutex<Option<Box<dyn FnOnce() -> R + Send>>>,
    result: Mutex<Option<R>>,
}

impl<R> std::fmt::Debug for LeafTask<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafTask").field("core", &self.core).finish()
    }
}

impl<R: Send + 'static> LeafTask<R> {
    /// Creates a leaf task with the default (no-op) context.
    #[must_use]
    pub fn build<F>(
        name: String,
        priority: TaskPriority,
        kind: TaskKind,
        body: F,
    ) -> TypedTaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
    {
        Self::build_with_context(name, priority, kind, Box::new(DefaultTaskContext), body)
    }

    /// Creates a leaf task with an explicit context.
    #[must_use]
    pub fn build_with_context<F>(
        name: String,
        priority: TaskPriority,
        kind: TaskKind,
        context: Box<dyn TaskContext>,
        body: F,
    ) -> TypedTaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
    {
        TypedTaskHandle {
            task: Arc::new(Self {
                core: TaskCore::new(name, priority, kind),
                context,
                body: Mutex::new(Some(Box::new(body))),
                result: Mutex::new(None),
            }),
        }
    }

    /// Consumes the body and runs it, publishing the result and `done`.
    fn run_body(&self) -> bool {
        let body = self
            .body
            .lock()
            .expect("task body lock poisoned")
            .take();
        let Some(body) = body else {
            warn!(task = %self.core.name(), "task body already consumed");
            return false;
        };
        let value = body();
        *self.result.lock().expect("task result lock poisoned") = Some(value);
        self.core.mark_done();
        true
    }
}

impl<R: Send + 'static> Task for LeafTask<R> {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn execute(self: Arc<Self>) {
        debug_assert!(
            self.core.is_grabbed(),
            "executing task '{}' without grabbing it",
            self.core.name()
        );
        self.context.on_pre_execute();
        if self.run_body() {
            self.context.on_post_execute();
            self.core.signal_completion();
            self.core.notify_parent();
        }
    }

    fn execute_single_threaded(self: Arc<Self>) {
        if !self.core.try_grab() {
            return;
        }
        self.context.on_pre_execute();
        if self.run_body() {
            self.context.on_post_execute();
        }
    }

    fn active_wait(self: Arc<Self>) {
        if self.core.try_grab() {
            self.execute();
        } else {
            self.core.wait();
        }
    }

    fn on_added_to_group(&self, parent: &TaskHandle) {
        self.context.on_added_to_group(parent);
    }
}

/// A typed handle to a [`LeafTask`], giving access to the stored result.
///
/// Converts into an untyped [`TaskHandle`] for scheduling and grouping.
pub struct TypedTaskHandle<R> {
    task: Arc<LeafTask<R>>,
}

impl<R> Clone for TypedTaskHandle<R> {
    fn clone(&self) -> Self {
        Self {
            task: Arc::clone(&self.task),
        }
    }
}

impl<R> std::fmt::Debug for TypedTaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedTaskHandle")
            .field("task", &self.task)
            .finish()
    }
}

impl<R: Send + 'static> TypedTaskHandle<R> {
    /// An untyped handle to the same task.
    #[must_use]
    pub fn handle(&self) -> TaskHandle {
        TaskHandle::from_task(Arc::clone(&self.task) as Arc<dyn Task>)
    }

    /// Id of the underlying task.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.task.core.id()
    }

    /// Returns `true` once the task has completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.task.core.is_done()
    }

    /// Blocks until the task completes.
    pub fn wait(&self) {
        self.task.core.wait();
    }

    /// Waits up to `timeout` for completion.
    #[must_use]
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.task.core.wait_for(timeout)
    }

    /// Waits for completion, stealing the work if it is still grabbable.
    pub fn active_wait(&self) {
        Arc::clone(&self.task).active_wait();
    }

    /// Takes the stored result.
    ///
    /// # Panics
    ///
    /// Panics if the task is not done or the result was already retrieved.
    #[must_use]
    pub fn get_result(&self) -> R {
        assert!(
            self.task.core.is_done(),
            "result of task '{}' requested before completion",
            self.task.core.name()
        );
        self.task
            .result
            .lock()
            .expect("task result lock poisoned")
            .take()
            .expect("task result already retrieved")
    }

    /// Waits for completion, then takes the result.
    #[must_use]
    pub fn wait_for_result(&self) -> R {
        self.wait();
        self.get_result()
    }
}

impl<R: Send + 'static> From<TypedTaskHandle<R>> for TaskHandle {
    fn from(typed: TypedTaskHandle<R>) -> Self {
        typed.handle()
    }
}
