//! Shared lifecycle state embedded in every task variant.

use crate::sync::ManualResetEvent;
use crate::task::{Group, TaskId, TaskKind, TaskPriority};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// Lifecycle state common to leaf tasks and groups.
///
/// The `grabbed` flag transitions false→true exactly once through
/// [`try_grab`](Self::try_grab); `done` transitions false→true exactly once,
/// with release semantics so that result storage written before it is
/// visible to any thread that observes `done == true`. The parent slot is
/// set once by group adoption and cleared when the task completes, breaking
/// the parent↔child reference cycle.
pub struct TaskCore {
    id: TaskId,
    name: String,
    priority: TaskPriority,
    kind: TaskKind,
    grabbed: AtomicBool,
    done: AtomicBool,
    completion: Option<ManualResetEvent>,
    parent: Mutex<Option<Arc<dyn Group>>>,
}

impl std::fmt::Debug for TaskCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("kind", &self.kind)
            .field("grabbed", &self.is_grabbed())
            .field("done", &self.is_done())
            .finish()
    }
}

impl TaskCore {
    /// Creates fresh state with a newly allocated id. Waitable tasks get a
    /// completion event named after the task.
    pub(crate) fn new(name: String, priority: TaskPriority, kind: TaskKind) -> Self {
        let completion = match kind {
            TaskKind::Waitable => Some(ManualResetEvent::new(name.clone())),
            TaskKind::FireAndForget => None,
        };
        Self {
            id: TaskId::next(),
            name,
            priority,
            kind,
            grabbed: AtomicBool::new(false),
            done: AtomicBool::new(false),
            completion,
            parent: Mutex::new(None),
        }
    }

    /// Unique id of this task.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Diagnostic name of this task.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared priority, possibly [`TaskPriority::Inherit`].
    #[must_use]
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Task kind tag.
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns `true` if completion is observable.
    #[must_use]
    pub fn is_waitable(&self) -> bool {
        self.kind == TaskKind::Waitable
    }

    /// Claims the right to execute. Succeeds exactly once per task.
    pub fn try_grab(&self) -> bool {
        self.grabbed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Returns `true` once someone has claimed execution.
    #[must_use]
    pub fn is_grabbed(&self) -> bool {
        self.grabbed.load(Ordering::Acquire)
    }

    /// Returns `true` once the task has completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Publishes completion. Must happen after the body's side effects.
    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Signals the completion event, if this task carries one.
    pub(crate) fn signal_completion(&self) {
        if let Some(event) = &self.completion {
            event.notify();
        }
    }

    /// Parents this task. Fails when a parent is already set.
    pub(crate) fn try_set_parent(&self, parent: Arc<dyn Group>) -> bool {
        let mut slot = self.parent.lock().expect("task parent lock poisoned");
        if slot.is_some() {
            return false;
        }
        *slot = Some(parent);
        true
    }

    /// Returns the current parent group, if any.
    pub(crate) fn parent(&self) -> Option<Arc<dyn Group>> {
        self.parent.lock().expect("task parent lock poisoned").clone()
    }

    /// Clears and returns the parent slot, breaking the reference cycle.
    pub(crate) fn take_parent(&self) -> Option<Arc<dyn Group>> {
        self.parent.lock().expect("task parent lock poisoned").take()
    }

    /// Blocks until the task completes.
    ///
    /// Waiting on a fire-and-forget task is a contract violation: it asserts
    /// in debug builds and is a logged no-op in release builds.
    pub fn wait(&self) {
        match &self.completion {
            Some(event) => event.wait(),
            None => {
                debug_assert!(false, "wait on fire-and-forget task '{}'", self.name);
                warn!(task = %self.name, "wait on a fire-and-forget task is a no-op");
            }
        }
    }

    /// Waits up to `timeout` for completion. Returns `true` when the task
    /// completed; the task keeps running after a timeout.
    #[must_use]
    pub fn wait_for(&self, timeout: Duration) -> bool {
        match &self.completion {
            Some(event) => event.wait_for(timeout),
            None => {
                debug_assert!(false, "wait_for on fire-and-forget task '{}'", self.name);
                warn!(task = %self.name, "wait_for on a fire-and-forget task is a no-op");
                false
            }
        }
    }

    /// Clears the parent slot and forwards completion to it.
    pub(crate) fn notify_parent(&self) {
        if let Some(parent) = self.take_parent() {
            parent.one_task_done();
        }
    }
}
