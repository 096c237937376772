//! Shared, refcounted task references.

use crate::task::{Task, TaskId, TaskPriority};
use std::sync::Arc;
use std::time::Duration;

/// A shared reference to a task, possibly invalid.
///
/// Handles are cheap to clone and default to the invalid state. Operations
/// on an invalid handle are safe no-ops returning neutral values, so client
/// code can hold and pass handles without sprinkling validity checks.
#[derive(Clone, Default)]
pub struct TaskHandle {
    inner: Option<Arc<dyn Task>>,
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Some(task) => f
                .debug_struct("TaskHandle")
                .field("id", &task.core().id())
                .field("name", &task.core().name())
                .field("done", &task.core().is_done())
                .finish(),
            None => f.write_str("TaskHandle(invalid)"),
        }
    }
}

impl TaskHandle {
    /// An invalid handle referencing nothing.
    #[must_use]
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Wraps a task in a handle.
    #[must_use]
    pub fn from_task(task: Arc<dyn Task>) -> Self {
        Self { inner: Some(task) }
    }

    /// Returns `true` if the handle references a task.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    /// Borrow of the underlying task, if any.
    pub(crate) fn task(&self) -> Option<&Arc<dyn Task>> {
        self.inner.as_ref()
    }

    /// Id of the referenced task, [`TaskId::INVALID`] for invalid handles.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.inner
            .as_ref()
            .map_or(TaskId::INVALID, |task| task.core().id())
    }

    /// Name of the referenced task, empty for invalid handles.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.as_ref().map_or("", |task| task.core().name())
    }

    /// Declared (unresolved) priority; `Normal` for invalid handles.
    #[must_use]
    pub fn priority(&self) -> TaskPriority {
        self.inner
            .as_ref()
            .map_or(TaskPriority::Normal, |task| task.core().priority())
    }

    /// Claims the right to execute. Always `false` on invalid handles.
    pub fn try_grab(&self) -> bool {
        self.inner.as_ref().is_some_and(|task| task.core().try_grab())
    }

    /// Returns `true` once the task has been grabbed.
    #[must_use]
    pub fn is_grabbed(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|task| task.core().is_grabbed())
    }

    /// Returns `true` once the task has completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.as_ref().is_some_and(|task| task.core().is_done())
    }

    /// Runs the task on the current thread; the caller must have grabbed it.
    pub fn execute(&self) {
        if let Some(task) = &self.inner {
            Arc::clone(task).execute();
        }
    }

    /// Serial debug replay of the task.
    pub fn execute_single_threaded(&self) {
        if let Some(task) = &self.inner {
            Arc::clone(task).execute_single_threaded();
        }
    }

    /// Blocks until the task completes.
    pub fn wait(&self) {
        if let Some(task) = &self.inner {
            task.core().wait();
        }
    }

    /// Waits up to `timeout` for completion; `false` on timeout or on an
    /// invalid handle.
    #[must_use]
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|task| task.core().wait_for(timeout))
    }

    /// Waits for completion, stealing ungrabbed leaf work onto the calling
    /// thread.
    pub fn active_wait(&self) {
        if let Some(task) = &self.inner {
            Arc::clone(task).active_wait();
        }
    }

    /// Releases the reference, leaving the handle invalid.
    pub fn reset(&mut self) {
        self.inner = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskKind, TypedTaskHandle};

    fn leaf(name: &str) -> TypedTaskHandle<i32> {
        crate::task::LeafTask::build(
            name.to_string(),
            TaskPriority::Normal,
            TaskKind::Waitable,
            || 7,
        )
    }

    #[test]
    fn default_handle_is_invalid_and_inert() {
        let mut handle = TaskHandle::default();
        assert!(!handle.is_valid());
        assert_eq!(handle.id(), TaskId::INVALID);
        assert_eq!(handle.name(), "");
        assert!(!handle.try_grab());
        assert!(!handle.is_done());
        assert!(!handle.wait_for(Duration::ZERO));
        handle.execute();
        handle.wait();
        handle.reset();
    }

    #[test]
    fn clones_reference_the_same_task() {
        let typed = leaf("shared");
        let handle: TaskHandle = typed.handle();
        let copy = handle.clone();
        assert_eq!(handle.id(), copy.id());
        assert!(copy.try_grab());
        // The grab is visible through every clone.
        assert!(handle.is_grabbed());
    }

    #[test]
    fn reset_releases_the_reference() {
        let typed = leaf("reset");
        let mut handle = typed.handle();
        assert!(handle.is_valid());
        handle.reset();
        assert!(!handle.is_valid());
    }
}
