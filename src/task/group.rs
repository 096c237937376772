//! Plumbing shared by the composite task variants.

use crate::context::GroupContext;
use crate::scheduler::SchedulerHandle;
use crate::task::{Group, TaskCore, TaskHandle, TaskId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// State common to parallel and sequence groups: the owning scheduler, the
/// outstanding-children counter and the group context.
pub(crate) struct GroupCore {
    scheduler: SchedulerHandle,
    outstanding: AtomicUsize,
    context: Box<dyn GroupContext>,
}

impl GroupCore {
    pub(crate) fn new(scheduler: SchedulerHandle, context: Box<dyn GroupContext>) -> Self {
        Self {
            scheduler,
            outstanding: AtomicUsize::new(0),
            context,
        }
    }

    pub(crate) fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    pub(crate) fn context(&self) -> &dyn GroupContext {
        self.context.as_ref()
    }

    /// Validates and parents `child` on behalf of `parent`.
    ///
    /// Invalid handles are rejected silently; handles that already belong to
    /// a group are logged and skipped. On success the outstanding-children
    /// counter grows; the caller stores the child and then fires
    /// [`notify_added`](Self::notify_added).
    pub(crate) fn adopt(&self, parent: &Arc<dyn Group>, child: &TaskHandle) -> bool {
        let Some(task) = child.task() else {
            return false;
        };
        if !task.core().try_set_parent(Arc::clone(parent)) {
            warn!(
                child = %child.name(),
                "task already belongs to a group; not added"
            );
            return false;
        }
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Fires the adoption hooks on the group and the child, in that order.
    pub(crate) fn notify_added(&self, parent: &Arc<dyn Group>, child: &TaskHandle) {
        self.context.on_task_added(child);
        if let Some(task) = child.task() {
            let parent_handle = TaskHandle::from_task(Arc::clone(parent).into_task());
            task.on_added_to_group(&parent_handle);
        }
    }

    /// Records one child completion. Returns `true` on the 1→0 transition of
    /// the outstanding counter, i.e. exactly once per group.
    pub(crate) fn child_done(&self) -> bool {
        let previous = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "child completion underflow");
        previous == 1
    }

    /// Completes the group: publishes `done`, fires the post-execute hook,
    /// signals the completion event and notifies the group's own parent.
    pub(crate) fn complete(&self, core: &TaskCore) {
        core.mark_done();
        self.context.on_post_execute();
        core.signal_completion();
        core.notify_parent();
    }
}

/// A shared reference to a composite task.
///
/// Where [`TaskHandle`] exposes the common task surface, a `GroupHandle`
/// additionally allows adding children. It converts into a plain
/// [`TaskHandle`] for scheduling.
#[derive(Clone)]
pub struct GroupHandle {
    inner: Arc<dyn Group>,
}

impl std::fmt::Debug for GroupHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupHandle")
            .field("id", &self.inner.core().id())
            .field("name", &self.inner.core().name())
            .field("done", &self.inner.core().is_done())
            .finish()
    }
}

impl GroupHandle {
    pub(crate) fn new(inner: Arc<dyn Group>) -> Self {
        Self { inner }
    }

    /// Adds `child` to the group.
    ///
    /// Children must not be added concurrently from several threads, and
    /// adding after the group was scheduled is a race with dispatch.
    pub fn add_task(&self, child: impl Into<TaskHandle>) {
        Arc::clone(&self.inner).add_child(child.into());
    }

    /// An untyped handle to the group itself.
    #[must_use]
    pub fn handle(&self) -> TaskHandle {
        TaskHandle::from_task(Arc::clone(&self.inner).into_task())
    }

    /// Id of the group.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.inner.core().id()
    }

    /// Returns `true` once every child has completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.core().is_done()
    }

    /// Blocks until the group completes.
    pub fn wait(&self) {
        self.inner.core().wait();
    }

    /// Waits up to `timeout` for group completion.
    #[must_use]
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.inner.core().wait_for(timeout)
    }

    /// Waits for the group. Groups cannot be inline-executed safely, so this
    /// is equivalent to [`wait`](Self::wait).
    pub fn active_wait(&self) {
        Arc::clone(&self.inner).into_task().active_wait();
    }
}

impl From<GroupHandle> for TaskHandle {
    fn from(group: GroupHandle) -> Self {
        group.handle()
    }
}
