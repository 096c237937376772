//! Sequence groups: a strictly ordered chain of children.

use crate::context::{DefaultGroupContext, GroupContext};
use crate::scheduler::SchedulerHandle;
use crate::task::group::{GroupCore, GroupHandle};
use crate::task::{Group, Task, TaskCore, TaskHandle, TaskKind, TaskPriority};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// A group whose children run one after another, in insertion order.
///
/// Only the head of the FIFO is ever in flight: dispatch runs the head
/// inline, and each completion pushes the next head to the scheduler. Child
/// k+1 therefore cannot start before child k is done.
pub struct SequenceGroup {
    core: TaskCore,
    group: GroupCore,
    children: Mutex<VecDeque<TaskHandle>>,
}

impl std::fmt::Debug for SequenceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceGroup")
            .field("core", &self.core)
            .finish()
    }
}

impl SequenceGroup {
    /// Creates a sequence group with the default (no-op) context.
    #[must_use]
    pub fn build(
        scheduler: &SchedulerHandle,
        name: impl Into<String>,
        kind: TaskKind,
        priority: TaskPriority,
    ) -> GroupHandle {
        Self::build_with_context(scheduler, name, kind, priority, Box::new(DefaultGroupContext))
    }

    /// Creates a sequence group with an explicit context.
    #[must_use]
    pub fn build_with_context(
        scheduler: &SchedulerHandle,
        name: impl Into<String>,
        kind: TaskKind,
        priority: TaskPriority,
        context: Box<dyn GroupContext>,
    ) -> GroupHandle {
        GroupHandle::new(Arc::new(Self {
            core: TaskCore::new(name.into(), priority, kind),
            group: GroupCore::new(scheduler.clone(), context),
            children: Mutex::new(VecDeque::new()),
        }))
    }

    fn pop_front(&self) -> Option<TaskHandle> {
        self.children
            .lock()
            .expect("group children lock poisoned")
            .pop_front()
    }
}

impl Task for SequenceGroup {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn execute(self: Arc<Self>) {
        debug_assert!(
            self.core.is_grabbed(),
            "executing group '{}' without grabbing it",
            self.core.name()
        );
        self.group.context().on_pre_execute();
        match self.pop_front() {
            Some(head) => {
                if head.try_grab() {
                    head.execute();
                }
                // A stolen head still drives the chain through its own
                // completion notification.
            }
            None => {
                warn!(group = %self.core.name(), "executing a sequence group with no children");
                self.group.complete(&self.core);
            }
        }
    }

    fn execute_single_threaded(self: Arc<Self>) {
        if !self.core.try_grab() {
            return;
        }
        self.group.context().on_pre_execute();
        while let Some(child) = self.pop_front() {
            child.execute_single_threaded();
        }
        self.group.context().on_post_execute();
        self.core.mark_done();
        self.core.signal_completion();
        // Replay is driven synchronously by the caller; clear the back
        // reference without waking the parent's dispatch logic.
        drop(self.core.take_parent());
    }

    fn active_wait(self: Arc<Self>) {
        self.core.wait();
    }

    fn on_added_to_group(&self, parent: &TaskHandle) {
        self.group.context().on_added_to_group(parent);
    }
}

impl Group for SequenceGroup {
    fn add_child(self: Arc<Self>, child: TaskHandle) {
        let parent: Arc<dyn Group> = self.clone();
        if self.group.adopt(&parent, &child) {
            self.children
                .lock()
                .expect("group children lock poisoned")
                .push_back(child.clone());
            self.group.notify_added(&parent, &child);
        }
    }

    fn one_task_done(self: Arc<Self>) {
        if self.group.child_done() {
            self.group.complete(&self.core);
            return;
        }
        if let Some(next) = self.pop_front() {
            self.group.scheduler().add(next);
        }
    }

    fn into_task(self: Arc<Self>) -> Arc<dyn Task> {
        self
    }
}
