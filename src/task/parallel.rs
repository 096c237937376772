//! Fan-out groups: independent children with an optional concurrency cap.

use crate::context::{DefaultGroupContext, GroupContext};
use crate::scheduler::SchedulerHandle;
use crate::task::group::{GroupCore, GroupHandle};
use crate::task::{Group, Task, TaskCore, TaskHandle, TaskKind, TaskPriority};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// A group whose children run independently, fan-out/fan-in style.
///
/// Dispatch pushes every child but the first to the scheduler — capped at
/// `max_simultaneous` in flight when non-zero — and runs child 0 inline on
/// the dispatching thread, which keeps that thread usefully employed instead
/// of ping-ponging through the queue. Children are unordered; the only
/// guarantee is that the group completes after all of them.
pub struct ParallelGroup {
    core: TaskCore,
    group: GroupCore,
    children: Mutex<Vec<TaskHandle>>,
    /// Index of the next child to hand to the scheduler; child 0 is always
    /// run inline, so claiming starts at 1.
    next_child: AtomicUsize,
    max_simultaneous: usize,
}

impl std::fmt::Debug for ParallelGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelGroup")
            .field("core", &self.core)
            .field("max_simultaneous", &self.max_simultaneous)
            .finish()
    }
}

impl ParallelGroup {
    /// Creates a parallel group with the default (no-op) context.
    ///
    /// `reserve` pre-sizes the child collection; `max_simultaneous` of 0
    /// means unbounded fan-out.
    #[must_use]
    pub fn build(
        scheduler: &SchedulerHandle,
        name: impl Into<String>,
        kind: TaskKind,
        priority: TaskPriority,
        reserve: usize,
        max_simultaneous: usize,
    ) -> GroupHandle {
        Self::build_with_context(
            scheduler,
            name,
            kind,
            priority,
            reserve,
            max_simultaneous,
            Box::new(DefaultGroupContext),
        )
    }

    /// Creates a parallel group with an explicit context.
    #[must_use]
    pub fn build_with_context(
        scheduler: &SchedulerHandle,
        name: impl Into<String>,
        kind: TaskKind,
        priority: TaskPriority,
        reserve: usize,
        max_simultaneous: usize,
        context: Box<dyn GroupContext>,
    ) -> GroupHandle {
        GroupHandle::new(Arc::new(Self {
            core: TaskCore::new(name.into(), priority, kind),
            group: GroupCore::new(scheduler.clone(), context),
            children: Mutex::new(Vec::with_capacity(reserve)),
            next_child: AtomicUsize::new(1),
            max_simultaneous,
        }))
    }

    fn children_snapshot(&self) -> Vec<TaskHandle> {
        self.children
            .lock()
            .expect("group children lock poisoned")
            .clone()
    }

    /// Dispatches the children: schedule up to the concurrency limit, then
    /// run the first child on the current thread.
    fn execute_impl(&self) {
        let children = self.children_snapshot();
        if children.is_empty() {
            warn!(group = %self.core.name(), "executing a parallel group with no children");
            self.group.complete(&self.core);
            return;
        }

        let limit = if self.max_simultaneous == 0 {
            children.len()
        } else {
            self.max_simultaneous.min(children.len())
        };

        // Claim indices through the shared atomic so concurrent completions
        // refilling capacity never double-schedule a child.
        loop {
            let claimed = self.next_child.load(Ordering::Acquire);
            if claimed >= limit {
                break;
            }
            if self
                .next_child
                .compare_exchange(claimed, claimed + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.group.scheduler().add(children[claimed].clone());
            }
        }

        let first = &children[0];
        if first.try_grab() {
            first.execute();
        }
    }
}

impl Task for ParallelGroup {
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
        self.execute_impl();
    }

    fn execute_single_threaded(self: Arc<Self>) {
        if !self.core.try_grab() {
            return;
        }
        self.group.context().on_pre_execute();
        for child in self.children_snapshot() {
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

impl Group for ParallelGroup {
    fn add_child(self: Arc<Self>, child: TaskHandle) {
        let parent: Arc<dyn Group> = self.clone();
        if self.group.adopt(&parent, &child) {
            self.children
                .lock()
                .expect("group children lock poisoned")
                .push(child.clone());
            self.group.notify_added(&parent, &child);
        }
    }

    fn one_task_done(self: Arc<Self>) {
        if self.group.child_done() {
            self.group.complete(&self.core);
            return;
        }
        // Bounded mode: a completion frees one slot, so hand the next
        // unscheduled child to the scheduler.
        if self.max_simultaneous > 0 {
            let next = {
                let children = self.children.lock().expect("group children lock poisoned");
                let index = self.next_child.fetch_add(1, Ordering::AcqRel);
                children.get(index).cloned()
            };
            if let Some(child) = next {
                self.group.scheduler().add(child);
            }
        }
    }

    fn into_task(self: Arc<Self>) -> Arc<dyn Task> {
        self
    }
}
