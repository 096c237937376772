//! One thread-safe FIFO per priority level.

use crate::task::{TaskHandle, TaskPriority, WorkerPriority};
use crossbeam_queue::SegQueue;

/// An array of lock-free FIFOs indexed by concrete priority.
///
/// `push` is O(1); popping scans levels in dispatch order (highest first)
/// and returns the first available handle. Within a level, FIFO order is
/// preserved; across levels, higher strictly beats lower at each dispatch
/// point — there is deliberately no anti-starvation mechanism.
pub(crate) struct PriorityQueueSet {
    queues: [SegQueue<TaskHandle>; TaskPriority::COUNT],
}

impl PriorityQueueSet {
    pub(crate) fn new() -> Self {
        Self {
            queues: std::array::from_fn(|_| SegQueue::new()),
        }
    }

    /// Enqueues a handle at the given (concrete) priority.
    pub(crate) fn push(&self, priority: TaskPriority, handle: TaskHandle) {
        self.queues[priority.queue_index()].push(handle);
    }

    /// Pops the highest-priority available handle among the levels `mask`
    /// covers.
    pub(crate) fn pop_masked(&self, mask: WorkerPriority) -> Option<TaskHandle> {
        for level in TaskPriority::DISPATCH_ORDER {
            if !mask.can_work_on(level) {
                continue;
            }
            if let Some(handle) = self.queues[level.queue_index()].pop() {
                return Some(handle);
            }
        }
        None
    }

    /// Pops the highest-priority available handle.
    #[cfg(test)]
    pub(crate) fn pop(&self) -> Option<TaskHandle> {
        self.pop_masked(WorkerPriority::ANY)
    }
}
