//! Data-parallel loops over index ranges.
//!
//! A [`Partitioner`] slices an index range into batches; `parallel_for`
//! builds one child task per batch under a waitable parallel group, submits
//! the group, and blocks the caller until every element has been processed.
//! The body is either `Fn(element_index)` or `Fn(batch_index, element_index)`
//! — the arity is picked up through the [`ForBody`] trait.

use crate::scheduler::SchedulerHandle;
use crate::task::{LeafTask, ParallelGroup, TaskKind, TaskPriority};
use std::ops::Range;
use std::sync::Arc;

/// Splits an index range into batches of sub-ranges.
///
/// A batch's sub-ranges need not be contiguous; an implementation is free to
/// produce arbitrary shard plans (strided, owner-computed, …) as long as
/// every index of the input range is yielded by exactly one batch.
pub trait Partitioner: Send + Sync + 'static {
    /// Number of batches. Zero means there is no work at all.
    fn batch_count(&self) -> usize;

    /// The sub-ranges owned by `batch_index`, in iteration order.
    fn batch_ranges(&self, batch_index: usize) -> Box<dyn Iterator<Item = Range<usize>> + Send + '_>;
}

/// Splits `[first, last)` into at most `batch_hint` contiguous chunks of
/// near-equal size.
#[derive(Debug, Clone, Copy)]
pub struct SimplePartitioner {
    first: usize,
    last: usize,
    batches: usize,
}

impl SimplePartitioner {
    /// Creates a partitioner over `[first, last)`.
    ///
    /// The effective batch count is clamped to the range length, and an
    /// empty range yields zero batches. A `batch_hint` of 0 is treated as 1.
    #[must_use]
    pub fn new(first: usize, last: usize, batch_hint: usize) -> Self {
        let len = last.saturating_sub(first);
        let batches = if len == 0 {
            0
        } else {
            batch_hint.max(1).min(len)
        };
        Self { first, last, batches }
    }
}

impl Partitioner for SimplePartitioner {
    fn batch_count(&self) -> usize {
        self.batches
    }

    fn batch_ranges(&self, batch_index: usize) -> Box<dyn Iterator<Item = Range<usize>> + Send + '_> {
        debug_assert!(batch_index < self.batches);
        let len = self.last - self.first;
        let base = len / self.batches;
        let remainder = len % self.batches;
        // The first `remainder` batches carry one extra element.
        let start = self.first + batch_index * base + batch_index.min(remainder);
        let size = base + usize::from(batch_index < remainder);
        Box::new(std::iter::once(start..start + size))
    }
}

/// A `parallel_for` body of either arity, unified behind one invocation.
///
/// The marker parameter lets both `Fn(usize)` and `Fn(usize, usize)` coexist
/// as implementations; inference picks the right one from the closure.
pub trait ForBody<Marker>: Send + Sync + 'static {
    /// Processes one element; `batch_index` is the ordinal of the batch the
    /// element belongs to.
    fn invoke(&self, batch_index: usize, element_index: usize);
}

impl<F> ForBody<(usize,)> for F
where
    F: Fn(usize) + Send + Sync + 'static,
{
    fn invoke(&self, _batch_index: usize, element_index: usize) {
        self(element_index);
    }
}

impl<F> ForBody<(usize, usize)> for F
where
    F: Fn(usize, usize) + Send + Sync + 'static,
{
    fn invoke(&self, batch_index: usize, element_index: usize) {
        self(batch_index, element_index);
    }
}

/// Runs `body` for every index the partitioner yields, in parallel.
///
/// Builds a waitable parallel group with one fire-and-forget child per
/// batch, schedules it, and blocks until all elements are processed. With
/// zero batches the call returns immediately and no group is constructed.
pub fn parallel_for<P, M, F>(
    scheduler: &SchedulerHandle,
    name: &str,
    partitioner: P,
    priority: TaskPriority,
    body: F,
) where
    P: Partitioner,
    F: ForBody<M>,
{
    let batches = partitioner.batch_count();
    if batches == 0 {
        return;
    }

    let group = ParallelGroup::build(scheduler, name, TaskKind::Waitable, priority, batches, 0);
    let partitioner = Arc::new(partitioner);
    let body = Arc::new(body);
    for batch in 0..batches {
        let partitioner = Arc::clone(&partitioner);
        let body = Arc::clone(&body);
        let child = LeafTask::build(
            format!("{name}/batch{batch}"),
            TaskPriority::Inherit,
            TaskKind::FireAndForget,
            move || {
                for range in partitioner.batch_ranges(batch) {
                    for element in range {
                        body.invoke(batch, element);
                    }
                }
            },
        );
        group.add_task(child);
    }

    scheduler.add(group.handle());
    group.active_wait();
}

/// Convenience partitioner for `[first, last)` sized to the workers eligible
/// at `priority`.
#[must_use]
pub fn default_partitioner(
    scheduler: &SchedulerHandle,
    first: usize,
    last: usize,
    priority: TaskPriority,
) -> SimplePartitioner {
    let concrete = if priority.is_concrete() {
        priority
    } else {
        TaskPriority::Normal
    };
    SimplePartitioner::new(first, last, scheduler.workers_count(concrete))
}

/// Runs `body` over every element of a shared container, in parallel.
///
/// The container is index-addressed through the same machinery as
/// [`parallel_for`]; it is shared with the child tasks, hence the `Arc`.
pub fn parallel_for_each<T, F>(
    scheduler: &SchedulerHandle,
    name: &str,
    items: Arc<Vec<T>>,
    priority: TaskPriority,
    body: F,
) where
    T: Send + Sync + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    let partitioner = default_partitioner(scheduler, 0, items.len(), priority);
    parallel_for(scheduler, name, partitioner, priority, move |index: usize| {
        body(&items[index]);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::scheduler::Scheduler;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn started_scheduler(workers: usize) -> Scheduler {
        let scheduler = Scheduler::new();
        scheduler.register_worker(WorkerConfig {
            count: workers,
            ..WorkerConfig::default()
        });
        scheduler.start().expect("scheduler start failed");
        scheduler
    }

    #[test]
    fn simple_partitioner_covers_the_range_exactly_once() {
        init_test("simple_partitioner_covers_the_range_exactly_once");
        for (first, last, hint) in [(0, 100, 7), (10, 17, 4), (0, 3, 8), (5, 5, 3)] {
            let partitioner = SimplePartitioner::new(first, last, hint);
            let mut seen = vec![0usize; last];
            for batch in 0..partitioner.batch_count() {
                for range in partitioner.batch_ranges(batch) {
                    for index in range {
                        seen[index] += 1;
                    }
                }
            }
            for index in first..last {
                assert_eq!(seen[index], 1, "index {index} covered wrong number of times");
            }
        }
        crate::test_complete!("simple_partitioner_covers_the_range_exactly_once");
    }

    #[test]
    fn empty_range_yields_zero_batches() {
        init_test("empty_range_yields_zero_batches");
        assert_eq!(SimplePartitioner::new(4, 4, 8).batch_count(), 0);
        assert_eq!(SimplePartitioner::new(9, 3, 2).batch_count(), 0);
        crate::test_complete!("empty_range_yields_zero_batches");
    }

    #[test]
    fn parallel_for_visits_every_element() {
        init_test("parallel_for_visits_every_element");
        let scheduler = started_scheduler(4);
        let sum = Arc::new(AtomicUsize::new(0));
        let captured = Arc::clone(&sum);
        parallel_for(
            &scheduler.handle(),
            "sum",
            SimplePartitioner::new(0, 100, 4),
            TaskPriority::Normal,
            move |index: usize| {
                captured.fetch_add(index, Ordering::Relaxed);
            },
        );
        assert_eq!(sum.load(Ordering::Relaxed), 100 * 99 / 2);
        scheduler.stop();
        crate::test_complete!("parallel_for_visits_every_element");
    }

    #[test]
    fn two_argument_body_receives_batch_ordinals() {
        init_test("two_argument_body_receives_batch_ordinals");
        let scheduler = started_scheduler(2);
        let max_batch = Arc::new(AtomicUsize::new(0));
        let captured = Arc::clone(&max_batch);
        parallel_for(
            &scheduler.handle(),
            "batched",
            SimplePartitioner::new(0, 16, 4),
            TaskPriority::Normal,
            move |batch: usize, _element: usize| {
                captured.fetch_max(batch, Ordering::Relaxed);
            },
        );
        assert_eq!(max_batch.load(Ordering::Relaxed), 3);
        scheduler.stop();
        crate::test_complete!("two_argument_body_receives_batch_ordinals");
    }

    #[test]
    fn zero_batches_return_immediately() {
        init_test("zero_batches_return_immediately");
        let scheduler = started_scheduler(1);
        parallel_for(
            &scheduler.handle(),
            "empty",
            SimplePartitioner::new(0, 0, 4),
            TaskPriority::Normal,
            |_index: usize| unreachable!("no elements to process"),
        );
        scheduler.stop();
        crate::test_complete!("zero_batches_return_immediately");
    }

    #[test]
    fn for_each_visits_every_item() {
        init_test("for_each_visits_every_item");
        let scheduler = started_scheduler(2);
        let items = Arc::new((0..50).collect::<Vec<usize>>());
        let sum = Arc::new(AtomicUsize::new(0));
        let captured = Arc::clone(&sum);
        parallel_for_each(
            &scheduler.handle(),
            "for-each",
            items,
            TaskPriority::Normal,
            move |item: &usize| {
                captured.fetch_add(*item, Ordering::Relaxed);
            },
        );
        assert_eq!(sum.load(Ordering::Relaxed), 50 * 49 / 2);
        scheduler.stop();
        crate::test_complete!("for_each_visits_every_item");
    }
}
