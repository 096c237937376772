//! Group completion-ordering invariants and boundary behaviors.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskpool::task::{LeafTask, ParallelGroup, SequenceGroup};
use taskpool::test_utils::init_test_logging;
use taskpool::{Scheduler, TaskKind, TaskPriority, WorkerConfig};

fn init_test(name: &str) {
    init_test_logging();
    taskpool::test_phase!(name);
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
fn parallel_group_completes_after_every_child() {
    init_test("parallel_group_completes_after_every_child");
    let scheduler = started_scheduler(4);
    let group = ParallelGroup::build(
        &scheduler.handle(),
        "fan",
        TaskKind::Waitable,
        TaskPriority::Normal,
        64,
        0,
    );
    let pending = Arc::new(AtomicUsize::new(64));
    let violated = Arc::new(AtomicBool::new(false));
    for index in 0..64 {
        let pending = Arc::clone(&pending);
        group.add_task(
            LeafTask::build(
                format!("fan-{index}"),
                TaskPriority::Inherit,
                TaskKind::FireAndForget,
                move || {
                    pending.fetch_sub(1, Ordering::AcqRel);
                },
            )
            .handle(),
        );
    }
    scheduler.add(group.handle());
    group.wait();
    // Everything the children published is visible after the group's event.
    if pending.load(Ordering::Acquire) != 0 {
        violated.store(true, Ordering::Release);
    }
    assert!(!violated.load(Ordering::Acquire), "group completed before its children");
    scheduler.stop();
    taskpool::test_complete!("parallel_group_completes_after_every_child");
}

#[test]
fn sequence_children_never_overlap_and_keep_order() {
    init_test("sequence_children_never_overlap_and_keep_order");
    let scheduler = started_scheduler(4);
    let group = SequenceGroup::build(
        &scheduler.handle(),
        "strict-chain",
        TaskKind::Waitable,
        TaskPriority::Normal,
    );
    let log = Arc::new(Mutex::new(Vec::new()));
    let in_flight = Arc::new(AtomicUsize::new(0));
    for index in 0..10 {
        let log = Arc::clone(&log);
        let in_flight = Arc::clone(&in_flight);
        group.add_task(
            LeafTask::build(
                format!("strict-{index}"),
                TaskPriority::Inherit,
                TaskKind::FireAndForget,
                move || {
                    assert_eq!(in_flight.fetch_add(1, Ordering::AcqRel), 0, "overlap");
                    log.lock().expect("log lock poisoned").push(index);
                    in_flight.fetch_sub(1, Ordering::AcqRel);
                },
            )
            .handle(),
        );
    }
    scheduler.add(group.handle());
    group.wait();
    assert_eq!(
        *log.lock().expect("log lock poisoned"),
        (0..10).collect::<Vec<_>>()
    );
    scheduler.stop();
    taskpool::test_complete!("sequence_children_never_overlap_and_keep_order");
}

#[test]
fn scheduled_empty_group_still_completes() {
    init_test("scheduled_empty_group_still_completes");
    let scheduler = started_scheduler(1);
    // Executing a group with no children is a logged contract violation,
    // but waiters must not be stranded.
    let group = ParallelGroup::build(
        &scheduler.handle(),
        "empty",
        TaskKind::Waitable,
        TaskPriority::Normal,
        0,
        0,
    );
    scheduler.add(group.handle());
    assert!(group.wait_for(Duration::from_secs(2)), "empty group never completed");
    scheduler.stop();
    taskpool::test_complete!("scheduled_empty_group_still_completes");
}

#[test]
fn group_active_wait_falls_back_to_wait() {
    init_test("group_active_wait_falls_back_to_wait");
    let scheduler = started_scheduler(2);
    let group = ParallelGroup::build(
        &scheduler.handle(),
        "fallback",
        TaskKind::Waitable,
        TaskPriority::Normal,
        4,
        0,
    );
    let counter = Arc::new(AtomicUsize::new(0));
    for index in 0..4 {
        let counter = Arc::clone(&counter);
        group.add_task(
            LeafTask::build(
                format!("fallback-{index}"),
                TaskPriority::Inherit,
                TaskKind::FireAndForget,
                move || {
                    std::thread::sleep(Duration::from_millis(5));
                    counter.fetch_add(1, Ordering::AcqRel);
                },
            )
            .handle(),
        );
    }
    scheduler.add(group.handle());
    // The graph is not inline-executable; this blocks until the workers
    // finish every child.
    group.active_wait();
    assert!(group.is_done());
    assert_eq!(counter.load(Ordering::Acquire), 4);
    scheduler.stop();
    taskpool::test_complete!("group_active_wait_falls_back_to_wait");
}

#[test]
fn deep_nesting_propagates_completion_to_the_root() {
    init_test("deep_nesting_propagates_completion_to_the_root");
    let scheduler = started_scheduler(2);
    let handle = scheduler.handle();

    let root = ParallelGroup::build(
        &handle,
        "root",
        TaskKind::Waitable,
        TaskPriority::Normal,
        2,
        0,
    );
    let counter = Arc::new(AtomicUsize::new(0));
    for branch in 0..2 {
        let sequence = SequenceGroup::build(
            &handle,
            format!("branch-{branch}"),
            TaskKind::FireAndForget,
            TaskPriority::Inherit,
        );
        for leaf in 0..3 {
            let counter = Arc::clone(&counter);
            sequence.add_task(
                LeafTask::build(
                    format!("branch-{branch}-leaf-{leaf}"),
                    TaskPriority::Inherit,
                    TaskKind::FireAndForget,
                    move || {
                        counter.fetch_add(1, Ordering::AcqRel);
                    },
                )
                .handle(),
            );
        }
        root.add_task(sequence.handle());
    }

    scheduler.add(root.handle());
    root.wait();
    assert_eq!(counter.load(Ordering::Acquire), 6);
    scheduler.stop();
    taskpool::test_complete!("deep_nesting_propagates_completion_to_the_root");
}
