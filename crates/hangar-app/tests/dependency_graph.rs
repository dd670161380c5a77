//! Acyclicity and concurrency properties of the dependency graph.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{Harness, T, hours};
use hangar_app::RescheduleRequest;
use hangar_core::id::TaskId;
use hangar_core::{ErrorKind, Role, Task, TenantScope};
use hangar_store_mem::MemoryStore;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Barrier;
use std::thread;

/// Whether `to` is reachable from `from` following "depends on" edges.
fn reachable(edges: &HashSet<(usize, usize)>, from: usize, to: usize) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if seen.insert(node) {
            stack.extend(
                edges
                    .iter()
                    .filter(|(task, _)| *task == node)
                    .map(|(_, depends_on)| *depends_on),
            );
        }
    }
    false
}

/// Kahn's algorithm over the stored edges; `true` when every task can be ordered.
fn is_acyclic(h: &Harness, tasks: &[Task]) -> bool {
    let index: HashMap<TaskId, usize> = tasks.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
    let edges = h.store.snapshot().dependencies;
    let mut indegree = vec![0_usize; tasks.len()];
    for edge in &edges {
        indegree[index[&edge.task]] += 1;
    }
    let mut ready: Vec<usize> = (0..tasks.len()).filter(|&i| indegree[i] == 0).collect();
    let mut ordered = 0;
    while let Some(node) = ready.pop() {
        ordered += 1;
        for edge in edges.iter().filter(|edge| edge.depends_on == tasks[node].id) {
            let dependent = index[&edge.task];
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(dependent);
            }
        }
    }
    ordered == tasks.len()
}

proptest! {
    #[test]
    fn random_insertions_never_produce_a_cycle(
        attempts in prop::collection::vec((0_usize..6, 0_usize..6), 1..40)
    ) {
        let h = Harness::new();
        let ctx = h.ctx(Role::Scheduler);
        let tasks: Vec<Task> = (0..6).map(|_| h.add_task(T, T + hours(1))).collect();
        let mut model: HashSet<(usize, usize)> = HashSet::new();

        for (task, depends_on) in attempts {
            let before = h.store.snapshot().dependencies;
            let result = h
                .service
                .create_dependency(&ctx, tasks[task].id, tasks[depends_on].id, None);

            if task == depends_on {
                prop_assert_eq!(result.err().map(|err| err.kind()), Some(ErrorKind::Validation));
            } else if model.contains(&(task, depends_on)) || reachable(&model, depends_on, task) {
                prop_assert_eq!(result.err().map(|err| err.kind()), Some(ErrorKind::Conflict));
            } else {
                prop_assert!(result.is_ok());
                model.insert((task, depends_on));
                continue;
            }
            prop_assert_eq!(h.store.snapshot().dependencies, before);
        }

        prop_assert_eq!(h.store.snapshot().dependencies.len(), model.len());
        prop_assert!(is_acyclic(&h, &tasks));
    }
}

#[test]
fn opposite_edges_created_in_parallel_leave_exactly_one() {
    for _ in 0..50 {
        let h = Harness::new();
        let ctx = h.ctx(Role::Scheduler);
        let x = h.add_task(T, T + hours(1));
        let y = h.add_task(T, T + hours(1));
        let barrier = Barrier::new(2);

        let results = thread::scope(|scope| {
            let forward = scope.spawn(|| {
                barrier.wait();
                h.service.create_dependency(&ctx, x.id, y.id, None)
            });
            let backward = scope.spawn(|| {
                barrier.wait();
                h.service.create_dependency(&ctx, y.id, x.id, None)
            });
            [
                forward.join().expect("forward worker finished"),
                backward.join().expect("backward worker finished"),
            ]
        });

        let created = results.iter().filter(|result| result.is_ok()).count();
        let rejected: Vec<ErrorKind> = results
            .iter()
            .filter_map(|result| result.as_ref().err().map(hangar_core::Error::kind))
            .collect();
        assert_eq!(created, 1);
        assert_eq!(rejected, vec![ErrorKind::Conflict]);
        assert_eq!(h.store.snapshot().dependencies.len(), 1);
    }
}

#[test]
fn parallel_reschedules_keep_dependents_aligned() {
    let h = Harness::new();
    let ctx = h.ctx(Role::Scheduler);
    let root = h.add_task(T, T + hours(2));
    let child = h.add_task(T + hours(2), T + hours(4));
    let grandchild = h.add_task(T + hours(4), T + hours(6));
    h.service.create_dependency(&ctx, child.id, root.id, None).expect("child -> root");
    h.service
        .create_dependency(&ctx, grandchild.id, child.id, None)
        .expect("grandchild -> child");
    let barrier = Barrier::new(2);

    thread::scope(|scope| {
        for shift in [1, 3] {
            let (barrier, h, ctx, root) = (&barrier, &h, &ctx, &root);
            scope.spawn(move || {
                barrier.wait();
                h.service
                    .reschedule_task(
                        ctx,
                        &RescheduleRequest {
                            task: root.id,
                            new_start: root.start_time + hours(shift),
                            new_end: root.end_time + hours(shift),
                            reason: format!("shift {shift}"),
                            cascade: true,
                        },
                    )
                    .expect("reschedule");
            });
        }
    });

    let root_now = h.current(&root);
    let child_now = h.current(&child);
    let grandchild_now = h.current(&grandchild);
    assert_eq!(child_now.start_time - root_now.end_time, child.start_time - root.end_time);
    assert_eq!(
        grandchild_now.start_time - child_now.end_time,
        grandchild.start_time - child.end_time
    );
    let history = MemoryStore::schedule_events(&h.store, TenantScope::All, root.id);
    assert_eq!(history.len(), 2, "both reschedules recorded");
}
