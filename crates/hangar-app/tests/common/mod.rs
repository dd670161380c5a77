//! Shared fixtures for hangar-app integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use hangar_app::{ProjectConfig, RequestContext, SchedulingService};
use hangar_core::id::{AircraftId, TenantId, UserId};
use hangar_core::{Actor, FixedClock, NewTask, Role, Task, TaskState, TenantScope};
use hangar_store_mem::MemoryStore;
use std::sync::Arc;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

/// Reference instant used by every scenario.
pub const T: OffsetDateTime = datetime!(2026-05-04 08:00 UTC);

/// Service wired to an in-memory store, a fixed clock and the store's outbox.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub service: SchedulingService<Arc<MemoryStore>>,
    pub tenant: TenantId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ProjectConfig::default())
    }

    pub fn with_config(config: ProjectConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(T));
        let service = SchedulingService::new(Arc::clone(&store), config)
            .with_clock(clock.clone())
            .with_publisher(store.clone());
        Self {
            store,
            clock,
            service,
            tenant: TenantId::new(),
        }
    }

    pub fn ctx(&self, role: Role) -> RequestContext {
        self.ctx_for(UserId::new(), role)
    }

    pub fn ctx_for(&self, user: UserId, role: Role) -> RequestContext {
        RequestContext::new(Actor::new(self.tenant, user, role))
    }

    pub fn add_task(&self, start: OffsetDateTime, end: OffsetDateTime) -> Task {
        let task = new_task(self.tenant, start, end, None);
        self.store.insert_task(task.clone()).expect("insert task");
        task
    }

    pub fn add_task_in(
        &self,
        state: TaskState,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Task {
        let mut task = new_task(self.tenant, start, end, None);
        task.state = state;
        self.store.insert_task(task.clone()).expect("insert task");
        task
    }

    pub fn current(&self, task: &Task) -> Task {
        self.store
            .task(TenantScope::All, task.id)
            .expect("task still present")
    }
}

pub fn new_task(
    tenant: TenantId,
    start: OffsetDateTime,
    end: OffsetDateTime,
    mechanic: Option<UserId>,
) -> Task {
    Task::new(
        NewTask {
            tenant,
            aircraft: AircraftId::new(),
            program: None,
            task_type: "scheduled maintenance".into(),
            start_time: start,
            end_time: end,
            assigned_mechanic: mechanic,
        },
        T,
    )
    .expect("valid task window")
}

pub fn hours(n: i64) -> Duration {
    Duration::hours(n)
}
