//! Storage and collaborator contracts consumed by the scheduling service.

use anyhow::Error;
use hangar_core::id::{DependencyId, TaskId, TenantId};
use hangar_core::{
    DependencyEdge, OutboxMessage, ScheduleChangeEvent, Task, TaskFilter, TaskState, TenantScope,
};
use hangar_store_mem::{MemoryStore, MemoryStoreError};
use std::sync::Arc;
use time::OffsetDateTime;

/// Persistence of [`Task`] records.
pub trait TaskStore {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error>;

    /// Point lookup. Soft-deleted or out-of-scope tasks yield `None`.
    ///
    /// # Errors
    /// Returns a store-specific error when the lookup fails.
    fn get_task(&self, scope: TenantScope, id: TaskId) -> Result<Option<Task>, Self::Error>;

    /// Overwrite a task.
    ///
    /// # Errors
    /// Returns a store-specific error when persisting fails.
    fn update_task(&self, task: &Task) -> Result<Task, Self::Error>;

    /// Filtered listing.
    ///
    /// # Errors
    /// Returns a store-specific error when listing fails.
    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, Self::Error>;

    /// Dedicated state update; appends `notes` to the task notes.
    ///
    /// # Errors
    /// Returns a store-specific error when persisting fails.
    fn update_task_state(
        &self,
        scope: TenantScope,
        id: TaskId,
        state: TaskState,
        notes: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, Self::Error>;
}

/// Persistence of dependency edges.
pub trait DependencyStore {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error>;

    /// Store a new edge.
    ///
    /// # Errors
    /// Returns a store-specific error when persisting fails.
    fn create_dependency(&self, edge: &DependencyEdge) -> Result<DependencyEdge, Self::Error>;

    /// Point lookup of an edge visible in `scope`.
    ///
    /// # Errors
    /// Returns a store-specific error when the lookup fails.
    fn get_dependency(
        &self,
        scope: TenantScope,
        id: DependencyId,
    ) -> Result<Option<DependencyEdge>, Self::Error>;

    /// Remove an edge; `false` when it does not exist in `scope`.
    ///
    /// # Errors
    /// Returns a store-specific error when deletion fails.
    fn delete_dependency(&self, scope: TenantScope, id: DependencyId) -> Result<bool, Self::Error>;

    /// Edges where `task` is the source (its prerequisites).
    ///
    /// # Errors
    /// Returns a store-specific error when listing fails.
    fn dependencies_of(
        &self,
        scope: TenantScope,
        task: TaskId,
    ) -> Result<Vec<DependencyEdge>, Self::Error>;

    /// Edges where `task` is the target (tasks depending on it).
    ///
    /// # Errors
    /// Returns a store-specific error when listing fails.
    fn dependents_of(
        &self,
        scope: TenantScope,
        task: TaskId,
    ) -> Result<Vec<DependencyEdge>, Self::Error>;
}

/// Append-only schedule change history.
pub trait ScheduleEventStore {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error>;

    /// Append a record.
    ///
    /// # Errors
    /// Returns a store-specific error when persisting fails.
    fn append_schedule_event(
        &self,
        event: &ScheduleChangeEvent,
    ) -> Result<ScheduleChangeEvent, Self::Error>;

    /// History of one task, oldest first.
    ///
    /// # Errors
    /// Returns a store-specific error when listing fails.
    fn schedule_events(
        &self,
        scope: TenantScope,
        task: TaskId,
    ) -> Result<Vec<ScheduleChangeEvent>, Self::Error>;
}

/// Everything the scheduling service reads and writes.
pub trait SchedulingStore: TaskStore + DependencyStore + ScheduleEventStore {}

impl<S> SchedulingStore for S where S: TaskStore + DependencyStore + ScheduleEventStore {}

/// Best-effort outbound event queue.
pub trait EventPublisher: Send + Sync {
    /// Queue a message for downstream delivery.
    ///
    /// # Errors
    /// Returns an error when the message cannot be queued; callers ignore it.
    fn enqueue(&self, message: OutboxMessage) -> anyhow::Result<()>;
}

/// Part reservation bookkeeping, released when a task is cancelled.
pub trait PartsReservations: Send + Sync {
    /// Release every open reservation held by `task`.
    ///
    /// # Errors
    /// Returns an error when the reservations cannot be released.
    fn release_for_task(&self, tenant: TenantId, task: TaskId) -> anyhow::Result<()>;
}

impl TaskStore for MemoryStore {
    type Error = MemoryStoreError;

    fn get_task(&self, scope: TenantScope, id: TaskId) -> Result<Option<Task>, Self::Error> {
        Ok(self.task(scope, id))
    }

    fn update_task(&self, task: &Task) -> Result<Task, Self::Error> {
        Self::update_task(self, task)
    }

    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, Self::Error> {
        Ok(Self::list_tasks(self, filter))
    }

    fn update_task_state(
        &self,
        scope: TenantScope,
        id: TaskId,
        state: TaskState,
        notes: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, Self::Error> {
        Ok(Self::update_task_state(self, scope, id, state, notes, now))
    }
}

impl DependencyStore for MemoryStore {
    type Error = MemoryStoreError;

    fn create_dependency(&self, edge: &DependencyEdge) -> Result<DependencyEdge, Self::Error> {
        Self::create_dependency(self, edge)
    }

    fn get_dependency(
        &self,
        scope: TenantScope,
        id: DependencyId,
    ) -> Result<Option<DependencyEdge>, Self::Error> {
        Ok(Self::dependency(self, scope, id))
    }

    fn delete_dependency(&self, scope: TenantScope, id: DependencyId) -> Result<bool, Self::Error> {
        Ok(Self::delete_dependency(self, scope, id))
    }

    fn dependencies_of(
        &self,
        scope: TenantScope,
        task: TaskId,
    ) -> Result<Vec<DependencyEdge>, Self::Error> {
        Ok(Self::dependencies_of(self, scope, task))
    }

    fn dependents_of(
        &self,
        scope: TenantScope,
        task: TaskId,
    ) -> Result<Vec<DependencyEdge>, Self::Error> {
        Ok(Self::dependents_of(self, scope, task))
    }
}

impl ScheduleEventStore for MemoryStore {
    type Error = MemoryStoreError;

    fn append_schedule_event(
        &self,
        event: &ScheduleChangeEvent,
    ) -> Result<ScheduleChangeEvent, Self::Error> {
        Self::append_schedule_event(self, event)
    }

    fn schedule_events(
        &self,
        scope: TenantScope,
        task: TaskId,
    ) -> Result<Vec<ScheduleChangeEvent>, Self::Error> {
        Ok(Self::schedule_events(self, scope, task))
    }
}

impl EventPublisher for MemoryStore {
    fn enqueue(&self, message: OutboxMessage) -> anyhow::Result<()> {
        Self::enqueue(self, message);
        Ok(())
    }
}

impl<S> TaskStore for Arc<S>
where
    S: TaskStore,
{
    type Error = S::Error;

    fn get_task(&self, scope: TenantScope, id: TaskId) -> Result<Option<Task>, Self::Error> {
        (**self).get_task(scope, id)
    }

    fn update_task(&self, task: &Task) -> Result<Task, Self::Error> {
        (**self).update_task(task)
    }

    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, Self::Error> {
        (**self).list_tasks(filter)
    }

    fn update_task_state(
        &self,
        scope: TenantScope,
        id: TaskId,
        state: TaskState,
        notes: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, Self::Error> {
        (**self).update_task_state(scope, id, state, notes, now)
    }
}

impl<S> DependencyStore for Arc<S>
where
    S: DependencyStore,
{
    type Error = S::Error;

    fn create_dependency(&self, edge: &DependencyEdge) -> Result<DependencyEdge, Self::Error> {
        (**self).create_dependency(edge)
    }

    fn get_dependency(
        &self,
        scope: TenantScope,
        id: DependencyId,
    ) -> Result<Option<DependencyEdge>, Self::Error> {
        (**self).get_dependency(scope, id)
    }

    fn delete_dependency(&self, scope: TenantScope, id: DependencyId) -> Result<bool, Self::Error> {
        (**self).delete_dependency(scope, id)
    }

    fn dependencies_of(
        &self,
        scope: TenantScope,
        task: TaskId,
    ) -> Result<Vec<DependencyEdge>, Self::Error> {
        (**self).dependencies_of(scope, task)
    }

    fn dependents_of(
        &self,
        scope: TenantScope,
        task: TaskId,
    ) -> Result<Vec<DependencyEdge>, Self::Error> {
        (**self).dependents_of(scope, task)
    }
}

impl<S> ScheduleEventStore for Arc<S>
where
    S: ScheduleEventStore,
{
    type Error = S::Error;

    fn append_schedule_event(
        &self,
        event: &ScheduleChangeEvent,
    ) -> Result<ScheduleChangeEvent, Self::Error> {
        (**self).append_schedule_event(event)
    }

    fn schedule_events(
        &self,
        scope: TenantScope,
        task: TaskId,
    ) -> Result<Vec<ScheduleChangeEvent>, Self::Error> {
        (**self).schedule_events(scope, task)
    }
}
