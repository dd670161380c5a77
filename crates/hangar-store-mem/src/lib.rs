//! In-memory storage implementation for hangar.
//!
//! Dependencies are kept as adjacency lists keyed by `(tenant, task)` in both
//! directions, so prerequisite and dependent lookups are index based.

mod error;

pub use error::MemoryStoreError;

use hangar_core::id::{DependencyId, TaskId, TenantId};
use hangar_core::{
    DependencyEdge, OutboxMessage, ScheduleChangeEvent, Task, TaskFilter, TaskState, TenantScope,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, MemoryStoreError>;
type AdjacencyKey = (TenantId, TaskId);

/// Serializable image of the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tasks, including soft-deleted ones.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Dependency edges.
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
    /// Schedule change history, in append order.
    #[serde(default)]
    pub schedule_events: Vec<ScheduleChangeEvent>,
    /// Pending outbound messages.
    #[serde(default)]
    pub outbox: Vec<OutboxMessage>,
}

#[derive(Default)]
struct State {
    tasks: HashMap<TaskId, Task>,
    edges: HashMap<DependencyId, DependencyEdge>,
    depends_on: HashMap<AdjacencyKey, Vec<DependencyId>>,
    dependents: HashMap<AdjacencyKey, Vec<DependencyId>>,
    schedule_events: Vec<ScheduleChangeEvent>,
    outbox: Vec<OutboxMessage>,
}

impl State {
    fn visible_task(&self, scope: TenantScope, id: TaskId) -> Option<&Task> {
        self.tasks
            .get(&id)
            .filter(|task| scope.includes(task.tenant) && !task.is_deleted())
    }

    fn adjacency_key(&self, scope: TenantScope, task: TaskId) -> Option<AdjacencyKey> {
        match scope {
            TenantScope::Tenant(tenant) => Some((tenant, task)),
            TenantScope::All => self.tasks.get(&task).map(|t| (t.tenant, task)),
        }
    }

    fn edges_at(
        &self,
        index: &HashMap<AdjacencyKey, Vec<DependencyId>>,
        scope: TenantScope,
        task: TaskId,
    ) -> Vec<DependencyEdge> {
        let Some(key) = self.adjacency_key(scope, task) else {
            return Vec::new();
        };
        index
            .get(&key)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .filter(|edge| scope.includes(edge.tenant))
            .cloned()
            .collect()
    }

    fn link(&mut self, edge: DependencyEdge) {
        self.depends_on
            .entry((edge.tenant, edge.task))
            .or_default()
            .push(edge.id);
        self.dependents
            .entry((edge.tenant, edge.depends_on))
            .or_default()
            .push(edge.id);
        self.edges.insert(edge.id, edge);
    }

    fn unlink(&mut self, id: DependencyId) -> Option<DependencyEdge> {
        let edge = self.edges.remove(&id)?;
        for (index, key) in [
            (&mut self.depends_on, (edge.tenant, edge.task)),
            (&mut self.dependents, (edge.tenant, edge.depends_on)),
        ] {
            if let Some(ids) = index.get_mut(&key) {
                ids.retain(|existing| *existing != id);
                if ids.is_empty() {
                    index.remove(&key);
                }
            }
        }
        Some(edge)
    }
}

/// Thread-safe in-memory store for tasks, dependencies, schedule history and the outbox.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot.
    ///
    /// # Errors
    /// Returns an error when ids collide or an edge points at an unknown task.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let store = Self::new();
        for task in snapshot.tasks {
            store.insert_task(task)?;
        }
        for edge in snapshot.dependencies {
            store.create_dependency(&edge)?;
        }
        for event in snapshot.schedule_events {
            store.append_schedule_event(&event)?;
        }
        store.lock().outbox = snapshot.outbox;
        Ok(store)
    }

    /// Capture the current contents. Collections are sorted for stable output.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        let mut tasks: Vec<Task> = state.tasks.values().cloned().collect();
        tasks.sort_by_key(|task| (task.start_time, task.id));
        let mut dependencies: Vec<DependencyEdge> = state.edges.values().cloned().collect();
        dependencies.sort_by_key(|edge| (edge.created_at, edge.id));
        Snapshot {
            tasks,
            dependencies,
            schedule_events: state.schedule_events.clone(),
            outbox: state.outbox.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a task.
    ///
    /// # Errors
    /// Returns [`MemoryStoreError::DuplicateTask`] if the id is taken.
    pub fn insert_task(&self, task: Task) -> Result<()> {
        let mut state = self.lock();
        if state.tasks.contains_key(&task.id) {
            return Err(MemoryStoreError::DuplicateTask(task.id));
        }
        debug!(task = %task.id, tenant = %task.tenant, "Inserted task");
        state.tasks.insert(task.id, task);
        Ok(())
    }

    /// Look up a visible, non-deleted task.
    #[must_use]
    pub fn task(&self, scope: TenantScope, id: TaskId) -> Option<Task> {
        self.lock().visible_task(scope, id).cloned()
    }

    /// Overwrite a stored task.
    ///
    /// # Errors
    /// Returns [`MemoryStoreError::TaskNotFound`] if the task does not exist.
    pub fn update_task(&self, task: &Task) -> Result<Task> {
        let mut state = self.lock();
        let Some(slot) = state.tasks.get_mut(&task.id) else {
            return Err(MemoryStoreError::TaskNotFound(task.id));
        };
        *slot = task.clone();
        info!(task = %task.id, start = %task.start_time, end = %task.end_time, "Updated task");
        Ok(task.clone())
    }

    /// Tasks matching `filter`, ordered by start time.
    #[must_use]
    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        let state = self.lock();
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.start_time, task.id));
        tasks
    }

    /// Set a task's state and append `notes` to its notes.
    ///
    /// Returns `None` when the task is not visible in `scope`.
    pub fn update_task_state(
        &self,
        scope: TenantScope,
        id: TaskId,
        new_state: TaskState,
        notes: &str,
        now: OffsetDateTime,
    ) -> Option<Task> {
        let mut state = self.lock();
        state.visible_task(scope, id)?;
        let task = state.tasks.get_mut(&id)?;
        let previous = task.state;
        task.state = new_state;
        let notes = notes.trim();
        if !notes.is_empty() {
            if !task.notes.is_empty() {
                task.notes.push('\n');
            }
            task.notes.push_str(notes);
        }
        task.updated_at = now;
        info!(task = %id, from = %previous, to = %new_state, "Updated task state");
        Some(task.clone())
    }

    /// Mark a task as deleted. Returns `false` if it was not visible.
    pub fn soft_delete_task(&self, scope: TenantScope, id: TaskId, now: OffsetDateTime) -> bool {
        let mut state = self.lock();
        if state.visible_task(scope, id).is_none() {
            return false;
        }
        if let Some(task) = state.tasks.get_mut(&id) {
            task.deleted_at = Some(now);
            task.updated_at = now;
        }
        info!(task = %id, "Soft-deleted task");
        true
    }

    /// Store a dependency edge.
    ///
    /// # Errors
    /// Returns an error if the id is taken or an endpoint is unknown.
    pub fn create_dependency(&self, edge: &DependencyEdge) -> Result<DependencyEdge> {
        let mut state = self.lock();
        if state.edges.contains_key(&edge.id) {
            return Err(MemoryStoreError::DuplicateDependency(edge.id));
        }
        for endpoint in [edge.task, edge.depends_on] {
            if !state.tasks.contains_key(&endpoint) {
                return Err(MemoryStoreError::DanglingDependency {
                    edge: edge.id,
                    task: endpoint,
                });
            }
        }
        state.link(edge.clone());
        info!(
            dependency = %edge.id,
            task = %edge.task,
            depends_on = %edge.depends_on,
            "Created dependency"
        );
        Ok(edge.clone())
    }

    /// Point lookup of an edge visible in `scope`.
    #[must_use]
    pub fn dependency(&self, scope: TenantScope, id: DependencyId) -> Option<DependencyEdge> {
        self.lock()
            .edges
            .get(&id)
            .filter(|edge| scope.includes(edge.tenant))
            .cloned()
    }

    /// Remove an edge. Returns `false` if it was not visible in `scope`.
    pub fn delete_dependency(&self, scope: TenantScope, id: DependencyId) -> bool {
        let mut state = self.lock();
        let visible = state
            .edges
            .get(&id)
            .is_some_and(|edge| scope.includes(edge.tenant));
        if !visible {
            return false;
        }
        let removed = state.unlink(id).is_some();
        if removed {
            info!(dependency = %id, "Deleted dependency");
        }
        removed
    }

    /// Edges where `task` is the dependent (its prerequisites).
    #[must_use]
    pub fn dependencies_of(&self, scope: TenantScope, task: TaskId) -> Vec<DependencyEdge> {
        let state = self.lock();
        state.edges_at(&state.depends_on, scope, task)
    }

    /// Edges where `task` is the prerequisite (tasks depending on it).
    #[must_use]
    pub fn dependents_of(&self, scope: TenantScope, task: TaskId) -> Vec<DependencyEdge> {
        let state = self.lock();
        state.edges_at(&state.dependents, scope, task)
    }

    /// Append a schedule change record.
    ///
    /// # Errors
    /// Returns [`MemoryStoreError::DuplicateScheduleEvent`] if the id is taken.
    pub fn append_schedule_event(
        &self,
        event: &ScheduleChangeEvent,
    ) -> Result<ScheduleChangeEvent> {
        let mut state = self.lock();
        if state.schedule_events.iter().any(|existing| existing.id == event.id) {
            return Err(MemoryStoreError::DuplicateScheduleEvent(event.id));
        }
        state.schedule_events.push(event.clone());
        info!(
            event = %event.id,
            task = %event.task,
            affected = event.affected_task_ids.len(),
            "Appended schedule event"
        );
        Ok(event.clone())
    }

    /// Schedule history of `task`, oldest first.
    #[must_use]
    pub fn schedule_events(&self, scope: TenantScope, task: TaskId) -> Vec<ScheduleChangeEvent> {
        self.lock()
            .schedule_events
            .iter()
            .filter(|event| event.task == task && scope.includes(event.tenant))
            .cloned()
            .collect()
    }

    /// Queue an outbound message, replacing a pending one with the same dedupe key.
    pub fn enqueue(&self, message: OutboxMessage) {
        let mut state = self.lock();
        if let Some(pending) = state
            .outbox
            .iter_mut()
            .find(|pending| pending.dedupe_key == message.dedupe_key)
        {
            debug!(key = %message.dedupe_key, "Coalesced outbox message");
            *pending = message;
            return;
        }
        debug!(
            key = %message.dedupe_key,
            event_type = %message.event_type,
            "Queued outbox message"
        );
        state.outbox.push(message);
    }

    /// Pending outbound messages.
    #[must_use]
    pub fn outbox(&self) -> Vec<OutboxMessage> {
        self.lock().outbox.clone()
    }

    /// Take every pending outbound message.
    pub fn drain_outbox(&self) -> Vec<OutboxMessage> {
        std::mem::take(&mut self.lock().outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangar_core::id::AircraftId;
    use hangar_core::{DependencyType, NewTask, outbox};
    use time::Duration;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-02-01 09:00 UTC);

    fn task(tenant: TenantId) -> Task {
        Task::new(
            NewTask {
                tenant,
                aircraft: AircraftId::new(),
                program: None,
                task_type: "inspection".into(),
                start_time: NOW,
                end_time: NOW + Duration::hours(1),
                assigned_mechanic: None,
            },
            NOW,
        )
        .unwrap_or_else(|err| panic!("valid task: {err}"))
    }

    fn edge(a: &Task, b: &Task) -> DependencyEdge {
        DependencyEdge::new(a.tenant, a.id, b.id, DependencyType::FinishToStart, NOW)
    }

    #[test]
    fn tasks_are_isolated_per_tenant() -> Result<()> {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let t = task(tenant);
        store.insert_task(t.clone())?;

        assert!(store.task(TenantScope::Tenant(tenant), t.id).is_some());
        assert!(store.task(TenantScope::Tenant(TenantId::new()), t.id).is_none());
        assert!(store.task(TenantScope::All, t.id).is_some());
        Ok(())
    }

    #[test]
    fn adjacency_is_indexed_both_ways_and_cleaned_on_delete() -> Result<()> {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let (a, b) = (task(tenant), task(tenant));
        store.insert_task(a.clone())?;
        store.insert_task(b.clone())?;
        let e = store.create_dependency(&edge(&a, &b))?;
        let scope = TenantScope::Tenant(tenant);

        assert_eq!(store.dependencies_of(scope, a.id), vec![e.clone()]);
        assert_eq!(store.dependents_of(scope, b.id), vec![e.clone()]);
        assert_eq!(store.dependents_of(TenantScope::All, b.id), vec![e.clone()]);
        assert!(store.dependencies_of(TenantScope::Tenant(TenantId::new()), a.id).is_empty());
        assert_eq!(store.dependency(TenantScope::All, e.id), Some(e.clone()));
        assert_eq!(store.dependency(TenantScope::Tenant(TenantId::new()), e.id), None);

        assert!(!store.delete_dependency(TenantScope::Tenant(TenantId::new()), e.id));
        assert!(store.delete_dependency(scope, e.id));
        assert!(!store.delete_dependency(scope, e.id));
        assert!(store.dependencies_of(scope, a.id).is_empty());
        assert!(store.dependents_of(scope, b.id).is_empty());
        Ok(())
    }

    #[test]
    fn dangling_edges_are_rejected() -> Result<()> {
        let store = MemoryStore::new();
        let a = task(TenantId::new());
        store.insert_task(a.clone())?;
        let ghost = task(a.tenant);
        assert!(matches!(
            store.create_dependency(&edge(&a, &ghost)),
            Err(MemoryStoreError::DanglingDependency { .. })
        ));
        Ok(())
    }

    #[test]
    fn state_update_appends_notes_and_hides_deleted_tasks() -> Result<()> {
        let store = MemoryStore::new();
        let t = task(TenantId::new());
        store.insert_task(t.clone())?;
        let scope = TenantScope::Tenant(t.tenant);

        let updated = store
            .update_task_state(scope, t.id, TaskState::InProgress, "started", NOW)
            .unwrap_or_else(|| panic!("task visible"));
        assert_eq!(updated.state, TaskState::InProgress);
        assert_eq!(updated.notes, "started");

        let updated = store
            .update_task_state(scope, t.id, TaskState::Completed, "Replaced filter", NOW)
            .unwrap_or_else(|| panic!("task visible"));
        assert_eq!(updated.notes, "started\nReplaced filter");

        assert!(store.soft_delete_task(scope, t.id, NOW));
        assert!(store.task(scope, t.id).is_none());
        assert!(store.list_tasks(&TaskFilter::new(scope)).is_empty());
        Ok(())
    }

    #[test]
    fn outbox_coalesces_on_dedupe_key() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let id = TaskId::new();
        store.enqueue(OutboxMessage::for_task(
            tenant,
            id,
            outbox::TASK_RESCHEDULED,
            serde_json::json!({ "n": 1 }),
        ));
        store.enqueue(OutboxMessage::for_task(
            tenant,
            id,
            outbox::TASK_RESCHEDULED,
            serde_json::json!({ "n": 2 }),
        ));
        store.enqueue(OutboxMessage::for_task(
            tenant,
            TaskId::new(),
            outbox::TASK_RESCHEDULED,
            serde_json::json!({ "n": 3 }),
        ));

        let pending = store.drain_outbox();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].payload, serde_json::json!({ "n": 2 }));
        assert!(store.outbox().is_empty());
    }

    #[test]
    fn snapshot_roundtrip_restores_indexes() -> Result<()> {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let (a, b) = (task(tenant), task(tenant));
        store.insert_task(a.clone())?;
        store.insert_task(b.clone())?;
        store.create_dependency(&edge(&a, &b))?;

        let json = serde_json::to_string(&store.snapshot())
            .unwrap_or_else(|err| panic!("snapshot serializes: {err}"));
        let snapshot: Snapshot =
            serde_json::from_str(&json).unwrap_or_else(|err| panic!("snapshot parses: {err}"));
        let restored = MemoryStore::from_snapshot(snapshot)?;

        assert_eq!(restored.dependents_of(TenantScope::Tenant(tenant), b.id).len(), 1);
        Ok(())
    }
}
