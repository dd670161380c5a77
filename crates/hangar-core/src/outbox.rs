use serde::{Deserialize, Serialize};

use crate::id::{TaskId, TenantId};

/// Event type emitted after a successful reschedule.
pub const TASK_RESCHEDULED: &str = "task.rescheduled";
/// Event type emitted after a successful state transition.
pub const TASK_STATE_CHANGED: &str = "task.state_changed";
/// Aggregate type for task events.
pub const AGGREGATE_TASK: &str = "task";

/// Message handed to the outbound event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Owning tenant.
    pub tenant: TenantId,
    /// Event type, e.g. [`TASK_RESCHEDULED`].
    pub event_type: String,
    /// Aggregate type, e.g. [`AGGREGATE_TASK`].
    pub aggregate_type: String,
    /// Aggregate identifier.
    pub aggregate_id: String,
    /// JSON payload.
    pub payload: serde_json::Value,
    /// Pending messages sharing this key are coalesced.
    pub dedupe_key: String,
}

impl OutboxMessage {
    /// Task-scoped message deduplicated on `(tenant, task)`.
    #[must_use]
    pub fn for_task(
        tenant: TenantId,
        task: TaskId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            tenant,
            event_type: event_type.to_owned(),
            aggregate_type: AGGREGATE_TASK.to_owned(),
            aggregate_id: task.to_string(),
            payload,
            dedupe_key: task_dedupe_key(tenant, task),
        }
    }
}

/// Dedupe key for task-scoped messages.
#[must_use]
pub fn task_dedupe_key(tenant: TenantId, task: TaskId) -> String {
    format!("{tenant}:{task}")
}
