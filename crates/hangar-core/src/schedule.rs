use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::id::{ScheduleEventId, TaskId, TenantId, UserId};

/// Kind of schedule mutation recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// The task's time window was moved.
    Rescheduled,
}

/// Immutable, append-only record of one schedule mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleChangeEvent {
    /// Record identifier.
    pub id: ScheduleEventId,
    /// Owning tenant.
    pub tenant: TenantId,
    /// Task that was rescheduled directly.
    pub task: TaskId,
    /// What changed.
    pub change_type: ChangeType,
    /// Why it changed.
    pub reason: String,
    /// Start before the change.
    #[serde(with = "time::serde::rfc3339")]
    pub old_start: OffsetDateTime,
    /// End before the change.
    #[serde(with = "time::serde::rfc3339")]
    pub old_end: OffsetDateTime,
    /// Start after the change.
    #[serde(with = "time::serde::rfc3339")]
    pub new_start: OffsetDateTime,
    /// End after the change.
    #[serde(with = "time::serde::rfc3339")]
    pub new_end: OffsetDateTime,
    /// User who triggered the change.
    pub triggered_by: UserId,
    /// Dependents shifted by the cascade, in the order they were written.
    #[serde(default)]
    pub affected_task_ids: Vec<TaskId>,
    /// Record timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
