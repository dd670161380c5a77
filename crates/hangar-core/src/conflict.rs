use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// Classification of a detected schedule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// The task is planned to start before a prerequisite ends.
    UnmetDependency,
}

/// Computed schedule violation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Task that violates the schedule.
    pub task: TaskId,
    /// Violation kind.
    pub conflict_type: ConflictType,
    /// Human-readable explanation.
    pub description: String,
    /// Tasks blocking `task`.
    pub blocking_task_ids: Vec<TaskId>,
}
