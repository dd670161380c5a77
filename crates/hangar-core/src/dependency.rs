use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::OffsetDateTime;

use crate::id::{DependencyId, TaskId, TenantId};

/// How a task is constrained relative to its prerequisite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// The dependent may not start before the prerequisite finishes.
    #[default]
    FinishToStart,
    /// The dependent may not start before the prerequisite starts.
    StartToStart,
    /// The dependent may not finish before the prerequisite finishes.
    FinishToFinish,
}

impl DependencyType {
    /// String representation used in fixtures and CLI flags.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FinishToStart => "finish_to_start",
            Self::StartToStart => "start_to_start",
            Self::FinishToFinish => "finish_to_finish",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "finish_to_start" | "fs" => Ok(Self::FinishToStart),
            "start_to_start" | "ss" => Ok(Self::StartToStart),
            "finish_to_finish" | "ff" => Ok(Self::FinishToFinish),
            other => Err(format!("unknown dependency type '{other}'")),
        }
    }
}

/// Directed edge: `task` depends on `depends_on`.
///
/// Edges are created and deleted, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Edge identifier.
    pub id: DependencyId,
    /// Owning tenant.
    pub tenant: TenantId,
    /// The constrained (dependent) task.
    pub task: TaskId,
    /// The prerequisite task.
    pub depends_on: TaskId,
    /// Relationship kind.
    #[serde(default)]
    pub dependency_type: DependencyType,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl DependencyEdge {
    /// Build a new edge with a fresh identifier.
    #[must_use]
    pub fn new(
        tenant: TenantId,
        task: TaskId,
        depends_on: TaskId,
        dependency_type: DependencyType,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: DependencyId::new(),
            tenant,
            task,
            depends_on,
            dependency_type,
            created_at,
        }
    }
}
