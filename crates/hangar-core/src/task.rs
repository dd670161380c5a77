use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::actor::TenantScope;
use crate::error::{Error, Result};
use crate::id::{AircraftId, ProgramId, TaskId, TenantId, UserId};

/// Lifecycle state of a maintenance task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Planned, not started. Initial state.
    Scheduled,
    /// Work is underway.
    InProgress,
    /// Work finished and signed off.
    Completed,
    /// Work will not be performed.
    Cancelled,
}

impl TaskState {
    /// String representation used in fixtures and CLI flags.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// `Completed` and `Cancelled` admit no further transitions or time changes.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// `Scheduled` and `InProgress`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown task state '{other}'")),
        }
    }
}

/// A scheduled unit of maintenance work on one aircraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: TaskId,
    /// Owning tenant.
    pub tenant: TenantId,
    /// Aircraft the work is performed on.
    pub aircraft: AircraftId,
    /// Maintenance program the task was generated from, if any.
    #[serde(default)]
    pub program: Option<ProgramId>,
    /// Free-form task type (inspection, repair, ...).
    pub task_type: String,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Planned start (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    /// Planned end (UTC), strictly after `start_time`.
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    /// Mechanic responsible for the work.
    #[serde(default)]
    pub assigned_mechanic: Option<UserId>,
    /// Free-text notes; transition notes are appended here.
    #[serde(default)]
    pub notes: String,
    /// Soft-delete marker.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last modification timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields needed to create a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Owning tenant.
    pub tenant: TenantId,
    /// Aircraft the work is performed on.
    pub aircraft: AircraftId,
    /// Originating program.
    pub program: Option<ProgramId>,
    /// Task type.
    pub task_type: String,
    /// Planned start.
    pub start_time: OffsetDateTime,
    /// Planned end.
    pub end_time: OffsetDateTime,
    /// Assigned mechanic.
    pub assigned_mechanic: Option<UserId>,
}

impl Task {
    /// Create a task in state [`TaskState::Scheduled`].
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the window is empty or inverted.
    pub fn new(input: NewTask, now: OffsetDateTime) -> Result<Self> {
        let (start_time, end_time) = normalize_window(input.start_time, input.end_time)?;
        Ok(Self {
            id: TaskId::new(),
            tenant: input.tenant,
            aircraft: input.aircraft,
            program: input.program,
            task_type: input.task_type,
            state: TaskState::Scheduled,
            start_time,
            end_time,
            assigned_mechanic: input.assigned_mechanic,
            notes: String::new(),
            deleted_at: None,
            created_at: to_utc(now),
            updated_at: to_utc(now),
        })
    }

    /// Replace the time window, keeping `end > start`.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the window is empty or inverted.
    pub fn set_window(
        &mut self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<()> {
        let (start_time, end_time) = normalize_window(start, end)?;
        self.start_time = start_time;
        self.end_time = end_time;
        self.updated_at = to_utc(now);
        Ok(())
    }

    /// Translate the window by `delta`.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when either end leaves the representable
    /// range. The task is left untouched.
    pub fn shift(&mut self, delta: Duration, now: OffsetDateTime) -> Result<()> {
        let (Some(start_time), Some(end_time)) = (
            self.start_time.checked_add(delta),
            self.end_time.checked_add(delta),
        ) else {
            return Err(Error::validation("shifted window is out of range"));
        };
        self.start_time = start_time;
        self.end_time = end_time;
        self.updated_at = to_utc(now);
        Ok(())
    }

    /// Soft-deleted tasks are invisible to the scheduling core.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Validate `end > start` and convert both ends to UTC.
///
/// # Errors
/// Returns [`Error::Validation`] when `end <= start`.
pub fn normalize_window(
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<(OffsetDateTime, OffsetDateTime)> {
    if end <= start {
        return Err(Error::validation("end time must be after start time"));
    }
    Ok((to_utc(start), to_utc(end)))
}

/// Convert a timestamp to UTC.
#[must_use]
pub fn to_utc(ts: OffsetDateTime) -> OffsetDateTime {
    ts.to_offset(UtcOffset::UTC)
}

/// Query parameters for listing tasks.
#[derive(Debug, Clone)]
pub struct TaskFilter {
    /// Tenant visibility.
    pub scope: TenantScope,
    /// States to include; empty means all.
    pub states: BTreeSet<TaskState>,
    /// Whether soft-deleted tasks are returned.
    pub include_deleted: bool,
}

impl TaskFilter {
    /// All non-deleted tasks visible in `scope`.
    #[must_use]
    pub const fn new(scope: TenantScope) -> Self {
        Self {
            scope,
            states: BTreeSet::new(),
            include_deleted: false,
        }
    }

    /// Restrict to the given states.
    #[must_use]
    pub fn with_states(mut self, states: impl IntoIterator<Item = TaskState>) -> Self {
        self.states.extend(states);
        self
    }

    /// Whether `task` passes this filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.scope.includes(task.tenant)
            && (self.include_deleted || !task.is_deleted())
            && (self.states.is_empty() || self.states.contains(&task.state))
    }
}
