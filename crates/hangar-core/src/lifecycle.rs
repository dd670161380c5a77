//! Guarded state machine for maintenance tasks.
//!
//! ```text
//! Scheduled ──► InProgress ──► Completed
//!     │              │
//!     └──────┬───────┘
//!            ▼
//!        Cancelled
//! ```
//!
//! [`can_transition`] is a pure decision: it never persists anything. Releasing
//! reservations, storing the new state and publishing events are left to the caller.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::actor::{Actor, Role};
use crate::error::{Error, Result};
use crate::task::{Task, TaskState};

/// Default tolerance for starting work ahead of the planned start.
pub const DEFAULT_EARLY_START_GRACE: Duration = Duration::minutes(5);
/// Default window after the planned start during which cancellation needs no override.
pub const DEFAULT_LATE_CANCEL_WINDOW: Duration = Duration::hours(24);

/// Operational status of the aircraft a task is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftStatus {
    /// In service.
    Operational,
    /// On the ground and available for maintenance.
    Grounded,
    /// Withdrawn from service.
    Retired,
}

/// Time tolerances applied by the guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPolicy {
    /// How long before the planned start work may begin.
    pub early_start_grace: Duration,
    /// How long after the planned start a cancellation is allowed without override.
    pub late_cancel_window: Duration,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            early_start_grace: DEFAULT_EARLY_START_GRACE,
            late_cancel_window: DEFAULT_LATE_CANCEL_WINDOW,
        }
    }
}

/// Facts gathered by the caller before asking for a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionContext {
    /// Current wall-clock time.
    pub now: OffsetDateTime,
    /// Current status of the task's aircraft.
    pub aircraft_status: AircraftStatus,
    /// Every part reservation on the task is used or released.
    pub reservations_closed: bool,
    /// The caller asks that required parts be verified as used.
    pub require_parts_used: bool,
    /// Every part flagged as required has been used.
    pub required_parts_used: bool,
    /// Every compliance item on the task is signed off.
    pub compliance_signed_off: bool,
    /// Permit completion before the planned end (scheduler/admin only).
    pub allow_early_completion: bool,
    /// Permit cancellation past the late-cancel window.
    pub allow_late_cancel: bool,
    /// Notes recorded with the transition.
    pub notes: String,
}

impl TransitionContext {
    /// Context with every precondition unmet and no overrides.
    #[must_use]
    pub const fn new(now: OffsetDateTime, aircraft_status: AircraftStatus) -> Self {
        Self {
            now,
            aircraft_status,
            reservations_closed: false,
            require_parts_used: false,
            required_parts_used: false,
            compliance_signed_off: false,
            allow_early_completion: false,
            allow_late_cancel: false,
            notes: String::new(),
        }
    }
}

/// Decide whether `actor` may move `task` into `target`.
///
/// A self-transition is always a successful no-op.
///
/// # Errors
/// - [`Error::Validation`] for an unsupported target state or missing completion notes.
/// - [`Error::Forbidden`] when the role or mechanic identity does not permit the move.
/// - [`Error::Conflict`] when any other guard fails.
pub fn can_transition(
    actor: &Actor,
    task: &Task,
    target: TaskState,
    ctx: &TransitionContext,
    policy: &TransitionPolicy,
) -> Result<()> {
    if task.state == target {
        return Ok(());
    }
    match target {
        TaskState::InProgress => guard_start(actor, task, ctx, policy),
        TaskState::Completed => guard_complete(actor, task, ctx),
        TaskState::Cancelled => guard_cancel(actor, task, ctx, policy),
        TaskState::Scheduled => Err(Error::validation(format!(
            "cannot transition task {} back to {}",
            task.id, target
        ))),
    }
}

fn guard_start(
    actor: &Actor,
    task: &Task,
    ctx: &TransitionContext,
    policy: &TransitionPolicy,
) -> Result<()> {
    require_state(task, TaskState::Scheduled, TaskState::InProgress)?;
    ensure_mechanic(actor, task)?;
    if ctx.aircraft_status != AircraftStatus::Grounded {
        return Err(Error::conflict("aircraft must be grounded before work can start"));
    }
    // An earliest start before the calendar begins is never in the future.
    if let Some(earliest) = task.start_time.checked_sub(policy.early_start_grace)
        && ctx.now < earliest
    {
        return Err(Error::conflict(format!(
            "task cannot start more than {} minutes before its planned start",
            policy.early_start_grace.whole_minutes()
        )));
    }
    Ok(())
}

fn guard_complete(actor: &Actor, task: &Task, ctx: &TransitionContext) -> Result<()> {
    require_state(task, TaskState::InProgress, TaskState::Completed)?;
    ensure_mechanic(actor, task)?;
    if ctx.now < task.end_time && !(ctx.allow_early_completion && actor.is_scheduler_or_admin()) {
        return Err(Error::conflict("task cannot be completed before its planned end"));
    }
    if !ctx.reservations_closed {
        return Err(Error::conflict("all part reservations must be used or released"));
    }
    if ctx.require_parts_used && !ctx.required_parts_used {
        return Err(Error::conflict("required parts have not been used"));
    }
    if !ctx.compliance_signed_off {
        return Err(Error::conflict("all compliance items must be signed off"));
    }
    if ctx.notes.trim().is_empty() {
        return Err(Error::validation("completion notes are required"));
    }
    Ok(())
}

fn guard_cancel(
    actor: &Actor,
    task: &Task,
    ctx: &TransitionContext,
    policy: &TransitionPolicy,
) -> Result<()> {
    if task.state == TaskState::Completed {
        return Err(Error::conflict("completed tasks cannot be cancelled"));
    }
    if !actor.is_scheduler_or_admin() {
        return Err(Error::forbidden("only schedulers or admins may cancel tasks"));
    }
    // A deadline past the calendar end is never reached.
    let deadline_passed = task
        .start_time
        .checked_add(policy.late_cancel_window)
        .is_some_and(|deadline| ctx.now > deadline);
    if deadline_passed && !ctx.allow_late_cancel {
        return Err(Error::conflict(format!(
            "task started more than {} hours ago; late cancel override required",
            policy.late_cancel_window.whole_hours()
        )));
    }
    Ok(())
}

fn require_state(task: &Task, expected: TaskState, target: TaskState) -> Result<()> {
    if task.state == expected {
        Ok(())
    } else {
        Err(Error::conflict(format!(
            "cannot move task from {} to {}",
            task.state, target
        )))
    }
}

fn ensure_mechanic(actor: &Actor, task: &Task) -> Result<()> {
    let Some(mechanic) = task.assigned_mechanic else {
        return Err(Error::conflict("task has no assigned mechanic"));
    };
    if actor.role == Role::Mechanic && actor.user != mechanic {
        return Err(Error::forbidden("only the assigned mechanic may work this task"));
    }
    Ok(())
}
