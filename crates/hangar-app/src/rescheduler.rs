//! Moving a task's window and cascading the shift to its dependents.

use hangar_core::id::{ScheduleEventId, TaskId};
use hangar_core::outbox::TASK_RESCHEDULED;
use hangar_core::task::normalize_window;
use hangar_core::{
    ChangeType, Error, Missing, Result, ScheduleChangeEvent, Task, TenantScope,
};
use std::collections::HashSet;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::config::CascadeFailure;
use crate::context::RequestContext;
use crate::service::SchedulingService;
use crate::store::{DependencyStore, ScheduleEventStore, SchedulingStore, TaskStore};

/// One dependent moved by a cascade.
struct CascadeStep {
    original: Task,
    moved: Task,
    via: TaskId,
}

/// Input for [`SchedulingService::reschedule_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescheduleRequest {
    /// Task to move.
    pub task: TaskId,
    /// Requested start.
    pub new_start: OffsetDateTime,
    /// Requested end; must be after `new_start`.
    pub new_end: OffsetDateTime,
    /// Why the task moves. Required.
    pub reason: String,
    /// Shift every transitive dependent by the change of end time.
    pub cascade: bool,
}

impl<S> SchedulingService<S>
where
    S: SchedulingStore,
{
    /// Move a task's window, optionally cascading the end-time delta to its
    /// transitive dependents, and record the change.
    ///
    /// Dependents in a terminal state are skipped and the cascade does not
    /// continue through them. A task reachable through several paths shifts once.
    /// Dependents are planned before anything is written, so a cascade that
    /// would push one of them out of the representable time range is refused
    /// up front. When a cascade write fails, [`CascadeFailure`] decides whether
    /// shifts already applied are kept (and recorded) or rolled back.
    ///
    /// # Errors
    /// - [`Error::Validation`] for an empty or inverted window, a blank reason,
    ///   or a cascade that would shift a dependent out of range.
    /// - [`Error::NotFound`] when the task is not visible or soft-deleted.
    /// - [`Error::Forbidden`] when the actor may not reschedule.
    /// - [`Error::Conflict`] when the task is completed or cancelled.
    /// - [`Error::Cancelled`] / [`Error::Store`] when the request stops part-way.
    pub fn reschedule_task(
        &self,
        ctx: &RequestContext,
        request: &RescheduleRequest,
    ) -> Result<ScheduleChangeEvent> {
        let (new_start, new_end) = normalize_window(request.new_start, request.new_end)?;
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(Error::validation("a reschedule reason is required"));
        }

        let task = self.load_task(ctx, request.task, Missing::Task)?;
        if !ctx.actor.can_reschedule() {
            return Err(Error::forbidden("only schedulers or admins may reschedule tasks"));
        }
        ensure_open(&task)?;

        let _guard = self.locks.acquire(task.tenant);
        let task = self.load_task(ctx, request.task, Missing::Task)?;
        ensure_open(&task)?;

        let now = self.now();
        let mut event = ScheduleChangeEvent {
            id: ScheduleEventId::new(),
            tenant: task.tenant,
            task: task.id,
            change_type: ChangeType::Rescheduled,
            reason: reason.to_owned(),
            old_start: task.start_time,
            old_end: task.end_time,
            new_start,
            new_end,
            triggered_by: ctx.actor.user,
            affected_task_ids: Vec::new(),
            created_at: now,
        };

        let delta = new_end - task.end_time;
        let steps = if request.cascade && !delta.is_zero() {
            self.plan_cascade(&task, delta, now)?
        } else {
            Vec::new()
        };

        ctx.ensure_active()?;
        let mut moved = task.clone();
        moved.set_window(new_start, new_end, now)?;
        self.store.update_task(&moved).map_err(Error::store)?;
        info!(
            task = %task.id,
            start = %new_start,
            end = %new_end,
            "Rescheduled task"
        );

        if !steps.is_empty() {
            let mut shifted = Vec::new();
            if let Err(err) = self.apply_cascade(ctx, steps, delta, &mut shifted) {
                return Err(self.cascade_failed(&task, event, &shifted, err));
            }
            event.affected_task_ids = shifted.iter().map(|original| original.id).collect();
        }

        let event = self
            .store
            .append_schedule_event(&event)
            .map_err(Error::store)?;
        self.publish(event.tenant, event.task, TASK_RESCHEDULED, &event);
        Ok(event)
    }

    /// Schedule change history of a task, oldest first.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when the task is not visible.
    pub fn list_schedule_changes(
        &self,
        ctx: &RequestContext,
        task: TaskId,
    ) -> Result<Vec<ScheduleChangeEvent>> {
        self.load_task(ctx, task, Missing::Task)?;
        self.store
            .schedule_events(ctx.scope(), task)
            .map_err(Error::store)
    }

    /// Walk "depends on me" edges from `root` and compute the shifted image of
    /// every open dependent, in write order. Nothing is written.
    fn plan_cascade(
        &self,
        root: &Task,
        delta: Duration,
        now: OffsetDateTime,
    ) -> Result<Vec<CascadeStep>> {
        let scope = TenantScope::Tenant(root.tenant);
        let mut visited = HashSet::from([root.id]);
        let mut stack = vec![root.id];
        let mut steps = Vec::new();

        while let Some(current) = stack.pop() {
            let edges = self
                .store
                .dependents_of(scope, current)
                .map_err(Error::store)?;
            for edge in edges {
                if !visited.insert(edge.task) {
                    continue;
                }
                let Some(dependent) = self.store.get_task(scope, edge.task).map_err(Error::store)?
                else {
                    debug!(task = %edge.task, "Skipping missing dependent");
                    continue;
                };
                if dependent.state.is_terminal() {
                    debug!(
                        task = %dependent.id,
                        state = %dependent.state,
                        "Skipping closed dependent"
                    );
                    continue;
                }

                let mut moved = dependent.clone();
                moved.shift(delta, now)?;
                steps.push(CascadeStep {
                    original: dependent,
                    moved,
                    via: current,
                });
                stack.push(edge.task);
            }
        }
        Ok(steps)
    }

    /// Write planned shifts in order. The pre-shift image of every written
    /// task is pushed to `shifted`.
    fn apply_cascade(
        &self,
        ctx: &RequestContext,
        steps: Vec<CascadeStep>,
        delta: Duration,
        shifted: &mut Vec<Task>,
    ) -> Result<()> {
        for step in steps {
            ctx.ensure_active()?;
            self.store.update_task(&step.moved).map_err(Error::store)?;
            debug!(
                task = %step.original.id,
                via = %step.via,
                delta_minutes = delta.whole_minutes(),
                "Cascaded reschedule"
            );
            shifted.push(step.original);
        }
        Ok(())
    }

    fn cascade_failed(
        &self,
        root: &Task,
        mut event: ScheduleChangeEvent,
        shifted: &[Task],
        err: Error,
    ) -> Error {
        match self.config.schedule.cascade_failure {
            CascadeFailure::KeepApplied => {
                event.affected_task_ids = shifted.iter().map(|original| original.id).collect();
                warn!(
                    task = %root.id,
                    applied = shifted.len(),
                    "Cascade stopped part-way; keeping applied shifts: {err}"
                );
                match self.store.append_schedule_event(&event) {
                    Ok(event) => {
                        self.publish(event.tenant, event.task, TASK_RESCHEDULED, &event);
                    }
                    Err(append_err) => {
                        let append_err: anyhow::Error = append_err.into();
                        warn!(task = %root.id, "Failed to record partial reschedule: {append_err:#}");
                    }
                }
            }
            CascadeFailure::RollBack => {
                warn!(
                    task = %root.id,
                    applied = shifted.len(),
                    "Cascade stopped part-way; rolling back: {err}"
                );
                for original in shifted.iter().rev().chain(std::iter::once(root)) {
                    if let Err(restore_err) = self.store.update_task(original) {
                        let restore_err: anyhow::Error = restore_err.into();
                        warn!(task = %original.id, "Failed to restore task window: {restore_err:#}");
                    }
                }
            }
        }
        err
    }
}

fn ensure_open(task: &Task) -> Result<()> {
    if task.state.is_terminal() {
        return Err(Error::conflict(format!(
            "task {} is {} and cannot be rescheduled",
            task.id, task.state
        )));
    }
    Ok(())
}
