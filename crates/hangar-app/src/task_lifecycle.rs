//! Applying guarded state transitions.

use hangar_core::id::TaskId;
use hangar_core::outbox::TASK_STATE_CHANGED;
use hangar_core::{
    Error, Missing, Result, Task, TaskState, TenantScope, TransitionContext, can_transition,
};
use serde::Serialize;
use tracing::info;

use crate::context::RequestContext;
use crate::service::SchedulingService;
use crate::store::{SchedulingStore, TaskStore};

#[derive(Serialize)]
struct StateChanged<'a> {
    task_id: TaskId,
    from: TaskState,
    to: TaskState,
    notes: &'a str,
}

impl<S> SchedulingService<S>
where
    S: SchedulingStore,
{
    /// Move a task into `target` when every lifecycle guard holds.
    ///
    /// A self-transition returns the task unchanged. Cancelling releases the
    /// task's part reservations before the new state is stored.
    ///
    /// # Errors
    /// - [`Error::NotFound`] when the task is not visible.
    /// - [`Error::Validation`], [`Error::Forbidden`] or [`Error::Conflict`] from
    ///   the lifecycle guards.
    /// - [`Error::Cancelled`] / [`Error::Store`] when the request stops before the write.
    pub fn transition_task_state(
        &self,
        ctx: &RequestContext,
        task: TaskId,
        target: TaskState,
        transition: &TransitionContext,
    ) -> Result<Task> {
        let tenant = self.load_task(ctx, task, Missing::Task)?.tenant;
        let _guard = self.locks.acquire(tenant);

        let current = self.load_task(ctx, task, Missing::Task)?;
        can_transition(
            &ctx.actor,
            &current,
            target,
            transition,
            &self.transition_policy(),
        )?;
        if current.state == target {
            return Ok(current);
        }

        ctx.ensure_active()?;
        if target == TaskState::Cancelled
            && let Some(reservations) = &self.reservations
        {
            reservations
                .release_for_task(current.tenant, current.id)
                .map_err(Error::store)?;
        }

        ctx.ensure_active()?;
        let updated = self
            .store
            .update_task_state(
                TenantScope::Tenant(current.tenant),
                task,
                target,
                &transition.notes,
                self.now(),
            )
            .map_err(Error::store)?
            .ok_or(Error::NotFound(Missing::Task(task)))?;
        info!(
            %task,
            from = %current.state,
            to = %target,
            actor = %ctx.actor.user,
            "Transitioned task"
        );

        self.publish(
            updated.tenant,
            task,
            TASK_STATE_CHANGED,
            &StateChanged {
                task_id: task,
                from: current.state,
                to: target,
                notes: transition.notes.trim(),
            },
        );
        Ok(updated)
    }
}
