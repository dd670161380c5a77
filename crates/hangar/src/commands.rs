//! Subcommand handlers. Each returns the JSON document printed on stdout.

use anyhow::{Context, Result};
use hangar_app::{RescheduleRequest, RequestContext, SchedulingService, SchedulingStore, TaskStore};
use hangar_core::{TaskFilter, TransitionContext};
use serde::Serialize;

use crate::Command;

/// Execute `command` and render its result.
pub fn run<S: SchedulingStore>(
    command: Command,
    service: &SchedulingService<S>,
    ctx: &RequestContext,
) -> Result<String> {
    match command {
        Command::Tasks { states } => {
            let filter = TaskFilter::new(ctx.scope()).with_states(states);
            let tasks = service
                .store()
                .list_tasks(&filter)
                .map_err(Into::<anyhow::Error>::into)
                .context("failed to list tasks")?;
            render(&tasks)
        }
        Command::Conflicts => render(&service.detect_conflicts(ctx)?),
        Command::Depend { task, on, kind } => {
            render(&service.create_dependency(ctx, task, on, kind)?)
        }
        Command::Undepend { dependency } => {
            service.delete_dependency(ctx, dependency)?;
            render(&Deleted { dependency })
        }
        Command::Deps { task } => render(&service.list_dependencies(ctx, task)?),
        Command::Dependents { task } => render(&service.list_dependents(ctx, task)?),
        Command::Reschedule {
            task,
            start,
            end,
            reason,
            cascade,
        } => render(&service.reschedule_task(
            ctx,
            &RescheduleRequest {
                task,
                new_start: start,
                new_end: end,
                reason,
                cascade,
            },
        )?),
        Command::Transition {
            task,
            state,
            aircraft,
            reservations_closed,
            require_parts_used,
            parts_used,
            signed_off,
            allow_early_completion,
            allow_late_cancel,
            notes,
        } => {
            let transition = TransitionContext {
                reservations_closed,
                require_parts_used,
                required_parts_used: parts_used,
                compliance_signed_off: signed_off,
                allow_early_completion,
                allow_late_cancel,
                notes: notes.unwrap_or_default(),
                ..service.transition_context(aircraft.into())
            };
            render(&service.transition_task_state(ctx, task, state, &transition)?)
        }
        Command::History { task } => render(&service.list_schedule_changes(ctx, task)?),
    }
}

#[derive(Serialize)]
struct Deleted {
    dependency: hangar_core::id::DependencyId,
}

fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to encode output")
}
