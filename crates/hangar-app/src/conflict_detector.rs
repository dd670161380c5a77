//! Read-only detection of unmet finish-to-start dependencies.

use hangar_core::{
    Conflict, ConflictType, DependencyType, Error, Result, Task, TaskFilter, TaskState,
    TenantScope,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::context::RequestContext;
use crate::service::SchedulingService;
use crate::store::{DependencyStore, SchedulingStore, TaskStore};

impl<S> SchedulingService<S>
where
    S: SchedulingStore,
{
    /// Report every active task planned to start before an unfinished
    /// finish-to-start prerequisite ends. Nothing is written.
    ///
    /// A task with several unmet prerequisites yields one conflict per prerequisite.
    ///
    /// # Errors
    /// Returns [`Error::Store`] when a lookup fails, or [`Error::Cancelled`].
    pub fn detect_conflicts(&self, ctx: &RequestContext) -> Result<Vec<Conflict>> {
        ctx.ensure_active()?;
        let filter = TaskFilter::new(ctx.scope())
            .with_states([TaskState::Scheduled, TaskState::InProgress]);
        let active = self.store.list_tasks(&filter).map_err(Error::store)?;

        let mut conflicts = Vec::new();
        for task in &active {
            let scope = TenantScope::Tenant(task.tenant);
            let edges = self
                .store
                .dependencies_of(scope, task.id)
                .map_err(Error::store)?;
            for edge in edges
                .iter()
                .filter(|edge| edge.dependency_type == DependencyType::FinishToStart)
            {
                let Some(prerequisite) = self
                    .store
                    .get_task(scope, edge.depends_on)
                    .map_err(Error::store)?
                else {
                    continue;
                };
                if let Some(conflict) = unmet(task, &prerequisite) {
                    conflicts.push(conflict);
                }
            }
        }
        debug!(
            checked = active.len(),
            found = conflicts.len(),
            "Detected schedule conflicts"
        );
        Ok(conflicts)
    }
}

fn unmet(task: &Task, prerequisite: &Task) -> Option<Conflict> {
    if prerequisite.state == TaskState::Completed || task.start_time >= prerequisite.end_time {
        return None;
    }
    Some(Conflict {
        task: task.id,
        conflict_type: ConflictType::UnmetDependency,
        description: format!(
            "task {} starts at {} before prerequisite {} ends at {}",
            task.id,
            rfc3339(task.start_time),
            prerequisite.id,
            rfc3339(prerequisite.end_time)
        ),
        blocking_task_ids: vec![prerequisite.id],
    })
}

fn rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}
