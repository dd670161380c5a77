//! Per-tenant dependency DAG with cycle prevention.

use hangar_core::id::{DependencyId, TaskId};
use hangar_core::{DependencyEdge, DependencyType, Error, Missing, Result, TenantScope};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::service::SchedulingService;
use crate::store::{DependencyStore, SchedulingStore};

impl<S> SchedulingService<S>
where
    S: SchedulingStore,
{
    /// Record that `task` depends on `depends_on`.
    ///
    /// The edge is refused when `depends_on` can already reach `task` through
    /// existing "depends on" edges. `dependency_type` defaults to finish-to-start.
    ///
    /// # Errors
    /// - [`Error::Validation`] for a self-dependency or tasks of different tenants.
    /// - [`Error::NotFound`] naming the side that does not exist.
    /// - [`Error::Conflict`] when the edge would close a cycle or already exists.
    /// - [`Error::Cancelled`] when the request was cancelled before the write.
    pub fn create_dependency(
        &self,
        ctx: &RequestContext,
        task: TaskId,
        depends_on: TaskId,
        dependency_type: Option<DependencyType>,
    ) -> Result<DependencyEdge> {
        if task == depends_on {
            return Err(Error::validation("a task cannot depend on itself"));
        }
        let dependent = self.load_task(ctx, task, Missing::Task)?;
        let prerequisite = self.load_task(ctx, depends_on, Missing::DependsOnTask)?;
        if dependent.tenant != prerequisite.tenant {
            return Err(Error::validation("dependencies cannot span tenants"));
        }

        let tenant = dependent.tenant;
        let _guard = self.locks.acquire(tenant);
        let scope = TenantScope::Tenant(tenant);

        let existing = self
            .store
            .dependencies_of(scope, task)
            .map_err(Error::store)?;
        if existing.iter().any(|edge| edge.depends_on == depends_on) {
            return Err(Error::conflict(format!(
                "task {task} already depends on {depends_on}"
            )));
        }
        if self.reaches(scope, depends_on, task)? {
            return Err(Error::conflict("circular dependency detected"));
        }

        ctx.ensure_active()?;
        let edge = DependencyEdge::new(
            tenant,
            task,
            depends_on,
            dependency_type.unwrap_or_default(),
            self.now(),
        );
        let edge = self.store.create_dependency(&edge).map_err(Error::store)?;
        info!(
            dependency = %edge.id,
            %task,
            %depends_on,
            kind = %edge.dependency_type,
            "Created dependency"
        );
        Ok(edge)
    }

    /// Remove an edge visible to the caller, under the lock of the tenant
    /// owning it.
    ///
    /// # Errors
    /// - [`Error::NotFound`] when the edge does not exist in scope.
    /// - [`Error::Cancelled`] when the request was cancelled before the write.
    pub fn delete_dependency(&self, ctx: &RequestContext, id: DependencyId) -> Result<()> {
        let edge = self
            .store
            .get_dependency(ctx.scope(), id)
            .map_err(Error::store)?
            .ok_or(Error::NotFound(Missing::Dependency(id)))?;
        let _guard = self.locks.acquire(edge.tenant);
        ctx.ensure_active()?;
        let removed = self
            .store
            .delete_dependency(TenantScope::Tenant(edge.tenant), id)
            .map_err(Error::store)?;
        if !removed {
            return Err(Error::NotFound(Missing::Dependency(id)));
        }
        info!(dependency = %id, "Deleted dependency");
        Ok(())
    }

    /// Prerequisites of `task` (edges where it is the source).
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when the task is not visible.
    pub fn list_dependencies(
        &self,
        ctx: &RequestContext,
        task: TaskId,
    ) -> Result<Vec<DependencyEdge>> {
        self.load_task(ctx, task, Missing::Task)?;
        self.store
            .dependencies_of(ctx.scope(), task)
            .map_err(Error::store)
    }

    /// Tasks that depend on `task` (edges where it is the target).
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when the task is not visible.
    pub fn list_dependents(
        &self,
        ctx: &RequestContext,
        task: TaskId,
    ) -> Result<Vec<DependencyEdge>> {
        self.load_task(ctx, task, Missing::Task)?;
        self.store
            .dependents_of(ctx.scope(), task)
            .map_err(Error::store)
    }

    /// Depth-first search over "depends on" edges from `from`, looking for `target`.
    fn reaches(&self, scope: TenantScope, from: TaskId, target: TaskId) -> Result<bool> {
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if node == target {
                debug!(%from, %target, "Dependency path found");
                return Ok(true);
            }
            if !visited.insert(node) {
                continue;
            }
            let edges = self
                .store
                .dependencies_of(scope, node)
                .map_err(Error::store)?;
            stack.extend(
                edges
                    .into_iter()
                    .map(|edge| edge.depends_on)
                    .filter(|next| !visited.contains(next)),
            );
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::context::CancelToken;
    use hangar_core::id::{AircraftId, TenantId, UserId};
    use hangar_core::{Actor, ErrorKind, NewTask, Role, Task};
    use hangar_store_mem::MemoryStore;
    use time::Duration;
    use time::macros::datetime;

    const NOW: time::OffsetDateTime = datetime!(2026-04-01 06:00 UTC);

    struct Fixture {
        service: SchedulingService<MemoryStore>,
        ctx: RequestContext,
    }

    impl Fixture {
        fn new() -> Self {
            let actor = Actor::new(TenantId::new(), UserId::new(), Role::Scheduler);
            Self {
                service: SchedulingService::new(MemoryStore::new(), ProjectConfig::default()),
                ctx: RequestContext::new(actor),
            }
        }

        fn task(&self) -> TaskId {
            self.task_for(self.ctx.actor.tenant)
        }

        fn task_for(&self, tenant: TenantId) -> TaskId {
            let task = Task::new(
                NewTask {
                    tenant,
                    aircraft: AircraftId::new(),
                    program: None,
                    task_type: "inspection".into(),
                    start_time: NOW,
                    end_time: NOW + Duration::hours(1),
                    assigned_mechanic: None,
                },
                NOW,
            )
            .unwrap_or_else(|err| panic!("valid task: {err}"));
            let id = task.id;
            self.service
                .store()
                .insert_task(task)
                .unwrap_or_else(|err| panic!("insert task: {err}"));
            id
        }

        fn depend(&self, task: TaskId, on: TaskId) -> Result<DependencyEdge> {
            self.service.create_dependency(&self.ctx, task, on, None)
        }
    }

    fn kind<T>(result: Result<T>) -> Option<ErrorKind> {
        result.err().map(|err| err.kind())
    }

    #[test]
    fn creates_finish_to_start_edge_by_default() -> Result<()> {
        let fx = Fixture::new();
        let (x, y) = (fx.task(), fx.task());
        let edge = fx.depend(x, y)?;

        assert_eq!(edge.dependency_type, DependencyType::FinishToStart);
        assert_eq!(edge.tenant, fx.ctx.actor.tenant);
        assert_eq!(fx.service.list_dependencies(&fx.ctx, x)?, vec![edge.clone()]);
        assert_eq!(fx.service.list_dependents(&fx.ctx, y)?, vec![edge]);
        Ok(())
    }

    #[test]
    fn self_dependency_is_invalid() {
        let fx = Fixture::new();
        let x = fx.task();
        assert_eq!(kind(fx.depend(x, x)), Some(ErrorKind::Validation));
    }

    #[test]
    fn missing_side_is_reported() {
        let fx = Fixture::new();
        let x = fx.task();
        let ghost = TaskId::new();

        let err = fx.depend(ghost, x).err();
        assert!(matches!(err, Some(Error::NotFound(Missing::Task(id))) if id == ghost));
        let err = fx.depend(x, ghost).err();
        assert!(matches!(err, Some(Error::NotFound(Missing::DependsOnTask(id))) if id == ghost));
    }

    #[test]
    fn other_tenants_tasks_are_not_found() {
        let fx = Fixture::new();
        let x = fx.task();
        let foreign = fx.task_for(TenantId::new());
        assert_eq!(kind(fx.depend(x, foreign)), Some(ErrorKind::NotFound));
    }

    #[test]
    fn two_cycle_is_rejected_and_edges_unchanged() -> Result<()> {
        let fx = Fixture::new();
        let (x, y) = (fx.task(), fx.task());
        let first = fx.depend(x, y)?;

        assert_eq!(kind(fx.depend(y, x)), Some(ErrorKind::Conflict));
        assert!(fx.service.list_dependencies(&fx.ctx, y)?.is_empty());
        assert_eq!(fx.service.list_dependencies(&fx.ctx, x)?, vec![first]);
        Ok(())
    }

    #[test]
    fn long_cycle_is_rejected() -> Result<()> {
        let fx = Fixture::new();
        let chain: Vec<TaskId> = (0..5).map(|_| fx.task()).collect();
        for pair in chain.windows(2) {
            fx.depend(pair[1], pair[0])?;
        }
        let before = fx.service.store().snapshot().dependencies;

        assert_eq!(kind(fx.depend(chain[0], chain[4])), Some(ErrorKind::Conflict));
        assert_eq!(fx.service.store().snapshot().dependencies, before);
        Ok(())
    }

    #[test]
    fn diamond_is_not_a_cycle() -> Result<()> {
        let fx = Fixture::new();
        let (top, left, right, bottom) = (fx.task(), fx.task(), fx.task(), fx.task());
        fx.depend(left, top)?;
        fx.depend(right, top)?;
        fx.depend(bottom, left)?;
        fx.depend(bottom, right)?;
        assert_eq!(fx.service.list_dependents(&fx.ctx, top)?.len(), 2);
        Ok(())
    }

    #[test]
    fn duplicate_edge_is_a_conflict() -> Result<()> {
        let fx = Fixture::new();
        let (x, y) = (fx.task(), fx.task());
        fx.depend(x, y)?;
        assert_eq!(kind(fx.depend(x, y)), Some(ErrorKind::Conflict));
        Ok(())
    }

    #[test]
    fn delete_is_tenant_scoped() -> Result<()> {
        let fx = Fixture::new();
        let (x, y) = (fx.task(), fx.task());
        let edge = fx.depend(x, y)?;

        let outsider = Actor::new(TenantId::new(), UserId::new(), Role::Scheduler);
        let outsider = RequestContext::new(outsider);
        assert_eq!(
            kind(fx.service.delete_dependency(&outsider, edge.id)),
            Some(ErrorKind::NotFound)
        );

        fx.service.delete_dependency(&fx.ctx, edge.id)?;
        assert!(fx.service.list_dependencies(&fx.ctx, x)?.is_empty());
        assert_eq!(
            kind(fx.service.delete_dependency(&fx.ctx, edge.id)),
            Some(ErrorKind::NotFound)
        );
        Ok(())
    }

    #[test]
    fn admin_delete_waits_for_the_edge_owners_lock() -> Result<()> {
        let fx = Fixture::new();
        let (x, y) = (fx.task(), fx.task());
        let edge = fx.depend(x, y)?;
        let admin = RequestContext::new(Actor::new(TenantId::new(), UserId::new(), Role::Admin));

        let owner_lock = fx.service.locks.acquire(fx.ctx.actor.tenant);
        std::thread::scope(|scope| {
            let deletion = scope.spawn(|| fx.service.delete_dependency(&admin, edge.id));
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert!(!deletion.is_finished());
            assert_eq!(fx.service.store().snapshot().dependencies.len(), 1);

            drop(owner_lock);
            deletion
                .join()
                .unwrap_or_else(|_| panic!("deletion thread panicked"))
        })?;
        assert!(fx.service.store().snapshot().dependencies.is_empty());
        Ok(())
    }

    #[test]
    fn cancelled_request_writes_nothing() {
        let fx = Fixture::new();
        let (x, y) = (fx.task(), fx.task());
        let token = CancelToken::new();
        let ctx = RequestContext::with_cancel(fx.ctx.actor.clone(), token.clone());
        token.cancel();

        assert_eq!(
            kind(fx.service.create_dependency(&ctx, x, y, None)),
            Some(ErrorKind::Cancelled)
        );
        assert!(fx.service.store().snapshot().dependencies.is_empty());
    }
}
