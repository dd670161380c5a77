//! Scheduling service shared by every front end.
//!
//! The operations themselves live in [`crate::dependency_manager`],
//! [`crate::rescheduler`], [`crate::conflict_detector`] and
//! [`crate::task_lifecycle`]; this module owns the collaborators they share.

use hangar_core::id::{TaskId, TenantId};
use hangar_core::task::to_utc;
use hangar_core::{
    AircraftStatus, Clock, Error, Missing, OutboxMessage, Result, SystemClock, Task,
    TransitionContext, TransitionPolicy,
};
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::warn;

use crate::config::ProjectConfig;
use crate::context::RequestContext;
use crate::store::{EventPublisher, PartsReservations, SchedulingStore, TaskStore};
use crate::tenant_lock::TenantLocks;

/// Entry point for dependency management, rescheduling, conflict detection and
/// task state transitions.
pub struct SchedulingService<S> {
    pub(crate) store: S,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) publisher: Option<Arc<dyn EventPublisher>>,
    pub(crate) reservations: Option<Arc<dyn PartsReservations>>,
    pub(crate) locks: TenantLocks,
    pub(crate) config: ProjectConfig,
}

impl<S> SchedulingService<S> {
    /// Construct a service reading the system clock, without publisher or reservations.
    pub fn new(store: S, config: ProjectConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            publisher: None,
            reservations: None,
            locks: TenantLocks::new(),
            config,
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach an outbox publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Attach part reservation bookkeeping, released on cancellation.
    #[must_use]
    pub fn with_reservations(mut self, reservations: Arc<dyn PartsReservations>) -> Self {
        self.reservations = Some(reservations);
        self
    }

    /// Expose a reference to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Borrow the project configuration.
    pub const fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Guard tolerances used by state transitions.
    #[must_use]
    pub const fn transition_policy(&self) -> TransitionPolicy {
        self.config.lifecycle.policy()
    }

    /// Current time in UTC.
    pub fn now(&self) -> OffsetDateTime {
        to_utc(self.clock.now())
    }

    /// Transition context stamped with the service clock and no preconditions met.
    pub fn transition_context(&self, aircraft_status: AircraftStatus) -> TransitionContext {
        TransitionContext::new(self.now(), aircraft_status)
    }

    /// Enqueue a task-scoped outbound message. Failures are logged and dropped.
    pub(crate) fn publish<P: Serialize>(
        &self,
        tenant: TenantId,
        task: TaskId,
        event_type: &str,
        payload: &P,
    ) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        let payload = match serde_json::to_value(payload) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%task, %event_type, "Failed to encode outbox payload: {err}");
                return;
            }
        };
        let message = OutboxMessage::for_task(tenant, task, event_type, payload);
        if let Err(err) = publisher.enqueue(message) {
            warn!(%task, %event_type, "Failed to enqueue outbox message: {err:#}");
        }
    }
}

impl<S> SchedulingService<S>
where
    S: SchedulingStore,
{
    /// Load a task visible to the caller, tagging a miss with `missing`.
    pub(crate) fn load_task(
        &self,
        ctx: &RequestContext,
        id: TaskId,
        missing: fn(TaskId) -> Missing,
    ) -> Result<Task> {
        self.store
            .get_task(ctx.scope(), id)
            .map_err(Error::store)?
            .ok_or_else(|| Error::NotFound(missing(id)))
    }
}
