//! Domain types, error taxonomy and the task lifecycle state machine for hangar.

/// Caller identity and tenant scoping.
pub mod actor;
/// Injectable wall clock.
pub mod clock;
/// Derived schedule violations.
pub mod conflict;
/// Dependency edges between tasks.
pub mod dependency;
/// Error taxonomy.
pub mod error;
/// Identifier types.
pub mod id;
/// Guarded task state machine.
pub mod lifecycle;
/// Outbound event messages.
pub mod outbox;
/// Schedule change records.
pub mod schedule;
/// Maintenance tasks.
pub mod task;

pub use actor::{Actor, Role, TenantScope};
pub use clock::{Clock, FixedClock, SystemClock};
pub use conflict::{Conflict, ConflictType};
pub use dependency::{DependencyEdge, DependencyType};
pub use error::{Error, ErrorKind, Missing, Result};
pub use lifecycle::{AircraftStatus, TransitionContext, TransitionPolicy, can_transition};
pub use outbox::OutboxMessage;
pub use schedule::{ChangeType, ScheduleChangeEvent};
pub use task::{NewTask, Task, TaskFilter, TaskState};
