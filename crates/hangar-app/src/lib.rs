//! Application layer for hangar.
//!
//! This crate provides the scheduling service (dependency management,
//! rescheduling with cascade, conflict detection and task state transitions),
//! the storage contracts it consumes, and project configuration shared by
//! front ends.

pub mod config;
pub mod conflict_detector;
pub mod context;
pub mod dependency_manager;
pub mod rescheduler;
pub mod service;
pub mod store;
pub mod task_lifecycle;
pub mod tenant_lock;

// Re-exports for convenience
pub use config::{CascadeFailure, LifecycleConfig, ProjectConfig, ScheduleConfig};
pub use context::{CancelToken, RequestContext};
pub use rescheduler::RescheduleRequest;
pub use service::SchedulingService;
pub use store::{
    DependencyStore, EventPublisher, PartsReservations, ScheduleEventStore, SchedulingStore,
    TaskStore,
};
pub use tenant_lock::{TenantGuard, TenantLocks};
