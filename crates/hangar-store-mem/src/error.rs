//! Error types for in-memory store operations.

use hangar_core::id::{DependencyId, ScheduleEventId, TaskId};
use thiserror::Error;

/// Errors that can occur during `MemoryStore` operations.
#[derive(Error, Debug)]
pub enum MemoryStoreError {
    /// A task with the same id already exists.
    #[error("Task already exists: {0}")]
    DuplicateTask(TaskId),

    /// A dependency with the same id already exists.
    #[error("Dependency already exists: {0}")]
    DuplicateDependency(DependencyId),

    /// A schedule event with the same id already exists.
    #[error("Schedule event already exists: {0}")]
    DuplicateScheduleEvent(ScheduleEventId),

    /// The task to update does not exist.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// An edge refers to a task the store does not hold.
    #[error("Dependency {edge} refers to unknown task {task}")]
    DanglingDependency {
        /// Offending edge.
        edge: DependencyId,
        /// Missing endpoint.
        task: TaskId,
    },
}
