//! Error taxonomy shared by every scheduling operation.

use std::fmt;

use thiserror::Error;

use crate::id::{DependencyId, TaskId};

/// Result alias used across the core.
pub type Result<T> = std::result::Result<T, Error>;

/// Which referenced record could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// The task an operation targets.
    Task(TaskId),
    /// The prerequisite side of a dependency.
    DependsOnTask(TaskId),
    /// A dependency edge.
    Dependency(DependencyId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task {id}"),
            Self::DependsOnTask(id) => write!(f, "depends-on task {id}"),
            Self::Dependency(id) => write!(f, "dependency {id}"),
        }
    }
}

/// Errors surfaced by the lifecycle and scheduling operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Role or ownership violation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Referenced record is absent or outside the actor's tenant.
    #[error("{0} not found")]
    NotFound(Missing),
    /// Guard failure, cycle, or mutation of a closed task.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The caller cancelled the request before a write was issued.
    #[error("request cancelled")]
    Cancelled,
    /// A backing store or collaborator failed.
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Distinguishable error kind, for callers mapping to transport codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::Validation`].
    Validation,
    /// See [`Error::Forbidden`].
    Forbidden,
    /// See [`Error::NotFound`].
    NotFound,
    /// See [`Error::Conflict`].
    Conflict,
    /// See [`Error::Cancelled`].
    Cancelled,
    /// See [`Error::Store`].
    Store,
}

impl Error {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Build a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Wrap a store error.
    pub fn store<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Store(err.into())
    }

    /// Kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Store(_) => ErrorKind::Store,
        }
    }
}
