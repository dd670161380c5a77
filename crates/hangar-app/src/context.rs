//! Request-scoped caller identity and cancellation.

use hangar_core::{Actor, Error, Result, TenantScope};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag a caller flips to abandon an in-flight request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Clones observe it too.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Everything an operation needs to know about who is calling.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Authenticated caller.
    pub actor: Actor,
    cancel: CancelToken,
}

impl RequestContext {
    /// Context that is never cancelled.
    #[must_use]
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            cancel: CancelToken::new(),
        }
    }

    /// Context bound to an existing token.
    #[must_use]
    pub const fn with_cancel(actor: Actor, cancel: CancelToken) -> Self {
        Self { actor, cancel }
    }

    /// Tenant scope of every read and write made for this request.
    #[must_use]
    pub const fn scope(&self) -> TenantScope {
        self.actor.scope()
    }

    /// Token shared with the caller.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Fail with [`Error::Cancelled`] once the caller gave up.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] when the token was cancelled.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
