//! Per-tenant single-writer lock for scheduling mutations.

use hangar_core::id::TenantId;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Registry of tenants with a mutation in flight.
#[derive(Debug, Default)]
pub struct TenantLocks {
    held: Mutex<HashSet<TenantId>>,
    released: Condvar,
}

/// Guard representing a held tenant lock. The lock is released when dropped.
#[derive(Debug)]
pub struct TenantGuard<'a> {
    locks: &'a TenantLocks,
    tenant: TenantId,
}

impl TenantLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, HashSet<TenantId>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire the writer lock for `tenant`. Blocks until it is available.
    pub fn acquire(&self, tenant: TenantId) -> TenantGuard<'_> {
        let mut held = self.held();
        while held.contains(&tenant) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(tenant);
        trace!(%tenant, "Acquired tenant lock");
        TenantGuard {
            locks: self,
            tenant,
        }
    }

    /// Attempt to acquire the lock without blocking.
    pub fn try_acquire(&self, tenant: TenantId) -> Option<TenantGuard<'_>> {
        let mut held = self.held();
        if !held.insert(tenant) {
            return None;
        }
        Some(TenantGuard {
            locks: self,
            tenant,
        })
    }

    fn release(&self, tenant: TenantId) {
        self.held().remove(&tenant);
        trace!(%tenant, "Released tenant lock");
        self.released.notify_all();
    }
}

impl TenantGuard<'_> {
    /// Tenant this guard holds.
    #[must_use]
    pub const fn tenant(&self) -> TenantId {
        self.tenant
    }
}

impl Drop for TenantGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(self.tenant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn guard_excludes_same_tenant_only() {
        let locks = TenantLocks::new();
        let (a, b) = (TenantId::new(), TenantId::new());

        let guard = locks.acquire(a);
        assert_eq!(guard.tenant(), a);
        assert!(locks.try_acquire(a).is_none());
        assert!(locks.try_acquire(b).is_some());

        drop(guard);
        assert!(locks.try_acquire(a).is_some());
    }

    #[test]
    fn writers_for_one_tenant_never_overlap() {
        let locks = Arc::new(TenantLocks::new());
        let tenant = TenantId::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..50 {
                        let _guard = locks.acquire(tenant);
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .unwrap_or_else(|_| panic!("writer thread panicked"));
        }
        assert_eq!(inside.load(Ordering::SeqCst), 0);
    }
}
