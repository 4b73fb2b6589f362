//! Scoped, exclusive access to one pooled resource.

use log::trace;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::pool::resource::{ResourceFactory, ResourceId, ResourcePool};
use crate::sync::atomic::OnceFlag;

/// A caller's exclusive right to use one pooled resource.
///
/// Created only by [`ResourcePool::acquire`]. The lease is move-only and
/// returns its resource to the pool when dropped, so every exit path of the
/// owning scope releases it. Both back-references are weak: a lease never
/// keeps its pool or resource alive once all strong owners are gone.
pub struct Lease<F: ResourceFactory> {
    /// Registry key of the leased resource
    resource_id: ResourceId,

    /// Non-owning reference to the originating pool
    pool: Weak<ResourcePool<F>>,

    /// Non-owning reference to the leased resource
    resource: Weak<F::Resource>,

    /// Set by whichever release path runs first
    released: OnceFlag,
}

impl<F: ResourceFactory> Lease<F> {
    pub(crate) fn new(
        resource_id: ResourceId,
        pool: Weak<ResourcePool<F>>,
        resource: Weak<F::Resource>,
    ) -> Self {
        Self {
            resource_id,
            pool,
            resource,
            released: OnceFlag::new(),
        }
    }

    /// The leased resource.
    ///
    /// Returns `None` once the lease is disposed, or when the pool has
    /// already dropped the resource out from under the weak reference.
    pub fn resource(&self) -> Option<Arc<F::Resource>> {
        if self.released.is_set() {
            return None;
        }

        self.resource.upgrade()
    }

    /// The originating pool.
    ///
    /// Returns `None` once the lease is disposed or the pool is gone.
    pub fn pool(&self) -> Option<Arc<ResourcePool<F>>> {
        if self.released.is_set() {
            return None;
        }

        self.pool.upgrade()
    }

    /// Registry id of the leased resource.
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// Whether this lease has already been disposed.
    pub fn is_disposed(&self) -> bool {
        self.released.is_set()
    }

    /// Return the resource to the pool.
    ///
    /// Idempotent: concurrent callers race on a one-shot flag and the
    /// release logic runs exactly once. A gone or disposing pool makes this
    /// a quiet no-op.
    pub fn dispose(&self) {
        self.release_once(0);
    }

    /// Return the resource to the pool, reporting whether the release
    /// actually succeeded.
    ///
    /// Same one-shot guard as [`dispose`](Self::dispose); the pool makes up
    /// to `retry_attempts + 1` attempts. Whether the release succeeds or
    /// not, the lease is left disposed and must not be used again.
    pub fn try_release(&self, retry_attempts: usize) -> bool {
        self.release_once(retry_attempts)
    }

    fn release_once(&self, retry_attempts: usize) -> bool {
        if !self.released.try_set() {
            return false;
        }

        match self.pool.upgrade() {
            Some(pool) => pool.try_release_resource(self.resource_id, retry_attempts),
            None => {
                trace!("pool for {} is gone, nothing to release", self.resource_id);
                false
            }
        }
    }
}

impl<F: ResourceFactory> Drop for Lease<F> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<F: ResourceFactory> fmt::Debug for Lease<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_disposed() {
            write!(f, "Lease(disposed)")
        } else {
            write!(f, "Lease({})", self.resource_id)
        }
    }
}
