//! Resource pooling for expensive external client handles.
//!
//! The pool keeps a registry of resources keyed by id, each tagged leased or
//! available. One coarse lock serializes all registry mutations; critical
//! sections are a linear scan at worst and factory I/O never runs under the
//! lock. Pool sizes are small, in the ones to tens.

use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use corral_core::error::PoolError;

use crate::pool::lease::Lease;
use crate::sync::atomic::{wait_until, OnceFlag};

/// Sole creation point for pooled resources.
///
/// The pool never constructs resources itself; it hands the connection
/// configuration to a factory and registers whatever comes back. A factory
/// failure surfaces to the caller unchanged and leaves the registry as it
/// was.
pub trait ResourceFactory: Send + Sync + 'static {
    /// Connection configuration handed to every `create` call.
    type Config: Send + Sync;

    /// The client handle type this factory produces.
    type Resource: Send + Sync + 'static;

    /// Create one resource instance.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::CreationFailed`] (or another pool error) when
    /// the underlying connection cannot be established.
    fn create(&self, config: &Self::Config) -> Result<Self::Resource, PoolError>;
}

/// Identifier of a resource within its pool.
///
/// Ids are allocated from a per-pool counter and never reused, so an id
/// removed from the registry while leased can never be confused with a
/// later entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource-{}", self.0)
    }
}

/// A registry entry: the resource and whether it is currently leased.
struct PoolEntry<R> {
    /// The resource itself
    resource: Arc<R>,

    /// Whether a lease currently holds this resource
    leased: bool,
}

/// A bounded, thread-safe registry of leasable resources.
///
/// Constructed into an [`Arc`] so leases can hold weak back-references to
/// their originating pool. At most one lease holds any resource at a time;
/// acquisition never blocks and reports exhaustion as an empty result.
pub struct ResourcePool<F: ResourceFactory> {
    /// Registry of pooled resources keyed by id
    entries: Mutex<HashMap<ResourceId, PoolEntry<F::Resource>>>,

    /// The factory used to create new entries
    factory: F,

    /// Connection configuration handed to the factory
    config: F::Config,

    /// Set once disposal begins; never cleared
    disposing: OnceFlag,

    /// Source of never-reused resource ids
    next_id: AtomicU64,
}

impl<F: ResourceFactory> ResourcePool<F> {
    /// Create a pool holding `initial_size` resources, all available.
    ///
    /// The whole batch is created before the registry is populated, so a
    /// factory failure part-way through leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfiguration`] if `initial_size` is
    /// zero, or the factory's error if any creation fails.
    pub fn new(factory: F, config: F::Config, initial_size: usize) -> Result<Arc<Self>, PoolError> {
        if initial_size < 1 {
            return Err(PoolError::InvalidConfiguration(
                "the pool must hold at least one resource".to_string(),
            ));
        }

        let mut created = Vec::with_capacity(initial_size);
        for _ in 0..initial_size {
            created.push(factory.create(&config)?);
        }

        let pool = Arc::new(Self {
            entries: Mutex::new(HashMap::with_capacity(initial_size)),
            factory,
            config,
            disposing: OnceFlag::new(),
            next_id: AtomicU64::new(0),
        });

        {
            let mut entries = pool.entries.lock();
            for resource in created {
                let id = pool.allocate_id();
                entries.insert(
                    id,
                    PoolEntry {
                        resource: Arc::new(resource),
                        leased: false,
                    },
                );
            }
        }

        info!("initialized resource pool with {} resources", initial_size);

        Ok(pool)
    }

    /// Reserve an available resource and wrap it in a [`Lease`].
    ///
    /// Returns `None` immediately when every resource is leased or the pool
    /// has begun disposing; acquisition never blocks or queues. Callers that
    /// need backpressure poll or fail fast above this layer. No fairness is
    /// guaranteed among concurrent callers.
    pub fn acquire(self: &Arc<Self>) -> Option<Lease<F>> {
        if self.disposing.is_set() {
            trace!("pool is disposing, refusing acquire");
            return None;
        }

        let mut entries = self.entries.lock();
        for (id, entry) in entries.iter_mut() {
            if !entry.leased {
                entry.leased = true;
                trace!("leased {}", id);
                return Some(Lease::new(
                    *id,
                    Arc::downgrade(self),
                    Arc::downgrade(&entry.resource),
                ));
            }
        }

        trace!("pool exhausted, no available resource");
        None
    }

    /// Grow the pool by `by` new resources, all available.
    ///
    /// The batch is created outside the registry lock and inserted
    /// all-or-nothing: a factory failure adds no entries at all.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidArgument`] if `by` is zero,
    /// [`PoolError::Disposed`] if the pool has begun disposing, or the
    /// factory's error if any creation fails.
    pub fn increase_pool_size(&self, by: usize) -> Result<(), PoolError> {
        if by < 1 {
            return Err(PoolError::InvalidArgument(
                "the pool must grow by at least one resource".to_string(),
            ));
        }
        if self.disposing.is_set() {
            return Err(PoolError::Disposed);
        }

        let mut created = Vec::with_capacity(by);
        for _ in 0..by {
            created.push(self.factory.create(&self.config)?);
        }

        let mut entries = self.entries.lock();
        for resource in created {
            let id = self.allocate_id();
            entries.insert(
                id,
                PoolEntry {
                    resource: Arc::new(resource),
                    leased: false,
                },
            );
        }

        debug!("pool grown by {} to {} resources", by, entries.len());

        Ok(())
    }

    /// Shrink the pool by removing up to `by` currently-available resources.
    ///
    /// Leased resources are not waited for: a single pass removes as many
    /// available entries as it can find, so fewer than `by` may go. The
    /// number actually removed is returned.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidArgument`] if `by` is zero or the
    /// resulting size would fall below one (the pool is left unchanged), or
    /// [`PoolError::Disposed`] if the pool has begun disposing.
    pub fn decrease_pool_size(&self, by: usize) -> Result<usize, PoolError> {
        if by < 1 {
            return Err(PoolError::InvalidArgument(
                "the pool must shrink by at least one resource".to_string(),
            ));
        }
        if self.disposing.is_set() {
            return Err(PoolError::Disposed);
        }

        let mut entries = self.entries.lock();
        if entries.len().saturating_sub(by) < 1 {
            return Err(PoolError::InvalidArgument(format!(
                "shrinking by {} would leave fewer than one resource",
                by
            )));
        }

        let victims: Vec<ResourceId> = entries
            .iter()
            .filter(|(_, entry)| !entry.leased)
            .map(|(id, _)| *id)
            .take(by)
            .collect();
        for id in &victims {
            entries.remove(id);
        }

        debug!(
            "pool shrunk by {} to {} resources",
            victims.len(),
            entries.len()
        );

        Ok(victims.len())
    }

    /// Transition the entry for `resource_id` from leased back to available.
    ///
    /// Makes up to `retry_attempts + 1` attempts. Returns `false` without
    /// panicking when the id is unknown, the entry was not leased after all
    /// attempts, or the pool has begun disposing.
    pub fn try_release_resource(&self, resource_id: ResourceId, retry_attempts: usize) -> bool {
        for attempt in 0..=retry_attempts {
            if self.disposing.is_set() {
                trace!("pool is disposing, refusing release of {}", resource_id);
                return false;
            }

            match self.entries.lock().get_mut(&resource_id) {
                Some(entry) if entry.leased => {
                    entry.leased = false;
                    trace!("released {}", resource_id);
                    return true;
                }
                Some(_) => {
                    trace!(
                        "release attempt {} found {} not leased",
                        attempt,
                        resource_id
                    );
                }
                None => {
                    trace!("release of unknown {}", resource_id);
                    return false;
                }
            }
        }

        false
    }

    /// Number of resources currently leased out.
    pub fn used_count(&self) -> usize {
        self.entries.lock().values().filter(|e| e.leased).count()
    }

    /// Number of resources currently available for acquisition.
    pub fn available_count(&self) -> usize {
        self.entries.lock().values().filter(|e| !e.leased).count()
    }

    /// Whether disposal has begun.
    pub fn is_disposing(&self) -> bool {
        self.disposing.is_set()
    }

    /// Shut the pool down, draining outstanding leases for up to
    /// `drain_timeout`.
    ///
    /// The first call sets the disposing flag; subsequent calls are no-ops.
    /// Once the flag is set no acquire or release succeeds, so the wait
    /// returns early only when nothing was leased to begin with; otherwise
    /// it runs to the deadline. The registry is cleared unconditionally
    /// afterwards. Resources still leased at that point are dropped from
    /// tracking and any later release for them reports `false`.
    pub fn dispose(&self, drain_timeout: Duration) {
        if !self.disposing.try_set() {
            return;
        }

        info!("disposing resource pool, draining outstanding leases");

        let drained = wait_until(drain_timeout, || {
            self.entries.lock().values().all(|entry| !entry.leased)
        });
        if !drained {
            warn!(
                "drain timed out after {:?}, dropping {} outstanding leases from tracking",
                drain_timeout,
                self.used_count()
            );
        }

        self.entries.lock().clear();

        info!("resource pool disposed");
    }

    fn allocate_id(&self) -> ResourceId {
        ResourceId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}
