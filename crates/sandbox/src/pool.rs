//! Fixed-capacity sandbox pool with exclusive RAII leasing.
//!
//! The pool is the single point of concurrency control for the worker:
//! capacity bounds the number of simultaneous executions, and a leased slot
//! is owned by exactly one caller until the lease drops. Releasing is the
//! guard's `Drop`, so a slot can never leak out of the pool no matter which
//! error path a request takes.

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use codebox_core::config::PoolConfig;
use codebox_core::{Error, Result};

use crate::isolator::Isolator;
use crate::slot::{Sandbox, SlotState};

struct PoolShared {
    /// Free slots. Mutated only while holding the lock; the semaphore
    /// guarantees a popper always finds a slot.
    free: Mutex<Vec<Sandbox>>,
    permits: Arc<Semaphore>,
}

/// Fixed-size collection of sandbox slots.
///
/// All slots are allocated at startup and the count never changes for the
/// process lifetime. Exhaustion policy: `obtain` BLOCKS until a slot frees
/// up rather than rejecting — waiters queue on a FIFO semaphore, so leasing
/// is starvation-free under bounded load.
pub struct SandboxPool {
    shared: Arc<PoolShared>,
    root: PathBuf,
    capacity: usize,
}

impl SandboxPool {
    /// Allocate `capacity` slot directories under the configured root.
    pub fn new(
        config: &PoolConfig,
        wall_time: Duration,
        isolator: Arc<dyn Isolator>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.root_dir)?;

        let slots: Vec<Sandbox> = (0..config.capacity)
            .map(|id| Sandbox::new(id, &config.root_dir, Arc::clone(&isolator), wall_time))
            .collect();
        for slot in &slots {
            std::fs::create_dir_all(slot.path())?;
        }

        tracing::info!(
            capacity = config.capacity,
            root = %config.root_dir.display(),
            "sandbox pool initialized"
        );

        Ok(Self {
            shared: Arc::new(PoolShared {
                free: Mutex::new(slots),
                permits: Arc::new(Semaphore::new(config.capacity)),
            }),
            root: config.root_dir.clone(),
            capacity: config.capacity,
        })
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.shared.permits.available_permits()
    }

    /// Lease a slot exclusively, waiting until one is free.
    ///
    /// Fails with [`Error::PoolClosed`] once the pool has been shut down.
    /// The returned guard releases the slot on drop — callers never release
    /// explicitly, and double release is impossible by construction.
    pub async fn obtain(&self) -> Result<SandboxLease> {
        let permit = Arc::clone(&self.shared.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;

        let mut slot = self
            .shared
            .free
            .lock()
            .expect("sandbox free list poisoned")
            .pop()
            .ok_or(Error::PoolClosed)?;
        slot.set_state(SlotState::Leased);
        tracing::debug!(slot = slot.id(), "sandbox leased");

        Ok(SandboxLease {
            slot: Some(slot),
            shared: Arc::clone(&self.shared),
            _permit: permit,
        })
    }

    /// Shut the pool down: refuse new leases and remove the slot
    /// directories of all free slots.
    ///
    /// Call after in-flight requests have drained; slots released later are
    /// parked on the free list but never leased again.
    pub async fn shutdown(&self) -> Result<()> {
        self.shared.permits.close();
        let slots: Vec<Sandbox> = self
            .shared
            .free
            .lock()
            .expect("sandbox free list poisoned")
            .drain(..)
            .collect();
        for slot in &slots {
            match tokio::fs::remove_dir_all(slot.path()).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(slot = slot.id(), error = %e, "failed to remove slot directory");
                }
            }
        }
        tracing::info!(root = %self.root.display(), "sandbox pool shut down");
        Ok(())
    }
}

/// Exclusive lease over one sandbox slot.
///
/// Dereferences to [`Sandbox`]. Dropping the lease returns the slot to the
/// pool (even mid-request, even after an error) and then wakes one waiter.
/// A slot left dirty or faulted is fine to return: the next lease's
/// `clean_and_init` owns cleanup, not release.
pub struct SandboxLease {
    slot: Option<Sandbox>,
    shared: Arc<PoolShared>,
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for SandboxLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxLease")
            .field("slot", &self.slot.as_ref().map(|s| s.id()))
            .finish_non_exhaustive()
    }
}

impl Deref for SandboxLease {
    type Target = Sandbox;

    fn deref(&self) -> &Sandbox {
        self.slot.as_ref().expect("lease accessed after release")
    }
}

impl DerefMut for SandboxLease {
    fn deref_mut(&mut self) -> &mut Sandbox {
        self.slot.as_mut().expect("lease accessed after release")
    }
}

impl Drop for SandboxLease {
    fn drop(&mut self) {
        if let Some(mut slot) = self.slot.take() {
            if slot.state() == SlotState::Faulted {
                tracing::warn!(
                    slot = slot.id(),
                    "slot returned faulted; next lease re-initializes it"
                );
            }
            let id = slot.id();
            slot.set_state(SlotState::Free);
            self.shared
                .free
                .lock()
                .expect("sandbox free list poisoned")
                .push(slot);
            tracing::debug!(slot = id, "sandbox released");
        }
        // The permit field drops after this body, waking one waiter only
        // once the slot is back on the free list.
    }
}
