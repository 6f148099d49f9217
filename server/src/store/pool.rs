//! Fixed-size connection pool.
//!
//! # Invariants
//!
//! - The number of available semaphore permits equals the number of idle
//!   connections whenever no `acquire` is mid-flight.
//! - A `PooledConnection` always holds a connection until it is dropped, and
//!   dropping it returns the connection to the idle list before the permit is
//!   released.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};

use super::{CredentialStore, StoreError};

/// A pool of store connections shared by all requests.
pub struct Pool {
    idle: Mutex<Vec<Box<dyn CredentialStore>>>,
    permits: Semaphore,
    size: usize,
    /// Total successful acquisitions since the pool was created.
    acquisitions: AtomicU64,
}

impl Pool {
    /// Create a pool owning the given connections.
    #[must_use]
    pub fn new(connections: Vec<Box<dyn CredentialStore>>) -> Self {
        let size = connections.len();
        Self {
            idle: Mutex::new(connections),
            permits: Semaphore::new(size),
            size,
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Acquire a connection, waiting for one to become free.
    ///
    /// # Errors
    /// Returns `StoreError::PoolClosed` if the pool was closed, or
    /// `StoreError::LockPoisoned` if the idle list lock was poisoned.
    pub async fn acquire(&self) -> Result<PooledConnection<'_>, StoreError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| StoreError::PoolClosed)?;

        let connection = self
            .idle
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .pop()
            .ok_or(StoreError::PoolClosed)?;

        self.acquisitions.fetch_add(1, Ordering::Relaxed);

        Ok(PooledConnection {
            connection: Some(connection),
            pool: self,
            _permit: permit,
        })
    }

    /// Stop handing out connections. Pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Number of connections the pool was created with.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of connections currently idle.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().map_or(0, |idle| idle.len())
    }

    /// Total number of successful acquisitions.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

/// A connection borrowed from a [`Pool`]; returned to the pool on drop.
pub struct PooledConnection<'a> {
    connection: Option<Box<dyn CredentialStore>>,
    pool: &'a Pool,
    // Declared last so it is released after the connection is back in the pool.
    _permit: SemaphorePermit<'a>,
}

impl Deref for PooledConnection<'_> {
    type Target = dyn CredentialStore;

    #[allow(clippy::expect_used)] // Only taken in `drop`.
    fn deref(&self) -> &Self::Target {
        self.connection
            .as_deref()
            .expect("pooled connection is present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    #[allow(clippy::expect_used)] // Only taken in `drop`.
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_deref_mut()
            .expect("pooled connection is present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            match self.pool.idle.lock() {
                Ok(mut idle) => idle.push(connection),
                Err(poisoned) => poisoned.into_inner().push(connection),
            }
        }
    }
}
