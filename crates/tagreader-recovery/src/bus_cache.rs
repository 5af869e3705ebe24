//! Shared bus handle cache.
//!
//! The bus is the only long-lived hardware resource. Opening it is expensive,
//! so one handle is cached and reused across attempts and read calls instead
//! of being torn down after every read. The cache replaces the handle when it
//! grows older than the health threshold, and on an explicit [`reset`].
//!
//! ```text
//!   get_or_create()                         reset()
//!        │                                     │
//!        ▼                                     ▼
//!   ┌─────────┐  age <= threshold   ┌──────────────────────┐
//!   │ cached? │────────────────────►│ drop cached handle   │
//!   └─────────┘   reuse handle      │ hard_reset()         │
//!        │ none / stale             │ settle               │
//!        ▼                          │ open()               │
//!     open() ──► install ◄──────────┴──────────────────────┘
//! ```
//!
//! All construction happens while holding the cache mutex, so callers that
//! race on an empty or stale cache wait for the one construction in flight
//! and then share its handle.
//!
//! [`reset`]: SharedBusCache::reset

use std::sync::Arc;
use std::time::Duration;

use tagreader_hardware::{BusFactory, Result};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ReaderConfig;

/// A shared reference to the cached bus.
///
/// Clones share the same bus allocation. The bus is released once the cache
/// has replaced the handle and the last clone is dropped.
#[derive(Debug)]
pub struct BusHandle<B> {
    bus: Arc<B>,
    created_at: Instant,
    generation: u64,
}

impl<B> Clone for BusHandle<B> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
            created_at: self.created_at,
            generation: self.generation,
        }
    }
}

impl<B> BusHandle<B> {
    /// The shared bus.
    pub fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    /// Time since the bus was opened.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Sequence number of this handle within its cache (1 for the first).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether both handles refer to the same bus instance.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bus, &other.bus)
    }

    fn is_stale(&self, threshold: Duration) -> bool {
        self.age() > threshold
    }
}

#[derive(Debug)]
struct CacheState<B> {
    handle: Option<BusHandle<B>>,
    generation: u64,
}

/// Owner of the single shared bus handle.
pub struct SharedBusCache<F: BusFactory> {
    factory: F,
    state: Mutex<CacheState<F::Bus>>,
    health_threshold: Duration,
    reset_settle: Duration,
}

impl<F: BusFactory> SharedBusCache<F> {
    /// Create an empty cache. No bus is opened until first use.
    pub fn new(factory: F, health_threshold: Duration, reset_settle: Duration) -> Self {
        Self {
            factory,
            state: Mutex::new(CacheState {
                handle: None,
                generation: 0,
            }),
            health_threshold,
            reset_settle,
        }
    }

    /// Create an empty cache using the timings from `config`.
    pub fn from_config(factory: F, config: &ReaderConfig) -> Self {
        Self::new(factory, config.health_threshold, config.reset_settle)
    }

    /// Return the cached handle, opening a new bus if none is cached or the
    /// cached one is stale.
    ///
    /// # Errors
    ///
    /// Returns the factory error if the bus cannot be opened. The cache is
    /// left empty and the next call tries again.
    pub async fn get_or_create(&self) -> Result<BusHandle<F::Bus>> {
        let mut state = self.state.lock().await;

        if let Some(handle) = &state.handle {
            if !handle.is_stale(self.health_threshold) {
                debug!(
                    generation = handle.generation,
                    age_ms = handle.age().as_millis() as u64,
                    "Reusing cached bus handle"
                );
                return Ok(handle.clone());
            }

            info!(
                generation = handle.generation,
                age_ms = handle.age().as_millis() as u64,
                "Cached bus handle is stale, replacing"
            );
            state.handle = None;
        }

        self.open_into(&mut state).await
    }

    /// Discard the cached handle, hard-reset the bus, wait for it to settle
    /// and install a freshly opened handle.
    ///
    /// # Errors
    ///
    /// Returns the factory error if the reset or the reopen fails. The cache
    /// is left empty in both cases.
    pub async fn reset(&self) -> Result<BusHandle<F::Bus>> {
        let mut state = self.state.lock().await;

        if let Some(old) = state.handle.take() {
            info!(generation = old.generation, "Discarding bus handle for hard reset");
        }

        if let Err(e) = self.factory.hard_reset().await {
            warn!("Bus hard reset failed: {}", e);
            return Err(e);
        }

        tokio::time::sleep(self.reset_settle).await;

        self.open_into(&mut state).await
    }

    /// Drop the cached handle without touching the hardware.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if let Some(old) = state.handle.take() {
            debug!(generation = old.generation, "Bus handle invalidated");
        }
    }

    /// The currently cached handle, if any. Never opens a bus.
    pub async fn peek(&self) -> Option<BusHandle<F::Bus>> {
        self.state.lock().await.handle.clone()
    }

    async fn open_into(&self, state: &mut CacheState<F::Bus>) -> Result<BusHandle<F::Bus>> {
        let bus = match self.factory.open().await {
            Ok(bus) => bus,
            Err(e) => {
                warn!("Failed to open bus: {}", e);
                return Err(e);
            }
        };

        state.generation += 1;
        let handle = BusHandle {
            bus: Arc::new(bus),
            created_at: Instant::now(),
            generation: state.generation,
        };

        info!(generation = handle.generation, "Opened bus");
        state.handle = Some(handle.clone());
        Ok(handle)
    }
}
