//! Mock bus implementation for testing and development.
//!
//! This module provides a simulated bus whose open and reset operations can
//! be made to fail on demand, and which counts every open and reset so tests
//! can observe how the engine manages the bus lifecycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{HardwareError, Result, traits::BusFactory};

/// A simulated bus instance.
///
/// Every successful open yields a bus with a new, increasing id.
#[derive(Debug, PartialEq, Eq)]
pub struct MockBus {
    id: u64,
}

impl MockBus {
    /// Sequence number of this bus (1 for the first open).
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Default)]
struct BusState {
    fail_opens: u32,
    fail_resets: u32,
    resets: u64,
}

/// Mock bus factory.
///
/// # Examples
///
/// ```
/// use tagreader_hardware::mock::MockBusFactory;
/// use tagreader_hardware::traits::BusFactory;
///
/// #[tokio::main]
/// async fn main() -> tagreader_hardware::Result<()> {
///     let (factory, handle) = MockBusFactory::new();
///
///     let bus = factory.open().await?;
///     assert_eq!(bus.id(), 1);
///
///     handle.fail_next_opens(1);
///     assert!(factory.open().await.is_err());
///     assert_eq!(handle.open_count(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockBusFactory {
    next_id: Arc<AtomicU64>,
    state: Arc<Mutex<BusState>>,
}

impl MockBusFactory {
    /// Create a new mock bus factory and the handle controlling it.
    pub fn new() -> (Self, MockBusHandle) {
        let next_id = Arc::new(AtomicU64::new(0));
        let state = Arc::new(Mutex::new(BusState::default()));

        let factory = Self {
            next_id: Arc::clone(&next_id),
            state: Arc::clone(&state),
        };

        (factory, MockBusHandle { next_id, state })
    }
}

impl BusFactory for MockBusFactory {
    type Bus = MockBus;

    async fn open(&self) -> Result<MockBus> {
        {
            let mut state = lock(&self.state);
            if state.fail_opens > 0 {
                state.fail_opens -= 1;
                return Err(HardwareError::initialization_failed("mock bus busy"));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MockBus { id })
    }

    async fn hard_reset(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_resets > 0 {
            state.fail_resets -= 1;
            return Err(HardwareError::communication("mock reset line stuck"));
        }
        state.resets += 1;
        Ok(())
    }
}

/// Handle for controlling a [`MockBusFactory`].
#[derive(Debug, Clone)]
pub struct MockBusHandle {
    next_id: Arc<AtomicU64>,
    state: Arc<Mutex<BusState>>,
}

impl MockBusHandle {
    /// Make the next `n` calls to `open()` fail.
    pub fn fail_next_opens(&self, n: u32) {
        lock(&self.state).fail_opens = n;
    }

    /// Make the next `n` calls to `hard_reset()` fail.
    pub fn fail_next_resets(&self, n: u32) {
        lock(&self.state).fail_resets = n;
    }

    /// Number of buses successfully opened so far.
    pub fn open_count(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Number of successful hard resets so far.
    pub fn reset_count(&self) -> u64 {
        lock(&self.state).resets
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_assigns_increasing_ids() {
        let (factory, handle) = MockBusFactory::new();

        let first = factory.open().await.unwrap();
        let second = factory.open().await.unwrap();

        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert_eq!(handle.open_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_open_does_not_consume_id() {
        let (factory, handle) = MockBusFactory::new();
        handle.fail_next_opens(2);

        assert!(factory.open().await.is_err());
        assert!(factory.open().await.is_err());
        let bus = factory.open().await.unwrap();

        assert_eq!(bus.id(), 1);
        assert_eq!(handle.open_count(), 1);
    }

    #[tokio::test]
    async fn test_reset_counting_and_failure() {
        let (factory, handle) = MockBusFactory::new();

        factory.hard_reset().await.unwrap();
        handle.fail_next_resets(1);
        let result = factory.hard_reset().await;

        assert!(matches!(
            result,
            Err(HardwareError::CommunicationError { .. })
        ));
        assert_eq!(handle.reset_count(), 1);
    }
}
