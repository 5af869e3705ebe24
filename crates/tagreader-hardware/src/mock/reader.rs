//! Mock card reader implementation for testing and development.
//!
//! The reader is driven by a script: every transport device attached to the
//! bus takes the next [`MockBehavior`] from the script and plays it out for
//! its single attempt. When the script is empty the fallback behavior is
//! used (no card by default).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tagreader_core::{BlockId, CardUid};

use super::bus::MockBus;
use crate::{
    HardwareError, Result,
    traits::{CardTransport, TransportFactory},
};

/// What one attached device does during its attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// A readable card is in the field.
    Card {
        uid: CardUid,
        blocks: HashMap<BlockId, Vec<u8>>,
    },

    /// No card enters the field; the poll waits out its timeout.
    NoCard,

    /// The poll itself fails with a bus error.
    PollFault,

    /// A card is detected but chip configuration fails.
    ConfigureFault,

    /// A card is detected but block authentication fails.
    ReadFault,

    /// The poll never returns.
    Hang,

    /// A card is detected but chip configuration never returns.
    HangOnConfigure,

    /// A card is detected and configured but block reads never return.
    HangOnRead,
}

impl MockBehavior {
    /// A card with the given UID and text blocks.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagreader_core::CardUid;
    /// use tagreader_hardware::mock::MockBehavior;
    ///
    /// let uid: CardUid = "8f82d28f".parse().unwrap();
    /// let behavior = MockBehavior::card(uid, &[(4, "159")]);
    /// assert!(behavior.has_card());
    /// ```
    pub fn card(uid: CardUid, blocks: &[(u8, &str)]) -> Self {
        let blocks = blocks
            .iter()
            .map(|(block, text)| {
                let mut raw = text.as_bytes().to_vec();
                raw.resize(raw.len().max(16), 0);
                (BlockId::new(*block), raw)
            })
            .collect();
        Self::Card { uid, blocks }
    }

    /// Whether a card is detected by the poll.
    pub fn has_card(&self) -> bool {
        matches!(
            self,
            Self::Card { .. }
                | Self::ConfigureFault
                | Self::ReadFault
                | Self::HangOnConfigure
                | Self::HangOnRead
        )
    }
}

#[derive(Debug)]
struct ReaderState {
    script: VecDeque<MockBehavior>,
    fallback: MockBehavior,
    attached_buses: Vec<u64>,
    fail_attach: u32,
}

/// Mock transport factory.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tagreader_core::{BlockId, CardUid};
/// use tagreader_hardware::mock::{MockBehavior, MockBusFactory, MockReader};
/// use tagreader_hardware::traits::{BusFactory, CardTransport, TransportFactory};
///
/// #[tokio::main]
/// async fn main() -> tagreader_hardware::Result<()> {
///     let (buses, _) = MockBusFactory::new();
///     let (reader, handle) = MockReader::new();
///
///     let uid: CardUid = "8f82d28f".parse().unwrap();
///     handle.push(MockBehavior::card(uid.clone(), &[(4, "159")]));
///
///     let bus = Arc::new(buses.open().await?);
///     let mut device = reader.attach(bus)?;
///     assert_eq!(device.poll_for_card(Duration::from_secs(5)).await?, uid);
///     device.configure().await?;
///     let raw = device.read_block(BlockId::new(4)).await?;
///     assert!(raw.starts_with(b"159"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    state: Arc<Mutex<ReaderState>>,
}

impl MockReader {
    /// Create a new mock reader and the handle scripting it.
    pub fn new() -> (Self, MockReaderHandle) {
        let state = Arc::new(Mutex::new(ReaderState {
            script: VecDeque::new(),
            fallback: MockBehavior::NoCard,
            attached_buses: Vec::new(),
            fail_attach: 0,
        }));

        let reader = Self {
            state: Arc::clone(&state),
        };

        (reader, MockReaderHandle { state })
    }
}

impl TransportFactory<MockBus> for MockReader {
    type Transport = MockTransport;

    fn attach(&self, bus: Arc<MockBus>) -> Result<MockTransport> {
        let mut state = lock(&self.state);

        if state.fail_attach > 0 {
            state.fail_attach -= 1;
            return Err(HardwareError::initialization_failed(
                "mock device rejected bus",
            ));
        }

        state.attached_buses.push(bus.id());
        let behavior = state
            .script
            .pop_front()
            .unwrap_or_else(|| state.fallback.clone());

        Ok(MockTransport {
            behavior,
            _bus: bus,
            card_detected: false,
        })
    }
}

/// A single-attempt device produced by [`MockReader`].
#[derive(Debug)]
pub struct MockTransport {
    behavior: MockBehavior,
    _bus: Arc<MockBus>,
    card_detected: bool,
}

impl CardTransport for MockTransport {
    async fn configure(&mut self) -> Result<()> {
        match self.behavior {
            MockBehavior::ConfigureFault => {
                Err(HardwareError::configuration("mock SAM configuration failed"))
            }
            MockBehavior::HangOnConfigure => {
                std::future::pending::<()>().await;
                Err(HardwareError::configuration("mock SAM never answered"))
            }
            _ => Ok(()),
        }
    }

    async fn poll_for_card(&mut self, timeout: Duration) -> Result<CardUid> {
        match &self.behavior {
            MockBehavior::Card { uid, .. } => {
                self.card_detected = true;
                Ok(uid.clone())
            }
            MockBehavior::ConfigureFault
            | MockBehavior::ReadFault
            | MockBehavior::HangOnConfigure
            | MockBehavior::HangOnRead => {
                self.card_detected = true;
                CardUid::new(vec![0xde, 0xad, 0xbe, 0xef])
                    .map_err(|e| HardwareError::invalid_data(e.to_string()))
            }
            MockBehavior::NoCard => {
                tokio::time::sleep(timeout).await;
                Err(HardwareError::no_card(timeout))
            }
            MockBehavior::PollFault => Err(HardwareError::communication("mock bus NACK")),
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(HardwareError::timeout(timeout))
            }
        }
    }

    async fn read_block(&mut self, block: BlockId) -> Result<Vec<u8>> {
        if !self.card_detected {
            return Err(HardwareError::card_read("no card selected"));
        }

        match &self.behavior {
            MockBehavior::Card { blocks, .. } => blocks
                .get(&block)
                .cloned()
                .ok_or_else(|| HardwareError::card_read(format!("block {block} not readable"))),
            MockBehavior::ReadFault => Err(HardwareError::authentication(block.as_u8())),
            MockBehavior::HangOnRead => {
                std::future::pending::<()>().await;
                Err(HardwareError::card_read(format!("block {block} never answered")))
            }
            _ => Err(HardwareError::card_read("no card selected")),
        }
    }
}

/// Handle for scripting a [`MockReader`].
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    state: Arc<Mutex<ReaderState>>,
}

impl MockReaderHandle {
    /// Append one behavior to the script.
    pub fn push(&self, behavior: MockBehavior) {
        lock(&self.state).script.push_back(behavior);
    }

    /// Append several behaviors to the script, in order.
    pub fn push_all(&self, behaviors: impl IntoIterator<Item = MockBehavior>) {
        lock(&self.state).script.extend(behaviors);
    }

    /// Behavior used once the script is exhausted.
    pub fn set_fallback(&self, behavior: MockBehavior) {
        lock(&self.state).fallback = behavior;
    }

    /// Make the next `n` calls to `attach()` fail.
    pub fn fail_next_attaches(&self, n: u32) {
        lock(&self.state).fail_attach = n;
    }

    /// Number of behaviors not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.state).script.len()
    }

    /// Number of devices attached so far.
    pub fn attach_count(&self) -> usize {
        lock(&self.state).attached_buses.len()
    }

    /// Bus id used by every attached device, in attach order.
    pub fn attached_buses(&self) -> Vec<u64> {
        lock(&self.state).attached_buses.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
