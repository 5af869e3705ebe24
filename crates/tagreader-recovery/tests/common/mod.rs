//! Common test utilities for the recovery engine integration tests.
//!
//! Every test builds its own [`Rig`]: a controller over a fresh mock bus,
//! a fresh mock reader and fresh shared state, together with the handles
//! used to script the hardware and observe what the engine did with it.

#![allow(dead_code)]

use std::sync::Arc;

use tagreader_core::CardUid;
use tagreader_hardware::mock::{
    MockBehavior, MockBusFactory, MockBusHandle, MockReader, MockReaderHandle,
};
use tagreader_recovery::{ReaderConfig, RecoveryController};

pub type MockController = RecoveryController<MockBusFactory, MockReader>;

/// UID of the card used throughout the scenarios.
pub const CARD_UID: &str = "8f82d28f";

pub struct Rig {
    pub controller: Arc<MockController>,
    pub buses: MockBusHandle,
    pub reader: MockReaderHandle,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(ReaderConfig::default())
    }

    pub fn with_config(config: ReaderConfig) -> Self {
        let (buses_factory, buses) = MockBusFactory::new();
        let (reader_factory, reader) = MockReader::new();
        let controller = RecoveryController::with_factories(buses_factory, reader_factory, config)
            .expect("valid test configuration");

        Self {
            controller: Arc::new(controller),
            buses,
            reader,
        }
    }

    /// Consecutive failed read calls recorded so far.
    pub fn failures(&self) -> u32 {
        self.controller.tracker().current()
    }
}

pub fn card_uid() -> CardUid {
    CARD_UID.parse().expect("valid card UID")
}

/// The card from the scenarios: block 4 holds the text "159".
pub fn album_card() -> MockBehavior {
    MockBehavior::card(card_uid(), &[(4, "159")])
}

/// Script entries for one read call that faults at every level.
pub fn failing_call() -> [MockBehavior; 3] {
    [
        MockBehavior::PollFault,
        MockBehavior::ConfigureFault,
        MockBehavior::ReadFault,
    ]
}
