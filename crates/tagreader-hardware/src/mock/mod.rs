//! Mock hardware implementations for testing and development.
//!
//! This module provides a simulated bus and a scripted card reader that can
//! be controlled programmatically without requiring physical hardware.

pub mod bus;
pub mod reader;

// Re-export commonly used types
pub use bus::{MockBus, MockBusFactory, MockBusHandle};
pub use reader::{MockBehavior, MockReader, MockReaderHandle, MockTransport};
