//! Hardware abstraction layer for the tagreader recovery engine.
//!
//! This crate defines the seams between the recovery engine and the reader
//! hardware: a shared bus that is expensive to open and may need a hard
//! reset, and per-attempt transport devices that poll for a card and read its
//! data blocks. A scripted mock of both is included for development and
//! testing without physical hardware.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous and return
//!   `Send` futures, so engine code can run on spawned Tokio tasks.
//! - **Two lifetimes**: The bus outlives read calls; transport devices live
//!   for exactly one attempt.
//! - **Error-aware**: All operations return `Result<T>` with a
//!   [`HardwareError`] that separates "no card" from transport faults.
//!
//! # Traits
//!
//! - [`BusFactory`] opens and hard-resets the shared bus.
//! - [`TransportFactory`] attaches a fresh [`CardTransport`] to a bus.
//! - [`CardTransport`] configures the chip, polls for a card and reads blocks.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tagreader_core::{BlockId, CardUid};
//! use tagreader_hardware::{BusFactory, CardTransport, Result, TransportFactory};
//!
//! async fn read_once<F, T>(buses: &F, devices: &T) -> Result<(CardUid, Vec<u8>)>
//! where
//!     F: BusFactory,
//!     T: TransportFactory<F::Bus>,
//! {
//!     let bus = Arc::new(buses.open().await?);
//!     let mut device = devices.attach(bus)?;
//!     let uid = device.poll_for_card(Duration::from_secs(5)).await?;
//!     device.configure().await?;
//!     let block = device.read_block(BlockId::new(4)).await?;
//!     Ok((uid, block))
//! }
//! ```
//!
//! [`BusFactory`]: traits::BusFactory
//! [`TransportFactory`]: traits::TransportFactory
//! [`CardTransport`]: traits::CardTransport

pub mod error;
pub mod mock;
pub mod traits;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use traits::{BusFactory, CardTransport, TransportFactory};
