//! Hardware trait definitions.
//!
//! These traits are the contract between the recovery engine and the reader
//! hardware. They split the hardware into two lifetimes:
//!
//! - a long-lived **bus**, expensive to open and occasionally in need of a
//!   hard reset, produced by a [`BusFactory`];
//! - a short-lived **transport device**, built against a bus for a single
//!   read attempt by a [`TransportFactory`] and dropped afterwards.
//!
//! Methods return `impl Future + Send` so that engine futures stay `Send`
//! and can run on spawned Tokio tasks. Implementors may still write plain
//! `async fn`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tagreader_core::{BlockId, CardUid};

use crate::error::Result;

/// Creates and resets the shared bus.
///
/// # Examples
///
/// ```no_run
/// use tagreader_hardware::traits::BusFactory;
/// use tagreader_hardware::error::Result;
///
/// async fn reopen<F: BusFactory>(factory: &F) -> Result<F::Bus> {
///     factory.hard_reset().await?;
///     factory.open().await
/// }
/// ```
pub trait BusFactory: Send + Sync {
    /// The bus type shared between transport devices.
    type Bus: Send + Sync + 'static;

    /// Open the bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus cannot be opened at all (device node
    /// missing, bus busy, initialization rejected).
    fn open(&self) -> impl Future<Output = Result<Self::Bus>> + Send;

    /// Perform a hard reset of the underlying bus hardware.
    ///
    /// Called with no bus handle cached. Settling after the reset is the
    /// caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset line or controller cannot be driven.
    fn hard_reset(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Builds a fresh transport device against a shared bus.
pub trait TransportFactory<B>: Send + Sync {
    /// The per-attempt device type.
    type Transport: CardTransport;

    /// Attach a new device to `bus`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device object cannot be constructed.
    fn attach(&self, bus: Arc<B>) -> Result<Self::Transport>;
}

/// Low-level card transport driver.
///
/// # Examples
///
/// ```no_run
/// use tagreader_hardware::traits::CardTransport;
/// use tagreader_hardware::error::Result;
/// use tagreader_core::BlockId;
/// use std::time::Duration;
///
/// async fn first_block<T: CardTransport>(device: &mut T) -> Result<Vec<u8>> {
///     let _uid = device.poll_for_card(Duration::from_secs(5)).await?;
///     device.configure().await?;
///     device.read_block(BlockId::new(4)).await
/// }
/// ```
pub trait CardTransport: Send {
    /// Configure the reader chip for card access.
    ///
    /// # Errors
    ///
    /// Returns an error if the chip rejects its configuration.
    fn configure(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `timeout` for a card to enter the field.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NoCard`](crate::HardwareError::NoCard) when the
    /// window elapses without a card, and any other variant on a bus fault.
    fn poll_for_card(&mut self, timeout: Duration)
    -> impl Future<Output = Result<CardUid>> + Send;

    /// Read one data block from the card in the field.
    ///
    /// # Errors
    ///
    /// Returns an error on authentication or transfer failure.
    fn read_block(&mut self, block: BlockId) -> impl Future<Output = Result<Vec<u8>>> + Send;
}
