//! Single read attempt against one transport device.
//!
//! The session is the boundary where driver errors become data: whatever the
//! transport returns is classified into an [`AttemptOutcome`] and no
//! [`HardwareError`] escapes. The session consumes the device and drops it
//! when the attempt ends; the shared bus the device was attached to is not
//! touched.

use std::collections::BTreeMap;
use std::time::Duration;

use tagreader_core::decode_block_text;
use tagreader_hardware::{CardTransport, HardwareError};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::config::ReaderConfig;
use crate::outcome::AttemptOutcome;

/// Per-attempt poll and read procedure.
#[derive(Debug, Clone, Copy)]
pub struct ReadSession<'a> {
    config: &'a ReaderConfig,
}

impl<'a> ReadSession<'a> {
    pub fn new(config: &'a ReaderConfig) -> Self {
        Self { config }
    }

    /// Poll for a card, configure the chip and read every configured field.
    ///
    /// A poll that has not returned within `poll_timeout` plus the configured
    /// grace is treated as hung firmware and reported as a system fault.
    pub async fn poll_and_read<T: CardTransport>(
        &self,
        mut transport: T,
        poll_timeout: Duration,
    ) -> AttemptOutcome {
        let poll_bound = poll_timeout.saturating_add(self.config.poll_grace);

        let uid = match timeout(poll_bound, transport.poll_for_card(poll_timeout)).await {
            Ok(Ok(uid)) => uid,
            Ok(Err(e)) if e.is_no_card() => {
                debug!(timeout_ms = poll_timeout.as_millis() as u64, "No card present");
                return AttemptOutcome::NoCardPresent;
            }
            Ok(Err(e)) => {
                warn!("Card poll failed: {}", e);
                return AttemptOutcome::fault(e);
            }
            Err(_) => {
                warn!(
                    bound_ms = poll_bound.as_millis() as u64,
                    "Card poll did not return in time"
                );
                return AttemptOutcome::fault(HardwareError::timeout(poll_bound));
            }
        };

        trace!(%uid, "Card detected");

        match timeout(self.config.command_timeout, transport.configure()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(%uid, "Reader configuration failed: {}", e);
                return AttemptOutcome::fault(e);
            }
            Err(_) => {
                warn!(%uid, "Reader configuration timed out");
                return AttemptOutcome::fault(HardwareError::timeout(self.config.command_timeout));
            }
        }

        let mut blocks = BTreeMap::new();
        for field in &self.config.fields {
            let raw = match timeout(self.config.command_timeout, transport.read_block(field.block))
                .await
            {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    warn!(%uid, block = field.block.as_u8(), "Block read failed: {}", e);
                    return AttemptOutcome::fault(e);
                }
                Err(_) => {
                    warn!(%uid, block = field.block.as_u8(), "Block read timed out");
                    return AttemptOutcome::fault(HardwareError::timeout(
                        self.config.command_timeout,
                    ));
                }
            };

            blocks.insert(field.name.clone(), decode_block_text(&raw));
        }

        AttemptOutcome::Success { uid, blocks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tagreader_core::{CardUid, DataField};
    use tagreader_hardware::mock::{MockBehavior, MockBusFactory, MockReader, MockTransport};
    use tagreader_hardware::{BusFactory, TransportFactory};

    fn uid() -> CardUid {
        "8f82d28f".parse().unwrap()
    }

    async fn device(behavior: MockBehavior) -> MockTransport {
        let (buses, _) = MockBusFactory::new();
        let (reader, handle) = MockReader::new();
        handle.push(behavior);
        reader.attach(Arc::new(buses.open().await.unwrap())).unwrap()
    }

    #[tokio::test]
    async fn test_success_builds_blocks() {
        let config = ReaderConfig::default();
        let session = ReadSession::new(&config);

        let outcome = session
            .poll_and_read(
                device(MockBehavior::card(uid(), &[(4, "159")])).await,
                config.poll_timeout,
            )
            .await;

        let expected = BTreeMap::from([("4".to_string(), "159".to_string())]);
        assert_eq!(
            outcome,
            AttemptOutcome::Success {
                uid: uid(),
                blocks: expected
            }
        );
    }

    #[tokio::test]
    async fn test_named_fields() {
        let config = ReaderConfig::new(vec![
            DataField::new("album", 4),
            DataField::new("track", 5),
        ]);
        let session = ReadSession::new(&config);

        let outcome = session
            .poll_and_read(
                device(MockBehavior::card(uid(), &[(4, "159"), (5, "07")])).await,
                config.poll_timeout,
            )
            .await;

        let AttemptOutcome::Success { blocks, .. } = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(blocks["album"], "159");
        assert_eq!(blocks["track"], "07");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_card() {
        let config = ReaderConfig::default();
        let session = ReadSession::new(&config);

        let outcome = session
            .poll_and_read(device(MockBehavior::NoCard).await, config.poll_timeout)
            .await;

        assert_eq!(outcome, AttemptOutcome::NoCardPresent);
    }

    #[tokio::test]
    async fn test_configure_fault_is_system_fault() {
        let config = ReaderConfig::default();
        let session = ReadSession::new(&config);

        let outcome = session
            .poll_and_read(
                device(MockBehavior::ConfigureFault).await,
                config.poll_timeout,
            )
            .await;

        assert!(outcome.is_fault());
    }

    #[tokio::test]
    async fn test_read_fault_is_system_fault() {
        let config = ReaderConfig::default();
        let session = ReadSession::new(&config);

        let outcome = session
            .poll_and_read(device(MockBehavior::ReadFault).await, config.poll_timeout)
            .await;

        assert_eq!(
            outcome,
            AttemptOutcome::SystemFault {
                cause: "Authentication failed for block 4".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_block_is_system_fault() {
        let config = ReaderConfig::new(vec![DataField::for_block(9)]);
        let session = ReadSession::new(&config);

        let outcome = session
            .poll_and_read(
                device(MockBehavior::card(uid(), &[(4, "159")])).await,
                config.poll_timeout,
            )
            .await;

        assert!(outcome.is_fault());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_poll_is_system_fault() {
        let config = ReaderConfig::default();
        let session = ReadSession::new(&config);

        let start = tokio::time::Instant::now();
        let outcome = session
            .poll_and_read(device(MockBehavior::Hang).await, config.poll_timeout)
            .await;

        assert!(outcome.is_fault());
        assert!(start.elapsed() >= Duration::from_millis(5500));
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_configure_is_system_fault() {
        let config = ReaderConfig::default();
        let session = ReadSession::new(&config);

        let start = tokio::time::Instant::now();
        let outcome = session
            .poll_and_read(
                device(MockBehavior::HangOnConfigure).await,
                config.poll_timeout,
            )
            .await;

        assert!(outcome.is_fault());
        assert_eq!(start.elapsed(), config.command_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_block_read_is_system_fault() {
        let config = ReaderConfig::default();
        let session = ReadSession::new(&config);

        let start = tokio::time::Instant::now();
        let outcome = session
            .poll_and_read(device(MockBehavior::HangOnRead).await, config.poll_timeout)
            .await;

        assert!(outcome.is_fault());
        assert_eq!(start.elapsed(), config.command_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_poll_timeout() {
        let config = ReaderConfig::default();
        let session = ReadSession::new(&config);

        let outcome = session
            .poll_and_read(
                device(MockBehavior::card(uid(), &[(4, "159")])).await,
                Duration::MAX,
            )
            .await;

        assert!(matches!(outcome, AttemptOutcome::Success { .. }));
    }
}
