//! Engine-wide constants for the card read recovery engine.
//!
//! This module centralizes every timing bound and threshold the recovery
//! engine relies on. Keeping them here gives a single place to audit the
//! worst-case latency of a read call and the point at which the engine starts
//! recommending an external reset.
//!
//! # Latency Budget
//!
//! A single read call runs at most [`MAX_ATTEMPTS`] attempts. Each attempt
//! costs its settling delay plus the poll timeout, and the last attempt adds
//! the bus reset settling delay:
//!
//! ```text
//! L0: settle(100ms) + poll(5s)
//! L1: settle(300ms) + poll(5s)
//! L2: reset(300ms) + settle(400ms) + poll(5s)
//! ```
//!
//! # Usage
//!
//! ```
//! use tagreader_core::constants::*;
//! use std::time::Duration;
//!
//! let poll = Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS);
//! assert_eq!(poll, Duration::from_secs(5));
//! assert_eq!(LEVEL_SETTLE_MS.len(), MAX_ATTEMPTS);
//! ```

// ============================================================================
// Recovery Attempts
// ============================================================================

/// Maximum number of attempts performed by one read call (L0, L1, L2).
pub const MAX_ATTEMPTS: usize = 3;

/// Settling delay applied before polling, indexed by recovery level.
///
/// The L2 entry is applied after the bus hard reset has completed, on top of
/// [`BUS_RESET_SETTLE_MS`].
pub const LEVEL_SETTLE_MS: [u64; MAX_ATTEMPTS] = [100, 300, 400];

// ============================================================================
// Card Polling
// ============================================================================

/// Default time the driver waits for a card to enter the field (milliseconds).
///
/// # Value: 5000ms (5 seconds)
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 5000;

/// Extra time granted to the driver beyond the poll timeout (milliseconds).
///
/// A driver that has not returned within `poll timeout + grace` is treated
/// as hung firmware, which is a system fault rather than "no card".
pub const DEFAULT_POLL_GRACE_MS: u64 = 500;

/// Upper bound for chip configuration and for a single block read (milliseconds).
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Shared Bus
// ============================================================================

/// Age after which a cached bus handle is considered stale (milliseconds).
///
/// # Value: 30000ms (30 seconds)
pub const BUS_HEALTH_THRESHOLD_MS: u64 = 30_000;

/// Settling delay after a bus hard reset (milliseconds).
pub const BUS_RESET_SETTLE_MS: u64 = 300;

// ============================================================================
// Failure Cascade
// ============================================================================

/// Consecutive failed read calls after which a system reset is recommended.
pub const CASCADE_THRESHOLD: u32 = 3;

// ============================================================================
// Card Data
// ============================================================================

/// Minimum UID length in bytes (ISO 14443 single size UID).
pub const MIN_UID_LENGTH: usize = 4;

/// Maximum UID length in bytes (ISO 14443 triple size UID).
pub const MAX_UID_LENGTH: usize = 10;

/// Data block read by the default field configuration.
pub const DEFAULT_DATA_BLOCK: u8 = 4;

// ============================================================================
// Background Reader Loop
// ============================================================================

/// Pause between consecutive reads in the background reader loop (milliseconds).
pub const DEFAULT_LOOP_INTERVAL_MS: u64 = 200;

/// Capacity of the reader loop event channel.
pub const READER_EVENT_CHANNEL_CAPACITY: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_delays_increase_with_level() {
        assert!(LEVEL_SETTLE_MS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_grace_is_shorter_than_poll() {
        assert!(DEFAULT_POLL_GRACE_MS < DEFAULT_POLL_TIMEOUT_MS);
    }

    #[test]
    fn test_uid_bounds() {
        assert!(MIN_UID_LENGTH <= MAX_UID_LENGTH);
        assert_eq!(MIN_UID_LENGTH, 4);
    }
}
