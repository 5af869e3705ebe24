//! Error types for hardware operations.
//!
//! This module defines the errors a bus or card transport driver can report.
//! One variant is special: [`HardwareError::NoCard`] is the driver's way of
//! saying the poll window elapsed with no card in the field. It is an expected
//! physical condition, and the recovery engine never treats it as a fault.
//! Every other variant is a transport fault.

use std::time::Duration;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No card entered the field within the poll window.
    #[error("No card present after {timeout_ms}ms")]
    NoCard { timeout_ms: u64 },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Bus communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Bus or device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Reader chip configuration failed.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Card authentication failed.
    #[error("Authentication failed for block {block}")]
    AuthenticationFailed { block: u8 },

    /// Card block read error.
    #[error("Card read error: {message}")]
    CardReadError { message: String },
}

impl HardwareError {
    /// Create a new no-card error for the given poll window.
    pub fn no_card(timeout: Duration) -> Self {
        Self::NoCard {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout {
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new authentication error.
    pub fn authentication(block: u8) -> Self {
        Self::AuthenticationFailed { block }
    }

    /// Create a new card read error.
    pub fn card_read(message: impl Into<String>) -> Self {
        Self::CardReadError {
            message: message.into(),
        }
    }

    /// Whether this is the driver's "no card in field" signal.
    pub fn is_no_card(&self) -> bool {
        matches!(self, Self::NoCard { .. })
    }
}
