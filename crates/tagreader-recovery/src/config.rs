use std::collections::HashSet;
use std::time::Duration;

use tagreader_core::constants::{
    BUS_HEALTH_THRESHOLD_MS, BUS_RESET_SETTLE_MS, CASCADE_THRESHOLD,
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_LOOP_INTERVAL_MS, DEFAULT_POLL_GRACE_MS,
    DEFAULT_POLL_TIMEOUT_MS, LEVEL_SETTLE_MS,
};
use tagreader_core::{DataField, Error, Result};

use crate::outcome::RecoveryLevel;

/// Reader engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// How long each attempt waits for a card to enter the field
    pub poll_timeout: Duration,

    /// Extra time a driver poll may take before it counts as hung
    pub poll_grace: Duration,

    /// Upper bound for chip configuration and for each block read
    pub command_timeout: Duration,

    /// Age after which the cached bus handle is replaced
    pub health_threshold: Duration,

    /// Settling delay after a bus hard reset
    pub reset_settle: Duration,

    /// Settling delay before polling, per recovery level
    pub settle: [Duration; 3],

    /// Consecutive failed reads that trigger a reset recommendation
    pub cascade_threshold: u32,

    /// Data fields read from every card
    pub fields: Vec<DataField>,

    /// Pause between reads in the background reader loop
    pub loop_interval: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
            poll_grace: Duration::from_millis(DEFAULT_POLL_GRACE_MS),
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            health_threshold: Duration::from_millis(BUS_HEALTH_THRESHOLD_MS),
            reset_settle: Duration::from_millis(BUS_RESET_SETTLE_MS),
            settle: LEVEL_SETTLE_MS.map(Duration::from_millis),
            cascade_threshold: CASCADE_THRESHOLD,
            fields: vec![DataField::default()],
            loop_interval: Duration::from_millis(DEFAULT_LOOP_INTERVAL_MS),
        }
    }
}

impl ReaderConfig {
    /// Create a configuration reading the given fields, with default timings
    pub fn new(fields: Vec<DataField>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Set the per-attempt poll timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the grace period granted to the driver beyond the poll timeout
    pub fn poll_grace(mut self, grace: Duration) -> Self {
        self.poll_grace = grace;
        self
    }

    /// Set the configuration and block read bound
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the bus handle health threshold
    pub fn health_threshold(mut self, threshold: Duration) -> Self {
        self.health_threshold = threshold;
        self
    }

    /// Set the settling delay after a bus hard reset
    pub fn reset_settle(mut self, settle: Duration) -> Self {
        self.reset_settle = settle;
        self
    }

    /// Set the settling delay for one recovery level
    pub fn settle_for(mut self, level: RecoveryLevel, settle: Duration) -> Self {
        self.settle[level.as_index()] = settle;
        self
    }

    /// Set the cascade threshold
    pub fn cascade_threshold(mut self, threshold: u32) -> Self {
        self.cascade_threshold = threshold;
        self
    }

    /// Set the background loop interval
    pub fn loop_interval(mut self, interval: Duration) -> Self {
        self.loop_interval = interval;
        self
    }

    /// Settling delay applied before polling at `level`
    pub fn settle_delay(&self, level: RecoveryLevel) -> Duration {
        self.settle[level.as_index()]
    }

    /// Check the configuration for values the engine cannot work with.
    ///
    /// # Errors
    /// Returns `Error::Config` for a zero poll timeout, health threshold or
    /// cascade threshold, and for duplicate field names. Returns
    /// `Error::MissingConfig` when no data field is configured.
    pub fn validate(&self) -> Result<()> {
        if self.poll_timeout.is_zero() {
            return Err(Error::Config("poll_timeout must be non-zero".to_string()));
        }

        if self.health_threshold.is_zero() {
            return Err(Error::Config(
                "health_threshold must be non-zero".to_string(),
            ));
        }

        if self.cascade_threshold == 0 {
            return Err(Error::Config(
                "cascade_threshold must be at least 1".to_string(),
            ));
        }

        if self.fields.is_empty() {
            return Err(Error::MissingConfig("fields".to_string()));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate field name: {}",
                    field.name
                )));
            }
        }

        Ok(())
    }
}
