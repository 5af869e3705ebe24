//! Read call orchestration with escalating recovery.
//!
//! A read call runs up to three attempts, one per [`RecoveryLevel`]:
//!
//! | Level | Bus handle            | Settling        |
//! |-------|-----------------------|-----------------|
//! | L0    | cached                | 100ms           |
//! | L1    | cached, fresh device  | 300ms           |
//! | L2    | hard reset + reopen   | 300ms + 400ms   |
//!
//! Classification of each attempt's outcome:
//!
//! - `Success` stops the call and reports the level that succeeded.
//! - `NoCardPresent` stops the call immediately. Card positioning is a user
//!   problem and a reset cannot fix it.
//! - `SystemFault` escalates to the next level; at L2 it is terminal.
//!
//! After the terminal outcome the failure cascade tracker is updated exactly
//! once, and a [`ReadResult`] is returned. `read()` never fails: every
//! hardware error is folded into the result.
//!
//! # Examples
//!
//! ```no_run
//! use tagreader_hardware::mock::{MockBusFactory, MockReader};
//! use tagreader_recovery::{ReaderConfig, RecoveryController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (buses, _) = MockBusFactory::new();
//! let (reader, _) = MockReader::new();
//! let controller = RecoveryController::with_factories(buses, reader, ReaderConfig::default())?;
//!
//! let result = controller.read_default().await;
//! if result.system_reset_needed() {
//!     eprintln!("{}", result.advice().message());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tagreader_hardware::{BusFactory, TransportFactory};
use tracing::{debug, error, info, warn};

use crate::bus_cache::SharedBusCache;
use crate::cascade::FailureCascadeTracker;
use crate::config::ReaderConfig;
use crate::outcome::{AttemptOutcome, RecoveryLevel};
use crate::result::ReadResult;
use crate::session::ReadSession;

/// Snapshot of the controller's lifetime counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStats {
    /// Read calls started.
    pub reads: u64,

    /// Read calls that returned `Success`.
    pub successes: u64,

    /// Read calls that returned `Timeout`.
    pub timeouts: u64,

    /// Read calls that returned `Error`.
    pub errors: u64,

    /// Escalations from one level to the next.
    pub escalations: u64,

    /// Hard bus resets requested at L2.
    pub bus_resets: u64,

    /// Read calls that reported `systemResetNeeded`.
    pub reset_signals: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    reads: AtomicU64,
    successes: AtomicU64,
    timeouts: AtomicU64,
    errors: AtomicU64,
    escalations: AtomicU64,
    bus_resets: AtomicU64,
    reset_signals: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RecoveryStats {
        RecoveryStats {
            reads: self.reads.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
            bus_resets: self.bus_resets.load(Ordering::Relaxed),
            reset_signals: self.reset_signals.load(Ordering::Relaxed),
        }
    }
}

/// Runs read calls against a reader with escalating recovery.
///
/// The bus cache and the failure tracker are shared state: several
/// controllers (or several tasks holding one controller through an `Arc`)
/// may use the same instances. Attempts within one call are sequential;
/// separate calls only serialize on bus construction and reset.
pub struct RecoveryController<F, T>
where
    F: BusFactory,
    T: TransportFactory<F::Bus>,
{
    cache: Arc<SharedBusCache<F>>,
    tracker: Arc<FailureCascadeTracker>,
    transports: T,
    config: ReaderConfig,
    stats: StatsCounters,
}

impl<F, T> RecoveryController<F, T>
where
    F: BusFactory,
    T: TransportFactory<F::Bus>,
{
    /// Create a controller over existing shared state.
    ///
    /// # Errors
    /// Returns the validation error if `config` is unusable.
    pub fn new(
        cache: Arc<SharedBusCache<F>>,
        tracker: Arc<FailureCascadeTracker>,
        transports: T,
        config: ReaderConfig,
    ) -> tagreader_core::Result<Self> {
        config.validate()?;

        Ok(Self {
            cache,
            tracker,
            transports,
            config,
            stats: StatsCounters::default(),
        })
    }

    /// Create a controller with its own bus cache and failure tracker.
    ///
    /// # Errors
    /// Returns the validation error if `config` is unusable.
    pub fn with_factories(
        buses: F,
        transports: T,
        config: ReaderConfig,
    ) -> tagreader_core::Result<Self> {
        let cache = Arc::new(SharedBusCache::from_config(buses, &config));
        let tracker = Arc::new(FailureCascadeTracker::new(config.cascade_threshold));
        Self::new(cache, tracker, transports, config)
    }

    /// Read a card using the configured poll timeout.
    pub async fn read_default(&self) -> ReadResult {
        self.read(self.config.poll_timeout).await
    }

    /// Read a card, waiting up to `poll_timeout` per attempt.
    pub async fn read(&self, poll_timeout: Duration) -> ReadResult {
        StatsCounters::bump(&self.stats.reads);

        let mut level = RecoveryLevel::L0;
        let outcome = loop {
            let outcome = self.attempt(level, poll_timeout).await;

            match level.next() {
                Some(next) if !outcome.is_terminal_at(level) => {
                    warn!(from = %level, to = %next, "System fault, escalating recovery level");
                    StatsCounters::bump(&self.stats.escalations);
                    level = next;
                }
                _ => break outcome,
            }
        };

        self.finish(outcome, level)
    }

    /// Shared bus cache used by this controller.
    pub fn cache(&self) -> &Arc<SharedBusCache<F>> {
        &self.cache
    }

    /// Failure tracker used by this controller.
    pub fn tracker(&self) -> &Arc<FailureCascadeTracker> {
        &self.tracker
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn stats(&self) -> RecoveryStats {
        self.stats.snapshot()
    }

    async fn attempt(&self, level: RecoveryLevel, poll_timeout: Duration) -> AttemptOutcome {
        debug!(%level, "Starting read attempt");

        let handle = if level.resets_bus() {
            StatsCounters::bump(&self.stats.bus_resets);
            self.cache.reset().await
        } else {
            self.cache.get_or_create().await
        };

        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%level, "Could not acquire bus: {}", e);
                return AttemptOutcome::fault(e);
            }
        };

        let transport = match self.transports.attach(Arc::clone(handle.bus())) {
            Ok(transport) => transport,
            Err(e) => {
                warn!(%level, "Could not attach reader device: {}", e);
                return AttemptOutcome::fault(e);
            }
        };

        tokio::time::sleep(self.config.settle_delay(level)).await;

        ReadSession::new(&self.config)
            .poll_and_read(transport, poll_timeout)
            .await
    }

    fn finish(&self, outcome: AttemptOutcome, level: RecoveryLevel) -> ReadResult {
        let system_reset_needed = match &outcome {
            AttemptOutcome::Success { uid, .. } => {
                self.tracker.record_success();
                StatsCounters::bump(&self.stats.successes);
                info!(%uid, attempt = %level, "Card read");
                false
            }
            AttemptOutcome::NoCardPresent => {
                StatsCounters::bump(&self.stats.timeouts);
                debug!(attempt = %level, "Read timed out without a card");
                false
            }
            AttemptOutcome::SystemFault { cause } => {
                StatsCounters::bump(&self.stats.errors);
                let count = self.tracker.record_failure();
                let cascading = self.tracker.is_cascading(count);

                if cascading {
                    StatsCounters::bump(&self.stats.reset_signals);
                    error!(
                        consecutive_failures = count,
                        cause = %cause,
                        "Reader failing persistently, system reset recommended"
                    );
                } else {
                    warn!(consecutive_failures = count, cause = %cause, "Read failed at every level");
                }

                cascading
            }
        };

        ReadResult::from_outcome(outcome, level, system_reset_needed)
    }
}
