//! Background read loop.
//!
//! The loop owns one task that calls [`RecoveryController::read_default`]
//! back to back and turns the results into [`ReaderEvent`]s for the
//! application:
//!
//! ```text
//! ┌────────────┐  read()  ┌─────────────────┐
//! │ Controller │◄─────────│   Loop task     │
//! └────────────┘          │                 │──────► ReaderLoopHandle::recv()
//!                         │ (mpsc, bounded) │
//!                         └─────────────────┘
//! ```
//!
//! Timeouts are not forwarded: an empty reader is the normal idle state. A
//! card left on the reader is reported once; the next report for the same
//! UID needs the card to leave the field first.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use tagreader_hardware::mock::{MockBusFactory, MockReader};
//! use tagreader_recovery::{ReaderConfig, ReaderEvent, ReaderLoop, RecoveryController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (buses, _) = MockBusFactory::new();
//!     let (reader, _) = MockReader::new();
//!     let controller = RecoveryController::with_factories(buses, reader, ReaderConfig::default())?;
//!
//!     let mut handle = ReaderLoop::new(Arc::new(controller)).start();
//!
//!     while let Some(event) = handle.recv().await {
//!         if let ReaderEvent::CardRead(result) = event {
//!             println!("{:?}", result.uid());
//!         }
//!     }
//!
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tagreader_core::CardUid;
use tagreader_core::constants::READER_EVENT_CHANNEL_CAPACITY;
use tagreader_hardware::{BusFactory, TransportFactory};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::controller::RecoveryController;
use crate::result::{ReadResult, ReadStatus};

/// Event produced by the background read loop.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ReaderEvent {
    /// A card was read.
    CardRead(ReadResult),

    /// A read call failed at every recovery level.
    ReadFailed(ReadResult),

    /// Sent after `ReadFailed` when the failure cascade threshold is reached.
    ResetRecommended(ReadResult),
}

impl ReaderEvent {
    pub fn result(&self) -> &ReadResult {
        match self {
            Self::CardRead(result) | Self::ReadFailed(result) | Self::ResetRecommended(result) => {
                result
            }
        }
    }
}

/// Handle for receiving events from a running [`ReaderLoop`].
///
/// Dropping the handle stops the loop.
pub struct ReaderLoopHandle {
    event_rx: mpsc::Receiver<ReaderEvent>,
    tasks: JoinSet<()>,
}

impl ReaderLoopHandle {
    /// Receive the next event.
    ///
    /// Returns `None` once the loop has stopped.
    pub async fn recv(&mut self) -> Option<ReaderEvent> {
        self.event_rx.recv().await
    }

    /// Stop the loop and wait for its task to terminate.
    ///
    /// A read in progress is cancelled at its next await point.
    pub async fn shutdown(mut self) {
        self.tasks.abort_all();

        while let Some(result) = self.tasks.join_next().await {
            match Self::classify_task_result(result) {
                TaskTermination::Finished => debug!("Reader loop finished"),
                TaskTermination::Cancelled => debug!("Reader loop cancelled"),
                TaskTermination::Panic => warn!("Reader loop panicked"),
            }
        }
    }

    fn classify_task_result(result: Result<(), tokio::task::JoinError>) -> TaskTermination {
        match result {
            Ok(()) => TaskTermination::Finished,
            Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
            Err(_) => TaskTermination::Panic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    /// Receiver went away and the loop returned.
    Finished,
    /// Aborted by `shutdown()`.
    Cancelled,
    Panic,
}

/// Continuous card reading on top of a shared controller.
///
/// The controller stays usable for on-demand reads while the loop runs;
/// both share the bus cache and the failure tracker.
pub struct ReaderLoop<F, T>
where
    F: BusFactory,
    T: TransportFactory<F::Bus>,
{
    controller: Arc<RecoveryController<F, T>>,
    capacity: usize,
}

impl<F, T> ReaderLoop<F, T>
where
    F: BusFactory + 'static,
    T: TransportFactory<F::Bus> + 'static,
{
    pub fn new(controller: Arc<RecoveryController<F, T>>) -> Self {
        Self {
            controller,
            capacity: READER_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Set the event channel capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Spawn the loop task and return the event handle.
    pub fn start(self) -> ReaderLoopHandle {
        let (event_tx, event_rx) = mpsc::channel(self.capacity);
        let mut tasks = JoinSet::new();
        tasks.spawn(Self::run(self.controller, event_tx));

        ReaderLoopHandle { event_rx, tasks }
    }

    async fn run(controller: Arc<RecoveryController<F, T>>, tx: mpsc::Sender<ReaderEvent>) {
        let interval = controller.config().loop_interval;
        let mut present: Option<CardUid> = None;

        while !tx.is_closed() {
            let result = controller.read_default().await;

            for event in Self::events_for(result, &mut present) {
                if !Self::forward(&tx, event).await {
                    return;
                }
            }

            tokio::time::sleep(interval).await;
        }
    }

    fn events_for(result: ReadResult, present: &mut Option<CardUid>) -> Vec<ReaderEvent> {
        match result.status() {
            ReadStatus::Success => {
                let uid = result.uid().cloned();
                if uid.is_some() && *present == uid {
                    trace!("Card still present, not reported again");
                    return Vec::new();
                }
                *present = uid;
                vec![ReaderEvent::CardRead(result)]
            }
            ReadStatus::Timeout => {
                *present = None;
                Vec::new()
            }
            ReadStatus::Error if result.system_reset_needed() => vec![
                ReaderEvent::ReadFailed(result.clone()),
                ReaderEvent::ResetRecommended(result),
            ],
            ReadStatus::Error => vec![ReaderEvent::ReadFailed(result)],
        }
    }

    /// Returns `false` once the receiver is gone.
    async fn forward(tx: &mpsc::Sender<ReaderEvent>, event: ReaderEvent) -> bool {
        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                debug!("Reader event channel full, waiting for receiver");
                tx.send(event).await.is_ok()
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
