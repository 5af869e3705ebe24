//! Fault-tolerant card reading for the tagreader engine.
//!
//! Card readers on a shared bus fail in two very different ways: the user
//! holds the card badly, or the reader itself stops answering. This crate
//! tells the two apart and recovers from the second one without help from
//! the caller.
//!
//! # Components
//!
//! - **SharedBusCache**: one lazily opened bus handle per reader, replaced
//!   after the health window or on an explicit hard reset
//! - **FailureCascadeTracker**: consecutive failed read calls across callers
//! - **ReadSession**: a single poll and block read on a fresh device
//! - **RecoveryController**: up to three attempts per read call (L0, L1, L2)
//! - **ReaderLoop**: continuous reading with events for the application
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tagreader_core::DataField;
//! use tagreader_hardware::mock::{MockBusFactory, MockReader};
//! use tagreader_recovery::{ReadStatus, ReaderConfig, RecoveryController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (buses, _) = MockBusFactory::new();
//! let (reader, _) = MockReader::new();
//! let config = ReaderConfig::new(vec![DataField::new("album", 4)]);
//! let controller = RecoveryController::with_factories(buses, reader, config)?;
//!
//! let result = controller.read(Duration::from_secs(5)).await;
//! match result.status() {
//!     ReadStatus::Success => println!("album {:?}", result.block("album")),
//!     _ => println!("{}", result.advice().message()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod bus_cache;
pub mod cascade;
pub mod config;
pub mod controller;
pub mod outcome;
pub mod reader_loop;
pub mod result;
pub mod session;

pub use bus_cache::{BusHandle, SharedBusCache};
pub use cascade::FailureCascadeTracker;
pub use config::ReaderConfig;
pub use controller::{RecoveryController, RecoveryStats};
pub use outcome::{AttemptOutcome, RecoveryLevel};
pub use reader_loop::{ReaderEvent, ReaderLoop, ReaderLoopHandle};
pub use result::{ReadAdvice, ReadResult, ReadStatus};
pub use session::ReadSession;
