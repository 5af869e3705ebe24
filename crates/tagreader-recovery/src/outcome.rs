//! Recovery levels and per-attempt outcomes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tagreader_core::CardUid;

/// Escalating retry strategy used by one attempt of a read call.
///
/// Levels are ordered; within one read call escalation only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum RecoveryLevel {
    /// Normal attempt on the cached bus handle.
    L0 = 0,

    /// Soft retry: fresh device, longer settling.
    L1 = 1,

    /// Hard retry: forced bus reset, longest settling.
    L2 = 2,
}

impl RecoveryLevel {
    /// All levels in escalation order.
    pub const ALL: [RecoveryLevel; 3] = [Self::L0, Self::L1, Self::L2];

    /// Attempt index, 0 to 2.
    #[inline]
    #[must_use]
    pub fn as_index(self) -> usize {
        self as usize
    }

    /// The next level, or `None` after L2.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::L0 => Some(Self::L1),
            Self::L1 => Some(Self::L2),
            Self::L2 => None,
        }
    }

    /// Whether attempts at this level force a bus reset.
    #[inline]
    #[must_use]
    pub fn resets_bus(self) -> bool {
        matches!(self, Self::L2)
    }
}

impl fmt::Display for RecoveryLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "L{}", *self as u8)
    }
}

impl From<RecoveryLevel> for u8 {
    fn from(level: RecoveryLevel) -> Self {
        level as u8
    }
}

impl TryFrom<u8> for RecoveryLevel {
    type Error = tagreader_core::Error;

    fn try_from(value: u8) -> tagreader_core::Result<Self> {
        match value {
            0 => Ok(Self::L0),
            1 => Ok(Self::L1),
            2 => Ok(Self::L2),
            _ => Err(tagreader_core::Error::Config(format!(
                "recovery level must be 0-2, got {value}"
            ))),
        }
    }
}

/// Classified result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Card read cleanly.
    Success {
        uid: CardUid,
        blocks: BTreeMap<String, String>,
    },

    /// No card entered the field; never retried.
    NoCardPresent,

    /// Bus or protocol failure; retried by escalation.
    SystemFault { cause: String },
}

impl AttemptOutcome {
    pub fn fault(cause: impl fmt::Display) -> Self {
        Self::SystemFault {
            cause: cause.to_string(),
        }
    }

    /// Whether the read call should stop after this outcome.
    #[must_use]
    pub fn is_terminal_at(&self, level: RecoveryLevel) -> bool {
        match self {
            Self::Success { .. } | Self::NoCardPresent => true,
            Self::SystemFault { .. } => level.next().is_none(),
        }
    }

    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::SystemFault { .. })
    }
}
