//! The structured result returned once per read call.
//!
//! [`ReadResult`] is the contract consumed by upstream logic. It serializes
//! as camelCase JSON:
//!
//! ```json
//! {
//!   "status": "success",
//!   "uid": "0x8f82d28f",
//!   "blocks": { "4": "159" },
//!   "attempt": 0,
//!   "systemResetNeeded": false,
//!   "readAt": "2025-10-05T12:46:06Z"
//! }
//! ```
//!
//! A cascade of failed reads is never reported as an error value: it is the
//! `systemResetNeeded` flag on an otherwise ordinary result.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tagreader_core::CardUid;

use crate::outcome::{AttemptOutcome, RecoveryLevel};

/// Terminal status of a read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    /// A card was read.
    Success,

    /// No card was presented in time. Not a system error.
    Timeout,

    /// All recovery levels ended in a system fault.
    Error,
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Result of one read call. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    status: ReadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<CardUid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<BTreeMap<String, String>>,
    attempt: RecoveryLevel,
    system_reset_needed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<String>,
    read_at: DateTime<Utc>,
}

impl ReadResult {
    /// Build the result for a call whose terminal outcome was produced at
    /// `attempt`.
    pub(crate) fn from_outcome(
        outcome: AttemptOutcome,
        attempt: RecoveryLevel,
        system_reset_needed: bool,
    ) -> Self {
        let (status, uid, blocks, cause) = match outcome {
            AttemptOutcome::Success { uid, blocks } => {
                (ReadStatus::Success, Some(uid), Some(blocks), None)
            }
            AttemptOutcome::NoCardPresent => (ReadStatus::Timeout, None, None, None),
            AttemptOutcome::SystemFault { cause } => {
                (ReadStatus::Error, None, None, Some(cause))
            }
        };

        Self {
            status,
            uid,
            blocks,
            attempt,
            system_reset_needed,
            cause,
            read_at: Utc::now(),
        }
    }

    pub fn status(&self) -> ReadStatus {
        self.status
    }

    /// Card UID, present iff the status is `Success`.
    pub fn uid(&self) -> Option<&CardUid> {
        self.uid.as_ref()
    }

    /// Field values keyed by field name, present iff the status is `Success`.
    pub fn blocks(&self) -> Option<&BTreeMap<String, String>> {
        self.blocks.as_ref()
    }

    /// Value of a single field.
    pub fn block(&self, name: &str) -> Option<&str> {
        self.blocks.as_ref()?.get(name).map(String::as_str)
    }

    /// Recovery level that produced the terminal outcome.
    pub fn attempt(&self) -> RecoveryLevel {
        self.attempt
    }

    /// Whether consecutive failed reads reached the cascade threshold.
    pub fn system_reset_needed(&self) -> bool {
        self.system_reset_needed
    }

    /// Terminal fault description, present iff the status is `Error`.
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub fn read_at(&self) -> DateTime<Utc> {
        self.read_at
    }

    pub fn is_success(&self) -> bool {
        self.status == ReadStatus::Success
    }

    pub fn is_timeout(&self) -> bool {
        self.status == ReadStatus::Timeout
    }

    pub fn is_error(&self) -> bool {
        self.status == ReadStatus::Error
    }

    /// What upstream code should tell the user.
    pub fn advice(&self) -> ReadAdvice {
        match self.status {
            ReadStatus::Success => ReadAdvice::Proceed,
            ReadStatus::Timeout => ReadAdvice::RepositionCard,
            ReadStatus::Error if self.system_reset_needed => ReadAdvice::RestartRecommended,
            ReadStatus::Error => ReadAdvice::RetryLater,
        }
    }
}

/// User-facing guidance derived from a [`ReadResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadAdvice {
    /// Card read; continue with the mapped action.
    Proceed,

    /// Ask the user to place or reposition the card.
    RepositionCard,

    /// Transient reader fault; another tap may work.
    RetryLater,

    /// Reader faults persist; further retries are futile until restart.
    RestartRecommended,
}

impl ReadAdvice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Proceed => "Card read",
            Self::RepositionCard => "Please place the card on the reader",
            Self::RetryLater => "Reader error, please try again",
            Self::RestartRecommended => "Card reader not responding, restart recommended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success() -> AttemptOutcome {
        AttemptOutcome::Success {
            uid: CardUid::new(vec![0x8f, 0x82, 0xd2, 0x8f]).unwrap(),
            blocks: BTreeMap::from([("4".to_string(), "159".to_string())]),
        }
    }

    #[test]
    fn test_success_result() {
        let result = ReadResult::from_outcome(success(), RecoveryLevel::L0, false);

        assert!(result.is_success());
        assert_eq!(result.uid().unwrap().to_string(), "0x8f82d28f");
        assert_eq!(result.block("4"), Some("159"));
        assert_eq!(result.cause(), None);
        assert_eq!(result.advice(), ReadAdvice::Proceed);
    }

    #[test]
    fn test_timeout_result_has_no_card_data() {
        let result =
            ReadResult::from_outcome(AttemptOutcome::NoCardPresent, RecoveryLevel::L0, false);

        assert!(result.is_timeout());
        assert!(result.uid().is_none());
        assert!(result.blocks().is_none());
        assert_eq!(result.advice(), ReadAdvice::RepositionCard);
    }

    #[test]
    fn test_error_advice_depends_on_reset_flag() {
        let plain = ReadResult::from_outcome(
            AttemptOutcome::fault("bus NACK"),
            RecoveryLevel::L2,
            false,
        );
        let cascading = ReadResult::from_outcome(
            AttemptOutcome::fault("bus NACK"),
            RecoveryLevel::L2,
            true,
        );

        assert_eq!(plain.cause(), Some("bus NACK"));
        assert_eq!(plain.advice(), ReadAdvice::RetryLater);
        assert_eq!(cascading.advice(), ReadAdvice::RestartRecommended);
        assert!(cascading.advice().message().contains("restart"));
    }

    #[test]
    fn test_wire_format() {
        let result = ReadResult::from_outcome(success(), RecoveryLevel::L1, false);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["uid"], "0x8f82d28f");
        assert_eq!(json["blocks"]["4"], "159");
        assert_eq!(json["attempt"], 1);
        assert_eq!(json["systemResetNeeded"], false);
        assert!(json.get("cause").is_none());
        assert!(json.get("readAt").is_some());
    }

    #[test]
    fn test_wire_format_error() {
        let result =
            ReadResult::from_outcome(AttemptOutcome::fault("i2c"), RecoveryLevel::L2, true);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["attempt"], 2);
        assert_eq!(json["systemResetNeeded"], true);
        assert_eq!(json["cause"], "i2c");
        assert!(json.get("uid").is_none());
        assert!(json.get("blocks").is_none());

        let back: ReadResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
