//! Two independent state machines: the ingest record's processed flag and the
//! media unit's downstream status.

use crate::decision::Classification;
use std::fmt;
use std::str::FromStr;

/// Processing state of an ingest record. `Processed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Unprocessed,
    Processed,
}

impl IngestState {
    pub fn from_flag(processed: bool) -> Self {
        if processed {
            IngestState::Processed
        } else {
            IngestState::Unprocessed
        }
    }

    /// State after a verdict. Only definite verdicts move an unprocessed record forward;
    /// ambiguous and orphan verdicts keep it eligible for a later pass.
    pub fn after(self, classification: Classification) -> Self {
        match self {
            IngestState::Processed => IngestState::Processed,
            IngestState::Unprocessed if classification.is_definite() => IngestState::Processed,
            IngestState::Unprocessed => IngestState::Unprocessed,
        }
    }

    pub fn is_processed(self) -> bool {
        self == IngestState::Processed
    }
}

/// Downstream status of a media unit. The engine only ever creates `Pending` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    Pending,
    Ready,
    Error,
}

impl UnitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitStatus::Pending => "pending",
            UnitStatus::Ready => "ready",
            UnitStatus::Error => "error",
        }
    }

    /// `pending → ready | error`; both targets are terminal.
    pub fn can_transition_to(self, next: UnitStatus) -> bool {
        matches!(
            (self, next),
            (UnitStatus::Pending, UnitStatus::Ready) | (UnitStatus::Pending, UnitStatus::Error)
        )
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(UnitStatus::Pending),
            "ready" => Ok(UnitStatus::Ready),
            "error" => Ok(UnitStatus::Error),
            other => Err(format!("unknown unit status '{}'", other)),
        }
    }
}
