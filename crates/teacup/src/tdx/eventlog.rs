// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

//! Measurement event log model
//!
//! The guest agent records every digest it extends into a runtime-measurement
//! register, together with free-form metadata about the event. The log is
//! shipped as a JSON array and is only trustworthy after replaying it against
//! the register values of a signed quote.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Number of runtime-measurement registers in a TD.
pub const RTMR_COUNT: usize = 4;

/// Width of a SHA-384 measurement digest in bytes.
pub const DIGEST_BYTE_LEN: usize = 48;

/// Event log parsing and validation error
#[derive(Error, Debug)]
pub enum EventLogError {
    /// the log is not valid JSON
    #[error("decoding event log JSON")]
    Json(#[from] serde_json::Error),
    /// a digest field is not valid hex
    #[error("event {position}: digest is not valid hex")]
    DigestEncoding {
        /// position of the offending record in the log
        position: usize,
        #[allow(missing_docs)]
        #[source]
        source: hex::FromHexError,
    },
    /// a digest decodes to the wrong number of bytes
    #[error("event {position}: digest is {actual} bytes, expected 48")]
    DigestWidth {
        /// position of the offending record in the log
        position: usize,
        /// decoded length of the rejected digest
        actual: usize,
    },
    /// a record addresses a register that does not exist
    #[error("event {position}: register index {value} is out of range")]
    RegisterIndex {
        /// position of the offending record in the log
        position: usize,
        /// the rejected index
        value: u32,
    },
}

/// Index of a TD runtime-measurement register.
///
/// The conventional assignment is firmware into RTMR0, kernel and boot
/// parameters into RTMR1, the OS image into RTMR2 and application events
/// into RTMR3. Replay never interprets these roles, it only keys on the
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum RtmrIndex {
    Rtmr0 = 0,
    Rtmr1 = 1,
    Rtmr2 = 2,
    Rtmr3 = 3,
}

impl RtmrIndex {
    /// All registers in index order.
    pub const ALL: [RtmrIndex; RTMR_COUNT] = [
        RtmrIndex::Rtmr0,
        RtmrIndex::Rtmr1,
        RtmrIndex::Rtmr2,
        RtmrIndex::Rtmr3,
    ];

    #[allow(missing_docs)]
    pub fn as_usize(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for RtmrIndex {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, u32> {
        match value {
            0 => Ok(RtmrIndex::Rtmr0),
            1 => Ok(RtmrIndex::Rtmr1),
            2 => Ok(RtmrIndex::Rtmr2),
            3 => Ok(RtmrIndex::Rtmr3),
            _ => Err(value),
        }
    }
}

impl Display for RtmrIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "rtmr{}", *self as u8)
    }
}

/// One record of the agent event log, as serialized on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogRecord {
    /// index of the register this event extends
    pub imr: u32,
    /// TCG event type
    pub event_type: u32,
    /// hex encoded SHA-384 digest extended into the register
    pub digest: String,
    /// event name
    #[serde(default)]
    pub event: String,
    /// free-form event payload
    #[serde(default)]
    pub event_payload: String,
}

/// A validated measurement event.
///
/// Field widths and the register index are checked once at construction;
/// replay consumes these without further validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementEntry {
    /// the register this event extends
    pub index: RtmrIndex,
    /// the digest extended into the register
    pub digest: [u8; DIGEST_BYTE_LEN],
    /// TCG event type, carried for transparency
    pub event_type: u32,
    /// event name, carried for transparency
    pub event: String,
    /// free-form event payload, carried for transparency
    pub event_payload: String,
}

/// Parse and validate an event log from its JSON serialization.
///
/// Record order is preserved. Replay depends on it.
pub fn parse_event_log(json: &str) -> Result<Vec<MeasurementEntry>, EventLogError> {
    let records: Vec<EventLogRecord> = serde_json::from_str(json)?;
    validate_event_log(&records)
}

/// Validate wire records into typed measurement entries.
pub fn validate_event_log(
    records: &[EventLogRecord],
) -> Result<Vec<MeasurementEntry>, EventLogError> {
    records
        .iter()
        .enumerate()
        .map(|(position, record)| {
            let index = RtmrIndex::try_from(record.imr).map_err(|value| {
                EventLogError::RegisterIndex { position, value }
            })?;
            let digest = hex::decode(&record.digest)
                .map_err(|source| EventLogError::DigestEncoding { position, source })?;
            let actual = digest.len();
            let digest: [u8; DIGEST_BYTE_LEN] = digest
                .try_into()
                .map_err(|_| EventLogError::DigestWidth { position, actual })?;
            Ok(MeasurementEntry {
                index,
                digest,
                event_type: record.event_type,
                event: record.event.clone(),
                event_payload: record.event_payload.clone(),
            })
        })
        .collect()
}
