// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

//! Replay of the TD runtime-measurement registers
//!
//! Each register is a SHA-384 hash chain: it starts out as 48 zero bytes and
//! every event advances it to `SHA384(previous ‖ digest)`. Replaying a log
//! and comparing the outcome against the registers of a signed quote is what
//! makes the log trustworthy.

use crate::{
    quote::TDReport10,
    tdx::eventlog::{MeasurementEntry, RtmrIndex, DIGEST_BYTE_LEN, RTMR_COUNT},
};
use sha2::{Digest, Sha384};
use std::fmt::{Display, Formatter};

/// Running state of one runtime-measurement register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmrState {
    state: [u8; DIGEST_BYTE_LEN],
}

impl Default for RtmrState {
    fn default() -> Self {
        Self {
            state: [0u8; DIGEST_BYTE_LEN],
        }
    }
}

impl RtmrState {
    /// Fold one event digest into the register state.
    pub fn extend(&mut self, digest: &[u8; DIGEST_BYTE_LEN]) -> &[u8] {
        let mut hasher = Sha384::new();
        hasher.update(self.state);
        hasher.update(digest);
        self.state.copy_from_slice(&hasher.finalize());
        &self.state
    }

    /// The current register value.
    pub fn value(&self) -> [u8; DIGEST_BYTE_LEN] {
        self.state
    }
}

impl Display for RtmrState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.state))
    }
}

/// The register values produced by replaying an event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayedRtmrs {
    registers: [RtmrState; RTMR_COUNT],
}

impl ReplayedRtmrs {
    /// Value of one replayed register.
    pub fn get(&self, index: RtmrIndex) -> [u8; DIGEST_BYTE_LEN] {
        self.registers[index.as_usize()].value()
    }

    /// Compare the replayed registers against the ones reported in a quote.
    ///
    /// A differing register is an answer, not an error. Callers decide what
    /// to do with partial matches.
    pub fn correlate(&self, report: &TDReport10) -> RtmrCorrelation {
        let reported = report.rtmrs();
        let mut matches = [false; RTMR_COUNT];
        for index in RtmrIndex::ALL {
            matches[index.as_usize()] = self.get(index) == reported[index.as_usize()];
        }
        RtmrCorrelation { matches }
    }
}

impl Display for ReplayedRtmrs {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, index) in RtmrIndex::ALL.into_iter().enumerate() {
            if i != 0 {
                if f.alternate() {
                    writeln!(f)?;
                } else {
                    write!(f, " ")?;
                }
            }
            write!(f, "{index}: {}", self.registers[index.as_usize()])?;
        }
        Ok(())
    }
}

/// Replay a validated event log into register values.
///
/// Entries are folded strictly in log order; each entry advances only the
/// register it names. A register without any events keeps its all-zero
/// start value.
pub fn replay_event_log(entries: &[MeasurementEntry]) -> ReplayedRtmrs {
    let mut rtmrs = ReplayedRtmrs::default();
    for entry in entries {
        rtmrs.registers[entry.index.as_usize()].extend(&entry.digest);
    }
    rtmrs
}

/// Outcome of correlating replayed registers with a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmrCorrelation {
    matches: [bool; RTMR_COUNT],
}

impl RtmrCorrelation {
    /// Whether one register matched byte for byte.
    pub fn matches(&self, index: RtmrIndex) -> bool {
        self.matches[index.as_usize()]
    }

    /// Whether every register matched.
    pub fn all_match(&self) -> bool {
        self.matches.iter().all(|matched| *matched)
    }

    /// The registers that did not match, in index order.
    pub fn mismatched(&self) -> impl Iterator<Item = RtmrIndex> + '_ {
        RtmrIndex::ALL
            .into_iter()
            .filter(|index| !self.matches(*index))
    }
}

impl Display for RtmrCorrelation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, index) in RtmrIndex::ALL.into_iter().enumerate() {
            if i != 0 {
                if f.alternate() {
                    writeln!(f)?;
                } else {
                    write!(f, " ")?;
                }
            }
            let state = if self.matches(index) { "ok" } else { "MISMATCH" };
            write!(f, "{index}: {state}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    fn entry(index: RtmrIndex, digest: [u8; DIGEST_BYTE_LEN]) -> MeasurementEntry {
        MeasurementEntry {
            index,
            digest,
            event_type: 134217729,
            event: String::new(),
            event_payload: String::new(),
        }
    }

    fn sha384_chain(digests: &[[u8; DIGEST_BYTE_LEN]]) -> [u8; DIGEST_BYTE_LEN] {
        let mut state = [0u8; DIGEST_BYTE_LEN];
        for digest in digests {
            let mut hasher = Sha384::new();
            hasher.update(state);
            hasher.update(digest);
            state.copy_from_slice(&hasher.finalize());
        }
        state
    }

    #[test]
    fn untouched_registers_stay_zero() {
        let rtmrs = replay_event_log(&[]);
        for index in RtmrIndex::ALL {
            assert_eq!(rtmrs.get(index), [0u8; DIGEST_BYTE_LEN]);
        }
    }

    #[test]
    fn extend_is_a_hash_chain() {
        let mut state = RtmrState::default();
        state.extend(&[0x01; DIGEST_BYTE_LEN]);
        state.extend(&[0x02; DIGEST_BYTE_LEN]);
        assert_eq!(
            state.value(),
            sha384_chain(&[[0x01; DIGEST_BYTE_LEN], [0x02; DIGEST_BYTE_LEN]])
        );
    }

    #[test]
    fn chaining_differs_from_hashing_the_concatenation() {
        let chained = sha384_chain(&[[0x01; DIGEST_BYTE_LEN], [0x02; DIGEST_BYTE_LEN]]);
        let mut concatenated = [0u8; DIGEST_BYTE_LEN];
        let mut hasher = Sha384::new();
        hasher.update([0u8; DIGEST_BYTE_LEN]);
        hasher.update([0x01; DIGEST_BYTE_LEN]);
        hasher.update([0x02; DIGEST_BYTE_LEN]);
        concatenated.copy_from_slice(&hasher.finalize());
        assert_ne!(chained, concatenated);
    }

    #[test]
    fn events_only_advance_their_register() {
        let rtmrs = replay_event_log(&[
            entry(RtmrIndex::Rtmr1, [0x11; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr1, [0x12; DIGEST_BYTE_LEN]),
        ]);
        assert_eq!(
            rtmrs.get(RtmrIndex::Rtmr1),
            sha384_chain(&[[0x11; DIGEST_BYTE_LEN], [0x12; DIGEST_BYTE_LEN]])
        );
        for index in [RtmrIndex::Rtmr0, RtmrIndex::Rtmr2, RtmrIndex::Rtmr3] {
            assert_eq!(rtmrs.get(index), [0u8; DIGEST_BYTE_LEN]);
        }
    }

    #[test]
    fn replay_respects_log_order() {
        let forward = replay_event_log(&[
            entry(RtmrIndex::Rtmr3, [0x31; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr0, [0x01; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr3, [0x32; DIGEST_BYTE_LEN]),
        ]);
        let reversed = replay_event_log(&[
            entry(RtmrIndex::Rtmr3, [0x32; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr0, [0x01; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr3, [0x31; DIGEST_BYTE_LEN]),
        ]);
        assert_ne!(forward.get(RtmrIndex::Rtmr3), reversed.get(RtmrIndex::Rtmr3));
        assert_eq!(forward.get(RtmrIndex::Rtmr0), reversed.get(RtmrIndex::Rtmr0));
        assert_eq!(
            forward.get(RtmrIndex::Rtmr3),
            sha384_chain(&[[0x31; DIGEST_BYTE_LEN], [0x32; DIGEST_BYTE_LEN]])
        );
    }

    #[test]
    fn correlate_confirms_a_genuine_pair() {
        let log = [
            entry(RtmrIndex::Rtmr0, [0x01; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr1, [0x11; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr3, [0x31; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr3, [0x32; DIGEST_BYTE_LEN]),
        ];
        let rtmrs = replay_event_log(&log);
        let mut report = TDReport10::zeroed();
        report.rt_mr0 = rtmrs.get(RtmrIndex::Rtmr0);
        report.rt_mr1 = rtmrs.get(RtmrIndex::Rtmr1);
        report.rt_mr2 = rtmrs.get(RtmrIndex::Rtmr2);
        report.rt_mr3 = rtmrs.get(RtmrIndex::Rtmr3);
        let correlation = rtmrs.correlate(&report);
        assert!(correlation.all_match());
        assert_eq!(correlation.mismatched().count(), 0);
    }

    #[test]
    fn correlate_flags_only_the_tampered_register() {
        let log = [
            entry(RtmrIndex::Rtmr0, [0x01; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr1, [0x11; DIGEST_BYTE_LEN]),
            entry(RtmrIndex::Rtmr3, [0x31; DIGEST_BYTE_LEN]),
        ];
        let rtmrs = replay_event_log(&log);
        let mut report = TDReport10::zeroed();
        report.rt_mr0 = rtmrs.get(RtmrIndex::Rtmr0);
        report.rt_mr1 = rtmrs.get(RtmrIndex::Rtmr1);
        report.rt_mr3 = rtmrs.get(RtmrIndex::Rtmr3);

        let mut tampered = log.clone();
        tampered[1].digest = [0xEE; DIGEST_BYTE_LEN];
        let correlation = replay_event_log(&tampered).correlate(&report);

        assert!(!correlation.all_match());
        assert!(correlation.matches(RtmrIndex::Rtmr0));
        assert!(!correlation.matches(RtmrIndex::Rtmr1));
        assert!(correlation.matches(RtmrIndex::Rtmr2));
        assert!(correlation.matches(RtmrIndex::Rtmr3));
        assert_eq!(
            correlation.mismatched().collect::<Vec<_>>(),
            [RtmrIndex::Rtmr1]
        );
    }
}
