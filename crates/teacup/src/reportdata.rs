// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

//! Report-data encoding for quote requests
//!
//! A TD report carries exactly 64 bytes of caller data, typically a nonce or
//! a hash of a key the quote should be bound to. Shorter input is padded
//! with zeroes on the right; longer input is refused. It is never truncated
//! or hashed down, both would silently bind the quote to something the
//! caller did not ask for.

use thiserror::Error;

/// Width of the report-data field in a TD report.
pub const REPORT_DATA_BYTE_LEN: usize = 64;

/// Report-data encoding error
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReportDataError {
    /// the input does not fit the field
    #[error("report data is {actual} bytes, the limit is 64 bytes")]
    TooLarge {
        /// length of the rejected input
        actual: usize,
    },
}

/// Encode caller data into the fixed-width report-data field.
///
/// Text goes in as its UTF-8 bytes.
///
/// # Examples
///
/// ```
/// # use teacup::reportdata::encode_report_data;
/// let report_data = encode_report_data("test")?;
/// assert_eq!(&report_data[..4], b"test");
/// assert_eq!(&report_data[4..], [0u8; 60]);
/// # Ok::<(), teacup::reportdata::ReportDataError>(())
/// ```
pub fn encode_report_data(
    input: impl AsRef<[u8]>,
) -> Result<[u8; REPORT_DATA_BYTE_LEN], ReportDataError> {
    let input = input.as_ref();
    if input.len() > REPORT_DATA_BYTE_LEN {
        return Err(ReportDataError::TooLarge {
            actual: input.len(),
        });
    }
    let mut report_data = [0u8; REPORT_DATA_BYTE_LEN];
    report_data[..input.len()].copy_from_slice(input);
    Ok(report_data)
}
