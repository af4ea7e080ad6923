// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

// Parts of it are Copyright (c) 2024 Phala Network
// and copied from https://github.com/Phala-Network/dcap-qvl

//! Parse Intel TDX attestation quotes
//!
//! The decoder understands quote format versions 4 and 5 carrying a TD
//! report. The signature section is carried as opaque bytes; validating it
//! against the vendor certificate chain is out of scope for this crate.

pub mod error;

use crate::quote::error::{QuoteContext as _, QuoteError};
use bytemuck::AnyBitPattern;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    io::{self, Read},
};
use tracing::trace;

#[allow(missing_docs)]
pub const TEE_TYPE_SGX: u32 = 0x00000000;
#[allow(missing_docs)]
pub const TEE_TYPE_TDX: u32 = 0x00000081;

#[allow(missing_docs)]
pub const BODY_SGX_ENCLAVE_REPORT_TYPE: u16 = 1;
#[allow(missing_docs)]
pub const BODY_TD_REPORT10_TYPE: u16 = 2;
#[allow(missing_docs)]
pub const BODY_TD_REPORT15_TYPE: u16 = 3;

mod serde_bytes {
    use serde::Deserialize;

    pub(crate) trait FromBytes {
        fn from_bytes(bytes: Vec<u8>) -> Option<Self>
        where
            Self: Sized;
    }
    impl FromBytes for Vec<u8> {
        fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
            Some(bytes)
        }
    }
    impl<const N: usize> FromBytes for [u8; N] {
        fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
            bytes.try_into().ok()
        }
    }

    pub(crate) fn serialize<S: serde::Serializer>(
        data: impl AsRef<[u8]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let hex_str = hex::encode(data);
        serializer.serialize_str(&hex_str)
    }

    pub(crate) fn deserialize<'de, D: serde::Deserializer<'de>, T: FromBytes>(
        deserializer: D,
    ) -> Result<T, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        let bytes = hex::decode(hex_str).map_err(serde::de::Error::custom)?;
        T::from_bytes(bytes).ok_or_else(|| serde::de::Error::custom("invalid bytes"))
    }
}

/// Trait that allows zero-copy read of value-references from slices in LE format.
pub trait Decode: Sized {
    /// Attempt to deserialise the value from input.
    fn decode<I: Read>(input: &mut I) -> Result<Self, error::QuoteError>;
}

impl<T: AnyBitPattern> Decode for T {
    fn decode<I: Read>(input: &mut I) -> Result<Self, error::QuoteError> {
        let mut bytes = vec![0u8; size_of::<T>()];
        input.read_exact(&mut bytes).context("parsing bytes")?;
        bytemuck::try_pod_read_unaligned(&bytes).map_err(Into::into)
    }
}

/// Length-prefixed opaque byte region, the prefix type given by `T`.
#[derive(Debug, Clone)]
#[repr(C)]
pub struct Data<T> {
    #[allow(missing_docs)]
    pub data: Vec<u8>,
    _marker: core::marker::PhantomData<T>,
}

impl<T> Serialize for Data<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_bytes::serialize(&self.data, serializer)
    }
}

impl<'de, T> Deserialize<'de> for Data<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = serde_bytes::deserialize(deserializer)?;
        Ok(Data {
            data,
            _marker: core::marker::PhantomData,
        })
    }
}

impl<T: Decode + Into<u64>> Decode for Data<T> {
    fn decode<I: Read>(input: &mut I) -> Result<Self, QuoteError> {
        let len = T::decode(input)?;
        let len = len.into() as usize;
        // the length prefix is untrusted, never reserved upfront
        let mut data = Vec::new();
        input
            .take(len as u64)
            .read_to_end(&mut data)
            .context("reading bytes")?;
        if data.len() != len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof)).context("reading bytes");
        }
        Ok(Data {
            data,
            _marker: core::marker::PhantomData,
        })
    }
}

#[allow(missing_docs)]
#[derive(AnyBitPattern, Debug, Serialize, Deserialize, Copy, Clone)]
#[repr(C, packed)]
pub struct Header {
    pub version: u16,
    pub attestation_key_type: u16,
    pub tee_type: u32,
    pub qe_svn: u16,
    pub pce_svn: u16,
    #[serde(with = "serde_bytes")]
    pub qe_vendor_id: [u8; 16],
    #[serde(with = "serde_bytes")]
    pub user_data: [u8; 20],
}

#[derive(AnyBitPattern, Debug, Copy, Clone)]
#[allow(missing_docs)]
#[repr(C, packed)]
pub struct Body {
    pub body_type: u16,
    pub size: u32,
}

#[derive(AnyBitPattern, Debug, Copy, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
#[repr(C, packed)]
pub struct TDReport10 {
    #[serde(with = "serde_bytes")]
    pub tee_tcb_svn: [u8; 16],
    #[serde(with = "serde_bytes")]
    pub mr_seam: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub mr_signer_seam: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub seam_attributes: [u8; 8],
    #[serde(with = "serde_bytes")]
    pub td_attributes: [u8; 8],
    #[serde(with = "serde_bytes")]
    pub xfam: [u8; 8],
    #[serde(with = "serde_bytes")]
    pub mr_td: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub mr_config_id: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub mr_owner: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub mr_owner_config: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub rt_mr0: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub rt_mr1: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub rt_mr2: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub rt_mr3: [u8; 48],
    #[serde(with = "serde_bytes")]
    pub report_data: [u8; 64],
}

impl TDReport10 {
    /// The four runtime-measurement registers in index order.
    pub fn rtmrs(&self) -> [[u8; 48]; 4] {
        [self.rt_mr0, self.rt_mr1, self.rt_mr2, self.rt_mr3]
    }
}

#[derive(AnyBitPattern, Debug, Copy, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
#[repr(C, packed)]
pub struct TDReport15 {
    pub base: TDReport10,
    #[serde(with = "serde_bytes")]
    pub tee_tcb_svn2: [u8; 16],
    #[serde(with = "serde_bytes")]
    pub mr_service_td: [u8; 48],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
#[repr(C)]
#[non_exhaustive]
pub enum Report {
    TD10(TDReport10),
    TD15(TDReport15),
}

impl Report {
    /// The common TD report fields, shared by both body versions.
    pub fn as_td10(&self) -> &TDReport10 {
        match self {
            Report::TD10(report) => report,
            Report::TD15(report) => &report.base,
        }
    }

    #[allow(missing_docs)]
    pub fn as_td15(&self) -> Option<&TDReport15> {
        match self {
            Report::TD15(report) => Some(report),
            _ => None,
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn space_or_newline(f: &mut Formatter<'_>) -> std::fmt::Result {
            if f.alternate() {
                writeln!(f)
            } else {
                write!(f, " ")
            }
        }
        let report_body = self.as_td10();
        write!(f, "mrtd: {}", hex::encode(report_body.mr_td))?;
        space_or_newline(f)?;
        write!(f, "rtmr0: {}", hex::encode(report_body.rt_mr0))?;
        space_or_newline(f)?;
        write!(f, "rtmr1: {}", hex::encode(report_body.rt_mr1))?;
        space_or_newline(f)?;
        write!(f, "rtmr2: {}", hex::encode(report_body.rt_mr2))?;
        space_or_newline(f)?;
        write!(f, "rtmr3: {}", hex::encode(report_body.rt_mr3))?;
        space_or_newline(f)?;
        write!(
            f,
            "reportdata: {}",
            hex::encode(report_body.report_data.as_slice())
        )
    }
}

/// A decoded TDX quote.
#[derive(Debug, Serialize, Deserialize)]
#[repr(C)]
pub struct Quote {
    #[allow(missing_docs)]
    pub header: Header,
    #[allow(missing_docs)]
    pub report: Report,
    /// The signature section, carried but never interpreted.
    pub signature: Data<u32>,
}

impl Decode for Quote {
    fn decode<I: Read>(input: &mut I) -> Result<Self, error::QuoteError> {
        let header = Header::decode(input)?;
        trace!(?header);
        let report;
        match header.version {
            4 => match header.tee_type {
                TEE_TYPE_TDX => {
                    report = Report::TD10(TDReport10::decode(input)?);
                }
                _ => return Err(error::QuoteError::InvalidTeeType),
            },
            5 => {
                let body = Body::decode(input)?;
                let body_size = body.size as usize;
                match body.body_type {
                    BODY_TD_REPORT10_TYPE => {
                        if body_size != size_of::<TDReport10>() {
                            return Err(error::QuoteError::Unexpected(format!(
                                "body size {body_size} does not match a TD 1.0 report"
                            )));
                        }
                        report = Report::TD10(TDReport10::decode(input)?);
                    }
                    BODY_TD_REPORT15_TYPE => {
                        if body_size != size_of::<TDReport15>() {
                            return Err(error::QuoteError::Unexpected(format!(
                                "body size {body_size} does not match a TD 1.5 report"
                            )));
                        }
                        report = Report::TD15(TDReport15::decode(input)?);
                    }
                    _ => return Err(error::QuoteError::UnsupportedBodyType),
                }
            }
            _ => return Err(error::QuoteError::QuoteVersion),
        }
        let signature = Data::<u32>::decode(input)?;
        Ok(Quote {
            header,
            report,
            signature,
        })
    }
}

impl Quote {
    /// Parse a TDX quote from a byte slice.
    pub fn parse(quote: &[u8]) -> Result<Self, QuoteError> {
        let mut input = quote;
        let quote = Quote::decode(&mut input)?;
        Ok(quote)
    }

    /// Get the report data
    pub fn get_report_data(&self) -> &[u8] {
        self.report.as_td10().report_data.as_slice()
    }

    /// Get the TD build-time measurement register
    pub fn mr_td(&self) -> [u8; 48] {
        self.report.as_td10().mr_td
    }

    /// Get the runtime measurement registers in index order
    pub fn rtmrs(&self) -> [[u8; 48]; 4] {
        self.report.as_td10().rtmrs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testaso::testaso;

    testaso! {
        struct TDReport10: 1, 584 => {
            tee_tcb_svn: 0,
            mr_seam: 16,
            mr_signer_seam: 64,
            seam_attributes: 112,
            td_attributes: 120,
            xfam: 128,
            mr_td: 136,
            mr_config_id: 184,
            mr_owner: 232,
            mr_owner_config: 280,
            rt_mr0: 328,
            rt_mr1: 376,
            rt_mr2: 424,
            rt_mr3: 472,
            report_data: 520
        }

        struct TDReport15: 1, 648 => {
            base: 0,
            tee_tcb_svn2: 584,
            mr_service_td: 600
        }
    }

    #[test]
    fn header_and_body_sizes() {
        assert_eq!(size_of::<Header>(), 48);
        assert_eq!(size_of::<Body>(), 6);
    }

    fn encode_header(version: u16, tee_type: u32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(size_of::<Header>());
        bytes.extend_from_slice(&version.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&tee_type.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&[0x93u8; 16]);
        bytes.extend_from_slice(&[0u8; 20]);
        bytes
    }

    fn encode_td10(mr_td: &[u8; 48], rtmrs: &[[u8; 48]; 4], report_data: &[u8; 64]) -> Vec<u8> {
        // tee_tcb_svn through xfam
        let mut bytes = vec![0u8; 136];
        bytes.extend_from_slice(mr_td);
        // mr_config_id, mr_owner, mr_owner_config
        bytes.extend_from_slice(&[0u8; 144]);
        for rtmr in rtmrs {
            bytes.extend_from_slice(rtmr);
        }
        bytes.extend_from_slice(report_data);
        assert_eq!(bytes.len(), size_of::<TDReport10>());
        bytes
    }

    fn sample_quote_v4() -> Vec<u8> {
        let mut quote = encode_header(4, TEE_TYPE_TDX);
        quote.extend_from_slice(&encode_td10(
            &[0xAA; 48],
            &[[0x10; 48], [0x11; 48], [0x12; 48], [0x13; 48]],
            &[0x42; 64],
        ));
        let signature = [0xC5u8; 134];
        quote.extend_from_slice(&(signature.len() as u32).to_le_bytes());
        quote.extend_from_slice(&signature);
        quote
    }

    #[test]
    fn parses_version_4() {
        let raw = sample_quote_v4();
        let quote = Quote::parse(&raw).unwrap();
        let header = quote.header;
        assert_eq!({ header.version }, 4);
        assert_eq!({ header.tee_type }, TEE_TYPE_TDX);
        let report = quote.report.as_td10();
        assert_eq!(report.mr_td, [0xAA; 48]);
        assert_eq!(quote.rtmrs(), [[0x10; 48], [0x11; 48], [0x12; 48], [0x13; 48]]);
        assert_eq!(quote.get_report_data(), [0x42; 64]);
        assert_eq!(quote.signature.data.len(), 134);
    }

    #[test]
    fn parsing_is_deterministic() {
        let raw = sample_quote_v4();
        let one = serde_json::to_value(Quote::parse(&raw).unwrap()).unwrap();
        let two = serde_json::to_value(Quote::parse(&raw).unwrap()).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn parses_version_5_td10() {
        let mut quote = encode_header(5, TEE_TYPE_TDX);
        quote.extend_from_slice(&BODY_TD_REPORT10_TYPE.to_le_bytes());
        quote.extend_from_slice(&(size_of::<TDReport10>() as u32).to_le_bytes());
        quote.extend_from_slice(&encode_td10(&[0xBB; 48], &[[0; 48]; 4], &[0; 64]));
        quote.extend_from_slice(&0u32.to_le_bytes());
        let quote = Quote::parse(&quote).unwrap();
        assert_eq!(quote.mr_td(), [0xBB; 48]);
        assert!(quote.report.as_td15().is_none());
    }

    #[test]
    fn parses_version_5_td15() {
        let mut quote = encode_header(5, TEE_TYPE_TDX);
        quote.extend_from_slice(&BODY_TD_REPORT15_TYPE.to_le_bytes());
        quote.extend_from_slice(&(size_of::<TDReport15>() as u32).to_le_bytes());
        quote.extend_from_slice(&encode_td10(&[0xCC; 48], &[[0; 48]; 4], &[1; 64]));
        quote.extend_from_slice(&[0u8; 16]);
        quote.extend_from_slice(&[0xDD; 48]);
        quote.extend_from_slice(&0u32.to_le_bytes());
        let quote = Quote::parse(&quote).unwrap();
        let report = quote.report.as_td15().unwrap();
        assert_eq!(report.mr_service_td, [0xDD; 48]);
        assert_eq!(quote.mr_td(), [0xCC; 48]);
    }

    #[test]
    fn rejects_unsupported_versions() {
        for version in [0u16, 1, 2, 3, 6] {
            let mut quote = encode_header(version, TEE_TYPE_TDX);
            quote.extend_from_slice(&encode_td10(&[0; 48], &[[0; 48]; 4], &[0; 64]));
            quote.extend_from_slice(&0u32.to_le_bytes());
            assert!(matches!(
                Quote::parse(&quote),
                Err(QuoteError::QuoteVersion)
            ));
        }
    }

    #[test]
    fn rejects_sgx_tee_type() {
        let mut quote = encode_header(4, TEE_TYPE_SGX);
        quote.extend_from_slice(&encode_td10(&[0; 48], &[[0; 48]; 4], &[0; 64]));
        quote.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Quote::parse(&quote),
            Err(QuoteError::InvalidTeeType)
        ));
    }

    #[test]
    fn rejects_sgx_body_type() {
        let mut quote = encode_header(5, TEE_TYPE_TDX);
        quote.extend_from_slice(&BODY_SGX_ENCLAVE_REPORT_TYPE.to_le_bytes());
        quote.extend_from_slice(&384u32.to_le_bytes());
        quote.extend_from_slice(&[0u8; 384]);
        quote.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Quote::parse(&quote),
            Err(QuoteError::UnsupportedBodyType)
        ));
    }

    #[test]
    fn rejects_mismatched_body_size() {
        let mut quote = encode_header(5, TEE_TYPE_TDX);
        quote.extend_from_slice(&BODY_TD_REPORT10_TYPE.to_le_bytes());
        quote.extend_from_slice(&(size_of::<TDReport15>() as u32).to_le_bytes());
        quote.extend_from_slice(&encode_td10(&[0; 48], &[[0; 48]; 4], &[0; 64]));
        quote.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Quote::parse(&quote),
            Err(QuoteError::Unexpected(_))
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        let raw = sample_quote_v4();
        // every strict prefix must fail, never zero-fill
        for cut in [0, 1, 47, 48, 200, 631, 635, raw.len() - 1] {
            assert!(
                matches!(Quote::parse(&raw[..cut]), Err(QuoteError::IoError { .. })),
                "prefix of {cut} bytes did not fail"
            );
        }
    }

    #[test]
    fn rejects_signature_length_beyond_buffer() {
        let mut quote = encode_header(4, TEE_TYPE_TDX);
        quote.extend_from_slice(&encode_td10(&[0; 48], &[[0; 48]; 4], &[0; 64]));
        quote.extend_from_slice(&64u32.to_le_bytes());
        quote.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            Quote::parse(&quote),
            Err(QuoteError::IoError { .. })
        ));
    }

    #[test]
    fn rejects_hostile_signature_length_prefix() {
        // a length prefix of 4 GiB must fail without reserving 4 GiB
        let mut quote = encode_header(4, TEE_TYPE_TDX);
        quote.extend_from_slice(&encode_td10(&[0; 48], &[[0; 48]; 4], &[0; 64]));
        quote.extend_from_slice(&u32::MAX.to_le_bytes());
        quote.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            Quote::parse(&quote),
            Err(QuoteError::IoError { .. })
        ));
    }
}
