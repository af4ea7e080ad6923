// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

use crate::error::AgentApiError;
use serde::{Deserialize, Serialize};
use teacup::{
    quote::Quote,
    tdx::{
        eventlog::{parse_event_log, EventLogRecord, MeasurementEntry},
        rtmr::{replay_event_log, ReplayedRtmrs},
    },
};
use zeroize::Zeroizing;

/// Width of an application key in bytes.
pub const KEY_BYTE_LEN: usize = 32;

/// Response to a quote request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetQuoteResponse {
    /// The quote, hex encoded.
    pub quote: String,
    /// The measurement event log backing the quote's runtime registers,
    /// shipped as embedded JSON.
    pub event_log: String,
}

impl GetQuoteResponse {
    /// The raw quote bytes.
    pub fn decode_quote(&self) -> Result<Vec<u8>, AgentApiError> {
        hex::decode(&self.quote).map_err(Into::into)
    }

    /// The quote, decoded into its typed form.
    pub fn parse_quote(&self) -> Result<Quote, AgentApiError> {
        Ok(Quote::parse(&self.decode_quote()?)?)
    }

    /// The validated measurement event log.
    pub fn decode_event_log(&self) -> Result<Vec<MeasurementEntry>, AgentApiError> {
        Ok(parse_event_log(&self.event_log)?)
    }

    /// Replay the shipped event log into register values.
    ///
    /// Compare the outcome against the registers of [`Self::parse_quote`] to
    /// establish that the log is genuine.
    pub fn replay_rtmrs(&self) -> Result<ReplayedRtmrs, AgentApiError> {
        Ok(replay_event_log(&self.decode_event_log()?))
    }
}

/// Static measurement reference values of the running TD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcbInfo {
    /// The TD build-time measurement, hex encoded.
    pub mrtd: String,
    /// The value of RTMR0, hex encoded.
    pub rtmr0: String,
    /// The value of RTMR1, hex encoded.
    pub rtmr1: String,
    /// The value of RTMR2, hex encoded.
    pub rtmr2: String,
    /// The value of RTMR3, hex encoded.
    pub rtmr3: String,
    /// SHA-256 over the app compose file, hex encoded.
    pub compose_hash: String,
    /// Identifier of the underlying device, hex encoded.
    pub device_id: String,
    /// The application compose file.
    pub app_compose: String,
    /// The measurement event log.
    pub event_log: Vec<EventLogRecord>,
}

/// Response to an info request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    /// The application identifier.
    pub app_id: String,
    /// The instance identifier.
    pub instance_id: String,
    /// The application certificate.
    pub app_cert: String,
    /// The name of the application.
    pub app_name: String,
    /// Measurement reference values of the running TD.
    pub tcb_info: TcbInfo,
}

/// The info RPC ships `tcb_info` as embedded JSON; decoded in
/// [`crate::AgentClient::info`].
#[derive(Deserialize)]
pub(crate) struct RawInfoResponse {
    pub(crate) app_id: String,
    pub(crate) instance_id: String,
    pub(crate) app_cert: String,
    pub(crate) app_name: String,
    pub(crate) tcb_info: String,
}

/// Response to a TLS key request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTlsKeyResponse {
    /// The private key, as a PKCS#8 PEM.
    pub key: String,
    /// The certificate chain issued for the key.
    pub certificate_chain: Vec<String>,
}

impl GetTlsKeyResponse {
    /// Decode the PEM into the raw P-256 secret scalar.
    pub fn decode_key(&self) -> Result<Zeroizing<Vec<u8>>, AgentApiError> {
        use p256::pkcs8::DecodePrivateKey;
        let secret = p256::SecretKey::from_pkcs8_pem(&self.key)
            .map_err(|e| AgentApiError::TlsKeyDecoding(e.to_string()))?;
        Ok(Zeroizing::new(secret.to_bytes().to_vec()))
    }
}

/// Response to an application key request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetKeyResponse {
    /// The key, hex encoded.
    pub key: String,
    /// Signatures binding the key to the application identity.
    pub signature_chain: Vec<String>,
}

impl GetKeyResponse {
    /// Decode the key and check its width.
    pub fn decode_key(&self) -> Result<Zeroizing<Vec<u8>>, AgentApiError> {
        let bytes = hex::decode(&self.key)?;
        if bytes.len() != KEY_BYTE_LEN {
            return Err(AgentApiError::KeyLength {
                actual: bytes.len(),
            });
        }
        Ok(Zeroizing::new(bytes))
    }
}
