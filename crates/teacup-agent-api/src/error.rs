// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

use thiserror::Error;

/// Represents all possible errors that can occur when talking to the guest agent.
#[derive(Error, Debug)]
pub enum AgentApiError {
    /// The report data for a quote request does not fit the field.
    #[error(transparent)]
    ReportData(#[from] teacup::reportdata::ReportDataError),

    /// Wraps an underlying reqwest error.
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Wraps a URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Wraps a Serde JSON error.
    #[error("Serde JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wraps a hex decoding error.
    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The event log shipped by the agent failed validation.
    #[error(transparent)]
    EventLog(#[from] teacup::tdx::eventlog::EventLogError),

    /// The quote shipped by the agent failed to parse.
    #[error(transparent)]
    Quote(#[from] teacup::quote::error::QuoteError),

    /// Wraps a standard I/O error from the Unix socket transport.
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    /// The agent answered with a non-success HTTP status.
    #[error("Agent returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code returned by the agent.
        status: u16,
        /// Response body, as far as it was readable.
        message: String,
    },

    /// The agent's HTTP response could not be parsed.
    #[error("Malformed agent response: {0}")]
    Protocol(String),

    /// A key did not decode to the expected width.
    #[error("Expected a 32 byte key, got {actual} bytes")]
    KeyLength {
        /// decoded length of the rejected key
        actual: usize,
    },

    /// A TLS key PEM could not be decoded.
    #[error("Decoding TLS key: {0}")]
    TlsKeyDecoding(String),

    /// The endpoint string is neither an HTTP URL nor a socket path.
    #[error("Invalid agent endpoint: {0:?}")]
    InvalidEndpoint(String),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
}
