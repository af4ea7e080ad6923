// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

//! Guest Agent API Client
//!
//! This crate provides the client side of the guest agent RPC interface
//! inside a TD: quote requests, instance information, key derivation and
//! runtime measurement events.
//!
//! Create an [`AgentClient`] to interface with the agent, either over its
//! Unix socket or over HTTP against a simulator.
//!
//! Example
//! ```rust,no_run
//! use teacup_agent_api::{AgentClient, AgentApiError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AgentApiError> {
//!     let client = AgentClient::new(None)?;
//!
//!     let info = client.info().await?;
//!     println!("app {} instance {}", info.app_id, info.instance_id);
//!
//!     let response = client.get_quote(b"binding nonce").await?;
//!     let quote = response.parse_quote()?;
//!     let correlation = response.replay_rtmrs()?.correlate(quote.report.as_td10());
//!     println!("event log match: {}", correlation.all_match());
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]

mod client;
mod error;
mod requests;
mod responses;

// Re-export public items
pub use client::{AgentClient, Endpoint, DEFAULT_AGENT_SOCKET};
pub use error::AgentApiError;
pub use requests::TlsKeyConfig;
pub use responses::{
    GetKeyResponse, GetQuoteResponse, GetTlsKeyResponse, InfoResponse, TcbInfo, KEY_BYTE_LEN,
};
