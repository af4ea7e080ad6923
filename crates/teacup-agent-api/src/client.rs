// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

use crate::{
    error::AgentApiError,
    requests::{EmitEventRequest, KeyRequest, QuoteRequest, TlsKeyConfig},
    responses::{
        GetKeyResponse, GetQuoteResponse, GetTlsKeyResponse, InfoResponse, RawInfoResponse,
    },
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
};
use teacup::reportdata::encode_report_data;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
};
use tracing::trace;
use url::Url;

/// Socket the guest agent listens on when no endpoint is configured.
pub const DEFAULT_AGENT_SOCKET: &str = "/var/run/tee-agent.sock";

const RPC_GET_QUOTE: &str = "/prpc/Agent.GetQuote";
const RPC_INFO: &str = "/prpc/Agent.Info";
const RPC_GET_TLS_KEY: &str = "/prpc/Agent.GetTlsKey";
const RPC_GET_KEY: &str = "/prpc/Agent.GetKey";
const RPC_EMIT_EVENT: &str = "/prpc/Agent.EmitEvent";

/// Where to reach the guest agent.
///
/// Inside a TD this is the agent's Unix socket. An HTTP endpoint is mostly
/// useful against a simulator during development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// An HTTP(S) base URL.
    Http(Url),
    /// A Unix domain socket path.
    Unix(PathBuf),
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Unix(PathBuf::from(DEFAULT_AGENT_SOCKET))
    }
}

impl FromStr for Endpoint {
    type Err = AgentApiError;

    fn from_str(value: &str) -> Result<Self, AgentApiError> {
        if value.starts_with("http://") || value.starts_with("https://") {
            return Ok(Endpoint::Http(Url::parse(value)?));
        }
        let path = value.strip_prefix("unix:").unwrap_or(value);
        if path.is_empty() {
            return Err(AgentApiError::InvalidEndpoint(value.to_string()));
        }
        Ok(Endpoint::Unix(PathBuf::from(path)))
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Http(url) => write!(f, "{url}"),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Client for the guest agent RPC interface.
///
/// Every handle is constructed with an explicit endpoint; there is no
/// process-wide client and no environment lookup. Pass the handle to the
/// code that needs evidence.
///
/// # Examples
///
/// ```rust,no_run
/// use teacup_agent_api::AgentClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = AgentClient::new(None)?;
///
///     let response = client.get_quote(b"test").await?;
///     let quote = response.parse_quote()?;
///     let replayed = response.replay_rtmrs()?;
///     let correlation = replayed.correlate(quote.report.as_td10());
///     println!("{correlation:#}");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AgentClient {
    endpoint: Endpoint,
    client: Client,
}

impl AgentClient {
    /// Creates a new client for the given endpoint string.
    ///
    /// `None` falls back to [`DEFAULT_AGENT_SOCKET`]. A string starting with
    /// `http://` or `https://` is taken as an HTTP base URL, anything else
    /// as a Unix socket path (an optional `unix:` prefix is stripped).
    ///
    /// # Errors
    ///
    /// Returns an `AgentApiError` if the endpoint does not parse or the
    /// underlying HTTP client cannot be built.
    pub fn new(endpoint: Option<&str>) -> Result<Self, AgentApiError> {
        let endpoint = match endpoint {
            Some(value) => value.parse()?,
            None => Endpoint::default(),
        };
        Self::with_endpoint(endpoint)
    }

    /// Creates a new client for an already parsed endpoint.
    ///
    /// # Errors
    ///
    /// Returns an `AgentApiError` if the underlying HTTP client cannot be
    /// built.
    pub fn with_endpoint(endpoint: Endpoint) -> Result<Self, AgentApiError> {
        Ok(AgentClient {
            endpoint,
            client: Client::builder().build()?,
        })
    }

    /// The endpoint this client talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn rpc_post<S: Serialize, D: DeserializeOwned>(
        &self,
        path: &str,
        payload: &S,
    ) -> Result<D, AgentApiError> {
        trace!(endpoint = %self.endpoint, path, "agent rpc");
        match &self.endpoint {
            Endpoint::Http(base) => {
                let url = base.join(path)?;
                let response = self.client.post(url).json(payload).send().await?;
                let status = response.status();
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(AgentApiError::Status {
                        status: status.as_u16(),
                        message,
                    });
                }
                Ok(response.json().await?)
            }
            Endpoint::Unix(socket) => {
                let body = serde_json::to_vec(payload)?;
                let raw = unix_http_post(socket, path, &body).await?;
                Ok(serde_json::from_slice(&raw)?)
            }
        }
    }

    /// Requests a quote over the given report data.
    ///
    /// Input shorter than 64 bytes is padded with zeroes on the right;
    /// longer input fails without being sent. Text goes in as its UTF-8
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns an `AgentApiError` if the report data is oversized or the
    /// RPC fails.
    pub async fn get_quote(
        &self,
        report_data: impl AsRef<[u8]>,
    ) -> Result<GetQuoteResponse, AgentApiError> {
        let report_data = encode_report_data(report_data)?;
        let report_data = hex::encode(report_data);
        let payload = QuoteRequest {
            report_data: &report_data,
        };
        self.rpc_post(RPC_GET_QUOTE, &payload).await
    }

    /// Retrieves identity and measurement information about the running TD.
    ///
    /// The agent ships the `tcb_info` field as embedded JSON; it is decoded
    /// into its typed form here.
    ///
    /// # Errors
    ///
    /// Returns an `AgentApiError` if the RPC fails or the embedded
    /// `tcb_info` does not parse.
    pub async fn info(&self) -> Result<InfoResponse, AgentApiError> {
        let raw: RawInfoResponse = self.rpc_post(RPC_INFO, &serde_json::json!({})).await?;
        let tcb_info = serde_json::from_str(&raw.tcb_info)?;
        Ok(InfoResponse {
            app_id: raw.app_id,
            instance_id: raw.instance_id,
            app_cert: raw.app_cert,
            app_name: raw.app_name,
            tcb_info,
        })
    }

    /// Requests a fresh TLS key and certificate chain.
    ///
    /// The agent derives a new key on every call.
    ///
    /// # Errors
    ///
    /// Returns an `AgentApiError` if the RPC fails.
    pub async fn get_tls_key(
        &self,
        config: &TlsKeyConfig,
    ) -> Result<GetTlsKeyResponse, AgentApiError> {
        self.rpc_post(RPC_GET_TLS_KEY, config).await
    }

    /// Requests the deterministic application key for `path`.
    ///
    /// The same path and purpose always yield the same key for this
    /// application.
    ///
    /// # Errors
    ///
    /// Returns an `AgentApiError` if the RPC fails.
    pub async fn get_key(
        &self,
        path: &str,
        purpose: &str,
    ) -> Result<GetKeyResponse, AgentApiError> {
        let payload = KeyRequest { path, purpose };
        self.rpc_post(RPC_GET_KEY, &payload).await
    }

    /// Extends RTMR3 with an application event.
    ///
    /// The agent appends the event to the measurement log, so later quotes
    /// and replays account for it.
    ///
    /// # Errors
    ///
    /// Returns an `AgentApiError` if the event name is empty or the RPC
    /// fails.
    pub async fn emit_event(
        &self,
        event: &str,
        payload: impl AsRef<[u8]>,
    ) -> Result<(), AgentApiError> {
        if event.is_empty() {
            return Err(AgentApiError::InvalidArgument("event name must not be empty"));
        }
        let payload = hex::encode(payload);
        let request = EmitEventRequest {
            event,
            payload: &payload,
        };
        let _: serde_json::Value = self.rpc_post(RPC_EMIT_EVENT, &request).await?;
        Ok(())
    }
}

/// One HTTP/1.1 POST over a Unix socket, request and response framed with
/// `Connection: close`.
async fn unix_http_post(
    socket: &Path,
    path: &str,
    body: &[u8],
) -> Result<Vec<u8>, AgentApiError> {
    let mut stream = UnixStream::connect(socket).await?;
    let request = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(request.as_bytes()).await?;
    stream.write_all(body).await?;
    let mut response = Vec::with_capacity(4096);
    stream.read_to_end(&mut response).await?;
    parse_http_response(&response)
}

fn parse_http_response(raw: &[u8]) -> Result<Vec<u8>, AgentApiError> {
    let header_end = raw
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .ok_or_else(|| AgentApiError::Protocol("no header terminator".to_string()))?;
    let head = std::str::from_utf8(&raw[..header_end])
        .map_err(|_| AgentApiError::Protocol("header is not valid UTF-8".to_string()))?;
    let status: u16 = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| AgentApiError::Protocol("missing HTTP status".to_string()))?;
    let mut body = raw[header_end + 4..].to_vec();
    if let Some(length) = content_length(head) {
        body.truncate(length);
    }
    if !(200..300).contains(&status) {
        return Err(AgentApiError::Status {
            status,
            message: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    Ok(body)
}

fn content_length(head: &str) -> Option<usize> {
    head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_parses_urls_and_socket_paths() {
        assert_eq!(
            "http://localhost:8090".parse::<Endpoint>().unwrap(),
            Endpoint::Http(Url::parse("http://localhost:8090").unwrap())
        );
        assert_eq!(
            "/var/run/tee-agent.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("/var/run/tee-agent.sock"))
        );
        assert_eq!(
            "unix:/tmp/agent.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("/tmp/agent.sock"))
        );
        assert!(matches!(
            "".parse::<Endpoint>(),
            Err(AgentApiError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn parses_http_response_with_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        assert_eq!(parse_http_response(raw).unwrap(), b"{}");
    }

    #[test]
    fn http_error_status_carries_the_body() {
        let raw = b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 6\r\n\r\nboom!!";
        match parse_http_response(raw) {
            Err(AgentApiError::Status { status: 500, message }) => {
                assert_eq!(message, "boom!!");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_response_without_header_terminator() {
        assert!(matches!(
            parse_http_response(b"HTTP/1.1 200 OK\r\n"),
            Err(AgentApiError::Protocol(_))
        ));
    }
}
