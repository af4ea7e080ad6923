// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct QuoteRequest<'a> {
    pub(crate) report_data: &'a str,
}

#[derive(Serialize)]
pub(crate) struct KeyRequest<'a> {
    pub(crate) path: &'a str,
    pub(crate) purpose: &'a str,
}

#[derive(Serialize)]
pub(crate) struct EmitEventRequest<'a> {
    pub(crate) event: &'a str,
    pub(crate) payload: &'a str,
}

/// Parameters for a TLS key request.
///
/// The agent derives a fresh key on every call and issues a certificate for
/// it, so two requests with the same configuration never return the same key
/// material.
#[derive(Debug, Clone, Serialize)]
pub struct TlsKeyConfig {
    /// Certificate subject common name.
    pub subject: String,
    /// Subject alternative names to put into the certificate.
    pub alt_names: Vec<String>,
    /// Whether to embed an attestation quote into the certificate.
    pub usage_ra_tls: bool,
    /// Whether the certificate is good for server authentication.
    pub usage_server_auth: bool,
    /// Whether the certificate is good for client authentication.
    pub usage_client_auth: bool,
}

impl Default for TlsKeyConfig {
    fn default() -> Self {
        Self {
            subject: String::new(),
            alt_names: Vec::new(),
            usage_ra_tls: false,
            usage_server_auth: true,
            usage_client_auth: false,
        }
    }
}
