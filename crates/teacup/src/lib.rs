// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

//! Model and verify TDX attestation evidence: quotes, measurement event
//! logs, register replay and the report data that binds a quote to its
//! requester.

#![deny(missing_docs)]
#![deny(clippy::all)]

pub mod log;
pub mod quote;
pub mod reportdata;
pub mod tdx;
