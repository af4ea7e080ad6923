// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

//! TD measurement handling: the event log model and register replay

pub mod eventlog;
pub mod rtmr;
