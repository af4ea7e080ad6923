// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Matter Labs

//! Quote Error type

use std::io;
use thiserror::Error;

/// Quote parsing error
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum QuoteError {
    #[error("{context}: I/O error")]
    IoError { context: String, source: io::Error },
    #[error("parsing bytes")]
    ConvertError(#[from] bytemuck::PodCastError),
    #[error("unsupported quote version")]
    QuoteVersion,
    #[error("invalid tee type")]
    InvalidTeeType,
    #[error("unsupported body type")]
    UnsupportedBodyType,
    #[error("{0}: unexpected error")]
    Unexpected(String),
}

/// Usability trait for easy QuoteError annotation
pub trait QuoteContext {
    /// The Ok Type
    type Ok;
    /// The Context
    fn context<I: Into<String>>(self, msg: I) -> Result<Self::Ok, QuoteError>;
}

impl<T> QuoteContext for Result<T, std::io::Error> {
    type Ok = T;
    fn context<I: Into<String>>(self, msg: I) -> Result<T, QuoteError> {
        self.map_err(|e| QuoteError::IoError {
            context: msg.into(),
            source: e,
        })
    }
}

impl<T> QuoteContext for Option<T> {
    type Ok = T;
    fn context<I: Into<String>>(self, msg: I) -> Result<T, QuoteError> {
        self.ok_or(QuoteError::Unexpected(msg.into()))
    }
}
