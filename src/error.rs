// ngsictl - CLI for FIWARE NGSI context brokers
// Copyright (C) 2024 The ngsictl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Classified errors for broker commands.
//!
//! Every failure branch builds an [`NgsiError`] naming the function it came
//! from and a branch number. Branch numbers start at 1 inside each function
//! and are only meant to let tests tell failure branches apart; they are not
//! stable across releases.

use std::error::Error as StdError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NgsiError>;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input, detected before any request is sent.
    Validation,
    Transport,
    HttpStatus,
    Decode,
    Encode,
    UnknownField,
    CountHeaderMissing,
    CountParse,
    Config,
    Io,
}

#[derive(Debug, Error)]
#[error("{site}{code:03} {message}")]
pub struct NgsiError {
    pub site: &'static str,
    pub code: u32,
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl NgsiError {
    pub fn new(site: &'static str, code: u32, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            site,
            code,
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps `err`, reusing its text as the message.
    pub fn wrap<E>(site: &'static str, code: u32, kind: ErrorKind, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            site,
            code,
            kind,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub fn with_source<E>(mut self, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(err));
        self
    }

    #[cfg(test)]
    pub fn is(&self, site: &str, code: u32) -> bool {
        self.site == site && self.code == code
    }
}
