// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Transports perform the network send of an outbound request.
//!
//! A transport is either synchronous ([`Transport`]) or fire-and-forget ([`AsyncTransport`]).
//! The [`Http`](crate::append::Http) appender is built with exactly one of them.

use std::collections::BTreeMap;
use std::fmt;

use crate::Error;

#[cfg(feature = "non-blocking")]
mod non_blocking;
mod recording;
#[cfg(feature = "ureq")]
mod ureq;

#[cfg(feature = "non-blocking")]
pub use self::non_blocking::NonBlocking;
#[cfg(feature = "non-blocking")]
pub use self::non_blocking::NonBlockingBuilder;
#[cfg(feature = "non-blocking")]
pub use self::non_blocking::WorkerGuard;
pub use self::recording::Recording;
#[cfg(feature = "ureq")]
pub use self::ureq::UreqTransport;

/// HTTP header map. A `None` value means the header is present but carries no value.
pub type Headers = BTreeMap<String, Option<String>>;

/// An outbound HTTP request, built fresh for every send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    uri: String,
    headers: Headers,
    protocol_version: String,
    body: Vec<u8>,
}

impl Request {
    /// Create a new request.
    pub fn new(
        method: impl Into<String>,
        uri: impl Into<String>,
        headers: Headers,
        body: Vec<u8>,
        protocol_version: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers,
            protocol_version: protocol_version.into(),
            body,
        }
    }

    /// The HTTP method, used verbatim.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The target URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The HTTP protocol version, e.g. `1.1`.
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// The serialized payload.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// A transport that sends a request and waits for the exchange to complete.
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    /// Send the request.
    ///
    /// Any failure of the exchange, including a status the transport treats as an error, is
    /// returned as an [`Error`].
    fn send(&self, request: Request) -> Result<(), Error>;
}

impl<T: Transport> From<T> for Box<dyn Transport> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// A transport that hands the request off and returns immediately.
///
/// The outcome of the exchange is never reported back.
pub trait AsyncTransport: fmt::Debug + Send + Sync + 'static {
    /// Start sending the request.
    fn send_async(&self, request: Request);
}

impl<T: AsyncTransport> From<T> for Box<dyn AsyncTransport> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}
