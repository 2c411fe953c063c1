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

use std::io;
use std::io::Read;

use ureq::Agent;
use ureq::AgentBuilder;

use crate::Error;
use crate::transport::Request;
use crate::transport::Transport;

/// A blocking transport built on a [`ureq::Agent`].
///
/// The agent pools connections between sends. Timeouts, proxies and TLS are configured on the
/// agent itself:
///
/// ```
/// use std::time::Duration;
///
/// use logforth_http::transport::UreqTransport;
///
/// let agent = ureq::AgentBuilder::new()
///     .timeout_connect(Duration::from_secs(1))
///     .timeout(Duration::from_secs(5))
///     .build();
/// let transport = UreqTransport::new(agent);
/// ```
///
/// Statuses outside `2xx` are reported as errors. ureq always speaks HTTP/1.1, so the protocol
/// version of a [`Request`] is not negotiated.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(AgentBuilder::new().build())
    }
}

impl UreqTransport {
    /// Create a transport sending through the given agent.
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: Request) -> Result<(), Error> {
        let mut call = self.agent.request(request.method(), request.uri());
        for (key, value) in request.headers() {
            call = call.set(key, value.as_deref().unwrap_or_default());
        }

        match call.send_bytes(request.body()) {
            Ok(response) => {
                // drain the body so that the connection returns to the pool
                let _ = io::copy(&mut response.into_reader().take(1 << 20), &mut io::sink());
                Ok(())
            }
            Err(ureq::Error::Status(code, _)) => Err(Error::new("http endpoint rejected request")
                .with_context("method", request.method())
                .with_context("uri", request.uri())
                .with_context("status", code)),
            Err(ureq::Error::Transport(err)) => Err(Error::new("failed to send http request")
                .with_context("method", request.method())
                .with_context("uri", request.uri())
                .with_source(err)),
        }
    }
}
