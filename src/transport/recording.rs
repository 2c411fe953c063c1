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

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::transport::AsyncTransport;
use crate::transport::Request;
use crate::transport::Transport;

/// An in-memory transport that records every request it sends successfully.
///
/// Clones share the same state, so a clone can be kept for inspection after the original is
/// moved into an appender.
///
/// # Examples
///
/// ```
/// use logforth_http::transport::Recording;
///
/// let transport = Recording::default();
/// let inspector = transport.clone();
/// assert!(inspector.last_request().is_none());
/// ```
#[derive(Debug, Default, Clone)]
pub struct Recording {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    requests: Vec<Request>,
    failures: VecDeque<String>,
}

impl Recording {
    fn state(&self) -> MutexGuard<'_, State> {
        // a poisoned lock only means a panicking test thread; the data is still usable
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Make the next send fail with the given message instead of recording the request.
    ///
    /// Failures queue up; each one is consumed by exactly one send.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state().failures.push_back(message.into());
    }

    /// All requests recorded so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    /// The most recently recorded request.
    pub fn last_request(&self) -> Option<Request> {
        self.state().requests.last().cloned()
    }

    /// Forget all recorded requests.
    pub fn clear(&self) {
        self.state().requests.clear();
    }
}

impl Transport for Recording {
    fn send(&self, request: Request) -> Result<(), Error> {
        let mut state = self.state();
        if let Some(message) = state.failures.pop_front() {
            return Err(Error::new(message).with_context("uri", request.uri()));
        }
        state.requests.push(request);
        Ok(())
    }
}

impl AsyncTransport for Recording {
    fn send_async(&self, request: Request) {
        let _ = Transport::send(self, request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Headers;

    fn request(uri: &str) -> Request {
        Request::new("POST", uri, Headers::new(), b"{}".to_vec(), "1.1")
    }

    #[test]
    fn records_successful_sends() {
        let transport = Recording::default();
        let inspector = transport.clone();

        transport.send(request("https://a")).unwrap();
        transport.send(request("https://b")).unwrap();

        assert_eq!(inspector.requests().len(), 2);
        assert_eq!(inspector.last_request().unwrap().uri(), "https://b");

        inspector.clear();
        assert!(inspector.last_request().is_none());
    }

    #[test]
    fn primed_failure_is_consumed_once() {
        let transport = Recording::default();
        transport.fail_next("Whoops!");

        let err = transport.send(request("https://a")).unwrap_err();
        assert_eq!(err.message(), "Whoops!");
        assert!(transport.last_request().is_none());

        transport.send(request("https://a")).unwrap();
        assert!(transport.last_request().is_some());
    }
}
