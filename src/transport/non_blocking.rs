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

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::SendTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;

use crate::Error;
use crate::transport::AsyncTransport;
use crate::transport::Request;
use crate::transport::Transport;

#[derive(Debug)]
enum Message {
    Request(Request),
    Shutdown,
}

/// A guard that waits for pending requests of a [`NonBlocking`] transport on drop.
///
/// Requests handed to a [`NonBlocking`] transport are sent by a dedicated thread at some later
/// point. If the program terminates abruptly, some of them may never be sent. Keep the guard
/// alive in `main` so that dropping it gives the worker a chance to drain the queue, bounded by
/// the shutdown timeout.
#[derive(Debug)]
pub struct WorkerGuard {
    _guard: Option<JoinHandle<()>>,
    sender: Sender<Message>,
    shutdown: Sender<()>,
    shutdown_timeout: Duration,
}

impl WorkerGuard {
    fn new(
        handle: JoinHandle<()>,
        sender: Sender<Message>,
        shutdown: Sender<()>,
        shutdown_timeout: Option<Duration>,
    ) -> Self {
        const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

        WorkerGuard {
            _guard: Some(handle),
            sender,
            shutdown,
            shutdown_timeout: shutdown_timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let shutdown_timeout = self.shutdown_timeout;
        match self
            .sender
            .send_timeout(Message::Shutdown, shutdown_timeout)
        {
            Ok(()) => {
                // The worker acknowledges on a zero-capacity channel once every request queued
                // before the shutdown message has been sent.
                let _ = self.shutdown.send_timeout((), shutdown_timeout);
            }
            Err(SendTimeoutError::Disconnected(_)) => (),
            Err(SendTimeoutError::Timeout(_)) => (),
        }
    }
}

/// An asynchronous transport that sends requests on a background thread.
///
/// [`send_async`](AsyncTransport::send_async) only enqueues the request. The worker thread sends
/// it through the wrapped synchronous [`Transport`] and discards the outcome. With a bounded
/// queue, requests that do not fit are dropped.
#[derive(Clone, Debug)]
pub struct NonBlocking {
    sender: Sender<Message>,
}

impl AsyncTransport for NonBlocking {
    fn send_async(&self, request: Request) {
        // full queue or gone worker: the request is dropped
        let _ = self.sender.try_send(Message::Request(request));
    }
}

/// A builder for configuring [`NonBlocking`].
///
/// # Examples
///
/// ```
/// use logforth_http::transport::NonBlockingBuilder;
/// use logforth_http::transport::Recording;
///
/// let (transport, _guard) = NonBlockingBuilder::new("http-log", Recording::default())
///     .buffered_requests_limit(Some(1024))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct NonBlockingBuilder {
    thread_name: String,
    buffered_requests_limit: Option<usize>,
    shutdown_timeout: Option<Duration>,
    transport: Box<dyn Transport>,
}

impl NonBlockingBuilder {
    /// Creates a new [`NonBlockingBuilder`] wrapping the given synchronous transport.
    pub fn new(thread_name: impl Into<String>, transport: impl Into<Box<dyn Transport>>) -> Self {
        Self {
            thread_name: thread_name.into(),
            buffered_requests_limit: None,
            shutdown_timeout: None,
            transport: transport.into(),
        }
    }

    /// Sets the number of pending requests the queue holds.
    ///
    /// Default to unbounded.
    pub fn buffered_requests_limit(mut self, buffered_requests_limit: Option<usize>) -> Self {
        self.buffered_requests_limit = buffered_requests_limit;
        self
    }

    /// Sets how long dropping the [`WorkerGuard`] waits for the queue to drain.
    ///
    /// Default to 100 milliseconds.
    pub fn shutdown_timeout(mut self, shutdown_timeout: Option<Duration>) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Completes the builder, spawning the worker thread.
    ///
    /// # Errors
    ///
    /// Return an error if the worker thread cannot be spawned.
    pub fn build(self) -> Result<(NonBlocking, WorkerGuard), Error> {
        let (sender, receiver) = match self.buffered_requests_limit {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        let (shutdown_sender, shutdown_receiver) = bounded(0);

        let worker = Worker {
            transport: self.transport,
            receiver,
            shutdown: shutdown_receiver,
        };
        let handle = std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|err| {
                Error::new("failed to spawn http transport worker")
                    .with_context("thread", &self.thread_name)
                    .with_source(err)
            })?;

        let guard = WorkerGuard::new(
            handle,
            sender.clone(),
            shutdown_sender,
            self.shutdown_timeout,
        );
        Ok((NonBlocking { sender }, guard))
    }
}

struct Worker {
    transport: Box<dyn Transport>,
    receiver: Receiver<Message>,
    shutdown: Receiver<()>,
}

impl Worker {
    fn run(self) {
        while let Ok(Message::Request(request)) = self.receiver.recv() {
            // fire-and-forget: the outcome is never observed
            let _ = self.transport.send(request);
        }
        let _ = self.shutdown.recv();
    }
}
