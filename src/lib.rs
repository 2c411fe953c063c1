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

//! Logforth HTTP ships log records to a remote HTTP endpoint as JSON.
//!
//! # Overview
//!
//! The [`Http`](append::Http) appender turns one record, or one batch of records, into a single
//! outbound request. Target URI, method, headers and protocol version are plain configuration on
//! the appender. Delivery is best-effort: a missing URI disables sending, and transport failures
//! are caught and dropped so that logging never destabilizes the application.
//!
//! Batches come from the [`Buffer`](append::Buffer) appender, which decides when to hand its
//! records over. Records reach appenders through a [`Logger`], which also bridges the [`log`]
//! crate.
//!
//! # Examples
//!
//! Ship every error immediately, and everything else in batches of 100:
//!
//! ```
//! use log::LevelFilter;
//! use logforth_http::append::Buffer;
//! use logforth_http::append::Http;
//! use logforth_http::append::HttpOptions;
//! use logforth_http::transport::Recording;
//!
//! let options = HttpOptions::default()
//!     .uri("https://log.server/log/endpoint")
//!     .method("POST");
//!
//! let errors = Http::new(options.clone(), Recording::default())
//!     .with_level(LevelFilter::Error)
//!     .with_bubble(false);
//! let rest = Buffer::new(Http::new(options, Recording::default()))
//!     .with_buffer_limit(100)
//!     .with_flush_on_overflow(true);
//!
//! logforth_http::builder()
//!     .dispatch(|d| d.append(errors).append(rest))
//!     .apply();
//!
//! log::error!("shipped on its own");
//! log::info!("shipped with the next batch");
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod filter;
pub mod layout;
pub mod processor;
pub mod record;
pub mod transport;
pub mod trap;

pub use append::Append;
pub use filter::Filter;
pub use layout::Layout;
pub use processor::Processor;
pub use trap::Trap;

mod error;
pub use error::Error;

mod logger;
pub use logger::*;
