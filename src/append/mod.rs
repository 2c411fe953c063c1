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

//! Appenders that receive log records from a dispatch.

use std::fmt;

use log::Level;

use crate::Error;
use crate::record::Record;

mod buffer;
mod http;

pub use self::buffer::Buffer;
pub use self::http::Http;
pub use self::http::HttpOptions;

/// An appender that can process log records.
pub trait Append: fmt::Debug + Send + Sync + 'static {
    /// Whether this appender handles records of the given level.
    ///
    /// Default to handling every level.
    fn enabled(&self, level: Level) -> bool {
        let _ = level;
        true
    }

    /// Whether records handled by this appender still reach the appenders after it.
    ///
    /// Default to `true`.
    fn bubble(&self) -> bool {
        true
    }

    /// Dispatch a log record to the append target.
    fn append(&self, record: &Record) -> Result<(), Error>;

    /// Dispatch an ordered batch of log records to the append target.
    ///
    /// Default to appending each enabled record on its own.
    fn append_batch(&self, records: &[Record]) -> Result<(), Error> {
        for record in records {
            if self.enabled(record.level()) {
                self.append(record)?;
            }
        }
        Ok(())
    }

    /// Flush any buffered records.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Append> From<T> for Box<dyn Append> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}
