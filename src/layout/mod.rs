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

//! Layouts for formatting log records.

use std::fmt;

use crate::Error;
use crate::record::Record;

mod json;

pub use self::json::BatchMode;
pub use self::json::JsonLayout;

/// A layout for formatting log records into a wire payload.
pub trait Layout: fmt::Debug + Send + Sync + 'static {
    /// Formats a single log record.
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error>;

    /// Formats an ordered batch of log records into one payload.
    ///
    /// Default to the individually formatted records joined by newlines.
    fn format_batch(&self, records: &[Record]) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![];
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                bytes.push(b'\n');
            }
            bytes.extend(self.format(record)?);
        }
        Ok(bytes)
    }
}

impl<T: Layout> From<T> for Box<dyn Layout> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}
