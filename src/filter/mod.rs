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

//! Filters for log records.

use std::fmt;

use log::LevelFilter;
use log::Metadata;

use crate::record::Record;

/// The result of a filter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// The record will be processed without further filtering.
    Accept,
    /// The record should not be processed.
    Reject,
    /// No decision could be made, further filtering should occur.
    Neutral,
}

/// A filter that can be applied to log records before they reach the appenders of a dispatch.
pub trait Filter: fmt::Debug + Send + Sync + 'static {
    /// Whether the record with the given metadata could pass this filter.
    fn enabled(&self, metadata: &Metadata) -> FilterResult;

    /// Whether the record passes this filter.
    fn matches(&self, record: &Record) -> FilterResult;
}

impl<T: Filter> From<T> for Box<dyn Filter> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// If the level filter is set to `Info`, `Error`, `Warn`, and `Info` records pass; `Off` rejects
/// everything.
impl Filter for LevelFilter {
    fn enabled(&self, metadata: &Metadata) -> FilterResult {
        if metadata.level() <= *self {
            FilterResult::Neutral
        } else {
            FilterResult::Reject
        }
    }

    fn matches(&self, record: &Record) -> FilterResult {
        if record.level() <= *self {
            FilterResult::Neutral
        } else {
            FilterResult::Reject
        }
    }
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::*;

    #[test]
    fn level_filter_rejects_more_verbose_records() {
        let filter = LevelFilter::Warn;
        let error = Record::builder().level(Level::Error).build();
        let debug = Record::builder().level(Level::Debug).build();

        assert_eq!(filter.matches(&error), FilterResult::Neutral);
        assert_eq!(filter.matches(&debug), FilterResult::Reject);
        assert_eq!(LevelFilter::Off.matches(&error), FilterResult::Reject);
    }
}
