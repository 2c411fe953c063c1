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

use crate::Append;
use crate::Error;
use crate::Filter;
use crate::Trap;
use crate::filter::FilterResult;
use crate::record::Record;

/// A logger facade that dispatches log records to one or more dispatches.
///
/// This struct implements [`log::Log`] to bridge the appenders of this crate with the [`log`]
/// crate. It can also be driven directly with [`Logger::log`].
#[derive(Debug)]
pub struct Logger {
    dispatches: Vec<Dispatch>,
    trap: Box<dyn Trap>,
}

impl Logger {
    pub(super) fn new(dispatches: Vec<Dispatch>, trap: Box<dyn Trap>) -> Self {
        Self { dispatches, trap }
    }

    /// Dispatch a record to every dispatch.
    ///
    /// Errors raised by appenders are handed to the trap; this never fails.
    pub fn log(&self, record: &Record) {
        for dispatch in &self.dispatches {
            if let Err(err) = dispatch.log(record) {
                let err = Error::new("failed to append record")
                    .with_context("message", record.message())
                    .with_source(err);
                self.trap.trap(&err);
            }
        }
    }

    /// Flush every appender of every dispatch.
    pub fn flush(&self) {
        for dispatch in &self.dispatches {
            for err in dispatch.flush() {
                let err = Error::new("failed to flush").with_source(err);
                self.trap.trap(&err);
            }
        }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.dispatches
            .iter()
            .any(|dispatch| dispatch.enabled(metadata))
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            Logger::log(self, &Record::from_log(record));
        }
    }

    fn flush(&self) {
        Logger::flush(self);
    }
}

/// A grouped set of filters and appenders.
#[derive(Debug)]
pub(super) struct Dispatch {
    filters: Vec<Box<dyn Filter>>,
    appends: Vec<Box<dyn Append>>,
}

impl Dispatch {
    pub(super) fn new(filters: Vec<Box<dyn Filter>>, appends: Vec<Box<dyn Append>>) -> Self {
        debug_assert!(
            !appends.is_empty(),
            "A Dispatch must have at least one append"
        );

        Self { filters, appends }
    }

    fn enabled(&self, metadata: &log::Metadata) -> bool {
        for filter in &self.filters {
            match filter.enabled(metadata) {
                FilterResult::Reject => return false,
                FilterResult::Accept => return true,
                FilterResult::Neutral => {}
            }
        }

        true
    }

    fn log(&self, record: &Record) -> Result<(), Error> {
        for filter in &self.filters {
            match filter.matches(record) {
                FilterResult::Reject => return Ok(()),
                FilterResult::Accept => break,
                FilterResult::Neutral => {}
            }
        }

        for append in &self.appends {
            if !append.enabled(record.level()) {
                continue;
            }
            append.append(record)?;
            if !append.bubble() {
                break;
            }
        }
        Ok(())
    }

    fn flush(&self) -> Vec<Error> {
        self.appends
            .iter()
            .filter_map(|append| append.flush().err())
            .collect()
    }
}
