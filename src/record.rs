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

//! Log record passed through dispatches, processors and layouts.

use jiff::Timestamp;
use log::Level;
use serde_json::Map;
use serde_json::Value;

/// An owned log record.
///
/// `context` holds the key-values attached at the call site. `extra` holds the key-values added
/// by [processors](crate::processor::Processor) on the way to an appender.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    // the observed time
    time: Timestamp,

    // the metadata
    level: Level,
    target: String,
    module_path: Option<String>,
    file: Option<String>,
    line: Option<u32>,

    // the payload
    message: String,

    // structural logging
    context: Map<String, Value>,
    extra: Map<String, Value>,
}

impl Record {
    /// Create a new [`RecordBuilder`].
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// The observed time.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// The verbosity level of the message.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The name of the target of the directive.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The module path of the message.
    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    /// The source file containing the message.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The line containing the message.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// The message body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The key-values attached where the record was emitted.
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// The key-values added by processors.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Mutable access to the processor key-values.
    pub fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    pub(crate) fn from_log(record: &log::Record) -> Record {
        let mut context = Map::new();
        let mut visitor = KvCollector { kvs: &mut context };
        // a failing visitor only truncates the structured fields
        let _ = record.key_values().visit(&mut visitor);

        Record {
            time: Timestamp::now(),
            level: record.level(),
            target: record.target().to_owned(),
            module_path: record.module_path().map(str::to_owned),
            file: record.file().map(str::to_owned),
            line: record.line(),
            message: record.args().to_string(),
            context,
            extra: Map::new(),
        }
    }
}

struct KvCollector<'a> {
    kvs: &'a mut Map<String, Value>,
}

impl<'kvs> log::kv::VisitSource<'kvs> for KvCollector<'_> {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        let v = if let Some(v) = value.to_bool() {
            Value::Bool(v)
        } else if let Some(v) = value.to_i64() {
            Value::from(v)
        } else if let Some(v) = value.to_u64() {
            Value::from(v)
        } else if let Some(v) = value.to_f64() {
            Value::from(v)
        } else {
            Value::String(value.to_string())
        };
        self.kvs.insert(key.to_string(), v);
        Ok(())
    }
}

/// Builder for [`Record`].
///
/// # Examples
///
/// ```
/// use log::Level;
/// use logforth_http::record::Record;
///
/// let record = Record::builder()
///     .level(Level::Error)
///     .message("disk full")
///     .context("free_bytes", 0)
///     .build();
/// assert_eq!(record.message(), "disk full");
/// ```
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                time: Timestamp::now(),
                level: Level::Info,
                target: String::new(),
                module_path: None,
                file: None,
                line: None,
                message: String::new(),
                context: Map::new(),
                extra: Map::new(),
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`time`](Record::time).
    pub fn time(mut self, time: Timestamp) -> Self {
        self.record.time = time;
        self
    }

    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`target`](Record::target).
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.record.target = target.into();
        self
    }

    /// Set [`module_path`](Record::module_path).
    pub fn module_path(mut self, path: Option<&str>) -> Self {
        self.record.module_path = path.map(str::to_owned);
        self
    }

    /// Set [`file`](Record::file).
    pub fn file(mut self, file: Option<&str>) -> Self {
        self.record.file = file.map(str::to_owned);
        self
    }

    /// Set [`line`](Record::line).
    pub fn line(mut self, line: Option<u32>) -> Self {
        self.record.line = line;
        self
    }

    /// Set [`message`](Record::message).
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Insert one key-value into [`context`](Record::context).
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.record.context.insert(key.into(), value.into());
        self
    }

    /// Insert one key-value into [`extra`](Record::extra).
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.record.extra.insert(key.into(), value.into());
        self
    }

    /// Invoke the builder and return a `Record`.
    pub fn build(self) -> Record {
        self.record
    }
}
