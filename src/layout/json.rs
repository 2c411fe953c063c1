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

use jiff::Zoned;
use jiff::tz::TimeZone;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::layout::Layout;
use crate::record::Record;

/// How [`JsonLayout`] encodes a batch of records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// One JSON array holding every record.
    #[default]
    Json,
    /// One JSON object per line.
    Newlines,
}

/// A JSON layout for formatting log records.
///
/// Output format:
///
/// ```json
/// {"timestamp":"2024-08-11T22:44:57.172051+08:00[Asia/Shanghai]","level":"ERROR","target":"checkout","file":"src/checkout.rs","line":51,"message":"payment declined","context":{"order":1042},"extra":{}}
/// ```
///
/// A batch is encoded as a JSON array of the same objects by default.
///
/// # Examples
///
/// ```
/// use jiff::tz::TimeZone;
/// use logforth_http::layout::BatchMode;
/// use logforth_http::layout::JsonLayout;
///
/// let json_layout = JsonLayout::default()
///     .timezone(TimeZone::UTC)
///     .batch_mode(BatchMode::Newlines);
/// ```
#[derive(Default, Debug, Clone)]
pub struct JsonLayout {
    tz: Option<TimeZone>,
    batch_mode: BatchMode,
    append_newline: bool,
}

impl JsonLayout {
    /// Sets the timezone for timestamps.
    ///
    /// Default to the system timezone.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }

    /// Sets how batches are encoded.
    pub fn batch_mode(mut self, batch_mode: BatchMode) -> Self {
        self.batch_mode = batch_mode;
        self
    }

    /// Whether a newline is appended after a single formatted record.
    pub fn append_newline(mut self, append_newline: bool) -> Self {
        self.append_newline = append_newline;
        self
    }

    fn record_line<'a>(&self, record: &'a Record) -> RecordLine<'a> {
        let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
        RecordLine {
            timestamp: record.time().to_zoned(tz),
            level: record.level().as_str(),
            target: record.target(),
            module_path: record.module_path(),
            file: record.file(),
            line: record.line(),
            message: record.message(),
            context: record.context(),
            extra: record.extra(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct RecordLine<'a> {
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: Zoned,
    level: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    module_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    message: &'a str,
    context: &'a Map<String, Value>,
    extra: &'a Map<String, Value>,
}

fn serialize_timestamp<S>(timestamp: &Zoned, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(&format_args!("{timestamp:.6}"))
}

impl Layout for JsonLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut bytes =
            serde_json::to_vec(&self.record_line(record)).map_err(Error::from_json_error)?;
        if self.append_newline {
            bytes.push(b'\n');
        }
        Ok(bytes)
    }

    fn format_batch(&self, records: &[Record]) -> Result<Vec<u8>, Error> {
        match self.batch_mode {
            BatchMode::Json => {
                let lines = records
                    .iter()
                    .map(|record| self.record_line(record))
                    .collect::<Vec<_>>();
                serde_json::to_vec(&lines).map_err(Error::from_json_error)
            }
            BatchMode::Newlines => {
                let mut bytes = vec![];
                for (i, record) in records.iter().enumerate() {
                    if i > 0 {
                        bytes.push(b'\n');
                    }
                    serde_json::to_writer(&mut bytes, &self.record_line(record))
                        .map_err(Error::from_json_error)?;
                }
                Ok(bytes)
            }
        }
    }
}
