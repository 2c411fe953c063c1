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

//! Per-record processors run by an appender before its layout sees the record.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::Error;
use crate::record::Record;

/// A processor enriches a record, usually by adding [`extra`](Record::extra) key-values.
pub trait Processor: fmt::Debug + Send + Sync + 'static {
    /// Process the record in place.
    fn process(&self, record: &mut Record) -> Result<(), Error>;
}

impl<T: Processor> From<T> for Box<dyn Processor> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// A processor that stamps a fixed set of key-values onto every record.
///
/// Existing `extra` entries with the same key are overwritten.
///
/// # Examples
///
/// ```
/// use logforth_http::processor::StaticProcessor;
///
/// let mut processor = StaticProcessor::default();
/// processor.insert("service", "billing");
/// processor.insert("region", "eu-west-1");
/// ```
#[derive(Default, Debug, Clone)]
pub struct StaticProcessor {
    kvs: BTreeMap<String, Value>,
}

impl StaticProcessor {
    /// Create a processor from an existing map.
    pub fn new(kvs: BTreeMap<String, Value>) -> Self {
        Self { kvs }
    }

    /// Insert a key-value pair.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.kvs.insert(key.into(), value.into());
    }

    /// Remove a key-value pair.
    pub fn remove(&mut self, key: &str) {
        self.kvs.remove(key);
    }
}

impl Processor for StaticProcessor {
    fn process(&self, record: &mut Record) -> Result<(), Error> {
        let extra = record.extra_mut();
        for (key, value) in self.kvs.iter() {
            extra.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_processor_stamps_extra() {
        let mut processor = StaticProcessor::default();
        processor.insert("service", "billing");
        processor.insert("shard", 3);
        processor.insert("dropped", true);
        processor.remove("dropped");

        let mut record = Record::builder().extra("service", "old").build();
        processor.process(&mut record).unwrap();

        assert_eq!(record.extra().len(), 2);
        assert_eq!(record.extra()["service"], Value::from("billing"));
        assert_eq!(record.extra()["shard"], Value::from(3));
    }
}
