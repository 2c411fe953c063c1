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
use std::mem;
use std::sync::Mutex;
use std::sync::MutexGuard;

use log::Level;
use log::LevelFilter;

use crate::Error;
use crate::append::Append;
use crate::record::Record;

/// An appender that buffers records and hands them to another appender in one batch.
///
/// The buffer is flushed on [`flush`](Append::flush) and on drop. With a buffer limit, a full
/// buffer either flushes before taking the next record (`flush_on_overflow`) or drops its oldest
/// record.
///
/// # Examples
///
/// ```
/// use logforth_http::append::Buffer;
/// use logforth_http::append::Http;
/// use logforth_http::append::HttpOptions;
/// use logforth_http::transport::Recording;
///
/// let http = Http::new(HttpOptions::default(), Recording::default());
/// let buffer = Buffer::new(http)
///     .with_buffer_limit(100)
///     .with_flush_on_overflow(true);
/// ```
#[derive(Debug)]
pub struct Buffer {
    append: Box<dyn Append>,
    buffer: Mutex<VecDeque<Record>>,
    buffer_limit: usize,
    flush_on_overflow: bool,
    level: LevelFilter,
    bubble: bool,
}

impl Buffer {
    /// Create a new unbounded buffer in front of the given appender.
    pub fn new(append: impl Into<Box<dyn Append>>) -> Self {
        Self {
            append: append.into(),
            buffer: Mutex::new(VecDeque::new()),
            buffer_limit: 0,
            flush_on_overflow: false,
            level: LevelFilter::Trace,
            bubble: true,
        }
    }

    /// Sets how many records the buffer holds. `0` means unbounded.
    pub fn with_buffer_limit(mut self, buffer_limit: usize) -> Self {
        self.buffer_limit = buffer_limit;
        self
    }

    /// Sets whether a full buffer is flushed (`true`) or drops its oldest record (`false`).
    ///
    /// Default to `false`.
    pub fn with_flush_on_overflow(mut self, flush_on_overflow: bool) -> Self {
        self.flush_on_overflow = flush_on_overflow;
        self
    }

    /// Sets the minimum level of buffered records.
    ///
    /// Default to [`LevelFilter::Trace`].
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Sets whether buffered records still reach the appenders after this one.
    ///
    /// Default to `true`.
    pub fn with_bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    fn buffer(&self) -> MutexGuard<'_, VecDeque<Record>> {
        self.buffer.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn flush_buffer(&self) -> Result<(), Error> {
        let mut records = mem::take(&mut *self.buffer());
        if records.is_empty() {
            return Ok(());
        }
        self.append.append_batch(records.make_contiguous())
    }
}

impl Append for Buffer {
    fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    fn bubble(&self) -> bool {
        self.bubble
    }

    fn append(&self, record: &Record) -> Result<(), Error> {
        let mut buffer = self.buffer();
        let mut result = Ok(());

        if self.buffer_limit > 0 && buffer.len() >= self.buffer_limit {
            if self.flush_on_overflow {
                // the wrapped appender may log, so it runs without the lock held
                let mut records = mem::take(&mut *buffer);
                drop(buffer);
                result = self.append.append_batch(records.make_contiguous());
                buffer = self.buffer();
            } else {
                buffer.pop_front();
            }
        }

        // a failed overflow flush must not lose the incoming record as well
        buffer.push_back(record.clone());
        result
    }

    fn flush(&self) -> Result<(), Error> {
        self.flush_buffer()?;
        self.append.flush()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // nowhere left to report a failure
        let _ = self.flush_buffer();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;
    use std::thread;

    use super::*;

    #[derive(Debug, Default)]
    struct Batches(Arc<Mutex<Vec<Vec<String>>>>);

    impl Append for Batches {
        fn append(&self, record: &Record) -> Result<(), Error> {
            self.append_batch(std::slice::from_ref(record))
        }

        fn append_batch(&self, records: &[Record]) -> Result<(), Error> {
            let messages = records.iter().map(|r| r.message().to_owned()).collect();
            self.0.lock().unwrap().push(messages);
            Ok(())
        }
    }

    fn record(message: &str) -> Record {
        Record::builder().level(Level::Error).message(message).build()
    }

    #[test]
    fn flush_on_overflow_hands_over_full_batch() {
        let batches = Arc::new(Mutex::new(vec![]));
        let buffer = Buffer::new(Batches(batches.clone()))
            .with_buffer_limit(3)
            .with_flush_on_overflow(true);

        for message in ["first", "second", "third", "fourth"] {
            buffer.append(&record(message)).unwrap();
        }
        assert_eq!(
            *batches.lock().unwrap(),
            vec![vec!["first", "second", "third"]]
        );

        drop(buffer);
        assert_eq!(batches.lock().unwrap().len(), 2);
        assert_eq!(batches.lock().unwrap()[1], vec!["fourth"]);
    }

    #[test]
    fn overflow_drops_oldest() {
        let batches = Arc::new(Mutex::new(vec![]));
        let buffer = Buffer::new(Batches(batches.clone())).with_buffer_limit(2);

        for message in ["first", "second", "third"] {
            buffer.append(&record(message)).unwrap();
        }
        assert!(batches.lock().unwrap().is_empty());

        buffer.flush().unwrap();
        assert_eq!(*batches.lock().unwrap(), vec![vec!["second", "third"]]);

        buffer.flush().unwrap();
        assert_eq!(batches.lock().unwrap().len(), 1);
    }

    #[test]
    fn level_gate() {
        let buffer = Buffer::new(Batches::default()).with_level(LevelFilter::Warn);
        assert!(buffer.enabled(Level::Error));
        assert!(!buffer.enabled(Level::Info));
    }

    #[test]
    fn bubble_flag() {
        assert!(Buffer::new(Batches::default()).bubble());
        assert!(!Buffer::new(Batches::default()).with_bubble(false).bubble());
    }

    #[derive(Debug)]
    struct Flaky {
        failing: Arc<AtomicBool>,
        batches: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl Append for Flaky {
        fn append(&self, record: &Record) -> Result<(), Error> {
            self.append_batch(std::slice::from_ref(record))
        }

        fn append_batch(&self, records: &[Record]) -> Result<(), Error> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::new("layout failed"));
            }
            let messages = records.iter().map(|r| r.message().to_owned()).collect();
            self.batches.lock().unwrap().push(messages);
            Ok(())
        }
    }

    #[test]
    fn failed_overflow_flush_keeps_incoming_record() {
        let failing = Arc::new(AtomicBool::new(false));
        let batches = Arc::new(Mutex::new(vec![]));
        let buffer = Buffer::new(Flaky {
            failing: failing.clone(),
            batches: batches.clone(),
        })
        .with_buffer_limit(1)
        .with_flush_on_overflow(true);

        buffer.append(&record("first")).unwrap();
        failing.store(true, Ordering::SeqCst);
        let err = buffer.append(&record("second")).unwrap_err();
        assert_eq!(err.message(), "layout failed");
        assert_eq!(buffer.buffer().len(), 1);

        failing.store(false, Ordering::SeqCst);
        buffer.flush().unwrap();
        assert_eq!(*batches.lock().unwrap(), vec![vec!["second"]]);
    }

    #[test]
    fn concurrent_append_and_flush_drop_oldest() {
        let batches = Arc::new(Mutex::new(vec![]));
        let buffer = Buffer::new(Batches(batches.clone())).with_buffer_limit(1);

        thread::scope(|s| {
            for i in 0..8 {
                let buffer = &buffer;
                s.spawn(move || {
                    for n in 0..200 {
                        if i % 2 == 0 {
                            buffer.append(&record(&format!("{i}-{n}"))).unwrap();
                        } else {
                            buffer.flush().unwrap();
                        }
                    }
                });
            }
        });

        assert!(buffer.buffer().len() <= 1);
        assert!(batches.lock().unwrap().iter().all(|batch| batch.len() == 1));
    }

    #[test]
    fn concurrent_append_and_flush_on_overflow_loses_nothing() {
        let batches = Arc::new(Mutex::new(vec![]));
        let buffer = Buffer::new(Batches(batches.clone()))
            .with_buffer_limit(1)
            .with_flush_on_overflow(true);

        thread::scope(|s| {
            for i in 0..8 {
                let buffer = &buffer;
                s.spawn(move || {
                    for n in 0..200 {
                        if i % 2 == 0 {
                            buffer.append(&record(&format!("{i}-{n}"))).unwrap();
                        } else {
                            buffer.flush().unwrap();
                        }
                    }
                });
            }
        });
        buffer.flush().unwrap();

        let delivered: usize = batches.lock().unwrap().iter().map(Vec::len).sum();
        assert_eq!(delivered, 4 * 200);
    }
}
