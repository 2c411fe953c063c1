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

use log::Level;
use log::LevelFilter;
use serde::Deserialize;
use serde::Deserializer;

use crate::Error;
use crate::append::Append;
use crate::layout::JsonLayout;
use crate::layout::Layout;
use crate::processor::Processor;
use crate::record::Record;
use crate::transport::AsyncTransport;
use crate::transport::Headers;
use crate::transport::Request;
use crate::transport::Transport;
use crate::trap::DiscardTrap;
use crate::trap::Trap;

const DEFAULT_METHOD: &str = "GET";
const DEFAULT_PROTOCOL_VERSION: &str = "1.1";
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Overrides for the delivery settings of an [`Http`] appender.
///
/// Every field is optional. A supplied field replaces the current setting; `headers` replaces
/// the whole header map. `uri` distinguishes "not supplied" (`None`) from "supplied as absent"
/// (`Some(None)`), which disables sending.
///
/// The options deserialize from the keys `uri`, `method`, `headers` and `protocolVersion`:
///
/// ```
/// use logforth_http::append::HttpOptions;
///
/// let options: HttpOptions = serde_json::from_str(
///     r#"{"uri": "https://log.server/log/endpoint", "method": "POST", "protocolVersion": "1.0"}"#,
/// )
/// .unwrap();
/// assert_eq!(options, HttpOptions::default().uri("https://log.server/log/endpoint").method("POST").protocol_version("1.0"));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpOptions {
    /// The target URI; `Some(None)` disables sending.
    #[serde(default, deserialize_with = "deserialize_supplied")]
    pub uri: Option<Option<String>>,
    /// The HTTP method.
    #[serde(default)]
    pub method: Option<String>,
    /// The whole header map.
    #[serde(default)]
    pub headers: Option<Headers>,
    /// The HTTP protocol version.
    #[serde(default)]
    pub protocol_version: Option<String>,
}

// a present key, even with a null value, counts as supplied
fn deserialize_supplied<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl HttpOptions {
    /// Supply the target URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(Some(uri.into()));
        self
    }

    /// Supply an absent target URI, disabling sending.
    pub fn no_uri(mut self) -> Self {
        self.uri = Some(None);
        self
    }

    /// Supply the HTTP method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Supply the whole header map.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Supply the HTTP protocol version.
    pub fn protocol_version(mut self, protocol_version: impl Into<String>) -> Self {
        self.protocol_version = Some(protocol_version.into());
        self
    }
}

#[derive(Debug, Clone)]
struct Delivery {
    uri: Option<String>,
    method: String,
    headers: Headers,
    protocol_version: String,
}

impl Default for Delivery {
    fn default() -> Self {
        Self {
            uri: None,
            method: DEFAULT_METHOD.to_owned(),
            headers: Headers::from([(
                "Content-Type".to_owned(),
                Some(DEFAULT_CONTENT_TYPE.to_owned()),
            )]),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_owned(),
        }
    }
}

impl Delivery {
    fn merge(&mut self, options: HttpOptions) {
        let HttpOptions {
            uri,
            method,
            headers,
            protocol_version,
        } = options;

        if let Some(uri) = uri {
            self.uri = uri;
        }
        if let Some(method) = method {
            self.method = method;
        }
        if let Some(headers) = headers {
            self.headers = headers;
        }
        if let Some(protocol_version) = protocol_version {
            self.protocol_version = protocol_version;
        }
    }
}

#[derive(Debug)]
enum Client {
    Sync(Box<dyn Transport>),
    Async(Box<dyn AsyncTransport>),
}

/// An appender that ships log records to a remote HTTP endpoint.
///
/// A single record is formatted on its own and sent as one request. A batch, usually handed
/// over by a [`Buffer`](crate::append::Buffer), is filtered by level, processed, formatted with
/// [`Layout::format_batch`] and sent as one request.
///
/// Delivery is best-effort. No request is built while the URI is absent. A failing synchronous
/// send is caught and handed to the trap, which discards it unless configured otherwise; the
/// asynchronous variant never observes the outcome at all. Logging never fails because the
/// endpoint is unreachable.
///
/// # Examples
///
/// ```
/// use logforth_http::append::Http;
/// use logforth_http::append::HttpOptions;
/// use logforth_http::transport::Recording;
///
/// let mut http = Http::new(
///     HttpOptions::default().uri("https://log.server/log/endpoint"),
///     Recording::default(),
/// );
/// http.set_method("POST")
///     .push_header("Authorization", Some("Bearer token"));
/// assert_eq!(http.method(), "POST");
/// ```
#[derive(Debug)]
pub struct Http {
    delivery: Delivery,
    client: Client,
    layout: Box<dyn Layout>,
    processors: Vec<Box<dyn Processor>>,
    trap: Box<dyn Trap>,
    level: LevelFilter,
    bubble: bool,
}

impl Http {
    /// Create an appender sending through a synchronous transport.
    ///
    /// `options` are merged over the defaults: no URI, method `GET`, header
    /// `Content-Type: application/json`, protocol version `1.1`.
    pub fn new(options: HttpOptions, transport: impl Into<Box<dyn Transport>>) -> Self {
        Self::with_client(options, Client::Sync(transport.into()))
    }

    /// Create an appender sending through a fire-and-forget transport.
    pub fn new_async(options: HttpOptions, transport: impl Into<Box<dyn AsyncTransport>>) -> Self {
        Self::with_client(options, Client::Async(transport.into()))
    }

    fn with_client(options: HttpOptions, client: Client) -> Self {
        let mut delivery = Delivery::default();
        delivery.merge(options);

        Self {
            delivery,
            client,
            layout: Box::new(JsonLayout::default()),
            processors: vec![],
            trap: Box::new(DiscardTrap::default()),
            level: LevelFilter::Trace,
            bubble: true,
        }
    }

    /// Sets the layout.
    ///
    /// Default to [`JsonLayout`].
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Adds a processor run on every record before formatting.
    pub fn with_processor(mut self, processor: impl Into<Box<dyn Processor>>) -> Self {
        self.processors.push(processor.into());
        self
    }

    /// Sets the trap that receives failures of the synchronous transport.
    ///
    /// Default to [`DiscardTrap`].
    pub fn with_trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Sets the minimum level of handled records.
    ///
    /// Default to [`LevelFilter::Trace`].
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Sets whether handled records still reach the appenders after this one.
    ///
    /// Default to `true`.
    pub fn with_bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    /// Merge the options over the current delivery settings.
    pub fn set_options(&mut self, options: HttpOptions) -> &mut Self {
        self.delivery.merge(options);
        self
    }

    /// The target URI, or `None` when sending is disabled.
    pub fn uri(&self) -> Option<&str> {
        self.delivery.uri.as_deref()
    }

    /// Sets the target URI. `None` disables sending.
    pub fn set_uri(&mut self, uri: Option<String>) -> &mut Self {
        self.delivery.uri = uri;
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> &str {
        non_empty_or(&self.delivery.method, DEFAULT_METHOD)
    }

    /// Sets the HTTP method. Any string is accepted and sent verbatim.
    pub fn set_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.delivery.method = method.into();
        self
    }

    /// The header map.
    pub fn headers(&self) -> &Headers {
        &self.delivery.headers
    }

    /// Replaces the whole header map.
    pub fn set_headers(&mut self, headers: Headers) -> &mut Self {
        self.delivery.headers = headers;
        self
    }

    /// The value of a header, or `default` when the header is missing or has no value.
    pub fn header<'a, 'k>(
        &'a self,
        key: impl Into<Option<&'k str>>,
        default: Option<&'a str>,
    ) -> Option<&'a str> {
        key.into()
            .and_then(|key| self.delivery.headers.get(key))
            .and_then(|value| value.as_deref())
            .or(default)
    }

    /// Whether the header exists, with or without a value. Always `false` for an absent key.
    pub fn has_header<'k>(&self, key: impl Into<Option<&'k str>>) -> bool {
        key.into()
            .is_some_and(|key| self.delivery.headers.contains_key(key))
    }

    /// Inserts or replaces a single header, keeping all others.
    pub fn push_header(&mut self, key: impl Into<String>, value: Option<&str>) -> &mut Self {
        self.delivery
            .headers
            .insert(key.into(), value.map(str::to_owned));
        self
    }

    /// Removes a header and returns its value.
    ///
    /// Returns `None` when the key is absent, the header is missing or it has no value.
    pub fn pop_header<'k>(&mut self, key: impl Into<Option<&'k str>>) -> Option<String> {
        let key = key.into()?;
        self.delivery.headers.remove(key).flatten()
    }

    /// The HTTP protocol version.
    pub fn protocol_version(&self) -> &str {
        non_empty_or(&self.delivery.protocol_version, DEFAULT_PROTOCOL_VERSION)
    }

    /// Sets the HTTP protocol version.
    pub fn set_protocol_version(&mut self, protocol_version: impl Into<String>) -> &mut Self {
        self.delivery.protocol_version = protocol_version.into();
        self
    }

    fn process(&self, record: &Record) -> Result<Record, Error> {
        let mut record = record.clone();
        for processor in &self.processors {
            processor.process(&mut record)?;
        }
        Ok(record)
    }

    fn write(&self, body: Vec<u8>) {
        let Some(uri) = self.uri().filter(|uri| !uri.is_empty()) else {
            return;
        };

        let request = Request::new(
            self.method(),
            uri,
            self.headers().clone(),
            body,
            self.protocol_version(),
        );

        match &self.client {
            Client::Sync(transport) => {
                // Logging must never fail the application: a failed send is handed to the trap
                // and otherwise dropped. No retry, no propagation.
                if let Err(err) = transport.send(request) {
                    self.trap.trap(&err);
                }
            }
            Client::Async(transport) => transport.send_async(request),
        }
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() { default } else { value }
}

impl Append for Http {
    fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    fn bubble(&self) -> bool {
        self.bubble
    }

    fn append(&self, record: &Record) -> Result<(), Error> {
        let record = self.process(record)?;
        let body = self.layout.format(&record)?;
        self.write(body);
        Ok(())
    }

    fn append_batch(&self, records: &[Record]) -> Result<(), Error> {
        let records = records
            .iter()
            .filter(|record| self.enabled(record.level()))
            .map(|record| self.process(record))
            .collect::<Result<Vec<_>, _>>()?;

        // an empty batch is still formatted; only a missing URI skips the send
        let body = self.layout.format_batch(&records)?;
        self.write(body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::transport::Recording;

    fn http() -> Http {
        Http::new(HttpOptions::default(), Recording::default())
    }

    fn record(level: Level, message: &str) -> Record {
        Record::builder().level(level).message(message).build()
    }

    #[test]
    fn default_values_after_instance_is_created() {
        let http = http();
        assert_eq!(http.uri(), None);
        assert_eq!(http.method(), "GET");
        assert_eq!(
            http.headers(),
            &Headers::from([("Content-Type".to_owned(), Some("application/json".to_owned()))])
        );
        assert_eq!(http.protocol_version(), "1.1");
    }

    #[test]
    fn set_options_replaces_supplied_settings() {
        let headers = Headers::from([("Content-Type".to_owned(), Some("application/xml".to_owned()))]);
        let mut http = http();
        http.set_options(
            HttpOptions::default()
                .uri("https://log.server/log/endpoint")
                .method("POST")
                .headers(headers.clone())
                .protocol_version("1.0"),
        )
        .set_method("PUT");

        assert_eq!(http.uri(), Some("https://log.server/log/endpoint"));
        assert_eq!(http.method(), "PUT");
        assert_eq!(http.headers(), &headers);
        assert_eq!(http.protocol_version(), "1.0");
    }

    #[test]
    fn options_merge_keeps_unsupplied_settings() {
        let mut http = Http::new(
            HttpOptions::default().uri("https://log.server/log/endpoint"),
            Recording::default(),
        );
        assert_eq!(http.method(), "GET");
        assert!(http.has_header("Content-Type"));

        http.set_options(HttpOptions::default().method("POST"));
        assert_eq!(http.uri(), Some("https://log.server/log/endpoint"));

        http.set_options(HttpOptions::default().no_uri());
        assert_eq!(http.uri(), None);
    }

    #[test]
    fn options_deserialize_explicit_null_uri() {
        let options: HttpOptions = serde_json::from_str(r#"{"uri": null}"#).unwrap();
        assert_eq!(options.uri, Some(None));

        let options: HttpOptions = serde_json::from_str(r#"{"method": "PATCH"}"#).unwrap();
        assert_eq!(options.uri, None);
        assert_eq!(options.method.as_deref(), Some("PATCH"));

        let options: HttpOptions =
            serde_json::from_str(r#"{"headers": {"X-Trace": null, "Accept": "*/*"}}"#).unwrap();
        let headers = options.headers.unwrap();
        assert_eq!(headers["X-Trace"], None);
        assert_eq!(headers["Accept"].as_deref(), Some("*/*"));
    }

    #[test]
    fn set_uri_to_none() {
        let mut http = http();
        http.set_uri(Some("https://log.server/log/endpoint".to_owned()));
        assert_eq!(http.uri(), Some("https://log.server/log/endpoint"));
        http.set_uri(None);
        assert_eq!(http.uri(), None);
    }

    #[test]
    fn empty_method_and_version_fall_back_to_defaults() {
        let mut http = http();
        http.set_method("").set_protocol_version("");
        assert_eq!(http.method(), "GET");
        assert_eq!(http.protocol_version(), "1.1");
    }

    #[test]
    fn get_header() {
        let mut http = http();
        http.set_headers(Headers::from([(
            "Content-Type".to_owned(),
            Some("application/xml".to_owned()),
        )]));

        assert_eq!(http.header("Content-Type", None), Some("application/xml"));
        assert_eq!(http.header("foo", None), None);
        assert_eq!(http.header("foo", Some("bar")), Some("bar"));
        assert_eq!(http.header(None, None), None);
    }

    #[test]
    fn has_header() {
        let mut http = http();
        http.push_header("Content-Type", Some("abc"))
            .push_header("foo", None);

        assert!(http.has_header("Content-Type"));
        assert!(http.has_header("foo"));
        assert!(!http.has_header("bar"));
        assert!(!http.has_header(None));
        assert_eq!(http.header("foo", None), None);
    }

    #[test]
    fn push_header_keeps_others() {
        let mut http = http();
        http.push_header("X", Some("1"));
        assert_eq!(http.header("X", None), Some("1"));
        assert_eq!(http.header("Content-Type", None), Some("application/json"));
    }

    #[test]
    fn pop_header() {
        let mut http = http();
        http.push_header("Content-Type", Some("application/xml"));

        assert_eq!(
            http.pop_header("Content-Type").as_deref(),
            Some("application/xml")
        );
        assert!(!http.has_header("Content-Type"));
        assert_eq!(http.pop_header("Content-Type"), None);
        assert_eq!(http.pop_header("foo"), None);
        assert_eq!(http.pop_header(None), None);
    }

    #[test]
    fn pop_header_without_value_removes_it() {
        let mut http = http();
        http.push_header("Y", None);
        assert_eq!(http.pop_header("Y"), None);
        assert!(!http.has_header("Y"));
    }

    #[test]
    fn single_record_sends_one_request() {
        let recording = Recording::default();
        let mut http = Http::new(HttpOptions::default(), recording.clone())
            .with_layout(JsonLayout::default());
        http.set_uri(Some("https://log.server/log/endpoint".to_owned()))
            .push_header("X-Api-Key", Some("secret"));

        let record = record(Level::Error, "Bar");
        http.append(&record).unwrap();

        let requests = recording.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method(), "GET");
        assert_eq!(request.uri(), "https://log.server/log/endpoint");
        assert_eq!(request.protocol_version(), "1.1");
        assert_eq!(request.headers(), http.headers());
        assert_eq!(request.body(), JsonLayout::default().format(&record).unwrap());
    }

    #[test]
    fn no_request_without_uri() {
        let recording = Recording::default();
        let http = Http::new(HttpOptions::default(), recording.clone());

        for _ in 0..10 {
            http.append(&record(Level::Error, "Bar")).unwrap();
        }
        http.append_batch(&[record(Level::Error, "Bar")]).unwrap();
        assert!(recording.requests().is_empty());
    }

    #[test]
    fn no_request_with_empty_uri() {
        let recording = Recording::default();
        let http = Http::new(HttpOptions::default().uri(""), recording.clone());
        assert_eq!(http.uri(), Some(""));

        http.append(&record(Level::Error, "Bar")).unwrap();
        http.append_batch(&[record(Level::Error, "Bar")]).unwrap();
        assert!(recording.requests().is_empty());
    }

    #[derive(Debug, Default, Clone)]
    struct CollectTrap(Arc<Mutex<Vec<String>>>);

    impl Trap for CollectTrap {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.message().to_owned());
        }
    }

    #[test]
    fn transport_failure_is_swallowed() {
        let recording = Recording::default();
        recording.fail_next("Whoops!");
        let http = Http::new(
            HttpOptions::default().uri("https://log.server/log/endpoint"),
            recording.clone(),
        );

        http.append(&record(Level::Error, "Bar")).unwrap();
        assert!(recording.last_request().is_none());
    }

    #[test]
    fn transport_failure_reaches_configured_trap() {
        let recording = Recording::default();
        recording.fail_next("Whoops!");
        let trap = CollectTrap::default();
        let http = Http::new(
            HttpOptions::default().uri("https://log.server/log/endpoint"),
            recording.clone(),
        )
        .with_trap(trap.clone());

        http.append(&record(Level::Error, "Bar")).unwrap();
        assert_eq!(*trap.0.lock().unwrap(), vec!["Whoops!"]);
    }

    #[test]
    fn batch_filters_by_level_and_keeps_order() {
        let recording = Recording::default();
        let http = Http::new(
            HttpOptions::default().uri("https://log.server/log/endpoint"),
            recording.clone(),
        )
        .with_level(LevelFilter::Warn);

        http.append_batch(&[
            record(Level::Error, "first"),
            record(Level::Debug, "dropped"),
            record(Level::Warn, "second"),
        ])
        .unwrap();

        let requests = recording.requests();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(requests[0].body()).unwrap();
        let messages = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["message"].as_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn empty_batch_still_sends() {
        let recording = Recording::default();
        let http = Http::new(
            HttpOptions::default().uri("https://log.server/log/endpoint"),
            recording.clone(),
        )
        .with_level(LevelFilter::Error);

        http.append_batch(&[record(Level::Info, "dropped")]).unwrap();

        let request = recording.last_request().unwrap();
        assert_eq!(request.body(), b"[]");
    }

    #[test]
    fn async_variant_hands_off_request() {
        let recording = Recording::default();
        let http = Http::new_async(
            HttpOptions::default()
                .uri("https://log.server/log/endpoint")
                .method("POST"),
            recording.clone(),
        );

        http.append(&record(Level::Info, "Bar")).unwrap();
        assert_eq!(recording.last_request().unwrap().method(), "POST");
    }
}
