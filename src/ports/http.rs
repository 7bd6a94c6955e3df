//! Live HTTP message types exchanged with transports and handlers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Parsed form fields: name to the list of submitted values.
pub type Form = BTreeMap<String, Vec<String>>;

/// Header multimap keyed by canonical header name (`Content-Type`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value to the named header, keeping existing values.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.0.entry(canonical_header_key(name)).or_default().push(value.into());
    }

    /// Replaces all values of the named header with a single value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(canonical_header_key(name), vec![value.into()]);
    }

    /// Returns the first value of the named header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&canonical_header_key(name)).and_then(|v| v.first()).map(String::as_str)
    }

    /// Returns every value of the named header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get(&canonical_header_key(name)).map_or(&[], Vec::as_slice)
    }

    /// Removes the named header, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.remove(&canonical_header_key(name))
    }

    /// Iterates headers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns true when no header is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<BTreeMap<String, Vec<String>>> for Headers {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        let mut headers = Self::new();
        for (name, values) in map {
            headers.0.entry(canonical_header_key(&name)).or_default().extend(values);
        }
        headers
    }
}

impl From<Headers> for BTreeMap<String, Vec<String>> {
    fn from(headers: Headers) -> Self {
        headers.0
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value);
        }
        headers
    }
}

/// Canonical form of a header name: first letter and every letter following
/// a hyphen upper-cased, the rest lower-cased. Names containing characters
/// outside the token set are returned unchanged.
#[must_use]
pub fn canonical_header_key(name: &str) -> String {
    let is_token = |b: u8| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b);
    if !name.bytes().all(is_token) {
        return name.to_string();
    }
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = c == '-';
            out
        })
        .collect()
}

/// Methods whose bodies may carry form fields.
const FORM_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];

/// An HTTP request as seen by the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request method (`GET`, `POST`, ...).
    pub method: String,
    /// Full request URL including the query.
    pub url: Url,
    /// Protocol name, e.g. `HTTP/1.1`.
    pub proto: String,
    /// Protocol major version.
    pub proto_major: u32,
    /// Protocol minor version.
    pub proto_minor: u32,
    /// Host the request is addressed to (`host[:port]`).
    pub host: String,
    /// Peer address for inbound requests; empty for outbound ones.
    pub remote_addr: String,
    /// Unmodified request-target for inbound requests; empty for outbound ones.
    pub request_uri: String,
    /// Request headers.
    pub headers: Headers,
    /// Request trailers.
    pub trailer: Headers,
    /// Transfer encodings, outermost first.
    pub transfer_encoding: Vec<String>,
    /// Declared body length.
    pub content_length: i64,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Creates an HTTP/1.1 request with an empty body.
    #[must_use]
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        let host = host_of(&url);
        Self {
            method: method.into(),
            url,
            proto: "HTTP/1.1".into(),
            proto_major: 1,
            proto_minor: 1,
            host,
            remote_addr: String::new(),
            request_uri: String::new(),
            headers: Headers::new(),
            trailer: Headers::new(),
            transfer_encoding: Vec::new(),
            content_length: 0,
            body: Vec::new(),
        }
    }

    /// Parses `url` and creates a request for it.
    ///
    /// # Errors
    ///
    /// Returns the parser error when `url` is not a valid absolute URL.
    pub fn parse(method: impl Into<String>, url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    /// Adds a header value.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body and its content length.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.content_length = i64::try_from(self.body.len()).unwrap_or(i64::MAX);
        self
    }

    /// Sets a URL-encoded form body with the matching content type.
    #[must_use]
    pub fn with_form<'a>(self, fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.with_header("Content-Type", "application/x-www-form-urlencoded").with_body(encoded)
    }

    /// Body as text; invalid UTF-8 sequences are replaced.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Form fields carried in the body.
    ///
    /// Only POST, PUT and PATCH requests with a URL-encoded content type carry
    /// form fields; every other request yields an empty form.
    #[must_use]
    pub fn post_form(&self) -> Form {
        let mut form = Form::new();
        if !FORM_METHODS.contains(&self.method.as_str()) {
            return form;
        }
        let urlencoded = self
            .headers
            .get("Content-Type")
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| mime.trim() == "application/x-www-form-urlencoded");
        if urlencoded {
            for (key, value) in url::form_urlencoded::parse(&self.body) {
                form.entry(key.into_owned()).or_default().push(value.into_owned());
            }
        }
        form
    }
}

/// `host[:port]` for a URL; the port is omitted when it is the scheme default.
#[must_use]
pub fn host_of(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// An HTTP response as seen by the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status line text, e.g. `200 OK`.
    pub status: String,
    /// Numeric status code.
    pub code: u16,
    /// Protocol name, e.g. `HTTP/1.1`.
    pub proto: String,
    /// Protocol major version.
    pub proto_major: u32,
    /// Protocol minor version.
    pub proto_minor: u32,
    /// Response headers.
    pub headers: Headers,
    /// Response trailers.
    pub trailer: Headers,
    /// Transfer encodings, outermost first.
    pub transfer_encoding: Vec<String>,
    /// Declared body length, -1 when unknown.
    pub content_length: i64,
    /// True when the body was already decompressed relative to the wire.
    pub uncompressed: bool,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates an HTTP/1.1 response with the given status code and an empty body.
    #[must_use]
    pub fn new(code: u16) -> Self {
        Self {
            status: status_text(code),
            code,
            proto: "HTTP/1.1".into(),
            proto_major: 1,
            proto_minor: 1,
            headers: Headers::new(),
            trailer: Headers::new(),
            transfer_encoding: Vec::new(),
            content_length: 0,
            uncompressed: false,
            body: Vec::new(),
        }
    }

    /// Adds a header value.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body and its content length.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.content_length = i64::try_from(self.body.len()).unwrap_or(i64::MAX);
        self
    }

    /// Body as text; invalid UTF-8 sequences are replaced.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Status line text for a code, e.g. `404 Not Found`.
#[must_use]
pub fn status_text(code: u16) -> String {
    match reqwest::StatusCode::from_u16(code).ok().and_then(|s| s.canonical_reason()) {
        Some(reason) => format!("{code} {reason}"),
        None => code.to_string(),
    }
}
