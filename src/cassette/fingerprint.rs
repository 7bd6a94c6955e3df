//! Request fingerprints: deterministic digests used to match live requests
//! against recorded interactions.

use sha2::{Digest, Sha256};

use crate::ports::http::{canonical_header_key, Headers, HttpRequest};
use crate::ports::BoxError;

const DELIMITER: &[u8] = b"::";

/// Computes the digest that decides whether two requests are "the same".
///
/// Equivalent requests must produce identical digests across runs, and the
/// digest must be stable enough to persist in a cassette file.
pub trait Fingerprinter: Send + Sync {
    /// Returns the fingerprint of `request`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be fingerprinted.
    fn fingerprint(&self, request: &HttpRequest) -> Result<String, BoxError>;
}

impl<F> Fingerprinter for F
where
    F: Fn(&HttpRequest) -> Result<String, BoxError> + Send + Sync,
{
    fn fingerprint(&self, request: &HttpRequest) -> Result<String, BoxError> {
        self(request)
    }
}

/// Incremental SHA-256 over delimiter-separated parts, rendered as lowercase hex.
pub struct RequestHasher {
    hasher: Sha256,
    first: bool,
}

impl RequestHasher {
    /// Creates an empty hasher.
    #[must_use]
    pub fn new() -> Self {
        Self { hasher: Sha256::new(), first: true }
    }

    /// Appends one part, preceded by the delimiter unless it is the first.
    pub fn add(&mut self, part: impl AsRef<[u8]>) {
        if !self.first {
            self.hasher.update(DELIMITER);
        }
        self.first = false;
        self.hasher.update(part.as_ref());
    }

    /// Appends an integer part in decimal.
    pub fn add_int(&mut self, n: i64) {
        self.add(n.to_string());
    }

    /// Finishes hashing.
    #[must_use]
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl Default for RequestHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard fingerprint: every request field, with an optional list of
/// headers excluded from matching.
#[derive(Debug, Clone, Default)]
pub struct DefaultFingerprinter {
    ignore_headers: Vec<String>,
}

impl DefaultFingerprinter {
    /// Creates a fingerprinter that hashes every header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes the `User-Agent` header from matching.
    #[must_use]
    pub fn ignore_user_agent(self) -> Self {
        self.ignore_headers(["User-Agent"])
    }

    /// Excludes the `Authorization` header from matching.
    #[must_use]
    pub fn ignore_authorization(self) -> Self {
        self.ignore_headers(["Authorization"])
    }

    /// Excludes the named headers from matching (case-insensitive).
    #[must_use]
    pub fn ignore_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignore_headers.extend(names.into_iter().map(|n| canonical_header_key(n.as_ref())));
        self
    }

    /// Headers currently excluded from matching, in canonical form.
    #[must_use]
    pub fn ignored_headers(&self) -> &[String] {
        &self.ignore_headers
    }

    fn digest(&self, request: &HttpRequest) -> String {
        let mut hasher = RequestHasher::new();
        hasher.add(&request.method);
        hasher.add(&request.host);
        hasher.add(request.url.as_str());
        hasher.add(&request.proto);
        hasher.add_int(i64::from(request.proto_major));
        hasher.add_int(i64::from(request.proto_minor));
        hasher.add(serialize_headers(&request.headers, &self.ignore_headers));
        hasher.add(&request.body);
        hasher.add_int(request.content_length);
        hasher.add(serialize_headers(&request.trailer, &[]));
        hasher.add(serialize_transfer_encoding(&request.transfer_encoding));
        hasher.add(&request.remote_addr);
        hasher.add(&request.request_uri);
        hasher.finish()
    }
}

impl Fingerprinter for DefaultFingerprinter {
    fn fingerprint(&self, request: &HttpRequest) -> Result<String, BoxError> {
        Ok(self.digest(request))
    }
}

/// `Name:v1,v2;Name2:v` with names and values sorted, ignored names dropped.
fn serialize_headers(headers: &Headers, ignore: &[String]) -> String {
    let entries: Vec<String> = headers
        .iter()
        .filter(|(name, _)| !ignore.iter().any(|i| i.eq_ignore_ascii_case(name)))
        .map(|(name, values)| {
            let mut values = values.to_vec();
            values.sort();
            format!("{name}:{}", values.join(","))
        })
        .collect();
    entries.join(";")
}

fn serialize_transfer_encoding(encodings: &[String]) -> String {
    let mut sorted = encodings.to_vec();
    sorted.sort();
    sorted.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HttpRequest {
        HttpRequest::parse("POST", "http://127.0.0.1:9000/api/v1?x=1")
            .unwrap()
            .with_header("Accept", "text/plain")
            .with_header("Accept", "application/json")
            .with_header("User-Agent", "agent/1.0")
            .with_body("payload")
    }

    #[test]
    fn digest_is_deterministic_and_leaves_body_intact() {
        let fp = DefaultFingerprinter::new();
        let req = sample();
        let first = fp.fingerprint(&req).unwrap();
        let second = fp.fingerprint(&req).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(req.body, b"payload");
    }

    #[test]
    fn header_value_order_does_not_matter() {
        let fp = DefaultFingerprinter::new();
        let a = sample();
        let mut b = HttpRequest::parse("POST", "http://127.0.0.1:9000/api/v1?x=1")
            .unwrap()
            .with_header("User-Agent", "agent/1.0")
            .with_header("Accept", "application/json")
            .with_header("Accept", "text/plain")
            .with_body("payload");
        assert_eq!(fp.fingerprint(&a).unwrap(), fp.fingerprint(&b).unwrap());

        b.body = b"other".to_vec();
        assert_ne!(fp.fingerprint(&a).unwrap(), fp.fingerprint(&b).unwrap());
    }

    #[test]
    fn ignored_headers_are_excluded() {
        let strict = DefaultFingerprinter::new();
        let lenient = DefaultFingerprinter::new().ignore_user_agent().ignore_authorization();
        let a = sample();
        let b = sample().with_header("authorization", "Bearer abc");
        let mut c = sample();
        c.headers.insert("User-Agent", "agent/2.0");

        assert_ne!(strict.fingerprint(&a).unwrap(), strict.fingerprint(&b).unwrap());
        assert_eq!(lenient.fingerprint(&a).unwrap(), lenient.fingerprint(&b).unwrap());
        assert_eq!(lenient.fingerprint(&a).unwrap(), lenient.fingerprint(&c).unwrap());
        assert_eq!(lenient.ignored_headers(), ["User-Agent", "Authorization"]);
    }

    #[test]
    fn delimiter_prevents_boundary_ambiguity() {
        let mut a = RequestHasher::new();
        a.add("ab");
        a.add("c");
        let mut b = RequestHasher::new();
        b.add("a");
        b.add("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn serializes_headers_canonically() {
        let headers: Headers =
            [("b", "2"), ("a", "z"), ("a", "y"), ("c", "3")].into_iter().collect();
        assert_eq!(serialize_headers(&headers, &["C".to_string()]), "A:y,z;B:2");
        assert_eq!(serialize_headers(&Headers::new(), &[]), "");
        assert_eq!(serialize_transfer_encoding(&["gzip".into(), "chunked".into()]), "chunked,gzip");
    }

    #[test]
    fn closures_are_fingerprinters() {
        let by_path = |r: &HttpRequest| -> Result<String, BoxError> { Ok(r.url.path().to_string()) };
        let fp: &dyn Fingerprinter = &by_path;
        assert_eq!(fp.fingerprint(&sample()).unwrap(), "/api/v1");
    }
}
