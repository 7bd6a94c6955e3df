//! Cassette data structures for recording and replaying HTTP interactions.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::ports::http::{Form, Headers, HttpRequest, HttpResponse};

/// The single cassette format version this crate reads and writes.
pub const FORMAT_VERSION: u32 = 2;

/// A client request as recorded in the cassette file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedRequest {
    /// Protocol name, e.g. `HTTP/1.1`.
    pub proto: String,
    /// Protocol major version.
    pub proto_major: u32,
    /// Protocol minor version.
    pub proto_minor: u32,
    /// Declared body length.
    pub content_length: i64,
    /// Transfer encodings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transfer_encoding: Vec<String>,
    /// Request trailers.
    #[serde(skip_serializing_if = "Headers::is_empty")]
    pub trailer: Headers,
    /// Target host.
    pub host: String,
    /// Peer address of an inbound request.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote_addr: String,
    /// Request-target of an inbound request.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_uri: String,
    /// Body of the request.
    #[serde(with = "super::body", skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<u8>,
    /// Form fields of the request.
    #[serde(skip_serializing_if = "Form::is_empty")]
    pub form: Form,
    /// Request headers.
    #[serde(skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    /// Request URL.
    pub url: String,
    /// Request method.
    pub method: String,
}

impl RecordedRequest {
    /// Snapshots a live request.
    #[must_use]
    pub fn from_http(request: &HttpRequest) -> Self {
        Self {
            proto: request.proto.clone(),
            proto_major: request.proto_major,
            proto_minor: request.proto_minor,
            content_length: request.content_length,
            transfer_encoding: request.transfer_encoding.clone(),
            trailer: request.trailer.clone(),
            host: request.host.clone(),
            remote_addr: request.remote_addr.clone(),
            request_uri: request.request_uri.clone(),
            body: request.body.clone(),
            form: request.post_form(),
            headers: request.headers.clone(),
            url: request.url.to_string(),
            method: request.method.clone(),
        }
    }

    /// Rebuilds the live request this record describes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] when the recorded URL does not parse.
    pub fn to_http_request(&self) -> Result<HttpRequest> {
        let url = Url::parse(&self.url)
            .map_err(|source| Error::InvalidUrl { url: self.url.clone(), source })?;
        Ok(HttpRequest {
            method: self.method.clone(),
            url,
            proto: self.proto.clone(),
            proto_major: self.proto_major,
            proto_minor: self.proto_minor,
            host: self.host.clone(),
            remote_addr: self.remote_addr.clone(),
            request_uri: self.request_uri.clone(),
            headers: self.headers.clone(),
            trailer: self.trailer.clone(),
            transfer_encoding: self.transfer_encoding.clone(),
            content_length: self.content_length,
            body: self.body.clone(),
        })
    }

    /// Body as text; invalid UTF-8 sequences are replaced.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A server response as recorded in the cassette file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedResponse {
    /// Protocol name, e.g. `HTTP/1.1`.
    pub proto: String,
    /// Protocol major version.
    pub proto_major: u32,
    /// Protocol minor version.
    pub proto_minor: u32,
    /// Transfer encodings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transfer_encoding: Vec<String>,
    /// Response trailers.
    #[serde(skip_serializing_if = "Headers::is_empty")]
    pub trailer: Headers,
    /// Declared body length.
    pub content_length: i64,
    /// True when the stored body was already decompressed relative to the wire.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub uncompressed: bool,
    /// Body of the response.
    #[serde(with = "super::body")]
    pub body: Vec<u8>,
    /// Response headers.
    pub headers: Headers,
    /// Status line text.
    pub status: String,
    /// Status code.
    pub code: u16,
    /// Elapsed time of the original exchange.
    #[serde(with = "super::duration")]
    pub duration: Duration,
}

impl RecordedResponse {
    /// Snapshots a live response that took `duration` to arrive.
    #[must_use]
    pub fn from_http(response: &HttpResponse, duration: Duration) -> Self {
        Self {
            proto: response.proto.clone(),
            proto_major: response.proto_major,
            proto_minor: response.proto_minor,
            transfer_encoding: response.transfer_encoding.clone(),
            trailer: response.trailer.clone(),
            content_length: response.content_length,
            uncompressed: response.uncompressed,
            body: response.body.clone(),
            headers: response.headers.clone(),
            status: response.status.clone(),
            code: response.code,
            duration,
        }
    }

    /// Synthesizes the live response this record describes.
    #[must_use]
    pub fn to_http_response(&self) -> HttpResponse {
        HttpResponse {
            status: self.status.clone(),
            code: self.code,
            proto: self.proto.clone(),
            proto_major: self.proto_major,
            proto_minor: self.proto_minor,
            headers: self.headers.clone(),
            trailer: self.trailer.clone(),
            transfer_encoding: self.transfer_encoding.clone(),
            content_length: self.content_length,
            uncompressed: self.uncompressed,
            body: self.body.clone(),
        }
    }

    /// Body as text; invalid UTF-8 sequences are replaced.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A single recorded request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Position in the cassette (assigned by the cassette).
    #[serde(default)]
    pub(crate) id: u64,
    /// Precomputed request fingerprint; empty in legacy files.
    #[serde(default, rename = "hash", skip_serializing_if = "String::is_empty")]
    pub(crate) fingerprint: String,
    /// The recorded request.
    pub request: RecordedRequest,
    /// The recorded response.
    pub response: RecordedResponse,
    /// Drop this interaction when the cassette is next saved.
    #[serde(skip)]
    pub discard_on_save: bool,
    #[serde(skip)]
    pub(crate) replayed: bool,
}

impl Interaction {
    /// Creates an interaction that has not been added to a cassette yet.
    #[must_use]
    pub fn new(request: RecordedRequest, response: RecordedResponse) -> Self {
        Self {
            id: 0,
            fingerprint: String::new(),
            request,
            response,
            discard_on_save: false,
            replayed: false,
        }
    }

    /// Position of this interaction within its cassette.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Fingerprint under which this interaction is indexed.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// True once this interaction has been returned by a lookup.
    #[must_use]
    pub fn was_replayed(&self) -> bool {
        self.replayed
    }
}

/// On-disk layout written by [`Cassette::save`](super::store::Cassette::save).
#[derive(Serialize)]
pub(crate) struct CassetteDocument<'a> {
    pub version: u32,
    pub compression_enabled: bool,
    pub interactions: &'a [Interaction],
}

/// On-disk layout read by [`Cassette::load`](super::store::Cassette::load).
///
/// `version` is validated before this is decoded.
#[derive(Deserialize)]
pub(crate) struct CassetteFile {
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_interaction() -> Interaction {
        let request = HttpRequest::parse("POST", "http://localhost:8080/api?x=1")
            .unwrap()
            .with_form([("key", "value")]);
        let response = HttpResponse::new(201).with_header("Content-Type", "text/plain").with_body("ok");
        let mut interaction = Interaction::new(
            RecordedRequest::from_http(&request),
            RecordedResponse::from_http(&response, Duration::from_millis(15)),
        );
        interaction.id = 3;
        interaction.fingerprint = "abc123".into();
        interaction
    }

    #[test]
    fn yaml_round_trip() {
        let interaction = sample_interaction();
        let yaml = serde_yaml::to_string(&interaction).expect("serialize");
        let deserialized: Interaction = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(interaction, deserialized);
    }

    #[test]
    fn serializes_wire_field_names() {
        let yaml = serde_yaml::to_string(&sample_interaction()).unwrap();
        assert!(yaml.starts_with("id: 3\nhash: abc123\n"));
        assert!(yaml.contains("duration: 15ms"));
        assert!(yaml.contains("code: 201"));
        assert!(yaml.contains("status: 201 Created"));
        assert!(yaml.contains("form:\n"));
        assert!(!yaml.contains("discard_on_save"));
        assert!(!yaml.contains("replayed"));
        assert!(!yaml.contains("remote_addr"));
    }

    #[test]
    fn legacy_interaction_without_hash_loads_with_empty_fingerprint() {
        let yaml = "id: 0\nrequest:\n  method: GET\n  url: http://example.com/\n\
                    response:\n  code: 200\n  duration: 1s\n";
        let interaction: Interaction = serde_yaml::from_str(yaml).unwrap();
        assert!(interaction.fingerprint().is_empty());
        assert_eq!(interaction.request.method, "GET");
        assert_eq!(interaction.response.duration, Duration::from_secs(1));
    }

    #[test]
    fn recorded_request_converts_back_to_live_request() {
        let interaction = sample_interaction();
        let live = interaction.request.to_http_request().unwrap();
        assert_eq!(live.method, "POST");
        assert_eq!(live.url.as_str(), "http://localhost:8080/api?x=1");
        assert_eq!(live.host, "localhost:8080");
        assert_eq!(live.body, b"key=value");

        let mut broken = interaction.request.clone();
        broken.url = "not a url".into();
        assert!(matches!(broken.to_http_request(), Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn recorded_response_synthesizes_live_response() {
        let response = sample_interaction().response.to_http_response();
        assert_eq!(response.code, 201);
        assert_eq!(response.body, b"ok");
        assert_eq!(response.content_length, 2);
        assert_eq!(response.headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn binary_bodies_survive_serialization() {
        let request = HttpRequest::parse("PUT", "http://localhost/upload").unwrap().with_body(vec![0xff, 0xfe, 0x00]);
        let response = HttpResponse::new(200).with_body(vec![31, 139, 255, 0]);
        let interaction = Interaction::new(
            RecordedRequest::from_http(&request),
            RecordedResponse::from_http(&response, Duration::ZERO),
        );

        let yaml = serde_yaml::to_string(&interaction).unwrap();
        let decoded: Interaction = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(decoded.request.to_http_request().unwrap().body, request.body);
        let replayed = decoded.response.to_http_response();
        assert_eq!(replayed.body, vec![31, 139, 255, 0]);
        assert_eq!(replayed.content_length, 4);
    }
}
