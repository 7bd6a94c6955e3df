//! Replays recorded inbound requests against a handler and reports where its
//! responses drift from what was captured.

use std::fmt;

use tracing::debug;

use super::format::Interaction;
use super::store::Cassette;
use crate::error::{Error, Result};
use crate::ports::http::HttpResponse;
use crate::ports::Handler;

/// The part of a response that differed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchField {
    /// Status code.
    Code,
    /// Body text.
    Body,
    /// A recorded response header.
    Header(String),
}

impl fmt::Display for MismatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code => f.write_str("status code"),
            Self::Body => f.write_str("body"),
            Self::Header(name) => write!(f, "header {name}"),
        }
    }
}

/// One difference between a recorded response and the handler's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayMismatch {
    /// Id of the interaction whose request was replayed.
    pub id: u64,
    /// Method of the replayed request.
    pub method: String,
    /// URL of the replayed request.
    pub url: String,
    /// What differed.
    pub field: MismatchField,
    /// Recorded value.
    pub expected: String,
    /// Value produced by the handler.
    pub actual: String,
}

impl fmt::Display for ReplayMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "interaction {} ({} {}): {} expected {:?}, got {:?}",
            self.id, self.method, self.url, self.field, self.expected, self.actual
        )
    }
}

/// Runs every request stored in `cassette` through `handler` and compares the
/// status code, the body and each recorded response header.
///
/// Headers the handler adds beyond those recorded are not reported.
///
/// # Errors
///
/// Returns an error if a stored request cannot be rebuilt or the handler fails.
pub async fn verify_handler(cassette: &Cassette, handler: &dyn Handler) -> Result<Vec<ReplayMismatch>> {
    let mut mismatches = Vec::new();
    for interaction in cassette.interactions() {
        let request = interaction.request.to_http_request()?;
        let actual = handler.handle(&request).await.map_err(Error::Transport)?;
        let found = compare(&interaction, &actual);
        debug!(id = interaction.id(), mismatches = found.len(), "replayed recorded request against handler");
        mismatches.extend(found);
    }
    Ok(mismatches)
}

fn compare(interaction: &Interaction, actual: &HttpResponse) -> Vec<ReplayMismatch> {
    let recorded = &interaction.response;
    let mismatch = |field, expected: String, actual: String| ReplayMismatch {
        id: interaction.id(),
        method: interaction.request.method.clone(),
        url: interaction.request.url.clone(),
        field,
        expected,
        actual,
    };

    let mut found = Vec::new();
    if recorded.code != actual.code {
        found.push(mismatch(MismatchField::Code, recorded.code.to_string(), actual.code.to_string()));
    }
    if recorded.body != actual.body {
        found.push(mismatch(MismatchField::Body, recorded.body_text(), actual.body_text()));
    }
    for (name, values) in recorded.headers.iter() {
        let live = actual.headers.get_all(name);
        if live != values {
            found.push(mismatch(MismatchField::Header(name.to_string()), values.join(","), live.join(",")));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cassette::format::{RecordedRequest, RecordedResponse};
    use crate::ports::http::HttpRequest;
    use crate::ports::BoxError;

    fn cassette() -> Cassette {
        let cassette = Cassette::new("unsaved");
        for (path, body) in [("/hello", "hello"), ("/json", "{}")] {
            let request = HttpRequest::parse("GET", &format!("http://localhost{path}")).unwrap();
            let response = HttpResponse::new(200).with_header("Content-Type", "text/plain").with_body(body);
            cassette
                .add_interaction(Interaction::new(
                    RecordedRequest::from_http(&request),
                    RecordedResponse::from_http(&response, Duration::ZERO),
                ))
                .unwrap();
        }
        cassette
    }

    #[tokio::test]
    async fn matching_handler_reports_nothing() {
        let handler = |req: &HttpRequest| -> Result<HttpResponse, BoxError> {
            let body = if req.url.path() == "/hello" { "hello" } else { "{}" };
            Ok(HttpResponse::new(200).with_header("Content-Type", "text/plain").with_body(body))
        };
        assert!(verify_handler(&cassette(), &handler).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn drifting_handler_reports_each_difference() {
        let handler = |req: &HttpRequest| -> Result<HttpResponse, BoxError> {
            if req.url.path() == "/hello" {
                Ok(HttpResponse::new(500).with_header("Content-Type", "text/plain").with_body("hello"))
            } else {
                Ok(HttpResponse::new(200).with_header("Content-Type", "application/json").with_body("[]"))
            }
        };
        let mismatches = verify_handler(&cassette(), &handler).await.unwrap();
        let fields: Vec<(u64, MismatchField)> = mismatches.iter().map(|m| (m.id, m.field.clone())).collect();
        assert_eq!(
            fields,
            vec![
                (0, MismatchField::Code),
                (1, MismatchField::Body),
                (1, MismatchField::Header("Content-Type".into())),
            ]
        );
        assert!(mismatches[0].to_string().contains("expected \"200\", got \"500\""));
    }

    #[tokio::test]
    async fn handler_errors_abort_verification() {
        let handler = |_: &HttpRequest| -> Result<HttpResponse, BoxError> { Err("handler down".into()) };
        let err = verify_handler(&cassette(), &handler).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
