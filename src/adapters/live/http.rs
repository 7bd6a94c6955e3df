//! Live adapter for the `Transport` port using `reqwest`.

use reqwest::{Client, Method, Version};

use crate::ports::http::{status_text, Headers, HttpRequest, HttpResponse};
use crate::ports::{BoxError, ResponseFuture, Transport};

/// Live transport that sends requests over the network.
#[derive(Debug, Clone)]
pub struct LiveTransport {
    client: Client,
}

impl LiveTransport {
    /// Creates a live transport with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Creates a live transport around a preconfigured client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        let method = Method::from_bytes(request.method.as_bytes())?;
        let mut builder = self.client.request(method, request.url.clone());
        for (name, values) in request.headers.iter() {
            for value in values {
                builder = builder.header(name, value);
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;
        let code = response.status().as_u16();
        let (proto, proto_major, proto_minor) = protocol(response.version());

        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            let text = std::str::from_utf8(value.as_bytes())
                .map_err(|e| format!("response header {name} is not valid UTF-8: {e}"))?;
            headers.append(name.as_str(), text);
        }
        let transfer_encoding: Vec<String> = headers
            .remove("Transfer-Encoding")
            .unwrap_or_default()
            .iter()
            .flat_map(|v| v.split(','))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();

        let declared = response.content_length();
        let body = response.bytes().await?.to_vec();
        let content_length = match declared {
            Some(n) => i64::try_from(n)?,
            None if transfer_encoding.is_empty() => i64::try_from(body.len())?,
            None => -1,
        };

        Ok(HttpResponse {
            status: status_text(code),
            code,
            proto: proto.to_string(),
            proto_major,
            proto_minor,
            headers,
            trailer: Headers::new(),
            transfer_encoding,
            content_length,
            uncompressed: false,
            body,
        })
    }
}

impl Default for LiveTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LiveTransport {
    fn perform<'a>(&'a self, request: &'a HttpRequest) -> ResponseFuture<'a> {
        Box::pin(self.send(request))
    }
}

fn protocol(version: Version) -> (&'static str, u32, u32) {
    match version {
        Version::HTTP_09 => ("HTTP/0.9", 0, 9),
        Version::HTTP_10 => ("HTTP/1.0", 1, 0),
        Version::HTTP_2 => ("HTTP/2.0", 2, 0),
        Version::HTTP_3 => ("HTTP/3.0", 3, 0),
        _ => ("HTTP/1.1", 1, 1),
    }
}
