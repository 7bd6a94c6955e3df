//! `httpvcr inspect` command.

use serde::Serialize;

use crate::cassette::{Cassette, Interaction};

/// Execute the `inspect` command.
///
/// # Errors
///
/// Returns an error string if the cassette cannot be loaded or encoded.
pub fn run(name: &str, compressed: bool, json: bool) -> Result<(), String> {
    let cassette = super::open(name, compressed)?;
    print!("{}", render(&cassette, json)?);
    Ok(())
}

#[derive(Serialize)]
struct Summary<'a> {
    id: u64,
    method: &'a str,
    url: &'a str,
    code: u16,
    hash: &'a str,
}

impl<'a> From<&'a Interaction> for Summary<'a> {
    fn from(i: &'a Interaction) -> Self {
        Self {
            id: i.id(),
            method: &i.request.method,
            url: &i.request.url,
            code: i.response.code,
            hash: i.fingerprint(),
        }
    }
}

fn render(cassette: &Cassette, json: bool) -> Result<String, String> {
    let interactions = cassette.interactions();
    let summaries: Vec<Summary<'_>> = interactions.iter().map(Summary::from).collect();

    if json {
        let mut out = serde_json::to_string_pretty(&summaries).map_err(|e| e.to_string())?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = format!("{}: {} interaction(s)\n", cassette.file().display(), summaries.len());
    for s in &summaries {
        let short = s.hash.get(..12).unwrap_or(s.hash);
        out.push_str(&format!("{:>4}  {:<7} {} -> {}  {short}\n", s.id, s.method, s.url, s.code));
    }
    if cassette.needs_upgrade() {
        out.push_str("note: fingerprints were recomputed; run `httpvcr upgrade` to store them\n");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cassette::{RecordedRequest, RecordedResponse};
    use crate::ports::{HttpRequest, HttpResponse};

    fn sample() -> Cassette {
        let cassette = Cassette::new("fixtures/sample");
        let request = HttpRequest::parse("GET", "http://localhost/users").unwrap();
        cassette
            .add_interaction(Interaction::new(
                RecordedRequest::from_http(&request),
                RecordedResponse::from_http(&HttpResponse::new(404), Duration::ZERO),
            ))
            .unwrap();
        cassette
    }

    #[test]
    fn renders_one_line_per_interaction() {
        let text = render(&sample(), false).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "fixtures/sample.yaml: 1 interaction(s)");
        assert!(lines[1].contains("GET"));
        assert!(lines[1].contains("http://localhost/users -> 404"));
    }

    #[test]
    fn renders_json_summaries() {
        let text = render(&sample(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["id"], 0);
        assert_eq!(value[0]["code"], 404);
        assert_eq!(value[0]["hash"].as_str().unwrap().len(), 64);
    }
}
