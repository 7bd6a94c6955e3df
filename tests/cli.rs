//! Integration tests for top-level CLI behavior.

use std::process::Command;
use std::time::Duration;

use httpvcr::{Cassette, HttpRequest, HttpResponse, Interaction, RecordedRequest, RecordedResponse};

fn run_httpvcr(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_httpvcr");
    Command::new(bin).args(args).output().expect("failed to run httpvcr binary")
}

fn write_cassette(name: &str) {
    let cassette = Cassette::new(name);
    let request = HttpRequest::parse("GET", "http://localhost/status").unwrap();
    let response = HttpResponse::new(200).with_body("up");
    cassette
        .add_interaction(Interaction::new(
            RecordedRequest::from_http(&request),
            RecordedResponse::from_http(&response, Duration::from_millis(3)),
        ))
        .unwrap();
    cassette.save().unwrap();
}

const LEGACY: &str = "---\nversion: 2\ncompression_enabled: false\ninteractions:\n- id: 0\n  request:\n    \
                      proto: HTTP/1.1\n    proto_major: 1\n    proto_minor: 1\n    content_length: 0\n    \
                      host: localhost\n    url: http://localhost/old\n    method: GET\n  response:\n    \
                      body: legacy\n    headers: {}\n    status: 200 OK\n    code: 200\n    duration: 1ms\n";

#[test]
fn inspect_lists_interactions() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("status").to_string_lossy().into_owned();
    write_cassette(&name);

    let output = run_httpvcr(&["inspect", &name]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("1 interaction(s)"));
    assert!(stdout.contains("http://localhost/status -> 200"));
}

#[test]
fn inspect_json_is_parseable() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("status").to_string_lossy().into_owned();
    write_cassette(&name);

    let output = run_httpvcr(&["inspect", &name, "--json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["method"], "GET");
    assert_eq!(value[0]["url"], "http://localhost/status");
}

#[test]
fn inspect_missing_cassette_fails() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("nothing").to_string_lossy().into_owned();

    let output = run_httpvcr(&["inspect", &name]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("cassette not found"));
}

#[test]
fn upgrade_stores_missing_fingerprints_once() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("legacy").to_string_lossy().into_owned();
    std::fs::write(format!("{name}.yaml"), LEGACY).unwrap();

    let output = run_httpvcr(&["upgrade", &name]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Upgraded"));
    let text = std::fs::read_to_string(format!("{name}.yaml")).unwrap();
    assert!(text.contains("hash: "));

    let output = run_httpvcr(&["upgrade", &name]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("already up to date"));
}

#[test]
fn help_lists_subcommands() {
    let output = run_httpvcr(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("inspect"));
    assert!(stdout.contains("upgrade"));
}
