//! Server-side capture through the recording middleware, then offline
//! verification of the captured traffic against the handler.

use std::sync::Arc;

use httpvcr::cassette::MismatchField;
use httpvcr::{
    verify_handler, BoxError, Cassette, Handler, HookKind, HttpRequest, HttpResponse, Mode, Recorder,
};

fn app(request: &HttpRequest) -> Result<HttpResponse, BoxError> {
    let mut body = String::new();
    if let Some(query) = request.url.query() {
        body.push_str(query);
        body.push('\n');
    }
    if request.body.is_empty() {
        body.push_str("OK");
    } else {
        body.push_str(&request.body_text());
    }
    Ok(HttpResponse::new(200).with_header("KEY", "VALUE").with_body(body))
}

fn drifted(request: &HttpRequest) -> Result<HttpResponse, BoxError> {
    let mut response = app(request)?;
    if request.url.path() == "/request1" {
        response.code = 503;
    }
    response.headers.insert("Key", "OTHER");
    Ok(response)
}

fn by_route(request: &HttpRequest) -> Result<String, BoxError> {
    Ok(format!("{} {} {}", request.method, request.url.path(), request.body_text()))
}

fn inbound(method: &str, target: &str) -> HttpRequest {
    let mut request = HttpRequest::parse(method, &format!("http://127.0.0.1:8080{target}")).unwrap();
    request.remote_addr = "127.0.0.1:53124".into();
    request.request_uri = target.into();
    request
}

async fn record(name: &str) -> Arc<Recorder> {
    let recorder = Arc::new(
        Recorder::builder(name)
            .mode(Mode::RecordOnly)
            .fingerprinter(by_route)
            .hook(HookKind::BeforeSave, |i| {
                i.request.host.clear();
                i.request.remote_addr.clear();
                i.response.duration = std::time::Duration::ZERO;
                Ok(())
            })
            .build()
            .unwrap(),
    );
    let handler = recorder.middleware(app);

    handler.handle(&inbound("GET", "/request1")).await.unwrap();
    handler.handle(&inbound("GET", "/request2?query=example")).await.unwrap();
    handler.handle(&inbound("POST", "/postform").with_form([("key", "value")])).await.unwrap();
    let json = inbound("POST", "/postdata")
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"key":"value"}"#);
    let response = handler.handle(&json).await.unwrap();
    assert_eq!(response.body_text(), r#"{"key":"value"}"#);
    recorder
}

#[tokio::test]
async fn middleware_captures_inbound_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("middleware").to_string_lossy().into_owned();
    let recorder = record(&name).await;

    let captured = recorder.cassette().interactions();
    assert_eq!(captured.len(), 4);
    assert_eq!(captured[1].request.remote_addr, "127.0.0.1:53124");
    assert_eq!(captured[1].request.request_uri, "/request2?query=example");
    assert_eq!(captured[2].request.form["key"], vec!["value"]);
    assert_eq!(captured[3].response.headers.get("Key"), Some("VALUE"));

    recorder.stop().unwrap();
    let text = std::fs::read_to_string(format!("{name}.yaml")).unwrap();
    assert!(!text.contains("remote_addr"));
    assert!(text.contains("request_uri: /postform"));
}

#[tokio::test]
async fn saved_cassette_verifies_against_the_same_handler() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("verify").to_string_lossy().into_owned();
    record(&name).await.stop().unwrap();

    let cassette = Cassette::open(&name).unwrap();
    let mismatches = verify_handler(&cassette, &app).await.unwrap();
    assert!(mismatches.is_empty(), "{mismatches:?}");
}

#[tokio::test]
async fn verification_reports_handler_drift() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("drift").to_string_lossy().into_owned();
    record(&name).await.stop().unwrap();

    let cassette = Cassette::open(&name).unwrap();
    let mismatches = verify_handler(&cassette, &drifted).await.unwrap();
    let codes: Vec<u64> = mismatches.iter().filter(|m| m.field == MismatchField::Code).map(|m| m.id).collect();
    assert_eq!(codes, vec![0]);
    let headers = mismatches.iter().filter(|m| m.field == MismatchField::Header("Key".into())).count();
    assert_eq!(headers, 4);
}

#[tokio::test]
async fn replay_only_middleware_does_not_capture() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("readonly").to_string_lossy().into_owned();
    record(&name).await.stop().unwrap();

    let recorder = Arc::new(Recorder::builder(&name).mode(Mode::ReplayOnly).fingerprinter(by_route).build().unwrap());
    let handler = recorder.middleware(app);
    handler.handle(&inbound("GET", "/new")).await.unwrap();
    assert_eq!(recorder.cassette().len(), 4);
}
