use std::sync::Arc;
use std::time::Duration;

use securitytxt_scanner::alert::{Alert, BroadcastPublisher};
use securitytxt_scanner::config::{Config, ScannerContext};
use securitytxt_scanner::core::models::{Protocol, TargetDescriptor, Verdict};
use securitytxt_scanner::core::scanner::probe::MAX_BODY_BYTES;
use securitytxt_scanner::store::MemoryStore;
use securitytxt_scanner::worker::Worker;
use tokio::sync::broadcast;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POLICY: &str = r#"
[scanner]
request_timeout = 1

[validation]
strategy = "organization_policy"
rules = [
  { field = "Contact", contains = "security@example.com" },
  { field = "Encryption", contains = "https://example.com/pgp-key.txt" },
  { field = "Hiring", contains = "https://example.com/careers" },
  { field = "Policy", contains = "https://example.com/disclosure-policy" },
]
"#;

const VALID_BODY: &str = "# Security contact for example.com\n\
Contact: mailto:security@example.com\n\
Encryption: https://example.com/pgp-key.txt\n\
Hiring: https://example.com/careers\n\
Policy: https://example.com/disclosure-policy\n";

struct Harness {
    worker: Worker,
    store: Arc<MemoryStore>,
    alerts: broadcast::Receiver<Alert>,
}

fn harness(config_toml: &str) -> Harness {
    let config = Config::from_toml_str(config_toml).unwrap();
    let context = ScannerContext::from_config(&config).unwrap();
    let store = Arc::new(MemoryStore::new());
    let publisher = Arc::new(BroadcastPublisher::new(16));
    let alerts = publisher.subscribe();
    let worker = Worker::new(&context, store.clone(), publisher).unwrap();
    Harness { worker, store, alerts }
}

fn target_for(server: &MockServer) -> TargetDescriptor {
    let addr = server.address();
    TargetDescriptor::new(Protocol::Http, &addr.ip().to_string(), &addr.port().to_string()).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<Alert>) -> Vec<Alert> {
    let mut alerts = Vec::new();
    while let Ok(alert) = rx.try_recv() {
        alerts.push(alert);
    }
    alerts
}

#[tokio::test]
async fn valid_file_at_well_known_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/security.txt"))
        .and(header("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VALID_BODY))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/security.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VALID_BODY))
        .expect(0)
        .mount(&server)
        .await;

    let mut h = harness(POLICY);
    let target = target_for(&server);
    let report = h.worker.handle(&target).await;

    assert_eq!(report.verdict, Verdict::Valid);
    assert_eq!(report.source.as_deref(), Some(format!("{}/.well-known/security.txt", target.to_url()).as_str()));
    assert_eq!(report.settlement.alerted, None);
    assert_eq!(
        h.store.get(target.domain(), target.port(), "securitytxt").await.as_deref(),
        Some("valid")
    );
    assert!(drain(&mut h.alerts).is_empty());
}

#[tokio::test]
async fn fallback_to_root_path_with_missing_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/security.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let without_hiring: String = VALID_BODY
        .lines()
        .filter(|l| !l.starts_with("Hiring"))
        .collect::<Vec<_>>()
        .join("\n");
    Mock::given(method("GET"))
        .and(path("/security.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(without_hiring))
        .mount(&server)
        .await;

    let mut h = harness(POLICY);
    let target = target_for(&server);
    let report = h.worker.handle(&target).await;

    assert_eq!(report.verdict, Verdict::Invalid);
    assert_eq!(
        h.store.get(target.domain(), target.port(), "securitytxt").await.as_deref(),
        Some("invalid")
    );

    let alerts = drain(&mut h.alerts);
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.finding, "invalidFile");
    assert_eq!(alert.location, format!("{}/security.txt", target.to_url()));
    assert!(alert.description.contains("Hiring"));
    let evidence = alert.evidence.as_ref().unwrap();
    assert_eq!(evidence.get("Contact"), Some("mailto:security@example.com"));
    assert_eq!(evidence.get("Hiring"), None);
}

#[tokio::test]
async fn both_paths_missing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let mut h = harness(POLICY);
    let target = target_for(&server);
    let report = h.worker.handle(&target).await;

    assert_eq!(report.verdict, Verdict::NotFound);
    assert_eq!(report.source, None);
    assert_eq!(
        h.store.get(target.domain(), target.port(), "securitytxt").await.as_deref(),
        Some("notFound")
    );

    let alerts = drain(&mut h.alerts);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].finding, "notFound");
    assert!(alerts[0].evidence.is_none());
}

#[tokio::test]
async fn failed_well_known_request_falls_through_to_root_path() {
    let server = MockServer::start().await;
    // Slower than the one second client timeout.
    Mock::given(method("GET"))
        .and(path("/.well-known/security.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VALID_BODY).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/security.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VALID_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(POLICY);
    let target = target_for(&server);
    let report = h.worker.handle(&target).await;

    assert_eq!(report.verdict, Verdict::Valid);
    assert_eq!(report.source.as_deref(), Some(format!("{}/security.txt", target.to_url()).as_str()));
    assert!(drain(&mut h.alerts).is_empty());
}

#[tokio::test]
async fn unreachable_service_is_not_found() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let target = TargetDescriptor::new(Protocol::Http, "127.0.0.1", &port.to_string()).unwrap();

    let mut h = harness(POLICY);
    let report = h.worker.handle(&target).await;

    assert_eq!(report.verdict, Verdict::NotFound);
    assert_eq!(drain(&mut h.alerts).len(), 1);
}

#[tokio::test]
async fn rescanning_overwrites_the_previous_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/security.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VALID_BODY))
        .mount(&server)
        .await;

    let h = harness(POLICY);
    let target = target_for(&server);
    let first = h.worker.handle(&target).await;
    let second = h.worker.handle(&target).await;

    assert_eq!(first.verdict, second.verdict);
    assert_eq!(h.store.len().await, 1);
    assert_eq!(
        h.store.get(target.domain(), target.port(), "securitytxt").await.as_deref(),
        Some("valid")
    );
}

#[tokio::test]
async fn raw_text_mode_stores_the_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/security.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VALID_BODY))
        .mount(&server)
        .await;

    let h = harness(&format!("{}\n[persistence]\nmode = \"raw_text\"\n", POLICY));
    let target = target_for(&server);
    h.worker.handle(&target).await;

    assert_eq!(
        h.store.get(target.domain(), target.port(), "securitytxt").await.as_deref(),
        Some(VALID_BODY)
    );
}

#[tokio::test]
async fn contact_presence_strategy_accepts_minimal_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/security.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Contact: mailto:someone@elsewhere.test\n"))
        .mount(&server)
        .await;

    let h = harness("[validation]\nstrategy = \"contact_presence\"\n");
    let report = h.worker.handle(&target_for(&server)).await;
    assert_eq!(report.verdict, Verdict::Valid);
}

#[tokio::test]
async fn messages_are_decoded_or_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let h = harness(POLICY);
    let addr = server.address();
    let message = format!(r#"{{"protocol":"http","domain":"{}","port":{}}}"#, addr.ip(), addr.port());
    let report = h.worker.handle_message(&message).await.unwrap();
    assert_eq!(report.verdict, Verdict::NotFound);

    assert!(h.worker.handle_message("not json").await.is_none());
    assert!(h.worker.handle_message(r#"{"protocol":"http","domain":"","port":"80"}"#).await.is_none());
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn oversized_well_known_file_falls_through_to_root_path() {
    let server = MockServer::start().await;
    let oversized = format!("{}# {}\n", VALID_BODY, "A".repeat(MAX_BODY_BYTES));
    Mock::given(method("GET"))
        .and(path("/.well-known/security.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(oversized))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/security.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VALID_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = harness(POLICY);
    let target = target_for(&server);
    let report = h.worker.handle(&target).await;

    assert_eq!(report.verdict, Verdict::Valid);
    assert_eq!(report.source.as_deref(), Some(format!("{}/security.txt", target.to_url()).as_str()));
    assert!(drain(&mut h.alerts).is_empty());
}

#[tokio::test]
async fn non_utf8_message_is_dropped_without_stopping_the_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let Harness { worker, store, mut alerts } = harness(POLICY);
    assert!(worker.handle_bytes(b"\xff\xfe").await.is_none());

    let addr = server.address();
    let message = format!(r#"{{"protocol":"http","domain":"{}","port":{}}}"#, addr.ip(), addr.port());
    let mut input = Vec::new();
    input.extend_from_slice(message.as_bytes());
    input.extend_from_slice(b"\n\xff\xfe\n\r\n");
    input.extend_from_slice(message.as_bytes());
    input.extend_from_slice(b"\r\n");

    let dispatched = Arc::new(worker).serve(&input[..]).await;

    assert_eq!(dispatched, 3);
    assert_eq!(store.len().await, 1);
    let findings: Vec<_> = drain(&mut alerts).into_iter().map(|a| a.finding).collect();
    assert_eq!(findings, vec!["notFound".to_string(), "notFound".to_string()]);
}
