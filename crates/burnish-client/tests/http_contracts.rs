use std::time::Duration;

use burnish_client::{HttpPolishClient, PolishBackend, API_KEY_HEADER};
use burnish_config::HttpTunables;
use burnish_protocol::error::JobError;
use burnish_protocol::records::ConnectionSettings;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> HttpPolishClient {
    HttpPolishClient::new(HttpTunables::default()).expect("build client")
}

fn short_timeout_client() -> HttpPolishClient {
    HttpPolishClient::new(HttpTunables {
        request_timeout: Duration::from_millis(100),
        health_timeout: Duration::from_millis(100),
    })
    .expect("build client")
}

fn settings(server: &MockServer, api_key: &str) -> ConnectionSettings {
    ConnectionSettings {
        // trailing slash exercises endpoint normalization
        endpoint_url: format!("{}/", server.uri()),
        api_key: api_key.to_owned(),
    }
}

#[tokio::test]
async fn polish_posts_body_and_api_key_and_parses_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/polish"))
        .and(header(API_KEY_HEADER, "secret-key"))
        .and(body_json(serde_json::json!({
            "text": "fix this sentance",
            "model_id": "m1",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "polished": "Fix this sentence.",
            "model": "m1",
            "elapsed_ms": 1200,
        })))
        .mount(&server)
        .await;

    let outcome = client()
        .polish(
            &settings(&server, "secret-key"),
            "fix this sentance",
            "m1",
            &CancellationToken::new(),
        )
        .await
        .expect("polish should succeed");

    assert_eq!(outcome.polished, "Fix this sentence.");
    assert_eq!(outcome.model, "m1");
    assert_eq!(outcome.elapsed_ms, 1200);
}

#[tokio::test]
async fn polish_omits_api_key_header_when_unconfigured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/polish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "polished": "Done.",
            "model": "m1",
            "elapsed_ms": 5,
        })))
        .mount(&server)
        .await;

    client()
        .polish(&settings(&server, ""), "text", "m1", &CancellationToken::new())
        .await
        .expect("polish should succeed");

    let requests = server
        .received_requests()
        .await
        .expect("recorded requests");
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key(API_KEY_HEADER));
}

#[tokio::test]
async fn polish_surfaces_error_envelope_on_non_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/polish"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "unknown model: m9"})),
        )
        .mount(&server)
        .await;

    let error = client()
        .polish(&settings(&server, ""), "text", "m9", &CancellationToken::new())
        .await
        .expect_err("polish should fail");

    match error {
        JobError::Transport(detail) => assert_eq!(detail, "unknown model: m9"),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn polish_reports_bare_status_when_error_body_is_unusable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/polish"))
        .respond_with(ResponseTemplate::new(503).set_body_string("gateway fell over"))
        .mount(&server)
        .await;

    let error = client()
        .polish(&settings(&server, ""), "text", "m1", &CancellationToken::new())
        .await
        .expect_err("polish should fail");

    match error {
        JobError::Transport(detail) => {
            assert_eq!(detail, "request failed with status 503");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn polish_treats_malformed_success_body_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/polish"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let error = client()
        .polish(&settings(&server, ""), "text", "m1", &CancellationToken::new())
        .await
        .expect_err("polish should fail");

    match error {
        JobError::Transport(detail) => assert!(detail.contains("malformed JSON")),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn polish_enforces_the_hard_client_side_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/polish"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(serde_json::json!({
                    "polished": "too late",
                    "model": "m1",
                    "elapsed_ms": 500,
                })),
        )
        .mount(&server)
        .await;

    let error = short_timeout_client()
        .polish(&settings(&server, ""), "text", "m1", &CancellationToken::new())
        .await
        .expect_err("polish should time out");

    match error {
        JobError::Transport(detail) => assert!(detail.contains("timed out")),
        other => panic!("expected transport timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn polish_honors_cancellation_mid_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/polish"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(serde_json::json!({
                    "polished": "unused",
                    "model": "m1",
                    "elapsed_ms": 5000,
                })),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let aborter = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        aborter.cancel();
    });

    let error = client()
        .polish(&settings(&server, ""), "text", "m1", &cancel)
        .await
        .expect_err("polish should be cancelled");

    assert_eq!(error, JobError::Cancelled);
}

#[tokio::test]
async fn health_parses_status_and_adapter_availability() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "adapters": {
                "m1": {"available": true},
                "claude": {"available": false, "reason": "no API key"},
            },
        })))
        .mount(&server)
        .await;

    let report = client()
        .health(&settings(&server, ""))
        .await
        .expect("health should succeed");

    assert_eq!(report.status, "ok");
    assert!(report.version.is_none());
    assert!(report.adapters["m1"].available);
    assert_eq!(
        report.adapters["claude"].reason.as_deref(),
        Some("no API key")
    );
}

#[tokio::test]
async fn models_returns_the_advertised_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "m1", "name": "Mistral 7B", "provider": "ollama"},
            {"id": "claude-haiku", "name": "Claude Haiku", "provider": "claude"},
        ])))
        .mount(&server)
        .await;

    let models = client()
        .models(&settings(&server, ""))
        .await
        .expect("models should succeed");

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "m1");
    assert_eq!(models[1].provider, "claude");
}
