use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use acmex::config::{AcmeSettings, CaProviderConfig, Config, DnsSettings, StorageSettings};
use acmex::dns;
use acmex::orchestrator::IssuanceOrchestrator;
use acmex::server;
use acmex::storage::{build_backend, CertificateStore};

fn test_config() -> Config {
    let mut config = Config::default();
    config.acme = AcmeSettings {
        providers: vec![CaProviderConfig {
            name: "test".to_string(),
            // Port 0 is never listening; connection is refused immediately.
            directory_url: "http://127.0.0.1:0/directory".to_string(),
            eab: None,
        }],
        contact: None,
        include_apex_with_wildcard: true,
    };
    config.dns = DnsSettings { zone_map: Default::default(), api_token: Some("test-token".to_string()), propagation_seconds: 0 };
    config.storage = StorageSettings { backend: "memory".to_string(), file: None, redis: None };
    config
}

fn test_orchestrator() -> Arc<IssuanceOrchestrator<Arc<dyn acmex::storage::StorageBackend>>> {
    let config = test_config();
    let backend = build_backend(&config.storage).unwrap();
    let store = CertificateStore::new(backend);
    let dns_provider = dns::build_provider(&config.dns).unwrap();
    Arc::new(IssuanceOrchestrator::new(&config, store, dns_provider).unwrap())
}

#[tokio::test]
async fn healthz_reports_ok_without_touching_any_ca() {
    let app = server::router(test_orchestrator());

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn cert_route_returns_service_unavailable_when_issuance_fails() {
    let app = server::router(test_orchestrator());

    let response = app
        .oneshot(Request::builder().uri("/cert/example.com").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(parsed["error"].is_string());
}

#[tokio::test]
async fn key_route_returns_service_unavailable_when_issuance_fails() {
    let app = server::router(test_orchestrator());

    let response = app
        .oneshot(Request::builder().uri("/key/example.com").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
