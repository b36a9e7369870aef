use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use log::Level;
use polarsteps_gpx::convert::{ConvertOptions, convert_trip};
use polarsteps_gpx::fetch::{FetchConfig, HttpTripFetcher};
use polarsteps_gpx::relay::{Relay, RelayConfig};
use polarsteps_gpx::{API_VERSION_HEADER, ConvertError, FetchFailure};
use reqwest::{Method, Url};
use tokio::net::TcpListener;

const APP_ORIGIN: &str = "https://app.example";

async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    addr
}

/// Stands in for the Polarsteps API and echoes the headers it received.
async fn spawn_upstream() -> SocketAddr {
    async fn trip(Path(id): Path<String>, headers: HeaderMap) -> impl IntoResponse {
        let header_text = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none")
                .to_string()
        };
        let body = serde_json::json!({
            "id": id,
            "api_version": header_text(HeaderName::from_static(API_VERSION_HEADER)),
            "user_agent": header_text(header::USER_AGENT),
            "steps": [{
                "start_time": "2024-05-01T10:00:00Z",
                "location": {"lat": 48.8, "lon": 2.3, "locality": "Paris"},
                "display_name": "Paris Stop",
                "description": "nice"
            }],
            "zelda_steps": []
        });
        (
            [("x-upstream", "stub"), ("access-control-allow-origin", "*")],
            body.to_string(),
        )
    }

    async fn missing() -> impl IntoResponse {
        (StatusCode::NOT_FOUND, "no such trip")
    }

    spawn(
        Router::new()
            .route("/trips/:id", get(trip))
            .route("/missing", get(missing)),
    )
    .await
}

async fn spawn_relay() -> SocketAddr {
    let relay = Relay::new(RelayConfig {
        allowed_origins: vec![APP_ORIGIN.to_string(), "http://localhost:63342".to_string()],
        api_version_header: HeaderName::from_static(API_VERSION_HEADER),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    spawn(relay.router()).await
}

fn relay_url(relay: SocketAddr, target: &str) -> Url {
    let mut url = Url::parse(&format!("http://{relay}/")).unwrap();
    url.query_pairs_mut().append_pair("target", target);
    url
}

#[tokio::test]
async fn test_rejects_unlisted_origin() {
    let upstream = spawn_upstream().await;
    let relay = spawn_relay().await;

    let response = reqwest::Client::new()
        .get(relay_url(relay, &format!("http://{upstream}/trips/1")))
        .header(header::ORIGIN, "https://evil.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.text().await.unwrap(), "CORS error: Unauthorized origin");
}

#[tokio::test]
async fn test_rejects_request_without_origin() {
    let relay = spawn_relay().await;

    let response = reqwest::get(relay_url(relay, "https://api.polarsteps.com/trips/1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_preflight() {
    let relay = spawn_relay().await;

    let response = reqwest::Client::new()
        .request(Method::OPTIONS, format!("http://{relay}/"))
        .header(header::ORIGIN, APP_ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], APP_ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, polarsteps-api-version"
    );
}

#[tokio::test]
async fn test_preflight_from_unlisted_origin() {
    let relay = spawn_relay().await;

    let response = reqwest::Client::new()
        .request(Method::OPTIONS, format!("http://{relay}/"))
        .header(header::ORIGIN, "https://evil.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_target() {
    let relay = spawn_relay().await;

    let response = reqwest::Client::new()
        .get(format!("http://{relay}/"))
        .header(header::ORIGIN, APP_ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Missing target parameter");
}

#[tokio::test]
async fn test_forwards_request() {
    let upstream = spawn_upstream().await;
    let relay = spawn_relay().await;

    let response = reqwest::Client::new()
        .get(relay_url(relay, &format!("http://{upstream}/trips/4242")))
        .header(header::ORIGIN, APP_ORIGIN)
        .header(API_VERSION_HEADER, "62")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], APP_ORIGIN);
    assert_eq!(headers["x-upstream"], "stub");

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["id"], "4242");
    assert_eq!(body["api_version"], "62");
    assert!(body["user_agent"].as_str().unwrap().starts_with("polarsteps-gpx/"));
}

#[tokio::test]
async fn test_proxies_upstream_status() {
    let upstream = spawn_upstream().await;
    let relay = spawn_relay().await;

    let response = reqwest::Client::new()
        .get(relay_url(relay, &format!("http://{upstream}/missing")))
        .header(header::ORIGIN, APP_ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], APP_ORIGIN);
    assert_eq!(response.text().await.unwrap(), "no such trip");
}

#[tokio::test]
async fn test_unreachable_target() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let relay = spawn_relay().await;

    let response = reqwest::Client::new()
        .get(relay_url(relay, &format!("http://{closed}/trips/1")))
        .header(header::ORIGIN, APP_ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "Proxy error");
}

fn fetch_config(upstream: SocketAddr, relay: SocketAddr, origin: Option<&str>) -> FetchConfig {
    FetchConfig {
        relay: Some(Url::parse(&format!("http://{relay}/")).unwrap()),
        origin: origin.map(str::to_string),
        ..FetchConfig::new(Url::parse(&format!("http://{upstream}/")).unwrap())
    }
}

fn quiet(_: Level, _: &str) {}

#[tokio::test]
async fn test_convert_trip_through_relay() {
    let upstream = spawn_upstream().await;
    let relay = spawn_relay().await;
    let fetcher = HttpTripFetcher::new(fetch_config(upstream, relay, Some(APP_ORIGIN))).unwrap();

    let gpx = convert_trip(
        "https://www.polarsteps.com/jane/4242-france?s=secret",
        &fetcher,
        &ConvertOptions::default(),
        &quiet,
    )
    .await
    .unwrap();

    assert!(gpx.contains("<trkpt lat=\"48.8\" lon=\"2.3\">"));
    assert!(gpx.contains("<name>Paris Stop</name>"));
    assert!(gpx.contains("<desc>nice</desc>"));
}

#[tokio::test]
async fn test_convert_trip_rejected_by_relay() {
    let upstream = spawn_upstream().await;
    let relay = spawn_relay().await;
    let fetcher = HttpTripFetcher::new(fetch_config(upstream, relay, None)).unwrap();

    let result = convert_trip(
        "https://www.polarsteps.com/jane/4242-france",
        &fetcher,
        &ConvertOptions::default(),
        &quiet,
    )
    .await;

    assert!(matches!(
        result,
        Err(ConvertError::FetchFailed {
            reason: FetchFailure::Status(status),
            ..
        }) if status == StatusCode::FORBIDDEN
    ));
}
