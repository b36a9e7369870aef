//! CORS relay: forwards one GET to `?target=` for allow-listed browser origins.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use log::{info, warn};
use reqwest::Client;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::USER_AGENT;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub allowed_origins: Vec<String>,
    /// Header copied from the browser request to the upstream request.
    pub api_version_header: HeaderName,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("CORS error: Unauthorized origin")]
    UnauthorizedOrigin,
    #[error("Missing target parameter")]
    MissingTarget,
    #[error("Proxy error")]
    Upstream(#[source] reqwest::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::UnauthorizedOrigin => StatusCode::FORBIDDEN,
            RelayError::MissingTarget => StatusCode::BAD_REQUEST,
            RelayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Upstream(e) => warn!("forwarding failed: {e}"),
            other => warn!("rejected request: {other}"),
        }
        (self.status(), self.to_string()).into_response()
    }
}

#[derive(Clone)]
pub struct Relay {
    config: Arc<RelayConfig>,
    allow_headers: HeaderValue,
    client: Client,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        let allow_headers =
            HeaderValue::from_str(&format!("Content-Type, {}", config.api_version_header))
                .unwrap_or(HeaderValue::from_static("Content-Type"));

        Ok(Self {
            config: Arc::new(config),
            allow_headers,
            client,
        })
    }

    /// Every path and method lands on the same handler, like the hosted worker.
    pub fn router(self) -> Router {
        Router::new().fallback(forward).with_state(self)
    }

    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        info!(
            "relay listening on {} for origins {:?}",
            listener.local_addr()?,
            self.config.allowed_origins
        );
        axum::serve(listener, self.router()).await
    }

    fn allowed_origin(&self, headers: &HeaderMap) -> Option<HeaderValue> {
        let origin = headers.get(header::ORIGIN)?;
        let text = origin.to_str().ok()?;
        self.config
            .allowed_origins
            .iter()
            .any(|allowed| allowed == text)
            .then(|| origin.clone())
    }

    fn cors_headers(&self, origin: HeaderValue) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers
    }
}

async fn forward(
    State(relay): State<Relay>,
    method: Method,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, RelayError> {
    let origin = relay
        .allowed_origin(&headers)
        .ok_or(RelayError::UnauthorizedOrigin)?;

    if method == Method::OPTIONS {
        return Ok((StatusCode::NO_CONTENT, relay.cors_headers(origin)).into_response());
    }

    let target = params
        .get("target")
        .filter(|t| !t.is_empty())
        .ok_or(RelayError::MissingTarget)?;

    let mut request = relay.client.get(target.as_str());
    if let Some(version) = headers.get(&relay.config.api_version_header) {
        request = request.header(relay.config.api_version_header.clone(), version.clone());
    }
    let upstream = request.send().await.map_err(RelayError::Upstream)?;

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    for hop in [header::CONNECTION, header::TRANSFER_ENCODING, header::CONTENT_LENGTH] {
        response_headers.remove(hop);
    }
    response_headers.extend(relay.cors_headers(origin));

    let body = upstream.bytes().await.map_err(RelayError::Upstream)?;
    info!("{method} {target} -> {status} ({} bytes)", body.len());

    Ok((status, response_headers, body).into_response())
}
