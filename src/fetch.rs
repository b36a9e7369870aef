//! Downloading a trip export from the Polarsteps API.
//!
//! Browsers need the request to go through the CORS relay; the CLI can call
//! the API directly or through the same relay.

use std::future::Future;
use std::time::Duration;

use log::{debug, info};
use reqwest::header::ORIGIN;
use reqwest::{Client, Url};

use crate::trip_url::TripReference;
use crate::{API_VERSION_HEADER, ConvertError, FetchFailure, USER_AGENT};

/// Source of raw trip export bodies.
pub trait TripFetcher {
    fn fetch_trip(
        &self,
        trip: &TripReference,
    ) -> impl Future<Output = Result<Vec<u8>, ConvertError>> + Send;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_base: Url,
    pub api_version: String,
    /// Relay base URL; the API URL is passed as its `target` query parameter.
    pub relay: Option<Url>,
    /// `Origin` sent to the relay, which only serves allow-listed origins.
    pub origin: Option<String>,
    pub timeout: Duration,
}

impl FetchConfig {
    pub fn new(api_base: Url) -> Self {
        Self {
            api_base,
            api_version: crate::DEFAULT_API_VERSION.to_string(),
            relay: None,
            origin: None,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpTripFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpTripFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn request_url(&self, trip: &TripReference) -> Url {
        let target = trip.api_url(&self.config.api_base);
        match &self.config.relay {
            Some(relay) => relay_url(relay, &target),
            None => target,
        }
    }
}

impl TripFetcher for HttpTripFetcher {
    async fn fetch_trip(&self, trip: &TripReference) -> Result<Vec<u8>, ConvertError> {
        let url = self.request_url(trip);
        info!("fetching trip {} from {}", trip.id, url.host_str().unwrap_or_default());

        let failed = |reason| ConvertError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let mut request = self
            .client
            .get(url.clone())
            .header(API_VERSION_HEADER, &self.config.api_version);
        if let Some(origin) = &self.config.origin {
            request = request.header(ORIGIN, origin);
        }

        let response = request
            .send()
            .await
            .map_err(|e| failed(FetchFailure::Transport(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(FetchFailure::Status(status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| failed(FetchFailure::Transport(e)))?;
        debug!("received {} bytes for trip {}", body.len(), trip.id);
        Ok(body.to_vec())
    }
}

/// `{relay}?target={url-encoded target}`
pub fn relay_url(relay: &Url, target: &Url) -> Url {
    let mut url = relay.clone();
    url.query_pairs_mut().append_pair("target", target.as_str());
    url
}
