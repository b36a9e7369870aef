//! Trip identification from a Polarsteps sharing URL.
//!
//! Sharing URLs look like `https://www.polarsteps.com/{account}/{tripId}-{slug}?s={secret}`.
//! The secret is only present for private trips.

use reqwest::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripReference {
    pub id: String,
    pub secret: Option<String>,
}

impl TripReference {
    /// Returns `None` when the input is not a URL or has no `{id}-{slug}` segment
    /// in second position.
    pub fn from_sharing_url(input: &str) -> Option<Self> {
        let url = Url::parse(input.trim()).ok()?;

        let trip_part = url.path_segments()?.filter(|s| !s.is_empty()).nth(1)?;
        let (id, _slug) = trip_part.split_once('-')?;
        if id.is_empty() {
            return None;
        }

        let secret = url
            .query_pairs()
            .find(|(key, _)| key == "s")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        Some(Self {
            id: id.to_string(),
            secret,
        })
    }

    /// `{api_base}/trips/{id}`, plus `?s={secret}` for private trips.
    pub fn api_url(&self, api_base: &Url) -> Url {
        let mut url = api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("trips").push(&self.id);
        }
        if let Some(secret) = &self.secret {
            url.query_pairs_mut().append_pair("s", secret);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_base() -> Url {
        Url::parse(crate::DEFAULT_API_BASE).unwrap()
    }

    #[test]
    fn test_parse_public_trip() {
        let trip =
            TripReference::from_sharing_url("https://www.polarsteps.com/jane/1234567-summer-in-japan")
                .unwrap();
        assert_eq!(trip.id, "1234567");
        assert_eq!(trip.secret, None);
    }

    #[test]
    fn test_parse_private_trip() {
        let trip = TripReference::from_sharing_url(
            "https://www.polarsteps.com/jane/1234567-summer-in-japan?s=abc-123&ref=share",
        )
        .unwrap();
        assert_eq!(trip.id, "1234567");
        assert_eq!(trip.secret.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_parse_ignores_empty_segments() {
        let trip = TripReference::from_sharing_url("https://www.polarsteps.com//jane//42-x/").unwrap();
        assert_eq!(trip.id, "42");
    }

    #[test]
    fn test_parse_id_stops_at_first_dash() {
        let trip = TripReference::from_sharing_url("https://www.polarsteps.com/jane/42-a-b-c").unwrap();
        assert_eq!(trip.id, "42");
    }

    #[test]
    fn test_parse_rejects_short_paths() {
        assert_eq!(TripReference::from_sharing_url("https://www.polarsteps.com/"), None);
        assert_eq!(TripReference::from_sharing_url("https://www.polarsteps.com/42-trip"), None);
    }

    #[test]
    fn test_parse_rejects_segment_without_dash() {
        assert_eq!(TripReference::from_sharing_url("https://www.polarsteps.com/jane/1234567"), None);
        assert_eq!(TripReference::from_sharing_url("https://www.polarsteps.com/jane/-slug"), None);
    }

    #[test]
    fn test_parse_rejects_malformed_urls() {
        assert_eq!(TripReference::from_sharing_url("not a url"), None);
        assert_eq!(TripReference::from_sharing_url(""), None);
        assert_eq!(TripReference::from_sharing_url("mailto:jane-doe@example.com"), None);
    }

    #[test]
    fn test_empty_secret_is_absent() {
        let trip = TripReference::from_sharing_url("https://www.polarsteps.com/jane/42-x?s=").unwrap();
        assert_eq!(trip.secret, None);
    }

    #[test]
    fn test_api_url() {
        let public = TripReference {
            id: "42".into(),
            secret: None,
        };
        assert_eq!(public.api_url(&api_base()).as_str(), "https://api.polarsteps.com/trips/42");

        let private = TripReference {
            id: "42".into(),
            secret: Some("s3cr3t".into()),
        };
        assert_eq!(
            private.api_url(&api_base()).as_str(),
            "https://api.polarsteps.com/trips/42?s=s3cr3t"
        );

        let nested = Url::parse("http://127.0.0.1:9000/api/").unwrap();
        assert_eq!(public.api_url(&nested).as_str(), "http://127.0.0.1:9000/api/trips/42");
    }
}
