use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Every failure that ends a conversion attempt. No partial GPX is written.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(
        "the input url is not valid: {0:?}. It must contain the trip id, e.g. \
         https://www.polarsteps.com/{{accountName}}/{{tripId}}-{{trip-name}}?s={{secret}}"
    )]
    InvalidTripUrl(String),

    #[error("cannot download trip data from {url}: {reason}")]
    FetchFailed { url: String, reason: FetchFailure },

    #[error("trip data is not a valid trip export: {0}")]
    MalformedExport(#[from] serde_json::Error),

    #[error("failed to serialize GPX: {0}")]
    Xml(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub enum FetchFailure {
    Status(StatusCode),
    Transport(reqwest::Error),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) if status.is_client_error() => write!(
                f,
                "HTTP {status}. Check that the trip url is valid; a private trip url must carry its 's' secret parameter"
            ),
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FetchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Status(_) => None,
            Self::Transport(e) => Some(e),
        }
    }
}
