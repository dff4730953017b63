//! Error taxonomy for the dashboard pipeline.
//!
//! Every failure is caught at the boundary where it occurs and turned into a
//! user-visible message. None of these errors terminate the process.

use thiserror::Error;

/// The two remote dashboard endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Stats,
    Activity,
}

impl Endpoint {
    /// Request path relative to the service base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Stats => "/dashboard/stats",
            Self::Activity => "/dashboard/user_activity",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Login failures. No token is stored when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,

    #[error("Invalid credentials (server returned {status})")]
    InvalidCredentials { status: u16 },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection error: login request timed out")]
    Timeout,

    #[error("login response did not contain an access token: {0}")]
    MalformedResponse(String),
}

/// A response body that could not be decoded into the expected shape.
///
/// This is the "data unavailable" marker: the presentation layer shows it
/// differently from a snapshot full of zeroes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to parse JSON response: {detail}")]
pub struct DecodeError {
    pub detail: String,
    /// Raw response body, kept for diagnosis.
    pub raw_body: String,
}

impl DecodeError {
    pub fn new(detail: impl Into<String>, raw_body: &str) -> Self {
        Self {
            detail: detail.into(),
            raw_body: raw_body.to_string(),
        }
    }
}

/// Failure of a single dashboard endpoint fetch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Error connecting to {endpoint}: {detail}")]
    Transport { endpoint: Endpoint, detail: String },

    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: Endpoint },

    #[error("{endpoint} returned status code {status}: {body}")]
    Status {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },

    #[error("{endpoint} rejected the access token; please log in again")]
    Unauthorized { endpoint: Endpoint },

    #[error("{endpoint}: {source} (raw response: {})", .source.raw_body)]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: DecodeError,
    },
}

impl FetchError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Timeout { endpoint }
            | Self::Status { endpoint, .. }
            | Self::Unauthorized { endpoint }
            | Self::Decode { endpoint, .. } => *endpoint,
        }
    }

    /// Short machine-readable outcome label, used by the fetch log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "status",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Decode { .. } => "decode",
        }
    }
}

/// Invalid filter input. Raised before any fetch is attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Start date {start} is after end date {end}")]
    StartAfterEnd {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("End date {end} is in the future (today is {today})")]
    EndInFuture {
        end: chrono::NaiveDate,
        today: chrono::NaiveDate,
    },

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("A window of {days} days before {end} falls outside the supported calendar")]
    WindowOutOfRange { end: chrono::NaiveDate, days: u32 },
}

/// Join several failures into one itemized message.
///
/// Returns `None` for an empty list so callers can skip the error banner.
pub fn combine_messages<E: std::fmt::Display>(errors: &[E]) -> Option<String> {
    match errors {
        [] => None,
        [single] => Some(single.to_string()),
        many => Some(
            many.iter()
                .enumerate()
                .map(|(i, e)| format!("{}. {e}", i + 1))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    }
}
