//! Error types for pr-phase-monitor

use thiserror::Error;

/// Errors produced while monitoring pull requests
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is invalid (fatal at startup, ignored on hot reload)
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication or permission failure against the hosting service
    #[error("authentication failed: {0}")]
    Auth(String),

    /// GitHub API returned an error
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Generic collaborator failure (fetch or action)
    #[error("platform error: {0}")]
    Platform(String),

    /// Notification delivery failed
    #[error("notification error: {0}")]
    Notification(String),

    /// A pull request or issue URL could not be understood
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Too many polling cycles failed in a row
    #[error("{failures} consecutive cycles failed, last error: {last}")]
    RetryLimit {
        /// Number of failed cycles
        failures: u32,
        /// Message of the last failure
        last: String,
    },
}

impl Error {
    /// Whether this error means no useful work can proceed.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::Config(_) | Self::RetryLimit { .. }
        )
    }
}

/// Map a GitHub error response to an [`Error`]
///
/// 401 is always an auth failure. 403 is too, unless it is a (primary or
/// secondary) rate limit, which clears up on its own.
pub fn from_github_status(status: u16, message: &str) -> Error {
    let rate_limited = message.to_ascii_lowercase().contains("rate limit");
    match status {
        401 => Error::Auth(message.to_string()),
        403 if !rate_limited => Error::Auth(message.to_string()),
        _ => Error::GitHubApi(format!("{status}: {message}")),
    }
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        if let octocrab::Error::GitHub { source, .. } = &err {
            return from_github_status(source.status_code.as_u16(), &source.message);
        }
        Self::GitHubApi(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
