//! Error types for relnotes

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Transient network failure kinds that are worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorCode {
    /// Peer reset or aborted the connection
    ConnectionReset,
    /// Request or connect timed out
    Timeout,
    /// Host name could not be resolved
    DnsFailure,
    /// Nothing listening on the remote end
    ConnectionRefused,
}

impl std::fmt::Display for NetworkErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionReset => write!(f, "connection reset"),
            Self::Timeout => write!(f, "timed out"),
            Self::DnsFailure => write!(f, "dns lookup failed"),
            Self::ConnectionRefused => write!(f, "connection refused"),
        }
    }
}

/// Which server-side throttle was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKind {
    /// Hourly request quota exhausted
    Primary,
    /// Abuse-detection limit
    Secondary,
}

impl RateLimitKind {
    /// How many times a call may wait out this limit before giving up
    pub const fn max_retries(self) -> u32 {
        match self {
            Self::Primary => 3,
            Self::Secondary => 2,
        }
    }
}

impl std::fmt::Display for RateLimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// Errors that can occur while building release notes
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub API failure that carries no status or network classification
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Non-success HTTP response
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Transport-level failure
    #[error("network error ({code}): {message}")]
    Network {
        /// Classified failure kind
        code: NetworkErrorCode,
        /// Underlying error text
        message: String,
    },

    /// Server asked us to slow down
    #[error("{kind} rate limit hit, retry after {retry_after:?}")]
    RateLimited {
        /// Primary or secondary limit
        kind: RateLimitKind,
        /// Server-advertised wait
        retry_after: Duration,
    },

    /// Rate limit persisted through every allowed wait
    #[error("{kind} rate limit retries exhausted after {attempts} attempts")]
    RateLimitExhausted {
        /// Primary or secondary limit
        kind: RateLimitKind,
        /// Total attempts made
        attempts: u32,
    },

    /// Retryable failure persisted through every backoff attempt
    #[error("[{context}] all {retries} retry attempts failed: {source}")]
    RetriesExhausted {
        /// Which operation failed
        context: String,
        /// Retries made after the first attempt
        retries: u32,
        /// Last failure observed
        #[source]
        source: Box<Error>,
    },

    /// Non-retryable failure, tagged with the operation that hit it
    #[error("[{context}] {source}")]
    Operation {
        /// Which operation failed
        context: String,
        /// What went wrong
        #[source]
        source: Box<Error>,
    },

    /// Queued work abandoned after another call failed
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Cache store read/write or decode failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Repository identifier could not be parsed
    #[error("Invalid repository: {0}")]
    InvalidRepo(String),

    /// Missing or malformed configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Invariant violation or task failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the backoff policy should try this call again.
    ///
    /// Only known transient network failures and 408, 429 or 5xx responses
    /// qualify. Rate-limit signals are handled by the rate limiter instead.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Http { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            _ => false,
        }
    }

    /// The error with any operation tag removed
    pub fn untagged(&self) -> &Self {
        match self {
            Self::Operation { source, .. } => source.untagged(),
            other => other,
        }
    }

    /// Rate-limit signal carried by this error, if any
    pub const fn rate_limit(&self) -> Option<(RateLimitKind, Duration)> {
        match self {
            Self::RateLimited { kind, retry_after } => Some((*kind, *retry_after)),
            _ => None,
        }
    }
}

/// Default wait when GitHub reports a rate limit without saying how long.
pub(crate) const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Walk an error's source chain looking for a transient transport failure.
pub(crate) fn network_code(err: &(dyn std::error::Error + 'static)) -> Option<NetworkErrorCode> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
                    return Some(NetworkErrorCode::ConnectionReset);
                }
                std::io::ErrorKind::TimedOut => return Some(NetworkErrorCode::Timeout),
                std::io::ErrorKind::ConnectionRefused => {
                    return Some(NetworkErrorCode::ConnectionRefused);
                }
                _ => {}
            }
        }
        let msg = e.to_string().to_lowercase();
        if msg.contains("dns error") || msg.contains("failed to lookup address") {
            return Some(NetworkErrorCode::DnsFailure);
        }
        current = e.source();
    }
    None
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_timeout() {
            Some(NetworkErrorCode::Timeout)
        } else {
            network_code(&e)
        };
        if let Some(code) = code {
            return Self::Network {
                code,
                message: e.to_string(),
            };
        }
        if let Some(status) = e.status() {
            return Self::Http {
                status: status.as_u16(),
                message: e.to_string(),
            };
        }
        Self::GitHubApi(e.to_string())
    }
}

impl From<octocrab::Error> for Error {
    fn from(e: octocrab::Error) -> Self {
        if let octocrab::Error::GitHub { source, .. } = &e {
            let status = source.status_code.as_u16();
            let lower = source.message.to_lowercase();
            if matches!(status, 403 | 429) && lower.contains("rate limit") {
                let kind = if lower.contains("secondary") {
                    RateLimitKind::Secondary
                } else {
                    RateLimitKind::Primary
                };
                return Self::RateLimited {
                    kind,
                    retry_after: DEFAULT_RATE_LIMIT_WAIT,
                };
            }
            return Self::Http {
                status,
                message: source.message.clone(),
            };
        }
        network_code(&e).map_or_else(
            || Self::GitHubApi(e.to_string()),
            |code| Self::Network {
                code,
                message: e.to_string(),
            },
        )
    }
}
