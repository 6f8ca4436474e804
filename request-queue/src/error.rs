use miette::Diagnostic;
use thiserror::Error;

/// A `Result` typedef to use with the [`QueueError`] type.
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// The error kinds a [`crate::Network`] implementation may report for a failed
/// [`crate::Network::perform_request`] call, per the retry/error taxonomy.
///
/// These are kinds, not a full type hierarchy: a concrete `Network` implementation
/// classifies whatever its transport gives it (connect failures, status codes, ...)
/// into one of these before handing it to [`QueueError::Network`] variants below.
#[derive(Error, Diagnostic, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request timed out waiting for a response.
    #[error("request timed out")]
    Timeout,
    /// A connection to the remote host could not be established.
    #[error("no connection could be established")]
    NoConnection,
    /// The server requires (or rejected) credentials.
    #[error("authentication required or rejected")]
    Auth,
    /// The server returned a 5xx status or otherwise malformed response.
    #[error("server error")]
    Server,
    /// A generic transport-level failure not covered by the other kinds.
    #[error("network error")]
    Network,
}

/// The unified error type for this crate.
#[derive(Error, Diagnostic, Debug)]
pub enum QueueError {
    /// A network round-trip failed in a way classified by [`ErrorKind`].
    #[error("{kind}: {message}")]
    #[diagnostic(code(request_queue::network))]
    Network {
        /// The taxonomy kind this failure falls under.
        kind: ErrorKind,
        /// A human-readable description of what happened.
        message: String,
    },
    /// `Request::parse_network_response` could not convert the response body into `T`.
    #[error("failed to parse response body: {0}")]
    #[diagnostic(code(request_queue::parse))]
    Parse(String),
    /// The cache backend failed to read, write, or evict an entry.
    #[error(transparent)]
    #[diagnostic(code(request_queue::cache))]
    Cache(#[from] anyhow::Error),
    /// Error from cacache, the default disk-backed cache manager.
    #[cfg(feature = "manager-cacache")]
    #[error(transparent)]
    #[diagnostic(code(request_queue::cacache))]
    CaCache(#[from] cacache::Error),
    /// Error from serde_json while (de)serializing a cached entry's metadata.
    #[error(transparent)]
    #[diagnostic(code(request_queue::serde))]
    Serde(#[from] serde_json::Error),
    /// A general catch-all for errors that don't fit the above, preserved via `anyhow`.
    #[error(transparent)]
    #[diagnostic(code(request_queue::general))]
    General(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl QueueError {
    /// Shorthand for constructing a [`QueueError::Network`] of kind [`ErrorKind::Timeout`].
    pub fn timeout(message: impl Into<String>) -> Self {
        QueueError::Network { kind: ErrorKind::Timeout, message: message.into() }
    }

    /// Shorthand for constructing a [`QueueError::Network`] of kind [`ErrorKind::NoConnection`].
    pub fn no_connection(message: impl Into<String>) -> Self {
        QueueError::Network {
            kind: ErrorKind::NoConnection,
            message: message.into(),
        }
    }

    /// Shorthand for constructing a [`QueueError::Network`] of kind [`ErrorKind::Auth`].
    pub fn auth(message: impl Into<String>) -> Self {
        QueueError::Network { kind: ErrorKind::Auth, message: message.into() }
    }

    /// Shorthand for constructing a [`QueueError::Network`] of kind [`ErrorKind::Server`].
    pub fn server(message: impl Into<String>) -> Self {
        QueueError::Network { kind: ErrorKind::Server, message: message.into() }
    }

    /// Shorthand for constructing a [`QueueError::Network`] of kind [`ErrorKind::Network`].
    pub fn network(message: impl Into<String>) -> Self {
        QueueError::Network { kind: ErrorKind::Network, message: message.into() }
    }

    /// The taxonomy kind for this error, if it is a [`QueueError::Network`] variant.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            QueueError::Network { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
