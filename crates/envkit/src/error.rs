//! Error types for environment operations.
//!
//! Errors are categorized so callers can tell a benign "not found" or
//! "already exists" answer from the platform apart from real failures,
//! without matching on message text.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for envkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of envkit errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Environment, variable or key does not exist.
    NotFound,
    /// Resource already exists (create should fall back to update).
    AlreadyExists,
    /// Token missing, invalid, or lacking scopes.
    Auth,
    /// Transport failure before an HTTP status was received.
    Network,
    /// Any other non-success status from the API.
    Api,
    /// Invalid user input (repository or environment name).
    Input,
    /// Public key or sealing failure.
    Crypto,
    /// Local file error.
    Io,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this answer means "absent" rather than "broken".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Whether a create call should be retried as an update.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Not found",
            Self::AlreadyExists => "Already exists",
            Self::Auth => "Authentication failed",
            Self::Network => "Network connectivity issue",
            Self::Api => "GitHub API error",
            Self::Input => "Invalid input",
            Self::Crypto => "Encryption failed",
            Self::Io => "File error",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Check the repository and environment names",
            Self::AlreadyExists => "No action needed, the item will be updated instead",
            Self::Auth => {
                "Ensure your token has 'repo' scope and you have admin rights to the repository"
            }
            Self::Network => "Check your internet connection and try again",
            Self::Api => "Check the error details returned by GitHub",
            Self::Input => "Use the owner/repo format and non-empty environment names",
            Self::Crypto => "Re-run to fetch a fresh public key for the environment",
            Self::Io => "Check the file path and permissions",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during environment operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered 404 for a resource.
    #[error("{what} not found")]
    NotFound {
        /// Human description of the missing resource.
        what: String,
    },

    /// The API answered with a non-success status.
    #[error("GitHub API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body, or the status text.
        message: String,
        /// Full JSON error body when one was returned.
        payload: Option<serde_json::Value>,
    },

    /// HTTP request failed without a status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Repository or environment name rejected before any request.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Public key could not be decoded or used.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// Dotenv file could not be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Api { status, .. } => match status {
                404 => ErrorCategory::NotFound,
                409 => ErrorCategory::AlreadyExists,
                401 | 403 => ErrorCategory::Auth,
                _ => ErrorCategory::Api,
            },
            Error::Http(_) => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Api,
            Error::InvalidInput(_) => ErrorCategory::Input,
            Error::InvalidKey(_) => ErrorCategory::Crypto,
            Error::Parse { .. } | Error::Io { .. } => ErrorCategory::Io,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether the platform reported the resource as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category().is_not_found()
    }

    /// Whether the platform reported the resource as already present.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        self.category().is_already_exists()
    }

    /// The JSON error body returned by the API, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Error::Api { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Api {
                status: code,
                message: format!("HTTP {code}"),
                payload: None,
            },
            other => Self::Http(other.to_string()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
