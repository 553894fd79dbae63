//! Error handling for the GROZY console
//!
//! Every backend call is recoverable: failures are caught at the async
//! boundary and turned into user-facing text via [`ClientError::diagnostic`].
//! Nothing in here is meant to reach a global error surface.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for backend calls
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors produced while talking to the assistant backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response (connection refused, DNS, reset)
    #[error("Transport error calling {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// The backend answered with a non-2xx status
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The body could not be decoded or lacked a required field
    #[error("Malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },

    #[error("Invalid backend URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Setup(String),
}

impl ClientError {
    pub fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Malformed {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status code, for protocol errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Actionable text shown to the user: what failed and how to fix it.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Transport { endpoint, .. } => format!(
                "Could not reach the assistant backend ({endpoint}). \
                 Check that the server is running and reachable, then try again."
            ),
            Self::Status {
                endpoint, status, ..
            } => format!(
                "The assistant backend answered {endpoint} with HTTP {status}. \
                 Try again in a moment; if it keeps failing, check the server logs."
            ),
            Self::Malformed { endpoint, .. } => format!(
                "The assistant backend sent an unexpected reply from {endpoint}. \
                 Make sure the server version matches this client."
            ),
            Self::InvalidUrl { url, .. } => format!(
                "The backend URL '{url}' is not valid. Set GROZY_API_URL to something like http://localhost:5000."
            ),
            Self::Setup(_) => {
                "The HTTP client could not be initialised. Check the TLS and proxy settings."
                    .to_string()
            }
        }
    }
}

/// Errors from the report viewer's copy/download actions
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("No report is displayed yet")]
    NothingDisplayed,

    #[error("Failed to write report to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
