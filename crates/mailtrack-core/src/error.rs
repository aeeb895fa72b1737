//! Error types shared by the tracking service.
//!
//! The variants mirror the failure modes the edge cares about when deciding
//! whether to retry a reconciliation: decode and validation problems are
//! silent no-ops, while auth, transport and timeout failures are retried.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding, authorizing or writing tracking data.
#[derive(Error, Debug)]
pub enum Error {
    /// The identity token in a tracking URL could not be decoded.
    #[error("malformed identity token: {0}")]
    Decode(String),

    /// The decoded identity (or a path segment) is not usable.
    #[error("invalid identity: {0}")]
    Validation(String),

    /// The service credential could not be parsed or used for signing.
    #[error("credential error: {0}")]
    Credential(String),

    /// Token exchange failed, or the row-store rejected our bearer token.
    #[error("auth error (status {}): {body}", status_label(.status))]
    Auth {
        /// HTTP status, if a response was received at all.
        status: Option<u16>,
        /// Response body or transport error message.
        body: String,
    },

    /// Network failure or non-success response from the row-store.
    #[error("transport error (status {}): {message}", status_label(.status))]
    Transport {
        /// HTTP status, if a response was received at all.
        status: Option<u16>,
        /// Response body or transport error message.
        message: String,
    },

    /// A client-enforced deadline elapsed before the call completed.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl Error {
    /// Build a transport error from a response status and body.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Build an auth error from a response status and body.
    pub fn auth(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Auth {
            status,
            body: body.into(),
        }
    }

    /// Whether repeating the same operation could plausibly succeed.
    ///
    /// Signing and parsing failures are deterministic, so only the network
    /// facing variants qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. } | Self::Transport { .. } | Self::Timeout(_)
        )
    }

    /// Stable short label, used as a metrics label and log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Validation(_) => "validation",
            Self::Credential(_) => "credential",
            Self::Auth { .. } => "auth",
            Self::Transport { .. } => "transport",
            Self::Timeout(_) => "timeout",
            Self::Json(_) => "json",
        }
    }
}
