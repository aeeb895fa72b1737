//! Open and click events.
//!
//! Events are never stored on their own. The reconciler folds each one into
//! the recipient's engagement row and then discards it.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Kind of engagement observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The tracking pixel was fetched.
    Open,
    /// A tracked link was followed.
    Click,
}

impl EventKind {
    /// Lower-case name, used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request details captured alongside an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Link identifier for clicks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    /// Raw `User-Agent` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Raw `Referer` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

/// A single open or click for a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Who the event belongs to.
    pub identity: Identity,
    /// What happened.
    pub kind: EventKind,
    /// When the request arrived. Used as the "first seen" timestamp.
    pub occurred_at: DateTime<Utc>,
    /// Optional request details.
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl TrackingEvent {
    /// Create an event stamped with the current time.
    pub fn new(identity: Identity, kind: EventKind, metadata: EventMetadata) -> Self {
        Self::at(identity, kind, metadata, Utc::now())
    }

    /// Create an event with an explicit timestamp.
    pub fn at(
        identity: Identity,
        kind: EventKind,
        metadata: EventMetadata,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            kind,
            occurred_at,
            metadata,
        }
    }

    /// Timestamp as written to the sheet, e.g. `2026-01-05T09:30:00.000Z`.
    pub fn timestamp(&self) -> String {
        format_timestamp(self.occurred_at)
    }
}

/// Format a timestamp the way the sheet expects (RFC 3339, millis, `Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
