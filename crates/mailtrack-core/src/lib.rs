//! Core types and pure logic for email engagement tracking.
//!
//! This crate provides:
//! - Identity tokens: reversible URL-safe encoding of recipient addresses
//! - Tracking URL builders for mail merges
//! - Bot classification for inbound pixel/click hits
//! - The open/click event model
//! - A retry policy with exponential backoff
//! - Prometheus metrics helpers
//! - Shared error types

pub mod bot;
mod error;
mod event;
pub mod identity;
pub mod metrics;
pub mod retry;

/// Link id that always resolves to the fallback redirect target.
pub const DEFAULT_LINK_ID: &str = "default";

pub use bot::{classify, is_bot, BotReason, BotVerdict};
pub use error::{Error, Result};
pub use event::{format_timestamp, EventKind, EventMetadata, TrackingEvent};
pub use identity::{decode, encode, is_plausible_email, Identity, TrackingUrls};
pub use retry::{RetryError, RetryPolicy};
