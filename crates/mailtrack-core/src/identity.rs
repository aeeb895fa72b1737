//! Recipient identities and the URL-safe tokens that carry them.
//!
//! A token is the lower-cased email address, base64 encoded with the URL-safe
//! alphabet and no padding. It is an obfuscation, not a secret: anyone can
//! encode an address and forge a hit, so tokens never gate access to anything.

use std::fmt;
use std::sync::LazyLock;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Token engine: URL-safe alphabet, unpadded output, lenient about padding
/// and trailing bits on input (tokens are hand-copied into mail merges).
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// A normalized (trimmed, lower-cased) recipient email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Normalize and validate a raw email address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the address is not a plausible email.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if !is_plausible_email(&normalized) {
            return Err(Error::Validation(format!(
                "'{normalized}' is not a plausible email address"
            )));
        }
        Ok(Self(normalized))
    }

    /// Decode a tracking token into a validated identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when the token is not URL-safe base64 of a
    /// UTF-8 string containing `@` and `.`, and [`Error::Validation`] when the
    /// decoded value is still not a plausible address.
    pub fn from_token(token: &str) -> Result<Self> {
        let email = decode_token(token)?;
        Self::parse(&email)
    }

    /// The token that encodes this identity.
    pub fn token(&self) -> String {
        encode(&self.0)
    }

    /// The normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `other` refers to this identity (trimmed, case-insensitive).
    pub fn matches(&self, other: &str) -> bool {
        other.trim().to_lowercase() == self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `email` matches the loose `local@domain.tld` shape.
pub fn is_plausible_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

/// Encode an email address into a URL-safe tracking token.
///
/// The address is lower-cased first so the same recipient always maps to the
/// same token regardless of how the send list capitalised it.
pub fn encode(email: &str) -> String {
    TOKEN_ENGINE.encode(email.to_lowercase())
}

/// Decode a tracking token back to an email address.
///
/// Returns `None` for anything malformed; callers serving pixels and
/// redirects treat that as "do not track" rather than as a failure.
pub fn decode(token: &str) -> Option<String> {
    decode_token(token).ok()
}

fn decode_token(token: &str) -> Result<String> {
    if token.is_empty() {
        return Err(Error::Decode("empty token".to_string()));
    }

    if let Some(bad) = token
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(Error::Decode(format!(
            "character {bad:?} is outside the URL-safe alphabet"
        )));
    }

    // Restore padding so the length is a multiple of four.
    let mut padded = String::with_capacity(token.len() + 3);
    padded.push_str(token);
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    let bytes = TOKEN_ENGINE
        .decode(padded.as_bytes())
        .map_err(|e| Error::Decode(e.to_string()))?;

    let decoded =
        String::from_utf8(bytes).map_err(|_| Error::Decode("token is not UTF-8".to_string()))?;

    if !decoded.contains('@') || !decoded.contains('.') {
        return Err(Error::Decode(
            "decoded value does not look like an email".to_string(),
        ));
    }

    Ok(decoded)
}

/// Pixel and click URLs for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingUrls {
    /// The recipient's token.
    pub token: String,
    /// `{base}/p/{token}.gif`
    pub pixel: String,
    /// `{base}/c/{token}/{link_id}`
    pub click: String,
}

impl TrackingUrls {
    /// Build tracking URLs for `email` under `base_url`.
    pub fn new(base_url: &str, email: &str, link_id: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let token = encode(email.trim());
        Self {
            pixel: format!("{base}/p/{token}.gif"),
            click: format!("{base}/c/{token}/{link_id}"),
            token,
        }
    }
}
