//! Heuristic filter for automated traffic.
//!
//! Mail scanners, chat link unfurlers and spreadsheet previews all fetch
//! tracking URLs without a human reading anything. This classifier drops the
//! obvious ones. It is a heuristic, not a security boundary: misses inflate
//! counters and false positives silently skip tracking, both of which are
//! acceptable.

use std::fmt;

/// User-agent substrings (lower-case) that mark a request as automated.
pub const USER_AGENT_DENYLIST: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "scraper",
    "googlebot",
    "bingbot",
    "slackbot",
    "facebookexternalhit",
    "twitterbot",
    "linkedinbot",
    "whatsapp",
    "telegrambot",
    "headless",
    "phantom",
    "selenium",
    "puppeteer",
    "curl",
    "wget",
    "python-requests",
    "go-http-client",
    "google-sheets",
    "google-docs",
    "preview",
];

/// Referer hosts belonging to the spreadsheet web UI. Viewing a sheet that
/// contains tracking URLs triggers link-preview fetches from these.
pub const PREVIEW_REFERER_HOSTS: &[&str] =
    &["docs.google.com", "sheets.google.com", "drive.google.com"];

/// Shortest user-agent we are willing to believe came from a mail client.
pub const MIN_USER_AGENT_LEN: usize = 10;

/// Why a request was classified as automated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReason {
    /// User-agent missing, empty, or shorter than [`MIN_USER_AGENT_LEN`].
    ShortUserAgent,
    /// User-agent contains a denylisted substring.
    UserAgentPattern(&'static str),
    /// Referer points at the spreadsheet UI.
    PreviewReferer(String),
}

impl BotReason {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ShortUserAgent => "short_user_agent",
            Self::UserAgentPattern(_) => "user_agent_pattern",
            Self::PreviewReferer(_) => "preview_referer",
        }
    }
}

impl fmt::Display for BotReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortUserAgent => f.write_str("empty or short user-agent"),
            Self::UserAgentPattern(p) => write!(f, "user-agent matches '{p}'"),
            Self::PreviewReferer(host) => write!(f, "referer host {host}"),
        }
    }
}

/// Classification result for an inbound hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotVerdict {
    /// Looks like a person opening mail or clicking a link.
    Genuine,
    /// Automated traffic; serve the response but do not record it.
    Bot(BotReason),
}

impl BotVerdict {
    /// Whether the verdict is [`BotVerdict::Bot`].
    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot(_))
    }
}

/// Classify a request from its `User-Agent` and `Referer` headers.
///
/// Rules are applied in order and the first match wins:
/// 1. empty or short user-agent
/// 2. denylisted user-agent substring (case-insensitive)
/// 3. referer host is the spreadsheet UI
pub fn classify(user_agent: Option<&str>, referer: Option<&str>) -> BotVerdict {
    let ua = user_agent.unwrap_or("").trim();
    if ua.chars().count() < MIN_USER_AGENT_LEN {
        return BotVerdict::Bot(BotReason::ShortUserAgent);
    }

    let ua_lower = ua.to_lowercase();
    if let Some(pattern) = USER_AGENT_DENYLIST
        .iter()
        .copied()
        .find(|pattern| ua_lower.contains(pattern))
    {
        return BotVerdict::Bot(BotReason::UserAgentPattern(pattern));
    }

    if let Some(host) = referer.and_then(referer_host)
        && is_preview_host(&host)
    {
        return BotVerdict::Bot(BotReason::PreviewReferer(host));
    }

    BotVerdict::Genuine
}

/// Convenience wrapper over [`classify`].
pub fn is_bot(user_agent: Option<&str>, referer: Option<&str>) -> bool {
    classify(user_agent, referer).is_bot()
}

fn referer_host(referer: &str) -> Option<String> {
    let referer = referer.trim();
    if referer.is_empty() {
        return None;
    }
    match url::Url::parse(referer) {
        Ok(parsed) => parsed.host_str().map(str::to_lowercase),
        // Some clients send a bare host or a scheme-less URL.
        Err(_) => referer
            .split(['/', '?', '#'])
            .next()
            .map(|h| h.split(':').next().unwrap_or(h).to_lowercase()),
    }
}

fn is_preview_host(host: &str) -> bool {
    PREVIEW_REFERER_HOSTS
        .iter()
        .any(|known| host == *known || host.ends_with(&format!(".{known}")))
}
