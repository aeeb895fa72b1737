//! Static link id to target URL table for click redirects.

use std::collections::BTreeMap;

use mailtrack_core::DEFAULT_LINK_ID;

/// Link id for the opt-out mailto target.
pub const UNSUBSCRIBE_LINK_ID: &str = "unsubscribe";

const BUILTIN_TARGETS: &[(&str, &str)] = &[
    ("soi_form", "https://soi.rubberarmstrong.com"),
    (
        UNSUBSCRIBE_LINK_ID,
        "mailto:rubberarmstrongcamp@gmail.com?subject=Unsubscribe",
    ),
    ("main_site", "https://rubberarmstrong.com"),
    (DEFAULT_LINK_ID, "https://rubberarmstrong.com"),
];

/// Maps symbolic link ids to absolute URLs.
///
/// The `default` entry is always present and is the fallback for unknown ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTable {
    targets: BTreeMap<String, String>,
}

impl Default for RedirectTable {
    fn default() -> Self {
        Self {
            targets: BUILTIN_TARGETS
                .iter()
                .map(|(id, url)| (id.to_string(), url.to_string()))
                .collect(),
        }
    }
}

impl RedirectTable {
    /// Merge `id=url` pairs (comma separated) over this table.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry has no `=`, an empty id, or a target that
    /// is not an absolute URL.
    pub fn with_overrides(mut self, entries: &str) -> anyhow::Result<Self> {
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, target) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("redirect entry {entry:?} must look like id=url"))?;
            let (id, target) = (id.trim(), target.trim());
            if id.is_empty() {
                anyhow::bail!("redirect entry {entry:?} has an empty link id");
            }
            reqwest::Url::parse(target)
                .map_err(|e| anyhow::anyhow!("redirect target for {id:?} is not a URL: {e}"))?;
            self.targets.insert(id.to_string(), target.to_string());
        }
        Ok(self)
    }

    /// Resolve a link id, falling back to the default target.
    pub fn resolve(&self, link_id: &str) -> &str {
        self.targets
            .get(link_id)
            .or_else(|| self.targets.get(DEFAULT_LINK_ID))
            .map(String::as_str)
            .unwrap_or(BUILTIN_TARGETS[BUILTIN_TARGETS.len() - 1].1)
    }

    /// Whether `link_id` has its own entry.
    #[cfg(test)]
    pub fn contains(&self, link_id: &str) -> bool {
        self.targets.contains_key(link_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.targets.len()
    }
}
