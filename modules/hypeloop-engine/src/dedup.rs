//! Target identity and the acted-on set.
//!
//! A target id is derived once per sighting and must be stable across
//! repeated sightings of the same post whenever the platform gives us
//! anything stable to hold on to.

use std::collections::HashSet;

use chrono::Utc;
use sha2::{Digest, Sha256};

use hypeloop_common::Candidate;

/// Opaque identifier for a candidate post.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetId(String);

impl TargetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Derive a target id for a candidate.
///
/// Priority: the platform's own id, then the status id parsed from the
/// permalink, then a truncated content hash. The final timestamp fallback is
/// not deterministic — two sightings of the same id-less, text-less post get
/// different ids and may be acted on twice. Accepted degradation.
pub fn derive_id(candidate: &Candidate) -> TargetId {
    if let Some(id) = candidate.id_hint.as_deref().filter(|s| !s.is_empty()) {
        return TargetId(id.to_string());
    }
    if let Some(id) = candidate.url.as_deref().and_then(status_id_from_url) {
        return TargetId(id);
    }
    let text = candidate.text.trim();
    if !text.is_empty() {
        return TargetId(content_hash(text));
    }
    TargetId(Utc::now().timestamp_millis().to_string())
}

/// Extract the status id from a canonical permalink, dropping any query.
fn status_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/status/")?;
    let id = rest.split(['?', '/']).next().unwrap_or(rest);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Truncated hex SHA-256 of the visible text.
fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

/// The set of targets already acted upon. Grows monotonically within a run.
#[derive(Debug, Default)]
pub struct RepliedLog {
    ids: HashSet<String>,
}

impl RepliedLog {
    pub fn new(ids: HashSet<String>) -> Self {
        Self { ids }
    }

    pub fn has_acted_on(&self, id: &TargetId) -> bool {
        self.ids.contains(id.as_str())
    }

    /// Record an acted-on target. Idempotent — re-recording is a no-op.
    pub fn record_acted_on(&mut self, id: TargetId) {
        self.ids.insert(id.into_string());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: Option<&str>, url: Option<&str>, text: &str) -> Candidate {
        Candidate {
            id_hint: id.map(String::from),
            url: url.map(String::from),
            text: text.to_string(),
            is_original: true,
            like_count: 0,
        }
    }

    #[test]
    fn id_hint_wins() {
        let c = candidate(Some("12345"), Some("https://x.com/a/status/999"), "hello");
        assert_eq!(derive_id(&c).as_str(), "12345");
    }

    #[test]
    fn url_parsed_when_no_hint() {
        let c = candidate(None, Some("https://x.com/a/status/777?s=20"), "hello");
        assert_eq!(derive_id(&c).as_str(), "777");
    }

    #[test]
    fn url_derivation_deterministic() {
        let c = candidate(None, Some("https://x.com/a/status/777"), "hello");
        assert_eq!(derive_id(&c), derive_id(&c));
    }

    #[test]
    fn content_hash_when_no_url() {
        let c = candidate(None, None, "some visible text");
        let id = derive_id(&c);
        assert_eq!(id.as_str().len(), 16);
        assert_eq!(derive_id(&c), id);
    }

    #[test]
    fn different_text_different_hash() {
        let a = derive_id(&candidate(None, None, "alpha"));
        let b = derive_id(&candidate(None, None, "beta"));
        assert_ne!(a, b);
    }

    #[test]
    fn empty_candidate_gets_fallback_id() {
        let c = candidate(None, None, "   ");
        assert!(!derive_id(&c).as_str().is_empty());
    }

    #[test]
    fn record_is_idempotent() {
        let mut log = RepliedLog::default();
        let id = TargetId::from("t1".to_string());
        log.record_acted_on(id.clone());
        log.record_acted_on(id.clone());
        assert!(log.has_acted_on(&id));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn malformed_status_url_falls_through_to_hash() {
        let c = candidate(None, Some("https://x.com/a/status/"), "body text");
        assert_eq!(derive_id(&c).as_str().len(), 16);
    }
}
