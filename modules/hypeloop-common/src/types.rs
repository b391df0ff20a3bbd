use serde::{Deserialize, Serialize};

/// A discoverable unit of content the scheduler may act upon.
///
/// `id_hint` is the platform's own identifier when the actuator managed to
/// extract one; `url` is the canonical permalink. Either may be missing for
/// items scraped mid-render, which is why target-id derivation has fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id_hint: Option<String>,
    pub url: Option<String>,
    pub text: String,
    pub is_original: bool,
    #[serde(default)]
    pub like_count: u32,
}
