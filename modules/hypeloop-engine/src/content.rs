//! Outgoing content: reply templates and generated original posts.

use std::sync::Arc;

use rand::prelude::IndexedRandom;
use tracing::debug;

use hypeloop_common::GenerationError;

use crate::traits::Generator;

/// Strip characters outside the Basic Multilingual Plane. The platform's
/// composer silently drops some astral-plane glyphs, which desynchronises
/// the typed text from the intended text.
pub fn strip_non_bmp(text: &str) -> String {
    text.chars().filter(|c| (*c as u32) <= 0xFFFF).collect()
}

// ---------------------------------------------------------------------------
// Reply selection
// ---------------------------------------------------------------------------

/// Strategy seam for choosing a reply. The default is uniform choice from a
/// fixed pool; swapping in weighted selection doesn't touch the dispatcher.
pub trait ReplySelector: Send + Sync {
    fn select(&self) -> String;
}

/// Uniformly samples one entry from a pre-approved template pool.
pub struct UniformTemplates {
    templates: Vec<String>,
}

impl UniformTemplates {
    pub fn new(templates: Vec<String>) -> Self {
        assert!(!templates.is_empty(), "template pool must not be empty");
        Self { templates }
    }

    /// The stock pool, parameterised on the promoted account name.
    pub fn stock(account: &str) -> Self {
        let templates = [
            format!("Absolutely loving what {account} is building!"),
            format!("This is so inspiring! Go {account}!"),
            format!("Wow, {account} just keeps getting better. Proud to be part of this!"),
            format!("{account} is absolutely crushing it!"),
            format!("This is exactly what we need! {account} for the win!"),
            format!("{account} is the future and I'm here for it!"),
            format!("This community is everything! Go {account}!"),
            format!("{account} is building something truly special!"),
            format!("So excited to be part of the {account} journey!"),
            format!("Incredible work from the {account} team!"),
            format!("This is what innovation looks like! {account} is leading!"),
            format!("So much love for the {account} community!"),
        ]
        .into_iter()
        .collect();
        Self::new(templates)
    }
}

impl ReplySelector for UniformTemplates {
    fn select(&self) -> String {
        let chosen = self
            .templates
            .choose(&mut rand::rng())
            .expect("template pool is non-empty");
        strip_non_bmp(chosen)
    }
}

// ---------------------------------------------------------------------------
// Original-post composition
// ---------------------------------------------------------------------------

/// Builds prompts, invokes the generation capability, and enforces the
/// mention policy on the result.
pub struct PostComposer {
    generator: Arc<dyn Generator>,
    account: String,
}

impl PostComposer {
    pub fn new(generator: Arc<dyn Generator>, account: &str) -> Self {
        Self {
            generator,
            account: account.to_string(),
        }
    }

    fn prompt(&self) -> String {
        format!(
            "Generate a short, engaging post about {account}, mentioning @{account} \
             somewhere (but NOT at the start). Keep it under 140 characters. Make it \
             sound positive and excited. Do NOT start the post with @{account}.",
            account = self.account
        )
    }

    /// Generate and normalize one original post.
    pub async fn compose(&self) -> Result<String, GenerationError> {
        let raw = self.generator.generate(&self.prompt()).await?;
        let text = strip_non_bmp(place_mention(raw.trim(), &self.account).trim());
        debug!(text = text.as_str(), "Composed post");
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text)
    }
}

/// Enforce the mention policy: `@account` appears exactly once and is never
/// the first token. A leading mention is relocated to the end, a missing one
/// appended, duplicates collapsed. Text that already satisfies the policy is
/// returned unchanged.
pub fn place_mention(text: &str, account: &str) -> String {
    let mention = format!("@{account}");
    let occurrences = mention_spans(text, &mention);

    if occurrences.len() == 1 && occurrences[0].0 != 0 {
        return text.to_string();
    }

    // Strip every occurrence, collapse the whitespace left behind, then
    // append a single mention at the end.
    let mut stripped = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(start, end) in &occurrences {
        stripped.push_str(&text[cursor..start]);
        cursor = end;
    }
    stripped.push_str(&text[cursor..]);
    let cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.is_empty() {
        mention
    } else {
        format!("{cleaned} {mention}")
    }
}

/// Byte spans of whole-token, ASCII-case-insensitive occurrences of the
/// mention. Handles are ASCII, so byte-wise comparison is sound.
fn mention_spans(text: &str, mention: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let needle = mention.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i + needle.len() <= bytes.len() {
        let window = &bytes[i..i + needle.len()];
        if window.eq_ignore_ascii_case(needle) {
            let end = i + needle.len();
            let boundary = bytes
                .get(end)
                .is_none_or(|b| !(b.is_ascii_alphanumeric() || *b == b'_'));
            if boundary {
                spans.push((i, end));
                i = end;
                continue;
            }
        }
        i += 1;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_mention_relocated_to_end() {
        assert_eq!(place_mention("@anoma are great", "anoma"), "are great @anoma");
    }

    #[test]
    fn missing_mention_appended() {
        assert_eq!(
            place_mention("the future is intent-centric", "anoma"),
            "the future is intent-centric @anoma"
        );
    }

    #[test]
    fn compliant_text_unchanged() {
        let text = "big week for @anoma shipping";
        assert_eq!(place_mention(text, "anoma"), text);
    }

    #[test]
    fn duplicate_mentions_collapsed() {
        assert_eq!(
            place_mention("@anoma loves @anoma a lot", "anoma"),
            "loves a lot @anoma"
        );
    }

    #[test]
    fn mention_matching_is_case_insensitive() {
        assert_eq!(place_mention("@Anoma are great", "anoma"), "are great @anoma");
    }

    #[test]
    fn longer_handle_not_mistaken_for_mention() {
        let text = "ship it @anomalous style";
        assert_eq!(place_mention(text, "anoma"), format!("{text} @anoma"));
    }

    #[test]
    fn mention_only_text_stays_a_single_mention() {
        assert_eq!(place_mention("@anoma", "anoma"), "@anoma");
    }

    #[test]
    fn strip_non_bmp_removes_astral_glyphs() {
        assert_eq!(strip_non_bmp("go team \u{1F680} go"), "go team  go");
        assert_eq!(strip_non_bmp("plain ascii"), "plain ascii");
    }

    #[test]
    fn strip_non_bmp_keeps_bmp_unicode() {
        assert_eq!(strip_non_bmp("caf\u{00e9} \u{2764}"), "caf\u{00e9} \u{2764}");
    }

    #[test]
    fn uniform_templates_selects_from_pool() {
        let pool = UniformTemplates::new(vec!["only one".to_string()]);
        assert_eq!(pool.select(), "only one");
    }
}
