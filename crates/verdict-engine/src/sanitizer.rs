//! Text sanitization.
//!
//! Produces a cleaned variant of flagged text: control characters stripped,
//! tag-injection spans neutralized in place, and the result truncated to a
//! configured bound.  Truncation runs last and is followed by a registry
//! re-scan so a cut can never reintroduce a trigger unnoticed.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use evasion_scanner::{Match, RuleCategory, RuleSet};

/// Replacement for neutralized tag-injection spans.
const FILTERED: &str = "[filtered]";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    /// Truncation kept exposing fresh matches until the output fell below
    /// the minimum-length floor.  Callers should fall back to blocking.
    #[error("sanitized output still triggers detection above the {floor}-character minimum")]
    Exhausted { floor: usize },
}

// ---------------------------------------------------------------------------
// Sanitizer
// ---------------------------------------------------------------------------

/// Cleans flagged text.  Stateless after construction; all length bounds
/// are counted in characters, not bytes.
#[derive(Debug)]
pub struct Sanitizer {
    rules: Arc<RuleSet>,
    /// Maximum output length in characters; truncation target.
    max_length: usize,
    /// Floor below which further truncation gives up.
    min_length: usize,
}

impl Sanitizer {
    pub fn new(rules: Arc<RuleSet>, max_length: usize, min_length: usize) -> Self {
        Self {
            rules,
            max_length,
            min_length,
        }
    }

    /// Produce a cleaned variant of `text`.
    ///
    /// Steps, in order: strip control characters, neutralize every span
    /// matching a tag-injection rule with `[filtered]`, then truncate to
    /// the maximum length.  After truncation the registry runs once more;
    /// any match that was not present before the cut is treated as
    /// truncation-induced and the text is cut back to just before it.  If
    /// that chase drops the output below the minimum-length floor the
    /// sanitizer gives up with [`SanitizeError::Exhausted`].
    ///
    /// Sanitizing text that is already clean and within bounds returns it
    /// unchanged.
    pub fn sanitize(&self, text: &str, matches: &[Match]) -> Result<String, SanitizeError> {
        for m in matches {
            warn!(rule = %m.label, severity = %m.severity, via = %m.via, "sanitizing flagged content");
        }

        // 1. Control characters (C0, DEL, C1) never survive.
        let stripped: String = text.chars().filter(|c| !is_control(*c)).collect();

        // 2. Neutralize tag-injection spans, preserving surrounding text.
        let mut cleaned = stripped;
        for rule in self.rules.rules() {
            if rule.category != RuleCategory::TagInjection {
                continue;
            }
            if rule.regex().is_match(&cleaned) {
                debug!(rule = %rule.label, category = %rule.category, "neutralizing tagged spans");
                cleaned = rule.regex().replace_all(&cleaned, FILTERED).into_owned();
            }
        }

        // 3. Truncation last.  Skip the re-scan entirely when nothing was
        //    cut: a cut is the only step that can expose a new match.
        if cleaned.chars().count() <= self.max_length {
            return Ok(cleaned);
        }

        let baseline: HashSet<usize> = self.rules.match_all(&cleaned).into_iter().collect();
        let mut out = truncate_chars(&cleaned, self.max_length);

        // 4. Chase truncation-induced matches (e.g. an end-anchored pattern
        //    exposed by the cut) by cutting back to just before the
        //    earliest one.
        loop {
            let fresh: Vec<usize> = self
                .rules
                .match_all(&out)
                .into_iter()
                .filter(|idx| !baseline.contains(idx))
                .collect();
            if fresh.is_empty() {
                return Ok(out);
            }

            let cut = fresh
                .iter()
                .filter_map(|&idx| self.rules.rule(idx).regex().find(&out))
                .map(|m| m.start())
                .min()
                .unwrap_or(0);
            out.truncate(cut);

            if out.chars().count() < self.min_length {
                return Err(SanitizeError::Exhausted {
                    floor: self.min_length,
                });
            }
        }
    }
}

/// C0 controls, DEL, and the C1 range.
fn is_control(c: char) -> bool {
    let cp = c as u32;
    cp < 0x20 || (0x7F..=0x9F).contains(&cp)
}

/// Truncate to at most `max` characters, respecting UTF-8 boundaries.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
