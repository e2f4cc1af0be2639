//! Transform-aware detection.
//!
//! Runs the pattern registry against the raw text and against every
//! successfully decoded variant of it, producing the union of matches found
//! directly or after a single reversible transform.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::patterns::Severity;
use crate::ruleset::RuleSet;
use crate::transforms::TransformKind;

/// `via` tag for matches found without any decoding.
pub const VIA_DIRECT: &str = "direct";

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// A single detection result.  Produced fresh per evaluation, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    /// The label of the rule that matched.
    pub label: String,
    /// Severity of the matched rule.
    pub severity: Severity,
    /// `"direct"`, or the name of the transform whose decoded output
    /// surfaced the match.
    pub via: String,
}

impl Match {
    /// Returns `true` when the match was found without decoding.
    pub fn is_direct(&self) -> bool {
        self.via == VIA_DIRECT
    }
}

// ---------------------------------------------------------------------------
// EvasionDetector
// ---------------------------------------------------------------------------

/// Applies the transform catalog to a candidate string and re-runs the
/// pattern registry against every decoded variant.
///
/// Stateless after construction and safe to share across threads.
#[derive(Debug)]
pub struct EvasionDetector {
    rules: Arc<RuleSet>,
    transforms: Vec<TransformKind>,
}

impl EvasionDetector {
    pub fn new(rules: Arc<RuleSet>, transforms: Vec<TransformKind>) -> Self {
        Self { rules, transforms }
    }

    /// Scan `text` directly and through every applicable transform.
    ///
    /// Returned matches are deduplicated on (rule, via) and ordered by rule
    /// insertion order, direct before decoded within the same rule, so the
    /// first CRITICAL entry is a deterministic tie-break for the verdict
    /// engine.  Decode failures are swallowed: a transform that cannot
    /// decode the input simply does not contribute matches.
    pub fn detect(&self, text: &str) -> Vec<Match> {
        let mut seen: HashSet<(usize, &'static str)> = HashSet::new();
        let mut keyed: Vec<(usize, Match)> = Vec::new();

        for idx in self.rules.match_all(text) {
            if seen.insert((idx, VIA_DIRECT)) {
                keyed.push((idx, self.make_match(idx, VIA_DIRECT)));
            }
        }

        for transform in &self.transforms {
            if !transform.applies(text) {
                continue;
            }
            let decoded = match transform.decode(text) {
                Ok(decoded) => decoded,
                Err(err) => {
                    trace!(transform = %transform, error = %err, "decode failed; transform skipped");
                    continue;
                }
            };
            // A decode that returns the input unchanged adds no information
            // and would only duplicate the direct matches under a new tag.
            if decoded == text {
                continue;
            }

            let hits = self.rules.match_all(&decoded);
            if !hits.is_empty() {
                debug!(
                    transform = %transform,
                    matches = hits.len(),
                    "matches surfaced after decode"
                );
            }
            for idx in hits {
                if seen.insert((idx, transform.name())) {
                    keyed.push((idx, self.make_match(idx, transform.name())));
                }
            }
        }

        keyed.sort_by_key(|(idx, _)| *idx);
        keyed.into_iter().map(|(_, m)| m).collect()
    }

    fn make_match(&self, idx: usize, via: &str) -> Match {
        let rule = self.rules.rule(idx);
        Match {
            label: rule.label.clone(),
            severity: rule.severity,
            via: via.to_string(),
        }
    }
}
