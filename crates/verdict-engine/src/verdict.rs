//! Verdict value types.

use serde::{Deserialize, Serialize};
use std::fmt;

use evasion_scanner::Severity;

/// The action the caller should take for one evaluated input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Pass the input through untouched.
    Allow,
    /// Pass the input through but surface a warning.
    Flag,
    /// Replace the input with its sanitized variant.
    Sanitize,
    /// Reject the input entirely.
    Block,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Flag => write!(f, "flag"),
            Self::Sanitize => write!(f, "sanitize"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// The outcome of evaluating one input.  Immutable once produced; one
/// verdict per input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// The resolved action.
    pub action: Action,
    /// Aggregate severity; `None` when the action is [`Action::Allow`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Human-readable reason explaining the decision.
    pub reason: String,
    /// The evaluated input, verbatim.
    pub original: String,
    /// Cleaned variant, present only when sanitization ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized: Option<String>,
}

impl Verdict {
    /// Convenience constructor for a clean pass.
    pub fn allow(original: impl Into<String>) -> Self {
        Self {
            action: Action::Allow,
            severity: None,
            reason: "passed validation".to_string(),
            original: original.into(),
            sanitized: None,
        }
    }

    /// Convenience constructor for a block with an explicit severity.
    pub fn block(
        original: impl Into<String>,
        severity: Severity,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action: Action::Block,
            severity: Some(severity),
            reason: reason.into(),
            original: original.into(),
            sanitized: None,
        }
    }

    /// Returns `true` when the input passed untouched.
    pub fn is_allowed(&self) -> bool {
        self.action == Action::Allow
    }
}
