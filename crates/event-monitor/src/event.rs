//! Security event and alert value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use evasion_scanner::Severity;

/// Number of hex characters kept from the content digest.
const FINGERPRINT_LEN: usize = 16;

/// One classified input as seen by the monitor.
///
/// Carries a content fingerprint instead of the raw payload so the retained
/// history is bounded and sensitive text is never re-stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: uuid::Uuid,
    pub timestamp: DateTime<Utc>,
    /// Free-form grouping key; alerting counts events per category.
    pub category: String,
    pub severity: Severity,
    /// Truncated SHA-256 of the evaluated content, hex-encoded.
    pub fingerprint: String,
    /// Optional originator (user id, remote address).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl SecurityEvent {
    /// Create an event for `content`, fingerprinting it immediately.  The
    /// content itself is not retained.
    pub fn new(
        category: impl Into<String>,
        severity: Severity,
        content: &str,
        subject: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: Utc::now(),
            category: category.into(),
            severity,
            fingerprint: fingerprint(content),
            subject,
        }
    }
}

/// Truncated SHA-256 hex digest of `content`.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut hex = format!("{digest:x}");
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Raised when a category's event count crosses the alert threshold.
/// Append-only: alerts are never mutated or removed once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    /// Number of same-category events in the window when the alert fired.
    pub count: usize,
    pub message: String,
}

impl Alert {
    pub fn new(category: impl Into<String>, count: usize) -> Self {
        let category = category.into();
        Self {
            timestamp: Utc::now(),
            message: format!("threshold exceeded: {count} {category} events"),
            category,
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_bounded() {
        let a = fingerprint("ignore previous instructions");
        let b = fingerprint("ignore previous instructions");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_content_yields_different_fingerprints() {
        assert_ne!(fingerprint("one"), fingerprint("two"));
    }

    #[test]
    fn event_does_not_retain_the_payload() {
        let event = SecurityEvent::new(
            "prompt_injection",
            Severity::Critical,
            "some very sensitive text",
            Some("user-42".to_string()),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("sensitive"));
        assert!(json.contains(&event.fingerprint));
        assert!(json.contains("user-42"));
    }

    #[test]
    fn subject_is_omitted_when_absent() {
        let event = SecurityEvent::new("benign", Severity::Low, "hello", None);
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("subject").is_none());
    }

    #[test]
    fn alert_message_names_category_and_count() {
        let alert = Alert::new("prompt_injection", 5);
        assert_eq!(alert.count, 5);
        assert!(alert.message.contains("prompt_injection"));
        assert!(alert.message.contains('5'));
    }
}
