//! Detection rule library.
//!
//! Contains the severity/category taxonomy and the built-in catalogue of
//! regex rules used to detect disallowed constructs.  Each entry carries a
//! human-readable label (used verbatim in verdict reasons), a
//! [`RuleCategory`] for grouping, a [`Severity`] that drives the verdict
//! ladder, and a regex string compiled at registry-construction time.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Ranked severity of a rule match.
///
/// The derived `Ord` follows declaration order, so
/// `Low < Medium < High < Critical`.  Verdict aggregation relies on this
/// total order rather than on string comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Broad classification of the technique a rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Attempts to override, cancel, or erase the original instructions.
    InstructionOverride,
    /// Attempts to redefine the model's persona or role.
    RoleHijack,
    /// Attempts to unlock privileged or unrestricted modes.
    PrivilegeEscalation,
    /// Bracketed or delimiter-style tags recognised by common prompt
    /// formats.  Rules in this category are the ones the sanitizer
    /// neutralizes in place.
    TagInjection,
    /// Attempts to exfiltrate the system prompt or other hidden context.
    DataExfiltration,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstructionOverride => write!(f, "instruction_override"),
            Self::RoleHijack => write!(f, "role_hijack"),
            Self::PrivilegeEscalation => write!(f, "privilege_escalation"),
            Self::TagInjection => write!(f, "tag_injection"),
            Self::DataExfiltration => write!(f, "data_exfiltration"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule definition
// ---------------------------------------------------------------------------

/// A single detection rule as it appears in configuration files.
///
/// Rules are immutable once loaded; their ordering is insertion order and
/// only matters for the first-critical tie-break in the verdict engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    /// Short human-readable identifier, quoted verbatim in verdict reasons.
    pub label: String,
    /// The technique family this rule belongs to.
    pub category: RuleCategory,
    /// Severity assigned to every match of this rule.
    pub severity: Severity,
    /// Regex source, compiled case-insensitively by the registry.
    pub pattern: String,
}

/// A built-in rule entry.  Kept as a static slice so the default catalogue
/// is available at zero runtime cost until the registry compiles it.
pub struct BuiltinRule {
    pub label: &'static str,
    pub category: RuleCategory,
    pub severity: Severity,
    pub pattern: &'static str,
}

/// The built-in rule catalogue.
pub static BUILTIN_RULES: &[BuiltinRule] = &[
    // ---- Instruction override ------------------------------------------
    BuiltinRule {
        label: "instruction override",
        category: RuleCategory::InstructionOverride,
        severity: Severity::Critical,
        pattern: r"ignore\s+(all\s+)?(previous|prior|above)\s+instructions?",
    },
    BuiltinRule {
        label: "instruction disregard",
        category: RuleCategory::InstructionOverride,
        severity: Severity::Critical,
        pattern: r"disregard\s+(all\s+)?(prior|previous|above)",
    },
    BuiltinRule {
        label: "memory manipulation",
        category: RuleCategory::InstructionOverride,
        severity: Severity::Critical,
        pattern: r"forget\s+(everything|all|your)\s+(instructions?|training)",
    },
    BuiltinRule {
        label: "system prompt injection",
        category: RuleCategory::InstructionOverride,
        severity: Severity::Critical,
        pattern: r"new\s+system\s+prompt",
    },
    // ---- Privilege escalation ------------------------------------------
    BuiltinRule {
        label: "privilege escalation",
        category: RuleCategory::PrivilegeEscalation,
        severity: Severity::Critical,
        pattern: r"(developer|god)\s+mode|admin\s+(mode|access)",
    },
    // ---- Role hijacking ------------------------------------------------
    BuiltinRule {
        label: "role override",
        category: RuleCategory::RoleHijack,
        severity: Severity::High,
        pattern: r"you\s+are\s+now\s+\w+",
    },
    BuiltinRule {
        label: "persona injection",
        category: RuleCategory::RoleHijack,
        severity: Severity::High,
        pattern: r"pretend\s+(to\s+be|you\s+are)",
    },
    // ---- Tag / delimiter injection -------------------------------------
    BuiltinRule {
        label: "tag injection",
        category: RuleCategory::TagInjection,
        severity: Severity::High,
        pattern: r"\[(system|admin|developer)\]",
    },
    BuiltinRule {
        label: "delimiter escape",
        category: RuleCategory::TagInjection,
        severity: Severity::High,
        pattern: r"<\s*/?\s*system\s*>|\[INST\]|<<\s*SYS\s*>>",
    },
    // ---- Data exfiltration ---------------------------------------------
    BuiltinRule {
        label: "prompt exfiltration",
        category: RuleCategory::DataExfiltration,
        severity: Severity::High,
        pattern: r"(reveal|show|print|display|output)\s+(your\s+)?(system\s+)?prompt|what\s+(are|were)\s+your\s+(initial\s+)?instructions",
    },
    // ---- Lower-severity probes -----------------------------------------
    BuiltinRule {
        label: "jailbreak probe",
        category: RuleCategory::InstructionOverride,
        severity: Severity::Medium,
        pattern: r"\bjailbreak\b|bypass\s+(all\s+)?(safety|filters?|guardrails?)",
    },
    BuiltinRule {
        label: "role header",
        category: RuleCategory::TagInjection,
        severity: Severity::Low,
        pattern: r"###\s*(system|instruction|human|assistant)\s*:",
    },
];

/// Owned copies of [`BUILTIN_RULES`], in catalogue order.  Used when a
/// configuration file does not supply its own rule set.
pub fn default_rule_defs() -> Vec<RuleDef> {
    BUILTIN_RULES
        .iter()
        .map(|r| RuleDef {
            label: r.label.to_string(),
            category: r.category,
            severity: r.severity,
            pattern: r.pattern.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_builtin_patterns_compile() {
        for rule in BUILTIN_RULES {
            regex::RegexBuilder::new(rule.pattern)
                .case_insensitive(true)
                .build()
                .unwrap_or_else(|e| panic!("pattern '{}' failed to compile: {e}", rule.label));
        }
    }

    #[test]
    fn labels_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for rule in BUILTIN_RULES {
            assert!(seen.insert(rule.label), "duplicate rule label: {}", rule.label);
        }
    }

    #[test]
    fn severity_order_is_ranked() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(
            [Severity::Medium, Severity::Critical, Severity::Low]
                .into_iter()
                .max(),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn severity_serializes_snake_case() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let back: Severity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(back, Severity::High);
    }

    #[test]
    fn catalogue_spans_all_severities() {
        for wanted in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ] {
            assert!(
                BUILTIN_RULES.iter().any(|r| r.severity == wanted),
                "no builtin rule with severity {wanted}"
            );
        }
    }
}
