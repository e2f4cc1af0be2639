//! Compiled pattern registry.
//!
//! Compiles a list of [`RuleDef`]s into a [`RegexSet`] for fast
//! multi-pattern matching, with individual [`Regex`] objects kept alongside
//! for span extraction and replacement.

use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};

use crate::patterns::{default_rule_defs, RuleCategory, RuleDef, Severity};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while constructing a [`RuleSet`].
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("failed to compile pattern for rule '{label}': {source}")]
    RegexCompile {
        label: String,
        #[source]
        source: regex::Error,
    },
}

// ---------------------------------------------------------------------------
// Compiled rule
// ---------------------------------------------------------------------------

/// A single rule after compilation.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub label: String,
    pub category: RuleCategory,
    pub severity: Severity,
    regex: Regex,
}

impl CompiledRule {
    /// The compiled case-insensitive regex for this rule.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// Compiled registry backed by a [`RegexSet`] for cheap "which rules match"
/// queries.  Rule order is preserved from the definitions, which makes the
/// indices returned by [`match_all`](Self::match_all) a stable tie-break key.
#[derive(Debug, Clone)]
pub struct RuleSet {
    set: RegexSet,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile every definition and return a ready-to-use registry.
    ///
    /// All patterns are compiled case-insensitively.  Fails on the first
    /// invalid pattern, naming the offending rule.
    pub fn new(defs: Vec<RuleDef>) -> Result<Self, RuleSetError> {
        let sources: Vec<&str> = defs.iter().map(|d| d.pattern.as_str()).collect();

        let set = RegexSetBuilder::new(&sources)
            .case_insensitive(true)
            .build()
            .map_err(|source| RuleSetError::RegexCompile {
                label: first_offender(&defs, &source),
                source,
            })?;

        let rules = defs
            .into_iter()
            .map(|def| {
                let regex = RegexBuilder::new(&def.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| RuleSetError::RegexCompile {
                        label: def.label.clone(),
                        source,
                    })?;
                Ok(CompiledRule {
                    label: def.label,
                    category: def.category,
                    severity: def.severity,
                    regex,
                })
            })
            .collect::<Result<Vec<_>, RuleSetError>>()?;

        Ok(Self { set, rules })
    }

    /// Compile the built-in catalogue.
    pub fn with_defaults() -> Result<Self, RuleSetError> {
        Self::new(default_rule_defs())
    }

    /// Scan `text` and return the indices of every matching rule, in rule
    /// insertion order.  Safe on the empty string (returns an empty vec).
    /// No side effects.
    pub fn match_all(&self, text: &str) -> Vec<usize> {
        self.set.matches(text).into_iter().collect()
    }

    /// Rule lookup by index, as returned from [`match_all`](Self::match_all).
    pub fn rule(&self, index: usize) -> &CompiledRule {
        &self.rules[index]
    }

    /// All compiled rules, in insertion order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Returns the number of rules in the registry.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// Identify which definition a whole-set compile error belongs to by
/// recompiling individually.  Falls back to the first label when the error
/// cannot be attributed (e.g. a set-size limit).
fn first_offender(defs: &[RuleDef], _err: &regex::Error) -> String {
    for def in defs {
        if RegexBuilder::new(&def.pattern)
            .case_insensitive(true)
            .build()
            .is_err()
        {
            return def.label.clone();
        }
    }
    defs.first().map(|d| d.label.clone()).unwrap_or_default()
}
