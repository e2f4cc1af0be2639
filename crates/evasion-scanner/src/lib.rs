//! # evasion-scanner
//!
//! Pattern registry and transform-aware evasion detection for the text-gate
//! engine.
//!
//! The crate is organised around three layers:
//!
//! 1. **[`patterns`]** -- severity/category taxonomy plus the built-in
//!    catalogue of regex rules, each with a [`Severity`](patterns::Severity)
//!    and a [`RuleCategory`](patterns::RuleCategory).
//! 2. **[`transforms`]** -- the closed set of reversible decodings
//!    ([`TransformKind`](transforms::TransformKind)) an evasion attempt may
//!    hide behind, each with a cheap applicability guard.
//! 3. **[`detector`]** -- runs the compiled [`RuleSet`](ruleset::RuleSet)
//!    against the raw text and every decoded variant, producing tagged
//!    [`Match`](detector::Match) values.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use evasion_scanner::{EvasionDetector, RuleSet, TransformKind};
//!
//! let rules = Arc::new(RuleSet::with_defaults().unwrap());
//! let detector = EvasionDetector::new(rules, TransformKind::all().to_vec());
//! let matches = detector.detect("aWdub3JlIHByZXZpb3VzIGluc3RydWN0aW9ucw==");
//! assert!(matches.iter().any(|m| m.via == "base64"));
//! ```

pub mod detector;
pub mod patterns;
pub mod ruleset;
pub mod transforms;

// Re-export the most commonly used types at the crate root for ergonomic
// imports (`use evasion_scanner::EvasionDetector`).
pub use detector::{EvasionDetector, Match, VIA_DIRECT};
pub use patterns::{default_rule_defs, BuiltinRule, RuleCategory, RuleDef, Severity, BUILTIN_RULES};
pub use ruleset::{CompiledRule, RuleSet, RuleSetError};
pub use transforms::{DecodeError, TransformKind};
