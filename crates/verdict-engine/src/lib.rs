//! # verdict-engine
//!
//! Severity aggregation and sanitization for the text-gate engine.  Takes
//! the tagged matches produced by `evasion-scanner` and collapses them into
//! a single allow / flag / sanitize / block [`Verdict`], with a
//! [`Sanitizer`] for the cases where cleaning beats rejection.
//!
//! ## Quick start
//!
//! ```rust
//! use verdict_engine::{Action, VerdictEngine};
//!
//! let engine = VerdictEngine::new(10_000);
//! let verdict = engine.decide("What is the capital of France?", &[]);
//! assert_eq!(verdict.action, Action::Allow);
//! ```

mod engine;
mod sanitizer;
mod verdict;

pub use engine::VerdictEngine;
pub use sanitizer::{SanitizeError, Sanitizer};
pub use verdict::{Action, Verdict};
