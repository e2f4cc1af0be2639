//! # event-monitor
//!
//! Bounded security-event monitoring for the text-gate engine: a
//! fixed-capacity ring of classified events, level-triggered threshold
//! alerting, read-only dashboard snapshots, and an append-only JSON-lines
//! log of events and the alerts they triggered.
//!
//! Each persisted record carries a content fingerprint rather than the raw
//! payload, so shipping or replaying the log never exposes the original
//! text.
//!
//! # Quick start
//!
//! ```rust
//! use event_monitor::{MonitorConfig, SecurityEvent, SecurityMonitor};
//! use evasion_scanner::Severity;
//!
//! let mut monitor = SecurityMonitor::new(MonitorConfig {
//!     window_capacity: 256,
//!     alert_threshold: 5,
//! });
//!
//! let event = SecurityEvent::new("prompt_injection", Severity::Critical, "payload", None);
//! let alert = monitor.record(event);
//! assert!(alert.is_none()); // first event of its category
//! ```

pub mod event;
pub mod monitor;
pub mod persist;

// Re-export primary public types at the crate root for convenience.
pub use event::{fingerprint, Alert, SecurityEvent};
pub use monitor::{DashboardSnapshot, MonitorConfig, SecurityMonitor};
pub use persist::{EventLog, EventSink, LogRecord, PersistError};
