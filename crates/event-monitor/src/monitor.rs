//! Bounded event monitoring and threshold alerting.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::event::{Alert, SecurityEvent};

/// How many of the newest alerts a dashboard snapshot carries.
const SNAPSHOT_RECENT_ALERTS: usize = 5;

/// Monitor sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Maximum number of events retained; the alerting window.
    pub window_capacity: usize,
    /// Same-category event count at which an alert fires.
    pub alert_threshold: usize,
}

/// Read-only aggregation over the monitor's current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    /// Events currently retained in the window.
    pub total_events: usize,
    pub events_by_category: BTreeMap<String, usize>,
    /// All alerts ever emitted, not just retained ones.
    pub total_alerts: usize,
    pub recent_alerts: Vec<Alert>,
}

/// Time-ordered ring of classified events plus an append-only alert log.
///
/// The ring holds at most `window_capacity` events; the oldest is evicted
/// on overflow.  The alerting window *is* the retained ring: when callers
/// want a wider window than the ring retains, the same-category count is
/// necessarily approximate (it can only see what survived eviction).
///
/// Alerting is level-triggered: every qualifying event re-fires while the
/// threshold stays exceeded.  A sustained flood therefore keeps alerting
/// instead of being silently suppressed after the first crossing.
///
/// This type is the only mutable shared state in the engine; wrap it in a
/// mutex (or hand it to a single-writer task) when recording from several
/// threads.
#[derive(Debug)]
pub struct SecurityMonitor {
    config: MonitorConfig,
    events: VecDeque<SecurityEvent>,
    alerts: Vec<Alert>,
}

impl SecurityMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            events: VecDeque::with_capacity(config.window_capacity),
            alerts: Vec::new(),
        }
    }

    /// Record one event.  Returns the alert if this event pushed (or kept)
    /// its category at or above the threshold.
    // TODO: consider a per-category cooldown so a sustained flood does not
    // emit one alert per event; needs sign-off from whoever consumes the
    // alert log before the behavior changes.
    pub fn record(&mut self, event: SecurityEvent) -> Option<Alert> {
        if self.events.len() >= self.config.window_capacity {
            self.events.pop_front();
        }
        let category = event.category.clone();
        self.events.push_back(event);

        let count = self
            .events
            .iter()
            .filter(|e| e.category == category)
            .count();

        if count >= self.config.alert_threshold {
            let alert = Alert::new(category, count);
            warn!(
                category = %alert.category,
                count,
                threshold = self.config.alert_threshold,
                "event threshold crossed"
            );
            self.alerts.push(alert.clone());
            Some(alert)
        } else {
            None
        }
    }

    /// Read-only aggregation of the current state.  Does not mutate.
    pub fn dashboard_snapshot(&self) -> DashboardSnapshot {
        let mut events_by_category: BTreeMap<String, usize> = BTreeMap::new();
        for event in &self.events {
            *events_by_category.entry(event.category.clone()).or_insert(0) += 1;
        }

        let recent_alerts = self
            .alerts
            .iter()
            .rev()
            .take(SNAPSHOT_RECENT_ALERTS)
            .rev()
            .cloned()
            .collect();

        DashboardSnapshot {
            generated_at: Utc::now(),
            total_events: self.events.len(),
            events_by_category,
            total_alerts: self.alerts.len(),
            recent_alerts,
        }
    }

    /// Events currently retained in the window.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Every alert emitted so far, oldest first.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evasion_scanner::Severity;

    fn event(category: &str) -> SecurityEvent {
        SecurityEvent::new(category, Severity::Critical, "payload", None)
    }

    fn monitor(capacity: usize, threshold: usize) -> SecurityMonitor {
        SecurityMonitor::new(MonitorConfig {
            window_capacity: capacity,
            alert_threshold: threshold,
        })
    }

    #[test]
    fn threshold_fires_on_the_nth_event_and_stays_level_triggered() {
        let mut m = monitor(100, 5);

        for _ in 0..4 {
            assert!(m.record(event("prompt_injection")).is_none());
        }
        assert_eq!(m.alerts().len(), 0);

        // 5th event: exactly one alert.
        let alert = m.record(event("prompt_injection")).expect("5th event alerts");
        assert_eq!(alert.count, 5);
        assert_eq!(m.alerts().len(), 1);

        // 6th qualifying event: a second alert, not suppression.
        let alert = m.record(event("prompt_injection")).expect("6th event alerts");
        assert_eq!(alert.count, 6);
        assert_eq!(m.alerts().len(), 2);
    }

    #[test]
    fn categories_are_counted_independently() {
        let mut m = monitor(100, 3);
        m.record(event("a"));
        m.record(event("a"));
        m.record(event("b"));
        m.record(event("b"));
        // Neither category has reached 3.
        assert!(m.alerts().is_empty());
        assert!(m.record(event("a")).is_some());
        assert!(m.record(event("b")).is_some());
    }

    #[test]
    fn ring_buffer_evicts_oldest_at_capacity() {
        let mut m = monitor(3, 100);
        for i in 0..5 {
            m.record(event(&format!("cat-{i}")));
        }
        assert_eq!(m.event_count(), 3);
        let snapshot = m.dashboard_snapshot();
        assert!(snapshot.events_by_category.contains_key("cat-4"));
        assert!(!snapshot.events_by_category.contains_key("cat-0"));
        assert!(!snapshot.events_by_category.contains_key("cat-1"));
    }

    #[test]
    fn eviction_bounds_the_alerting_window() {
        // Threshold 5 but only 3 events retained: the count can never reach
        // the threshold, so no alert fires.  The window is the ring.
        let mut m = monitor(3, 5);
        for _ in 0..10 {
            assert!(m.record(event("flood")).is_none());
        }
        assert!(m.alerts().is_empty());
    }

    #[test]
    fn snapshot_aggregates_without_mutating() {
        let mut m = monitor(100, 2);
        m.record(event("a"));
        m.record(event("a"));
        m.record(event("b"));

        let first = m.dashboard_snapshot();
        let second = m.dashboard_snapshot();

        assert_eq!(first.total_events, 3);
        assert_eq!(second.total_events, 3);
        assert_eq!(first.events_by_category["a"], 2);
        assert_eq!(first.events_by_category["b"], 1);
        assert_eq!(first.total_alerts, 1);
        assert_eq!(second.total_alerts, 1);
        assert_eq!(m.event_count(), 3);
    }

    #[test]
    fn snapshot_keeps_only_the_newest_alerts() {
        let mut m = monitor(100, 1);
        for i in 0..8 {
            m.record(event(&format!("cat-{i}")));
        }
        let snapshot = m.dashboard_snapshot();
        assert_eq!(snapshot.total_alerts, 8);
        assert_eq!(snapshot.recent_alerts.len(), 5);
        // Oldest of the recent five is the 4th alert overall.
        assert_eq!(snapshot.recent_alerts[0].category, "cat-3");
        assert_eq!(snapshot.recent_alerts[4].category, "cat-7");
    }
}
