use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;

/// Counters accumulated by an [`Engine`](crate::Engine) over its lifetime.
#[derive(Debug, Default, Clone)]
pub struct EngineMetrics {
    opens: u64,
    clicks: u64,
    closes: u64,
    handler_faults: u64,
    pages_created: u64,
    compactions: u64,
    stale_notifications: u64,
    sessions_ended: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_open(&mut self) {
        self.opens = self.opens.saturating_add(1);
    }

    pub fn record_click(&mut self) {
        self.clicks = self.clicks.saturating_add(1);
    }

    pub fn record_close(&mut self) {
        self.closes = self.closes.saturating_add(1);
    }

    pub fn record_handler_fault(&mut self) {
        self.handler_faults = self.handler_faults.saturating_add(1);
    }

    pub fn record_pages_created(&mut self, count: usize) {
        if count > 0 {
            self.pages_created = self.pages_created.saturating_add(count as u64);
        }
    }

    pub fn record_compaction(&mut self) {
        self.compactions = self.compactions.saturating_add(1);
    }

    pub fn record_stale(&mut self) {
        self.stale_notifications = self.stale_notifications.saturating_add(1);
    }

    pub fn record_session_end(&mut self) {
        self.sessions_ended = self.sessions_ended.saturating_add(1);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            opens: self.opens,
            clicks: self.clicks,
            closes: self.closes,
            handler_faults: self.handler_faults,
            pages_created: self.pages_created,
            compactions: self.compactions,
            stale_notifications: self.stale_notifications,
            sessions_ended: self.sessions_ended,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub opens: u64,
    pub clicks: u64,
    pub closes: u64,
    pub handler_faults: u64,
    pub pages_created: u64,
    pub compactions: u64,
    pub stale_notifications: u64,
    pub sessions_ended: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "engine_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("opens".to_string(), json!(self.opens));
        map.insert("clicks".to_string(), json!(self.clicks));
        map.insert("closes".to_string(), json!(self.closes));
        map.insert("handler_faults".to_string(), json!(self.handler_faults));
        map.insert("pages_created".to_string(), json!(self.pages_created));
        map.insert("compactions".to_string(), json!(self.compactions));
        map.insert(
            "stale_notifications".to_string(),
            json!(self.stale_notifications),
        );
        map.insert("sessions_ended".to_string(), json!(self.sessions_ended));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counters() {
        let mut metrics = EngineMetrics::new();
        metrics.record_open();
        metrics.record_click();
        metrics.record_click();
        metrics.record_pages_created(0);
        metrics.record_pages_created(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.opens, 1);
        assert_eq!(snapshot.clicks, 2);
        assert_eq!(snapshot.pages_created, 2);

        let event = snapshot.to_log_event("pageframe::metrics");
        assert_eq!(event.message, "engine_metrics");
        assert_eq!(event.field("clicks"), Some(&json!(2)));
    }
}
