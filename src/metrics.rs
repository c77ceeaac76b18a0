//! Transition bookkeeping: switch counts and bytes moved, behind the
//! `metrics` feature. Serializes to JSON via `serde`/`serde_json` for a
//! caller that wants to log or export it, mirroring the optional
//! observability surface this core's ambient stack carries even though the
//! detailed backend/transport layer itself is out of scope.

use serde::Serialize;

/// Running counters for one [`crate::data::Data`] container's lifetime.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MetricsCollector {
    pub switch_count: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub mappings_reused: u64,
}

impl MetricsCollector {
    pub(crate) fn record_switch(&mut self) {
        self.switch_count += 1;
    }

    pub(crate) fn record_send(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
    }

    pub(crate) fn record_recv(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
    }

    /// Records that a `switchto` reused an existing `Mapping` allocation in
    /// place instead of building a fresh one.
    pub(crate) fn record_mapping_reused(&mut self) {
        self.mappings_reused += 1;
    }

    /// Serialize to a JSON string for logging or export.
    ///
    /// # Panics
    /// Never: `MetricsCollector` contains only primitive fields, which
    /// `serde_json` always serializes successfully.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("MetricsCollector is always representable as JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut m = MetricsCollector::default();
        m.record_switch();
        m.record_send(10);
        m.record_recv(4);
        m.record_send(1);
        m.record_mapping_reused();
        assert_eq!(m.switch_count, 1);
        assert_eq!(m.bytes_sent, 11);
        assert_eq!(m.bytes_received, 4);
        assert_eq!(m.mappings_reused, 1);
    }

    #[test]
    fn serializes_to_json() {
        let mut m = MetricsCollector::default();
        m.record_switch();
        let json = m.to_json();
        assert!(json.contains("\"switch_count\":1"));
    }
}
