//! Integrity Monitoring — Shared types
//!
//! Data structures for exam-integrity monitoring: the session record,
//! violation records and counters, detection snapshots, outgoing collector
//! events, and the presentation prompts the host UI renders.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// One active, monitored attempt at an exam, bounded by privacy acceptance
/// and deactivation/forced submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegritySession {
    pub exam_id: String,
    /// Unix timestamp (millis) of session creation.
    pub started_at: i64,
    pub active: bool,
    pub accessibility_mode: bool,
    pub fullscreen_supported: bool,
    pub privacy_acknowledged: bool,
}

/// The broad class of a recorded violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Window focus or page visibility lost.
    Focus,
    /// Full-screen exited while the session required it.
    Fullscreen,
    /// A heuristic threat scan tick came back positive.
    Advanced,
}

/// Heuristic conditions the advanced scanner can suspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvancedThreat {
    Devtools,
    Virtualization,
    ScreenSharing,
}

impl AdvancedThreat {
    pub fn subtype(&self) -> &'static str {
        match self {
            AdvancedThreat::Devtools => "devtools",
            AdvancedThreat::Virtualization => "virtualization",
            AdvancedThreat::ScreenSharing => "screensharing",
        }
    }
}

/// A single recorded violation. Append-only while a session is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub kind: ViolationKind,
    /// Heuristic subtype for `Advanced` (devtools | virtualization |
    /// screensharing), `network-disconnection` for delivery events.
    pub subtype: Option<String>,
    /// Unix timestamp (millis).
    pub timestamp: i64,
    pub details: HashMap<String, String>,
}

/// Connectivity as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkStatus {
    Online,
    Offline,
}

/// Result of one heuristic scan tick. Overwritten, never accumulated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    pub devtools_suspected: bool,
    pub virtualization_suspected: bool,
    pub screen_sharing_suspected: bool,
    pub network: NetworkStatus,
}

impl Default for DetectionSnapshot {
    fn default() -> Self {
        Self {
            devtools_suspected: false,
            virtualization_suspected: false,
            screen_sharing_suspected: false,
            network: NetworkStatus::Online,
        }
    }
}

/// Per-session violation counters. Monotonically non-decreasing while the
/// session is active; only the coordinator increments them.
#[derive(Debug, Default)]
pub struct ViolationCounters {
    focus: AtomicU64,
    fullscreen: AtomicU64,
    advanced: AtomicU64,
}

impl ViolationCounters {
    pub fn record(&self, kind: ViolationKind) {
        let counter = match kind {
            ViolationKind::Focus => &self.focus,
            ViolationKind::Fullscreen => &self.fullscreen,
            ViolationKind::Advanced => &self.advanced,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero all counters. Only called at session creation; counters are
    /// monotonic for the lifetime of a session.
    pub fn reset(&self) {
        self.focus.store(0, Ordering::Relaxed);
        self.fullscreen.store(0, Ordering::Relaxed);
        self.advanced.store(0, Ordering::Relaxed);
    }

    pub fn focus(&self) -> u64 { self.focus.load(Ordering::Relaxed) }
    pub fn fullscreen(&self) -> u64 { self.fullscreen.load(Ordering::Relaxed) }
    pub fn advanced(&self) -> u64 { self.advanced.load(Ordering::Relaxed) }
}

/// Event types understood by the remote collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    MonitoringStarted,
    Heartbeat,
    AdvancedViolation,
    NetworkDisconnection,
}

/// A report bound for the collector, delivered through the host's reporting
/// callback (and the offline queue when disconnected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub exam_id: String,
    /// Client wall-clock timestamp (millis).
    pub client_time: i64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}

impl IntegrityEvent {
    pub fn new(event_type: EventType, exam_id: &str, client_time: i64) -> Self {
        Self {
            event_type,
            exam_id: exam_id.to_string(),
            client_time,
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Presentation triggers emitted to the host UI. The engine decides *when*,
/// the host decides how to render them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptRequest {
    /// Shown before any session starts. Must be accepted for monitoring to
    /// begin; carries whether an accessibility exemption is available.
    PrivacyNotice { accessibility_available: bool },
    /// Full-screen could not be engaged. `fullscreen_supported` selects the
    /// "retry" branch (supported but denied) vs the "unsupported" branch.
    FullscreenWarning { fullscreen_supported: bool },
    /// Focus/visibility lost; countdown to forced submission is running.
    FocusWarning { remaining_secs: u32 },
    /// The user returned in time; the countdown display should be hidden.
    FocusWarningCleared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_monotonic() {
        let counters = ViolationCounters::default();
        counters.record(ViolationKind::Focus);
        counters.record(ViolationKind::Focus);
        counters.record(ViolationKind::Advanced);
        assert_eq!(counters.focus(), 2);
        assert_eq!(counters.fullscreen(), 0);
        assert_eq!(counters.advanced(), 1);
    }

    #[test]
    fn test_event_type_wire_names() {
        let json = serde_json::to_string(&EventType::MonitoringStarted).unwrap();
        assert_eq!(json, "\"monitoring_started\"");
        let json = serde_json::to_string(&EventType::NetworkDisconnection).unwrap();
        assert_eq!(json, "\"network_disconnection\"");
    }

    #[test]
    fn test_integrity_event_roundtrip() {
        let event = IntegrityEvent::new(EventType::Heartbeat, "exam-42", 1_000)
            .with_detail("focus_violations", "1");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"heartbeat\""));
        let back: IntegrityEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.exam_id, "exam-42");
        assert_eq!(back.details.get("focus_violations").map(String::as_str), Some("1"));
    }
}
