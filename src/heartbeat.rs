//! Session Heartbeat & Reporter — collector event construction.
//!
//! Builds the `monitoring_started` handshake and the periodic `heartbeat`
//! payloads, plus the per-violation collector events, and hands all of them
//! to the delivery layer so every report benefits from offline queuing.
//! When an accessibility exemption is engaged it is stamped into every
//! outgoing report.

use crate::delivery::DeliveryLayer;
use crate::types::{
    AdvancedThreat, DetectionSnapshot, EventType, IntegrityEvent, IntegritySession,
    NetworkStatus, ViolationCounters,
};
use std::sync::Arc;
use tracing::debug;

pub struct Reporter {
    delivery: Arc<DeliveryLayer>,
}

impl Reporter {
    pub fn new(delivery: Arc<DeliveryLayer>) -> Self {
        Self { delivery }
    }

    /// One-time session handshake with capability flags.
    pub fn handshake(&self, session: &IntegritySession, visibility_supported: bool, now_ms: i64) {
        let event = self
            .base(EventType::MonitoringStarted, session, now_ms)
            .with_detail("fullscreen_supported", bool_str(session.fullscreen_supported))
            .with_detail("visibility_supported", bool_str(visibility_supported));
        debug!(exam_id = %session.exam_id, "Monitoring handshake");
        self.delivery.dispatch(&event);
    }

    /// Periodic heartbeat carrying current counters and detection state.
    pub fn heartbeat(
        &self,
        session: &IntegritySession,
        counters: &ViolationCounters,
        snapshot: DetectionSnapshot,
        now_ms: i64,
    ) {
        let event = self
            .base(EventType::Heartbeat, session, now_ms)
            .with_detail("focus_violations", counters.focus().to_string())
            .with_detail("fullscreen_violations", counters.fullscreen().to_string())
            .with_detail("advanced_violations", counters.advanced().to_string())
            .with_detail("devtools_suspected", bool_str(snapshot.devtools_suspected))
            .with_detail("virtualization_suspected", bool_str(snapshot.virtualization_suspected))
            .with_detail("screen_sharing_suspected", bool_str(snapshot.screen_sharing_suspected))
            .with_detail(
                "network",
                if snapshot.network == NetworkStatus::Online { "online" } else { "offline" },
            );
        debug!(exam_id = %session.exam_id, "Heartbeat");
        self.delivery.dispatch(&event);
    }

    /// One collector event per positive heuristic on a scan tick.
    pub fn advanced_violation(&self, session: &IntegritySession, threat: AdvancedThreat, now_ms: i64) {
        let event = self
            .base(EventType::AdvancedViolation, session, now_ms)
            .with_detail("subtype", threat.subtype());
        self.delivery.dispatch(&event);
    }

    /// Emitted on each online → offline transition. Lands in the offline
    /// slot by construction and surfaces on reconnect.
    pub fn network_disconnection(&self, session: &IntegritySession, now_ms: i64) {
        let event = self
            .base(EventType::NetworkDisconnection, session, now_ms)
            .with_detail("subtype", "network-disconnection");
        self.delivery.dispatch(&event);
    }

    fn base(&self, event_type: EventType, session: &IntegritySession, now_ms: i64) -> IntegrityEvent {
        let mut event = IntegrityEvent::new(event_type, &session.exam_id, now_ms);
        if session.accessibility_mode {
            event = event.with_detail("accessibility_exempt", "true");
        }
        event
    }
}

fn bool_str(v: bool) -> &'static str {
    if v { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::ReportSink;
    use crate::error::ProctorResult;
    use crate::platform::OfflineStore;
    use parking_lot::{Mutex, RwLock};
    use crate::types::ViolationKind;

    #[derive(Default)]
    struct MemoryStore(RwLock<Option<String>>);

    impl OfflineStore for MemoryStore {
        fn read(&self) -> ProctorResult<Option<String>> { Ok(self.0.read().clone()) }
        fn write(&self, payload: &str) -> ProctorResult<()> {
            *self.0.write() = Some(payload.to_string());
            Ok(())
        }
        fn clear(&self) -> ProctorResult<()> {
            *self.0.write() = None;
            Ok(())
        }
    }

    fn reporter() -> (Reporter, Arc<Mutex<Vec<IntegrityEvent>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let inner = captured.clone();
        let sink: ReportSink = Arc::new(move |e: &IntegrityEvent| inner.lock().push(e.clone()));
        let delivery = Arc::new(DeliveryLayer::new(sink, Arc::new(MemoryStore::default())));
        (Reporter::new(delivery), captured)
    }

    fn session(accessibility: bool) -> IntegritySession {
        IntegritySession {
            exam_id: "exam-7".into(),
            started_at: 0,
            active: true,
            accessibility_mode: accessibility,
            fullscreen_supported: true,
            privacy_acknowledged: true,
        }
    }

    #[test]
    fn test_handshake_carries_capability_flags() {
        let (reporter, captured) = reporter();
        reporter.handshake(&session(false), true, 1_000);
        let events = captured.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::MonitoringStarted);
        assert_eq!(events[0].client_time, 1_000);
        assert_eq!(events[0].details.get("fullscreen_supported").map(String::as_str), Some("true"));
        assert_eq!(events[0].details.get("visibility_supported").map(String::as_str), Some("true"));
        assert!(events[0].details.get("accessibility_exempt").is_none());
    }

    #[test]
    fn test_heartbeat_carries_counters_and_snapshot() {
        let (reporter, captured) = reporter();
        let counters = ViolationCounters::default();
        counters.record(ViolationKind::Focus);
        counters.record(ViolationKind::Advanced);
        let snapshot = DetectionSnapshot {
            devtools_suspected: true,
            virtualization_suspected: false,
            screen_sharing_suspected: false,
            network: NetworkStatus::Online,
        };
        reporter.heartbeat(&session(false), &counters, snapshot, 2_000);
        let events = captured.lock();
        let details = &events[0].details;
        assert_eq!(events[0].event_type, EventType::Heartbeat);
        assert_eq!(details.get("focus_violations").map(String::as_str), Some("1"));
        assert_eq!(details.get("advanced_violations").map(String::as_str), Some("1"));
        assert_eq!(details.get("devtools_suspected").map(String::as_str), Some("true"));
        assert_eq!(details.get("network").map(String::as_str), Some("online"));
    }

    #[test]
    fn test_accessibility_exemption_stamped_on_every_report() {
        let (reporter, captured) = reporter();
        let s = session(true);
        reporter.handshake(&s, true, 0);
        reporter.heartbeat(&s, &ViolationCounters::default(), DetectionSnapshot::default(), 1);
        reporter.advanced_violation(&s, AdvancedThreat::Devtools, 2);
        reporter.network_disconnection(&s, 3);
        let events = captured.lock();
        assert_eq!(events.len(), 4);
        for event in events.iter() {
            assert_eq!(event.details.get("accessibility_exempt").map(String::as_str), Some("true"));
        }
    }

    #[test]
    fn test_advanced_violation_subtype() {
        let (reporter, captured) = reporter();
        reporter.advanced_violation(&session(false), AdvancedThreat::ScreenSharing, 5);
        let events = captured.lock();
        assert_eq!(events[0].event_type, EventType::AdvancedViolation);
        assert_eq!(events[0].details.get("subtype").map(String::as_str), Some("screensharing"));
    }
}
