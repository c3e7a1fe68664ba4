//! Integrity Coordinator — session lifecycle and orchestration.
//!
//! Sole owner of the session record, the violation log, and the counters.
//! Wires the restriction controller, violation monitor, threat scanner,
//! delivery layer, and reporter together; every other component communicates
//! through return values and callbacks rather than shared mutable state.
//! The host pumps platform signals through `handle_event` and drives the
//! clock through `tick`.

use crate::capability::CapabilityAdapter;
use crate::config::MonitorConfig;
use crate::delivery::{DeliveryLayer, ReportSink};
use crate::error::{ProctorError, ProctorResult};
use crate::heartbeat::Reporter;
use crate::platform::{
    Clock, DisplayCaptureProbe, HardwareInfo, OfflineStore, PlatformDom, PlatformEvent,
};
use crate::restriction::{LockOutcome, RestrictionController};
use crate::scanner::ThreatScanner;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::types::{
    DetectionSnapshot, IntegritySession, PromptRequest, ViolationCounters, ViolationKind,
    ViolationRecord,
};
use crate::violation::{GraceTick, GraceTimer, LeaveOutcome, MonitorState, ViolationMonitor};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bound on the per-session violation log.
const MAX_RECORDS: usize = 10_000;

/// Callback fired exactly once when the grace countdown expires; the host
/// submits/locks the exam.
pub type ForceSubmitSink = Arc<dyn Fn() + Send + Sync>;

/// Callback receiving presentation triggers for the host UI.
pub type PromptSink = Arc<dyn Fn(&PromptRequest) + Send + Sync>;

/// Everything the engine needs from the hosting platform.
pub struct PlatformHandles {
    pub dom: Arc<dyn PlatformDom>,
    pub hardware: Arc<dyn HardwareInfo>,
    pub capture_probe: Arc<dyn DisplayCaptureProbe>,
    pub offline_store: Arc<dyn OfflineStore>,
    pub clock: Arc<dyn Clock>,
}

/// Host-side callbacks wired in at construction.
pub struct CoordinatorCallbacks {
    pub on_force_submit: ForceSubmitSink,
    pub on_integrity_event: ReportSink,
    pub prompts: PromptSink,
}

/// What the coordinator decided about one platform event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Let the platform's default behavior proceed.
    Pass,
    /// The host must suppress the default behavior (blocked key,
    /// context menu).
    Suppress,
}

/// Point-in-time view of the engine for dashboards and tests.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MonitorStatus {
    pub session: Option<IntegritySession>,
    pub state: MonitorState,
    pub focus_violations: u64,
    pub fullscreen_violations: u64,
    pub advanced_violations: u64,
    pub detection: DetectionSnapshot,
    pub grace: GraceTimer,
    pub pending_tasks: usize,
}

/// Scheduler task kinds owned by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    GraceTick,
    Scan,
    Heartbeat,
}

pub struct IntegrityCoordinator {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    capabilities: Arc<CapabilityAdapter>,
    restriction: RestrictionController,
    monitor: ViolationMonitor,
    scanner: ThreatScanner,
    delivery: Arc<DeliveryLayer>,
    reporter: Reporter,
    scheduler: Scheduler<TaskKind>,
    session: RwLock<Option<IntegritySession>>,
    counters: ViolationCounters,
    violation_log: RwLock<Vec<ViolationRecord>>,
    /// Exam waiting on privacy acceptance; no session exists yet.
    pending_exam: RwLock<Option<String>>,
    accessibility_mode: AtomicBool,
    /// Scanner + heartbeat running. Stays false while the full-screen
    /// warning blocks session start.
    monitoring_started: AtomicBool,
    force_submitted: AtomicBool,
    grace_task: Mutex<Option<TaskHandle>>,
    on_force_submit: ForceSubmitSink,
    prompts: PromptSink,
}

impl IntegrityCoordinator {
    pub fn new(
        config: MonitorConfig,
        platform: PlatformHandles,
        callbacks: CoordinatorCallbacks,
    ) -> Self {
        let capabilities = Arc::new(CapabilityAdapter::negotiate(platform.dom.clone()));
        let delivery = Arc::new(DeliveryLayer::new(
            callbacks.on_integrity_event,
            platform.offline_store,
        ));
        Self {
            restriction: RestrictionController::new(capabilities.clone()),
            monitor: ViolationMonitor::new(config.grace_period_secs),
            scanner: ThreatScanner::new(
                platform.dom,
                platform.hardware,
                platform.capture_probe,
                config.clone(),
            ),
            reporter: Reporter::new(delivery.clone()),
            scheduler: Scheduler::new(),
            session: RwLock::new(None),
            counters: ViolationCounters::default(),
            violation_log: RwLock::new(Vec::new()),
            pending_exam: RwLock::new(None),
            accessibility_mode: AtomicBool::new(false),
            monitoring_started: AtomicBool::new(false),
            force_submitted: AtomicBool::new(false),
            grace_task: Mutex::new(None),
            on_force_submit: callbacks.on_force_submit,
            prompts: callbacks.prompts,
            clock: platform.clock,
            capabilities,
            delivery,
            config,
        }
    }

    // ── Public control surface ───────────────────────────────────────────

    /// Begin the integrity flow for `exam_id`: shows the privacy notice.
    /// No monitoring starts until the notice is accepted.
    pub fn start_integrity_mode(&self, exam_id: &str) -> ProctorResult<()> {
        if self.session.read().is_some() {
            return Err(ProctorError::AlreadyActive);
        }
        *self.pending_exam.write() = Some(exam_id.to_string());
        info!(exam_id = %exam_id, "Integrity mode requested, showing privacy notice");
        (self.prompts)(&PromptRequest::PrivacyNotice {
            accessibility_available: self.config.allow_accessibility_exceptions,
        });
        Ok(())
    }

    /// The user accepted the privacy notice: create the session and engage
    /// the presentation lock. When full-screen cannot be engaged the
    /// full-screen warning is shown instead and neither the scanner nor the
    /// heartbeat starts until `retry_fullscreen` succeeds (or an
    /// accessibility exemption is engaged).
    pub fn accept_privacy_notice(&self) -> ProctorResult<()> {
        let exam_id = self
            .pending_exam
            .write()
            .take()
            .ok_or(ProctorError::NotActive)?;
        let now = self.clock.now_ms();
        // Fresh session: clear the previous session's log and counters.
        self.force_submitted.store(false, Ordering::Relaxed);
        self.counters.reset();
        self.monitor.reset();
        self.violation_log.write().clear();
        let accessibility = self.accessibility_mode.load(Ordering::Relaxed)
            && self.config.allow_accessibility_exceptions;
        *self.session.write() = Some(IntegritySession {
            exam_id: exam_id.clone(),
            started_at: now,
            active: false,
            accessibility_mode: accessibility,
            fullscreen_supported: self.capabilities.supports_fullscreen(),
            privacy_acknowledged: true,
        });
        info!(exam_id = %exam_id, accessibility, "Privacy notice accepted, session created");

        if accessibility {
            self.restriction.lock_without_fullscreen();
            self.start_monitoring(now);
            return Ok(());
        }
        match self.restriction.lock() {
            LockOutcome::Engaged => self.start_monitoring(now),
            LockOutcome::Degraded(err) => self.show_fullscreen_warning(&err),
        }
        Ok(())
    }

    /// The user declined the privacy notice: the session never starts.
    pub fn decline_privacy_notice(&self) {
        if self.pending_exam.write().take().is_some() {
            info!("Privacy notice declined, integrity mode aborted");
        }
    }

    /// Retry action from the full-screen warning prompt.
    pub fn retry_fullscreen(&self) -> ProctorResult<()> {
        if self.session.read().is_none() {
            return Err(ProctorError::NotActive);
        }
        if self.monitoring_started.load(Ordering::Relaxed) {
            return Ok(());
        }
        match self.restriction.reenter_fullscreen() {
            LockOutcome::Engaged => {
                let now = self.clock.now_ms();
                self.start_monitoring(now);
            }
            LockOutcome::Degraded(err) => self.show_fullscreen_warning(&err),
        }
        Ok(())
    }

    /// Toggle accessibility mode. When enabled (and allowed by
    /// configuration) while session start is blocked on full-screen, the
    /// session proceeds without full-screen enforcement; the exemption is
    /// recorded in every outgoing report.
    pub fn set_accessibility_mode(&self, enabled: bool) {
        self.accessibility_mode.store(enabled, Ordering::Relaxed);
        let engaged = enabled && self.config.allow_accessibility_exceptions;
        let mut bypass = false;
        if let Some(session) = self.session.write().as_mut() {
            session.accessibility_mode = engaged;
            bypass = engaged && !self.monitoring_started.load(Ordering::Relaxed);
        }
        if bypass {
            info!("Accessibility exemption engaged, bypassing fullscreen enforcement");
            self.restriction.lock_without_fullscreen();
            self.start_monitoring(self.clock.now_ms());
        }
    }

    /// The explicit "return to exam" action from the focus-warning prompt.
    pub fn return_to_exam(&self) {
        if !self.monitor.on_return() {
            return;
        }
        self.cancel_grace_task();
        (self.prompts)(&PromptRequest::FocusWarningCleared);
        // Automatic full-screen re-entry before further exits count as new
        // violations.
        let reenter = {
            let session = self.session.read();
            session
                .as_ref()
                .map(|s| s.fullscreen_supported && !s.accessibility_mode)
                .unwrap_or(false)
        };
        if reenter {
            if let LockOutcome::Degraded(err) = self.restriction.reenter_fullscreen() {
                warn!(error = %err, "Automatic fullscreen re-entry failed");
            }
        }
    }

    /// Graceful teardown: every timer and restriction is released and the
    /// session is destroyed. No force-submit fires.
    pub fn exit_integrity_mode(&self) {
        info!("Exiting integrity mode");
        self.monitor.terminate();
        self.teardown();
    }

    // ── Platform signal pump ─────────────────────────────────────────────

    /// Feed one platform signal into the engine. The return value tells the
    /// host whether to suppress the platform's default handling.
    pub fn handle_event(&self, event: PlatformEvent) -> EventDisposition {
        match event {
            PlatformEvent::VisibilityChanged { visible: false } | PlatformEvent::FocusLost => {
                self.on_leave_signal(ViolationKind::Focus);
                EventDisposition::Pass
            }
            PlatformEvent::VisibilityChanged { visible: true } | PlatformEvent::FocusGained => {
                // Recovery requires the explicit return action.
                EventDisposition::Pass
            }
            PlatformEvent::FullscreenChanged { active: false } => {
                // Only a violation while full-screen is actually enforced:
                // accessibility-exempt sessions skip enforcement entirely.
                let enforced = self.restriction.is_locked()
                    && self
                        .session
                        .read()
                        .as_ref()
                        .map(|s| !s.accessibility_mode)
                        .unwrap_or(false);
                if enforced {
                    self.on_leave_signal(ViolationKind::Fullscreen);
                }
                EventDisposition::Pass
            }
            PlatformEvent::FullscreenChanged { active: true } => EventDisposition::Pass,
            PlatformEvent::NetworkOffline => {
                if self.delivery.set_offline() {
                    let now = self.clock.now_ms();
                    if let Some(session) = self.session.read().as_ref() {
                        // Lands in the offline slot by construction; the
                        // collector sees it after reconnect.
                        self.reporter.network_disconnection(session, now);
                    }
                }
                EventDisposition::Pass
            }
            PlatformEvent::NetworkOnline => {
                self.delivery.set_online(self.clock.now_ms());
                EventDisposition::Pass
            }
            PlatformEvent::KeyDown { key, ctrl, alt, shift, meta } => {
                if self.restriction.suppress_key(&key, ctrl, alt, shift, meta) {
                    debug!(key = %key, "Blocked navigation shortcut");
                    EventDisposition::Suppress
                } else {
                    EventDisposition::Pass
                }
            }
            PlatformEvent::ContextMenu => {
                if self.restriction.suppress_context_menu() {
                    EventDisposition::Suppress
                } else {
                    EventDisposition::Pass
                }
            }
        }
    }

    /// Advance the engine clock: runs every scheduled task due at or before
    /// `now_ms`. The host calls this from its timer loop.
    pub fn tick(&self, now_ms: i64) {
        for kind in self.scheduler.run_due(now_ms) {
            match kind {
                TaskKind::GraceTick => self.on_grace_tick(now_ms),
                TaskKind::Scan => self.run_scan(now_ms),
                TaskKind::Heartbeat => self.run_heartbeat(now_ms),
            }
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            session: self.session.read().clone(),
            state: self.monitor.state(),
            focus_violations: self.counters.focus(),
            fullscreen_violations: self.counters.fullscreen(),
            advanced_violations: self.counters.advanced(),
            detection: self.scanner.snapshot(),
            grace: self.monitor.timer(),
            pending_tasks: self.scheduler.pending(),
        }
    }

    pub fn violations(&self) -> Vec<ViolationRecord> {
        self.violation_log.read().clone()
    }

    // ── Internal ─────────────────────────────────────────────────────────

    fn start_monitoring(&self, now_ms: i64) {
        if self.monitoring_started.swap(true, Ordering::Relaxed) {
            return;
        }
        let visibility_supported = self.capabilities.supports_visibility_api();
        {
            let mut session = self.session.write();
            if let Some(session) = session.as_mut() {
                session.active = true;
            }
        }
        self.monitor.activate();
        if let Some(session) = self.session.read().as_ref() {
            self.reporter.handshake(session, visibility_supported, now_ms);
            info!(exam_id = %session.exam_id, "Monitoring started");
        }
        self.scheduler.schedule_every(
            TaskKind::Scan,
            (self.config.scan_interval_secs * 1_000) as i64,
            now_ms,
        );
        self.scheduler.schedule_every(
            TaskKind::Heartbeat,
            (self.config.heartbeat_interval_secs * 1_000) as i64,
            now_ms,
        );
        // One immediate scan on activation.
        self.run_scan(now_ms);
    }

    fn show_fullscreen_warning(&self, err: &ProctorError) {
        let fullscreen_supported = !matches!(err, ProctorError::CapabilityUnsupported(_));
        warn!(error = %err, "Fullscreen not engaged, monitoring start deferred");
        (self.prompts)(&PromptRequest::FullscreenWarning { fullscreen_supported });
    }

    fn on_leave_signal(&self, kind: ViolationKind) {
        if !self.monitoring_started.load(Ordering::Relaxed) {
            return;
        }
        let now = self.clock.now_ms();
        match self.monitor.on_leave(kind, now) {
            LeaveOutcome::GraceStarted { kind, remaining_secs } => {
                self.counters.record(kind);
                self.push_record(ViolationRecord {
                    kind,
                    subtype: None,
                    timestamp: now,
                    details: HashMap::new(),
                });
                let handle = self.scheduler.schedule_every(TaskKind::GraceTick, 1_000, now);
                *self.grace_task.lock() = Some(handle);
                (self.prompts)(&PromptRequest::FocusWarning { remaining_secs });
            }
            LeaveOutcome::AlreadyCounting | LeaveOutcome::Ignored => {}
        }
    }

    fn on_grace_tick(&self, now_ms: i64) {
        match self.monitor.grace_tick(now_ms) {
            GraceTick::Remaining(remaining_secs) => {
                (self.prompts)(&PromptRequest::FocusWarning { remaining_secs });
            }
            GraceTick::Expired => self.force_submit(),
            GraceTick::Idle => self.cancel_grace_task(),
        }
    }

    fn run_scan(&self, now_ms: i64) {
        if self.force_submitted.load(Ordering::Relaxed)
            || !self.monitoring_started.load(Ordering::Relaxed)
        {
            return;
        }
        let result = self.scanner.scan(self.delivery.network());
        // A condition persisting across ticks is recorded on every tick.
        for threat in result.positives {
            self.counters.record(ViolationKind::Advanced);
            self.push_record(ViolationRecord {
                kind: ViolationKind::Advanced,
                subtype: Some(threat.subtype().to_string()),
                timestamp: now_ms,
                details: HashMap::new(),
            });
            if let Some(session) = self.session.read().as_ref() {
                self.reporter.advanced_violation(session, threat, now_ms);
            }
        }
    }

    fn run_heartbeat(&self, now_ms: i64) {
        let session = self.session.read();
        if let Some(session) = session.as_ref().filter(|s| s.active) {
            self.reporter
                .heartbeat(session, &self.counters, self.scanner.snapshot(), now_ms);
        }
    }

    fn force_submit(&self) {
        if self.force_submitted.swap(true, Ordering::Relaxed) {
            return;
        }
        warn!("Grace period expired, forcing submission");
        self.teardown();
        (self.on_force_submit)();
    }

    /// Total, immediate cancellation: every task, restriction, and the
    /// session record itself.
    fn teardown(&self) {
        self.scheduler.cancel_all();
        *self.grace_task.lock() = None;
        self.monitoring_started.store(false, Ordering::Relaxed);
        self.restriction.unlock();
        *self.pending_exam.write() = None;
        let mut session = self.session.write();
        if let Some(session) = session.as_mut() {
            session.active = false;
        }
        *session = None;
    }

    fn cancel_grace_task(&self) {
        if let Some(handle) = self.grace_task.lock().take() {
            self.scheduler.cancel(handle);
        }
    }

    fn push_record(&self, record: ViolationRecord) {
        if self.force_submitted.load(Ordering::Relaxed) {
            return;
        }
        let mut log = self.violation_log.write();
        if log.len() < MAX_RECORDS {
            log.push(record);
        }
    }
}
