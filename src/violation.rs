//! Violation Classifier & Grace Timer — the per-session state machine.
//!
//! Classifies loss of focus/visibility/full-screen into violations and
//! drives the countdown-to-forced-submission:
//!
//! Inactive → Active           on successful lock (or accessibility bypass)
//! Active → GraceCountdown     on visibility/focus/full-screen loss
//! GraceCountdown → Active     on the explicit "return" action before expiry
//! GraceCountdown → Terminated when the countdown reaches zero
//!
//! Exactly one counter increment per entry into GraceCountdown, no matter
//! how many underlying events fire during that cycle; the coordinator (the
//! sole counter owner) performs the increment when told a cycle started.

use crate::types::ViolationKind;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Session monitoring states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorState {
    Inactive,
    Active,
    GraceCountdown,
    Terminated,
}

/// The countdown. At most one is active per session; a new start replaces
/// (restarts) a finished cycle rather than stacking on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GraceTimer {
    pub remaining_secs: u32,
    pub deadline_ms: i64,
    pub active: bool,
}

impl GraceTimer {
    fn idle() -> Self {
        Self { remaining_secs: 0, deadline_ms: 0, active: false }
    }
}

/// What a leave signal (visibility/focus/full-screen loss) amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// A new grace cycle began; the coordinator must increment the counter
    /// for `kind` and surface the countdown.
    GraceStarted { kind: ViolationKind, remaining_secs: u32 },
    /// A cycle is already counting; debounced, no new increment.
    AlreadyCounting,
    /// The session is not in a state where leaving matters.
    Ignored,
}

/// What one countdown tick amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraceTick {
    Remaining(u32),
    /// Countdown hit zero: the session terminated; force-submit must fire.
    Expired,
    /// No countdown running.
    Idle,
}

pub struct ViolationMonitor {
    state: RwLock<MonitorState>,
    timer: RwLock<GraceTimer>,
    grace_period_secs: u32,
}

impl ViolationMonitor {
    pub fn new(grace_period_secs: u32) -> Self {
        Self {
            state: RwLock::new(MonitorState::Inactive),
            timer: RwLock::new(GraceTimer::idle()),
            grace_period_secs,
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state.read()
    }

    pub fn timer(&self) -> GraceTimer {
        *self.timer.read()
    }

    /// Inactive → Active. Idempotent for repeated activation attempts.
    pub fn activate(&self) {
        let mut state = self.state.write();
        if *state == MonitorState::Inactive {
            *state = MonitorState::Active;
            debug!("Violation monitor active");
        }
    }

    /// Classify a leave signal at `now_ms`.
    pub fn on_leave(&self, kind: ViolationKind, now_ms: i64) -> LeaveOutcome {
        let mut state = self.state.write();
        match *state {
            MonitorState::Active => {
                *state = MonitorState::GraceCountdown;
                let remaining = self.grace_period_secs;
                *self.timer.write() = GraceTimer {
                    remaining_secs: remaining,
                    deadline_ms: now_ms + i64::from(remaining) * 1_000,
                    active: true,
                };
                warn!(kind = ?kind, remaining_secs = remaining, "Grace countdown started");
                LeaveOutcome::GraceStarted { kind, remaining_secs: remaining }
            }
            MonitorState::GraceCountdown => LeaveOutcome::AlreadyCounting,
            MonitorState::Inactive | MonitorState::Terminated => LeaveOutcome::Ignored,
        }
    }

    /// The explicit "return" action. True when a countdown was actually
    /// cleared (GraceCountdown → Active).
    pub fn on_return(&self) -> bool {
        let mut state = self.state.write();
        if *state == MonitorState::GraceCountdown {
            *state = MonitorState::Active;
            *self.timer.write() = GraceTimer::idle();
            debug!("Returned before grace expiry, countdown cleared");
            true
        } else {
            false
        }
    }

    /// Advance the countdown to `now_ms`.
    pub fn grace_tick(&self, now_ms: i64) -> GraceTick {
        let mut state = self.state.write();
        if *state != MonitorState::GraceCountdown {
            return GraceTick::Idle;
        }
        let mut timer = self.timer.write();
        let remaining_ms = timer.deadline_ms - now_ms;
        if remaining_ms <= 0 {
            *state = MonitorState::Terminated;
            *timer = GraceTimer::idle();
            warn!("Grace countdown expired");
            return GraceTick::Expired;
        }
        // Ceil to whole seconds so the prompt never shows 0 while time is left.
        let remaining_secs = ((remaining_ms + 999) / 1_000) as u32;
        timer.remaining_secs = remaining_secs;
        GraceTick::Remaining(remaining_secs)
    }

    /// Force the terminal state (graceful exit or forced submission).
    pub fn terminate(&self) {
        *self.state.write() = MonitorState::Terminated;
        *self.timer.write() = GraceTimer::idle();
    }

    /// Back to Inactive for a fresh session.
    pub fn reset(&self) {
        *self.state.write() = MonitorState::Inactive;
        *self.timer.write() = GraceTimer::idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_ignores_leave() {
        let vm = ViolationMonitor::new(30);
        assert_eq!(vm.on_leave(ViolationKind::Focus, 0), LeaveOutcome::Ignored);
        assert_eq!(vm.state(), MonitorState::Inactive);
    }

    #[test]
    fn test_leave_starts_grace_once() {
        let vm = ViolationMonitor::new(30);
        vm.activate();
        let outcome = vm.on_leave(ViolationKind::Focus, 1_000);
        assert_eq!(
            outcome,
            LeaveOutcome::GraceStarted { kind: ViolationKind::Focus, remaining_secs: 30 }
        );
        // Further leave events during the cycle are debounced.
        assert_eq!(vm.on_leave(ViolationKind::Fullscreen, 2_000), LeaveOutcome::AlreadyCounting);
        assert_eq!(vm.on_leave(ViolationKind::Focus, 3_000), LeaveOutcome::AlreadyCounting);
        assert_eq!(vm.state(), MonitorState::GraceCountdown);
        assert!(vm.timer().active);
        assert_eq!(vm.timer().deadline_ms, 31_000);
    }

    #[test]
    fn test_return_clears_countdown_and_rearms() {
        let vm = ViolationMonitor::new(30);
        vm.activate();
        vm.on_leave(ViolationKind::Focus, 0);
        assert!(vm.on_return());
        assert_eq!(vm.state(), MonitorState::Active);
        assert!(!vm.timer().active);
        // A second leave starts a fresh cycle (replace, not stack).
        let outcome = vm.on_leave(ViolationKind::Fullscreen, 10_000);
        assert_eq!(
            outcome,
            LeaveOutcome::GraceStarted { kind: ViolationKind::Fullscreen, remaining_secs: 30 }
        );
        assert_eq!(vm.timer().deadline_ms, 40_000);
    }

    #[test]
    fn test_return_without_countdown_is_noop() {
        let vm = ViolationMonitor::new(30);
        vm.activate();
        assert!(!vm.on_return());
        assert_eq!(vm.state(), MonitorState::Active);
    }

    #[test]
    fn test_countdown_ticks_to_expiry() {
        let vm = ViolationMonitor::new(30);
        vm.activate();
        vm.on_leave(ViolationKind::Focus, 0);
        assert_eq!(vm.grace_tick(1_000), GraceTick::Remaining(29));
        assert_eq!(vm.grace_tick(29_500), GraceTick::Remaining(1));
        assert_eq!(vm.grace_tick(30_000), GraceTick::Expired);
        assert_eq!(vm.state(), MonitorState::Terminated);
        // Terminated: leave and tick are both inert.
        assert_eq!(vm.on_leave(ViolationKind::Focus, 31_000), LeaveOutcome::Ignored);
        assert_eq!(vm.grace_tick(31_000), GraceTick::Idle);
    }

    #[test]
    fn test_tick_without_countdown_is_idle() {
        let vm = ViolationMonitor::new(30);
        vm.activate();
        assert_eq!(vm.grace_tick(5_000), GraceTick::Idle);
    }

    #[test]
    fn test_reset_rearms_after_termination() {
        let vm = ViolationMonitor::new(30);
        vm.activate();
        vm.terminate();
        vm.reset();
        assert_eq!(vm.state(), MonitorState::Inactive);
        vm.activate();
        assert_eq!(vm.state(), MonitorState::Active);
    }

    #[test]
    fn test_terminate_is_terminal() {
        let vm = ViolationMonitor::new(30);
        vm.activate();
        vm.terminate();
        assert_eq!(vm.state(), MonitorState::Terminated);
        assert_eq!(vm.on_leave(ViolationKind::Focus, 0), LeaveOutcome::Ignored);
    }
}
