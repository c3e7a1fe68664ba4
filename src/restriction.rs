//! Restriction Controller — locked presentation mode enforcement.
//!
//! Enters/exits full-screen through the capability adapter, suppresses the
//! context menu, and blocks navigation-style keyboard shortcuts while a
//! session is locked. `lock()` fails soft: an unsupported or rejected
//! full-screen request is reported as a degraded outcome, never thrown; the
//! coordinator decides between warning the user and continuing in
//! accessibility mode.

use crate::capability::CapabilityAdapter;
use crate::error::ProctorError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a lock attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// Full-screen engaged, all suppressions installed.
    Engaged,
    /// Suppressions installed but full-screen could not be engaged.
    Degraded(ProctorError),
}

pub struct RestrictionController {
    capabilities: Arc<CapabilityAdapter>,
    locked: AtomicBool,
}

impl RestrictionController {
    pub fn new(capabilities: Arc<CapabilityAdapter>) -> Self {
        Self {
            capabilities,
            locked: AtomicBool::new(false),
        }
    }

    /// Engage the restricted presentation mode. Context-menu and keyboard
    /// suppression activate regardless of the full-screen outcome.
    pub fn lock(&self) -> LockOutcome {
        self.locked.store(true, Ordering::Relaxed);
        match self.capabilities.request_fullscreen() {
            Ok(()) => {
                debug!("Presentation lock engaged");
                LockOutcome::Engaged
            }
            Err(err) => {
                warn!(error = %err, "Presentation lock degraded");
                LockOutcome::Degraded(err)
            }
        }
    }

    /// Engage the suppressions without any full-screen enforcement. Used
    /// when an accessibility exemption skips full-screen entirely.
    pub fn lock_without_fullscreen(&self) {
        self.locked.store(true, Ordering::Relaxed);
        debug!("Presentation lock engaged without fullscreen (accessibility)");
    }

    /// Re-attempt full-screen while already locked (retry action, or
    /// automatic re-entry after a return from the grace countdown).
    pub fn reenter_fullscreen(&self) -> LockOutcome {
        match self.capabilities.request_fullscreen() {
            Ok(()) => LockOutcome::Engaged,
            Err(err) => LockOutcome::Degraded(err),
        }
    }

    /// Reverse every restriction and exit full-screen if engaged.
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Relaxed);
        if let Err(err) = self.capabilities.exit_fullscreen() {
            // Exit failure leaves the user in full-screen; the browser's own
            // escape path still works, so log and continue.
            warn!(error = %err, "Failed to exit fullscreen during unlock");
        }
        debug!("Presentation lock released");
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Whether a context-menu open should be suppressed right now.
    pub fn suppress_context_menu(&self) -> bool {
        self.is_locked()
    }

    /// Whether a key event should be suppressed right now.
    pub fn suppress_key(&self, key: &str, ctrl: bool, alt: bool, shift: bool, meta: bool) -> bool {
        self.is_locked() && Self::is_blocked_key(key, ctrl, alt, shift, meta)
    }

    /// Pure classification of navigation-style shortcuts blocked while
    /// locked: Escape, F11, Alt+Tab/Cmd+Tab, Alt+F4, Ctrl/Cmd+W, Ctrl/Cmd+N,
    /// Ctrl/Cmd+Shift+Tab.
    pub fn is_blocked_key(key: &str, ctrl: bool, alt: bool, shift: bool, meta: bool) -> bool {
        let accel = ctrl || meta;
        match key {
            "Escape" | "F11" => true,
            "F4" => alt,
            "Tab" => alt || meta || (accel && shift),
            "w" | "W" | "n" | "N" => accel,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ApiVariant, DomFeature, PlatformDom};
    use crate::error::ProctorResult;
    use parking_lot::RwLock;

    struct StubDom {
        fullscreen_supported: bool,
        deny_fullscreen: bool,
        engaged: RwLock<bool>,
    }

    impl StubDom {
        fn new(fullscreen_supported: bool, deny_fullscreen: bool) -> Self {
            Self { fullscreen_supported, deny_fullscreen, engaged: RwLock::new(false) }
        }
    }

    impl PlatformDom for StubDom {
        fn supports(&self, feature: DomFeature, variant: ApiVariant) -> bool {
            matches!(feature, DomFeature::Fullscreen)
                && variant == ApiVariant::Unprefixed
                && self.fullscreen_supported
        }
        fn request_fullscreen(&self, _variant: ApiVariant) -> ProctorResult<()> {
            if self.deny_fullscreen {
                return Err(ProctorError::PermissionDenied("user dismissed".into()));
            }
            *self.engaged.write() = true;
            Ok(())
        }
        fn exit_fullscreen(&self, _variant: ApiVariant) -> ProctorResult<()> {
            *self.engaged.write() = false;
            Ok(())
        }
        fn fullscreen_element_present(&self, _variant: ApiVariant) -> bool {
            *self.engaged.read()
        }
        fn is_document_visible(&self, _variant: ApiVariant) -> bool { true }
        fn outer_size(&self) -> (u32, u32) { (1280, 800) }
        fn inner_size(&self) -> (u32, u32) { (1280, 800) }
        fn timed_log_ms(&self) -> f64 { 0.1 }
    }

    fn controller(fullscreen_supported: bool, deny: bool) -> RestrictionController {
        let dom = Arc::new(StubDom::new(fullscreen_supported, deny));
        let caps = Arc::new(CapabilityAdapter::negotiate(dom));
        RestrictionController::new(caps)
    }

    #[test]
    fn test_lock_engages_when_supported() {
        let rc = controller(true, false);
        assert_eq!(rc.lock(), LockOutcome::Engaged);
        assert!(rc.is_locked());
        assert!(rc.suppress_context_menu());
    }

    #[test]
    fn test_lock_degrades_when_unsupported() {
        let rc = controller(false, false);
        match rc.lock() {
            LockOutcome::Degraded(ProctorError::CapabilityUnsupported(_)) => {}
            other => panic!("expected degraded-unsupported, got {:?}", other),
        }
        // Suppressions still active in degraded mode.
        assert!(rc.is_locked());
    }

    #[test]
    fn test_lock_degrades_when_denied() {
        let rc = controller(true, true);
        match rc.lock() {
            LockOutcome::Degraded(ProctorError::PermissionDenied(_)) => {}
            other => panic!("expected degraded-denied, got {:?}", other),
        }
    }

    #[test]
    fn test_unlock_reverses_everything() {
        let rc = controller(true, false);
        rc.lock();
        rc.unlock();
        assert!(!rc.is_locked());
        assert!(!rc.suppress_context_menu());
        assert!(!rc.suppress_key("Escape", false, false, false, false));
    }

    #[test]
    fn test_blocked_key_matrix() {
        // (key, ctrl, alt, shift, meta, expected)
        let cases = [
            ("Escape", false, false, false, false, true),
            ("F11", false, false, false, false, true),
            ("Tab", false, true, false, false, true),   // Alt+Tab
            ("Tab", false, false, false, true, true),   // Cmd+Tab
            ("F4", false, true, false, false, true),    // Alt+F4
            ("w", true, false, false, false, true),     // Ctrl+W
            ("W", false, false, false, true, true),     // Cmd+W
            ("n", true, false, false, false, true),     // Ctrl+N
            ("Tab", true, false, true, false, true),    // Ctrl+Shift+Tab
            ("Tab", false, false, true, true, true),    // Cmd+Shift+Tab
            ("a", true, false, false, false, false),    // Ctrl+A passes
            ("Tab", false, false, false, false, false), // plain Tab passes
            ("F4", false, false, false, false, false),  // plain F4 passes
        ];
        for (key, ctrl, alt, shift, meta, expected) in cases {
            assert_eq!(
                RestrictionController::is_blocked_key(key, ctrl, alt, shift, meta),
                expected,
                "key={key} ctrl={ctrl} alt={alt} shift={shift} meta={meta}"
            );
        }
    }

    #[test]
    fn test_keys_pass_when_unlocked() {
        let rc = controller(true, false);
        assert!(!rc.suppress_key("Escape", false, false, false, false));
    }
}
