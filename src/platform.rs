//! Platform boundary — traits the hosting application implements.
//!
//! The engine never touches browser/OS APIs directly. Full-screen control,
//! page visibility, window metrics, the display-capture probe, hardware
//! facts, durable storage, and the wall clock all arrive through this
//! boundary, so the engine runs identically under a real host and the
//! scripted platform used in tests.

use crate::error::ProctorResult;

/// Vendor-prefix families a platform DOM surface may speak. Negotiation
/// probes them in this exact order and sticks with the first hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ApiVariant {
    Unprefixed,
    Webkit,
    Moz,
    Ms,
}

impl ApiVariant {
    /// Fixed probe order: unprefixed first, then vendor prefixes.
    pub const NEGOTIATION_ORDER: [ApiVariant; 4] = [
        ApiVariant::Unprefixed,
        ApiVariant::Webkit,
        ApiVariant::Moz,
        ApiVariant::Ms,
    ];
}

/// Capabilities that require vendor-variant negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomFeature {
    Fullscreen,
    VisibilityApi,
}

/// The raw, possibly vendor-prefixed DOM surface. Every operation takes the
/// variant selected at negotiation time; implementations for real browsers
/// map each variant onto the corresponding prefixed API (or report it
/// absent).
pub trait PlatformDom: Send + Sync {
    /// Whether this variant of the feature exists at all.
    fn supports(&self, feature: DomFeature, variant: ApiVariant) -> bool;

    /// Request full-screen on the exam container element.
    /// `Err(PermissionDenied)` when the platform/user rejects the request.
    fn request_fullscreen(&self, variant: ApiVariant) -> ProctorResult<()>;

    /// Exit full-screen. Only called while an element is full-screen.
    fn exit_fullscreen(&self, variant: ApiVariant) -> ProctorResult<()>;

    /// Whether some element currently occupies full-screen.
    fn fullscreen_element_present(&self, variant: ApiVariant) -> bool;

    /// Whether the document is currently visible (not hidden/minimized).
    fn is_document_visible(&self, variant: ApiVariant) -> bool;

    /// Window chrome metrics, used by the devtools heuristic.
    fn outer_size(&self) -> (u32, u32);
    fn inner_size(&self) -> (u32, u32);

    /// Execute a no-op console log and report how long it took (ms). An
    /// attached console inspects logged objects and slows this down.
    fn timed_log_ms(&self) -> f64;
}

/// Non-committal display-capture probe. `Ok(true)` means an active capture
/// of this display was observed. Errors and unavailability are treated by
/// the scanner as "not detected" (a documented false negative).
pub trait DisplayCaptureProbe: Send + Sync {
    fn probe(&self) -> ProctorResult<bool>;
}

/// Hardware/environment facts for the virtualization heuristic.
pub trait HardwareInfo: Send + Sync {
    /// Logical CPU count as reported to the page, if available.
    fn logical_cpus(&self) -> Option<u32>;
    /// The WebGL unmasked renderer string, if obtainable.
    fn gl_renderer(&self) -> Option<String>;
    /// The platform identifier string (navigator.platform equivalent).
    fn platform_id(&self) -> Option<String>;
}

/// Durable single-slot storage for the offline queue. Failures are
/// tolerated by the delivery layer; implementations should not panic.
pub trait OfflineStore: Send + Sync {
    fn read(&self) -> ProctorResult<Option<String>>;
    fn write(&self, payload: &str) -> ProctorResult<()>;
    fn clear(&self) -> ProctorResult<()>;
}

/// Wall-clock source. The engine schedules purely off the values fed to it,
/// so tests can drive time explicitly.
pub trait Clock: Send + Sync {
    /// Unix timestamp in milliseconds.
    fn now_ms(&self) -> i64;
}

/// Production clock backed by chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Input signals the host pumps into the coordinator as they occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    VisibilityChanged { visible: bool },
    FocusGained,
    FocusLost,
    FullscreenChanged { active: bool },
    NetworkOnline,
    NetworkOffline,
    KeyDown { key: String, ctrl: bool, alt: bool, shift: bool, meta: bool },
    ContextMenu,
}
