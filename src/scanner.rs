//! Advanced Threat Scanner — periodic heuristic sweeps.
//!
//! Every tick evaluates three independent heuristics and reports each
//! positive as its own violation:
//! - developer tools: window chrome delta above threshold, or a timed no-op
//!   log call running suspiciously long;
//! - virtualization: low logical CPU count, a software/VM GL renderer, or a
//!   hypervisor marker in the platform identifier;
//! - screen sharing: a non-committal display-capture probe, where any error
//!   or unavailability counts as "not detected".
//!
//! Signals are heuristic by design: false negatives and positives are
//! expected and the results are advisory. Each tick overwrites the previous
//! `DetectionSnapshot`; a condition persisting across ticks is reported on
//! every tick (no cross-tick deduplication).

use crate::config::MonitorConfig;
use crate::platform::{DisplayCaptureProbe, HardwareInfo, PlatformDom};
use crate::types::{AdvancedThreat, DetectionSnapshot, NetworkStatus};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Renderer substrings indicating a software or virtualized GL stack.
const VM_RENDERER_MARKERS: &[&str] = &[
    "swiftshader",
    "llvmpipe",
    "virtualbox",
    "vmware",
    "mesa offscreen",
    "basic render driver",
];

/// Platform-identifier substrings indicating a hypervisor guest.
const HYPERVISOR_MARKERS: &[&str] = &[
    "qemu",
    "kvm",
    "xen",
    "hyper-v",
    "parallels",
    "bochs",
];

/// Outcome of one scan tick.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub snapshot: DetectionSnapshot,
    /// Every heuristic that came back positive this tick.
    pub positives: Vec<AdvancedThreat>,
}

pub struct ThreatScanner {
    dom: Arc<dyn PlatformDom>,
    hardware: Arc<dyn HardwareInfo>,
    capture_probe: Arc<dyn DisplayCaptureProbe>,
    config: MonitorConfig,
    last_snapshot: RwLock<DetectionSnapshot>,
}

impl ThreatScanner {
    pub fn new(
        dom: Arc<dyn PlatformDom>,
        hardware: Arc<dyn HardwareInfo>,
        capture_probe: Arc<dyn DisplayCaptureProbe>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            dom,
            hardware,
            capture_probe,
            config,
            last_snapshot: RwLock::new(DetectionSnapshot::default()),
        }
    }

    /// Run all heuristics once and overwrite the snapshot.
    pub fn scan(&self, network: NetworkStatus) -> ScanResult {
        let devtools = self.devtools_suspected();
        let virtualization = self.virtualization_suspected();
        let screen_sharing = self.screen_sharing_suspected();

        let snapshot = DetectionSnapshot {
            devtools_suspected: devtools,
            virtualization_suspected: virtualization,
            screen_sharing_suspected: screen_sharing,
            network,
        };
        *self.last_snapshot.write() = snapshot;

        let mut positives = Vec::new();
        if devtools {
            positives.push(AdvancedThreat::Devtools);
        }
        if virtualization {
            positives.push(AdvancedThreat::Virtualization);
        }
        if screen_sharing {
            positives.push(AdvancedThreat::ScreenSharing);
        }

        if positives.is_empty() {
            debug!("Scan tick clean");
        } else {
            warn!(positives = ?positives, "Scan tick raised suspicions");
        }

        ScanResult { snapshot, positives }
    }

    /// Snapshot of the most recent tick.
    pub fn snapshot(&self) -> DetectionSnapshot {
        *self.last_snapshot.read()
    }

    fn devtools_suspected(&self) -> bool {
        let (outer_w, outer_h) = self.dom.outer_size();
        let (inner_w, inner_h) = self.dom.inner_size();
        let threshold = self.config.devtools_size_threshold_px;
        let width_delta = outer_w.saturating_sub(inner_w);
        let height_delta = outer_h.saturating_sub(inner_h);
        if width_delta > threshold || height_delta > threshold {
            return true;
        }
        self.dom.timed_log_ms() > self.config.devtools_log_threshold_ms
    }

    fn virtualization_suspected(&self) -> bool {
        if let Some(cpus) = self.hardware.logical_cpus() {
            if cpus < self.config.min_expected_cpus {
                return true;
            }
        }
        if let Some(renderer) = self.hardware.gl_renderer() {
            let renderer = renderer.to_ascii_lowercase();
            if VM_RENDERER_MARKERS.iter().any(|m| renderer.contains(m)) {
                return true;
            }
        }
        if let Some(platform) = self.hardware.platform_id() {
            let platform = platform.to_ascii_lowercase();
            if HYPERVISOR_MARKERS.iter().any(|m| platform.contains(m)) {
                return true;
            }
        }
        false
    }

    fn screen_sharing_suspected(&self) -> bool {
        // Probe failure means "not detected": this heuristic only ever
        // produces false negatives, never an error.
        match self.capture_probe.probe() {
            Ok(detected) => detected,
            Err(err) => {
                debug!(error = %err, "Display-capture probe unavailable, treating as negative");
                false
            }
        }
    }
}
