//! Engine configuration — tunable intervals and heuristic thresholds.

use serde::{Deserialize, Serialize};

/// All tunables for one monitoring session. Hosts typically keep the
/// defaults; every threshold here mirrors the collector-side expectations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds the user has to return after a focus/visibility violation
    /// before the exam is force-submitted.
    pub grace_period_secs: u32,
    /// Interval between advanced threat scan ticks, in seconds.
    pub scan_interval_secs: u64,
    /// Interval between heartbeat reports, in seconds.
    pub heartbeat_interval_secs: u64,
    /// Window chrome delta (outer minus inner, px) above which docked
    /// developer tools are suspected.
    pub devtools_size_threshold_px: u32,
    /// Duration (ms) above which a timed no-op log call suggests an attached
    /// debugger/console.
    pub devtools_log_threshold_ms: f64,
    /// Logical CPU count below which virtualization is suspected.
    pub min_expected_cpus: u32,
    /// When true, engaging accessibility mode skips full-screen enforcement
    /// entirely; the exemption is recorded in every outgoing report.
    pub allow_accessibility_exceptions: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 30,
            scan_interval_secs: 60,
            heartbeat_interval_secs: 30,
            devtools_size_threshold_px: 160,
            devtools_log_threshold_ms: 10.0,
            min_expected_cpus: 2,
            allow_accessibility_exceptions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_collector_contract() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.grace_period_secs, 30);
        assert_eq!(cfg.scan_interval_secs, 60);
        assert_eq!(cfg.heartbeat_interval_secs, 30);
        assert_eq!(cfg.devtools_size_threshold_px, 160);
    }

    #[test]
    fn test_config_roundtrip() {
        let cfg = MonitorConfig { allow_accessibility_exceptions: true, ..Default::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: MonitorConfig = serde_json::from_str(&json).unwrap();
        assert!(back.allow_accessibility_exceptions);
        assert_eq!(back.scan_interval_secs, 60);
    }
}
