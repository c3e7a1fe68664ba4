//! # Proctor Sentinel — Exam-integrity monitoring engine
//!
//! A client-side proctoring core that locks an exam into a restricted
//! presentation mode, detects attempts to leave it, runs a
//! countdown-to-auto-submit grace period, performs periodic heuristic
//! threat scans (developer tools, virtualization, screen capture), and
//! resiliently reports violations to a remote collector across network
//! interruptions.
//!
//! Subsystems:
//! - **Capability Adapter** — one unprefixed surface over vendor-prefixed
//!   platform APIs, negotiated once at startup
//! - **Restriction Controller** — locked presentation mode: full-screen,
//!   context-menu suppression, navigation-shortcut blocking
//! - **Violation Classifier & Grace Timer** — the per-session state machine
//!   driving the 30 s countdown to forced submission
//! - **Advanced Threat Scanner** — periodic devtools / virtualization /
//!   screen-sharing heuristics
//! - **Delivery Resilience Layer** — connectivity tracking and a single-slot
//!   durable offline queue
//! - **Session Heartbeat & Reporter** — handshake and periodic state
//!   snapshots to the collector
//! - **Integrity Coordinator** — session lifecycle, counters, and the public
//!   control surface
//!
//! Detection is best-effort and heuristic: false negatives and positives
//! are expected, and nothing here is tamper-proof. The engine is
//! platform-agnostic; hosts implement the traits in [`platform`] and pump
//! events and clock ticks into the [`coordinator::IntegrityCoordinator`].

pub mod capability;
pub mod config;
pub mod coordinator;
pub mod delivery;
pub mod error;
pub mod heartbeat;
pub mod platform;
pub mod restriction;
pub mod scanner;
pub mod scheduler;
pub mod types;
pub mod violation;

pub use config::MonitorConfig;
pub use coordinator::{
    CoordinatorCallbacks, EventDisposition, IntegrityCoordinator, MonitorStatus, PlatformHandles,
};
pub use error::{ProctorError, ProctorResult};
pub use types::{
    AdvancedThreat, DetectionSnapshot, EventType, IntegrityEvent, IntegritySession, NetworkStatus,
    PromptRequest, ViolationKind, ViolationRecord,
};
pub use violation::MonitorState;
