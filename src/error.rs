use thiserror::Error;

pub type ProctorResult<T> = Result<T, ProctorError>;

/// Failure taxonomy for the integrity engine. None of these are permitted to
/// escape the coordinator boundary as a panic; each maps to a documented
/// degradation path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProctorError {
    /// The platform exposes no variant of the required API. Surfaced as a
    /// user-facing warning, never fatal.
    #[error("capability not supported by platform: {0}")]
    CapabilityUnsupported(&'static str),

    /// The platform or user rejected a full-screen request. Retryable.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The display-capture probe failed. Treated as a negative detection.
    #[error("detection probe failed: {0}")]
    ProbeFailed(String),

    /// Durable offline-queue storage failed. Reduces durability only.
    #[error("offline store failure: {0}")]
    StorageFailed(String),

    /// A report could not be delivered. Retried via the offline queue.
    #[error("delivery failure: {0}")]
    DeliveryFailed(String),

    /// An operation that requires an active session was invoked without one.
    #[error("no active integrity session")]
    NotActive,

    /// A session start was requested while one is already in progress.
    #[error("an integrity session is already in progress")]
    AlreadyActive,
}
