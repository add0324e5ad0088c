//! Error types for PrizeForge

use thiserror::Error;

/// Fault reported by a persistence backend.
///
/// Both variants are transient: the caller may retry the whole draw with
/// the same participation id and the idempotency claim guarantees the
/// retry converges on a single recorded outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend did not answer within its deadline.
    #[error("store timeout: {0}")]
    Timeout(String),

    /// The backend refused or could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Why the anti-fraud gate rejected a participation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The identity drew for this campaign within the cooldown window.
    #[error("cooldown window not elapsed")]
    Cooldown,

    /// The identity reached the campaign's participation cap.
    #[error("max participations reached")]
    LimitReached,
}

/// Engine error type
///
/// Only validation failures, anti-fraud rejections and infrastructure
/// faults cross the public boundary. Reservation races and stock
/// exhaustion are resolved inside the orchestrator and never surface
/// here.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed campaign or draw input; rejected before any resolver
    /// runs, with no side effects.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Anti-fraud rejection; fails closed, no stock touched.
    #[error("participation rejected: {0}")]
    RateLimited(RejectReason),

    /// Transient persistence fault; retryable, no outcome fabricated.
    #[error("persistence fault: {0}")]
    Persistence(#[from] StoreError),

    /// The secure random source failed. The draw aborts rather than
    /// falling back to a predictable generator.
    #[error("secure random source unavailable")]
    RngUnavailable,
}

/// Result type alias
pub type EngineResult<T> = Result<T, EngineError>;
