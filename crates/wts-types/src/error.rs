//! Decoding errors for the range-checked value types.

/// Errors raised when a raw value does not fit one of the closed domains
/// of the turn model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// A phase outside `1..=10`.
    #[error("phase {0} is outside the range 1..=10")]
    PhaseOutOfRange(i64),

    /// A DEFCON level that is not `hidden`, 1, 2, or 3.
    #[error("unknown DEFCON status: {0}")]
    UnknownDefconStatus(String),
}
