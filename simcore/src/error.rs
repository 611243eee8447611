use thiserror::Error;

/// Errors surfaced by simulation primitives.
///
/// All of them are detected at call time; nothing is retried and the state of the offending
/// container is left unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Quantity is zero, or a withdrawal asks for more than the container can ever hold.
    #[error("invalid request of {quantity} units from a container with capacity {capacity}")]
    InvalidRequest {
        /// Requested quantity.
        quantity: u64,
        /// Capacity of the container.
        capacity: u64,
    },
    /// A deposit would push the level over the capacity.
    #[error("depositing {quantity} units at level {level} exceeds capacity {capacity}")]
    CapacityExceeded {
        /// Deposited quantity.
        quantity: u64,
        /// Level at the time of the deposit.
        level: u64,
        /// Capacity of the container.
        capacity: u64,
    },
    /// A container cannot be created with zero capacity or a level above capacity.
    #[error("invalid container with capacity {capacity} and initial level {level}")]
    InvalidContainer {
        /// Requested capacity.
        capacity: u64,
        /// Requested initial level.
        level: u64,
    },
}
