//! Error types for the orientation fusion engine

/// Result type alias
pub type Result<T> = std::result::Result<T, FusionError>;

/// Orientation fusion error types
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// Matrix operands of different sizes
    #[error("Dimension mismatch: left operand has {left} elements, right has {right}")]
    DimensionMismatch {
        /// Element count of the left operand
        left: usize,
        /// Element count of the right operand
        right: usize,
    },

    /// Flattened matrix whose length is not a perfect square
    #[error("Matrix of {len} elements is not square")]
    NotSquare {
        /// Element count of the operand
        len: usize,
    },

    /// Gravity and magnetic field give no usable reference frame
    #[error("Degenerate orientation: gravity and magnetic field are zero or collinear")]
    DegenerateOrientation,

    /// The periodic fuser thread could not be started
    #[error("Failed to spawn fuser thread: {0}")]
    SchedulerSpawn(#[from] std::io::Error),
}
