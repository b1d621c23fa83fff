//! Error types for the world model.

use std::fmt;

/// Error type for batch construction and model entry points.
#[derive(Debug)]
pub enum ModelError {
    /// A tensor or buffer does not match the configured dimensions.
    ShapeMismatch {
        /// What was being checked (e.g. "action size").
        what: &'static str,
        /// Size implied by the configuration.
        expected: usize,
        /// Size actually provided.
        actual: usize,
    },
    /// The batch contains no time steps.
    EmptyBatch,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::ShapeMismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "shape mismatch for {}: expected {}, got {}",
                what, expected, actual
            ),
            ModelError::EmptyBatch => write!(f, "batch contains no time steps"),
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let err = ModelError::ShapeMismatch {
            what: "action size",
            expected: 4,
            actual: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("action size"));
        assert!(msg.contains("expected 4"));
        assert!(msg.contains("got 3"));
    }

    #[test]
    fn test_empty_batch_display() {
        let msg = format!("{}", ModelError::EmptyBatch);
        assert!(msg.contains("no time steps"));
    }
}
