//! Error types for simulation operations.

use thiserror::Error;

use crate::BodyHandle;

/// Errors that can occur while configuring or stepping a solver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// A body's inertia tensor cannot be inverted.
    #[error("inertia tensor of body {handle} is not invertible")]
    SingularInertia {
        /// The offending body.
        handle: BodyHandle,
    },

    /// Handle does not refer to a live body.
    #[error("invalid body handle: {handle}")]
    InvalidHandle {
        /// The stale or out-of-range handle.
        handle: BodyHandle,
    },

    /// A linear system could not be solved.
    #[error("singular matrix: {reason}")]
    SingularMatrix {
        /// Description of where the matrix came from.
        reason: String,
    },

    /// Constraint or mesh topology is malformed.
    #[error("invalid topology: {reason}")]
    InvalidTopology {
        /// Description of what's wrong.
        reason: String,
    },

    /// Buffer or vector lengths disagree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length provided.
        actual: usize,
    },
}

impl SimError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid handle error.
    #[must_use]
    pub fn invalid_handle(handle: BodyHandle) -> Self {
        Self::InvalidHandle { handle }
    }

    /// Create a singular matrix error.
    #[must_use]
    pub fn singular_matrix(reason: impl Into<String>) -> Self {
        Self::SingularMatrix {
            reason: reason.into(),
        }
    }

    /// Create an invalid topology error.
    #[must_use]
    pub fn invalid_topology(reason: impl Into<String>) -> Self {
        Self::InvalidTopology {
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Check if this is a configuration error.
    ///
    /// A singular inertia tensor counts: it is caught at initialize time.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::SingularInertia { .. }
        )
    }

    /// Check if this is a stale or unknown handle.
    #[must_use]
    pub fn is_handle_error(&self) -> bool {
        matches!(self, Self::InvalidHandle { .. })
    }
}
