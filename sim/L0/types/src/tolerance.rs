//! Numeric tolerances shared by the geometry and solver code.

/// Below this length a direction, axis or segment is treated as degenerate.
pub const GEOM_EPSILON: f64 = 1e-10;

/// Squared-length threshold for degenerate segments.
pub const SEGMENT_EPSILON_SQ: f64 = 1e-20;

/// Relative tolerance used when comparing against machine precision.
pub const DOUBLE_EPS: f64 = f64::EPSILON;

/// Threshold for degenerate PBD constraint configurations (length, area).
pub const CONSTRAINT_EPSILON: f64 = 1e-6;

/// Magnitude below which a sparse entry is dropped.
pub const SPARSE_EPSILON: f64 = 1e-15;
