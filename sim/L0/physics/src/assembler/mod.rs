//! Turning narrow-phase contacts into solver constraints.
//!
//! Two assemblers share the same input vocabulary:
//!
//! - [`RigidContactAssembler`] converts point contacts and mesh feature pairs
//!   into [`RbdConstraint`](sim_rigid::RbdConstraint) rows queued on a
//!   [`RigidBodyConstraintSolver`](sim_rigid::RigidBodyConstraintSolver).
//! - [`PbdCollisionAssembler`] converts mesh feature pairs into
//!   [`PbdCollisionConstraint`](sim_deformable::PbdCollisionConstraint)
//!   lists for a [`PbdCollisionSolver`](sim_deformable::PbdCollisionSolver).
//!
//! Element ids index the vertex buffer of the side they belong to.

mod pbd;
mod rigid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use pbd::{CollisionBatch, PbdCollisionAssembler};
pub use rigid::{PointContact, RigidContactAssembler};

/// Mesh element taking part in a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FeatureElement {
    /// A single vertex.
    Vertex(usize),
    /// An edge given by its two vertices.
    Edge([usize; 2]),
    /// A triangle given by its three vertices.
    Triangle([usize; 3]),
}

impl FeatureElement {
    /// Short name used in traces.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Vertex(_) => "vertex",
            Self::Edge(_) => "edge",
            Self::Triangle(_) => "triangle",
        }
    }
}

/// Pair of elements reported in contact, one per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureContact {
    /// Element of body A.
    pub a: FeatureElement,
    /// Element of body B.
    pub b: FeatureElement,
}

impl FeatureContact {
    /// Pair `a` with `b`.
    #[must_use]
    pub const fn new(a: FeatureElement, b: FeatureElement) -> Self {
        Self { a, b }
    }

    /// The same pair seen from body B.
    #[must_use]
    pub const fn swapped(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }
}
