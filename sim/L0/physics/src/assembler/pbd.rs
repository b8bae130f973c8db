//! Contacts to position-based collision constraints.

use sim_deformable::{
    CollisionParams, EdgeEdgeConstraint, PbdCollisionConstraint, PbdCollisionSolver,
    PointEdgeConstraint, PointPointConstraint, PointTriangleConstraint,
};
use sim_types::Result;
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{FeatureContact, FeatureElement};

type BoxedCollision = Box<dyn PbdCollisionConstraint>;

/// Collision constraints split by which body holds the leading element.
///
/// Constraint kinds always take the lower-dimensional element on their A
/// side, so triangle-vertex and edge-vertex pairs are built with the bodies
/// swapped and land in `b_to_a`.
#[derive(Debug, Default)]
pub struct CollisionBatch {
    /// Constraints with body A as their A side.
    pub a_to_b: Vec<BoxedCollision>,
    /// Constraints with body B as their A side.
    pub b_to_a: Vec<BoxedCollision>,
}

impl CollisionBatch {
    /// Total number of constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.a_to_b.len() + self.b_to_a.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register both lists with `solver`, skipping empty ones.
    ///
    /// `body_a` and `body_b` are ids returned by
    /// [`PbdCollisionSolver::add_body`].
    ///
    /// # Errors
    ///
    /// Propagates [`SimError::InvalidTopology`](sim_types::SimError) for
    /// unknown or identical ids.
    pub fn submit(
        self,
        solver: &mut PbdCollisionSolver<'_>,
        body_a: usize,
        body_b: usize,
    ) -> Result<()> {
        if !self.a_to_b.is_empty() {
            solver.add_collision_constraints_between(self.a_to_b, body_a, body_b)?;
        }
        if !self.b_to_a.is_empty() {
            solver.add_collision_constraints_between(self.b_to_a, body_b, body_a)?;
        }
        Ok(())
    }
}

/// Builds PBD collision constraints from mesh feature pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PbdCollisionAssembler {
    /// Correction scale applied to body A.
    pub stiffness_a: f64,
    /// Correction scale applied to body B.
    pub stiffness_b: f64,
    /// Separation below which a constraint activates.
    pub proximity: f64,
}

impl Default for PbdCollisionAssembler {
    fn default() -> Self {
        let params = CollisionParams::default();
        Self {
            stiffness_a: params.stiffness[0],
            stiffness_b: params.stiffness[1],
            proximity: params.proximity,
        }
    }
}

impl PbdCollisionAssembler {
    /// Set both stiffnesses.
    #[must_use]
    pub const fn with_stiffness(mut self, stiffness_a: f64, stiffness_b: f64) -> Self {
        self.stiffness_a = stiffness_a;
        self.stiffness_b = stiffness_b;
        self
    }

    /// Set the proximity.
    #[must_use]
    pub const fn with_proximity(mut self, proximity: f64) -> Self {
        self.proximity = proximity;
        self
    }

    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error message if a stiffness is outside `[0, 1]` or the
    /// proximity is negative.
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if !(0.0..=1.0).contains(&self.stiffness_a) || !(0.0..=1.0).contains(&self.stiffness_b) {
            return Err("stiffness must be in [0, 1]");
        }
        if self.proximity.is_nan() || self.proximity < 0.0 {
            return Err("proximity must be non-negative");
        }
        Ok(())
    }

    fn params(&self, swapped: bool) -> CollisionParams {
        let stiffness = if swapped {
            [self.stiffness_b, self.stiffness_a]
        } else {
            [self.stiffness_a, self.stiffness_b]
        };
        CollisionParams {
            stiffness,
            proximity: self.proximity,
        }
    }

    /// Constraint for a single pair, with A as its leading side.
    ///
    /// Returns `None` for pairs without a matching constraint kind.
    #[must_use]
    pub fn constraint(&self, contact: &FeatureContact) -> Option<BoxedCollision> {
        self.dispatch(contact, false)
    }

    fn dispatch(&self, contact: &FeatureContact, swapped: bool) -> Option<BoxedCollision> {
        let params = self.params(swapped);
        let constraint: BoxedCollision = match (contact.a, contact.b) {
            (FeatureElement::Vertex(a), FeatureElement::Vertex(b)) => {
                Box::new(PointPointConstraint::new(a, b, params))
            }
            (FeatureElement::Vertex(v), FeatureElement::Edge(e)) => {
                Box::new(PointEdgeConstraint::new(v, e, params))
            }
            (FeatureElement::Edge(a), FeatureElement::Edge(b)) => {
                Box::new(EdgeEdgeConstraint::new(a, b, params))
            }
            (FeatureElement::Vertex(v), FeatureElement::Triangle(t)) => {
                Box::new(PointTriangleConstraint::new(v, t, params))
            }
            _ => return None,
        };
        Some(constraint)
    }

    /// Build constraints for every supported pair.
    ///
    /// Edge-vertex and triangle-vertex pairs are built from B's side.
    /// Pairs with no constraint kind are skipped.
    #[must_use]
    pub fn assemble(&self, contacts: &[FeatureContact]) -> CollisionBatch {
        let mut batch = CollisionBatch::default();
        for contact in contacts {
            let swap = matches!(
                (contact.a, contact.b),
                (FeatureElement::Edge(_) | FeatureElement::Triangle(_), FeatureElement::Vertex(_))
            );
            let built = if swap {
                self.dispatch(&contact.swapped(), true)
            } else {
                self.dispatch(contact, false)
            };
            match (built, swap) {
                (Some(c), false) => batch.a_to_b.push(c),
                (Some(c), true) => batch.b_to_a.push(c),
                (None, _) => debug!(
                    a = contact.a.kind(),
                    b = contact.b.kind(),
                    "no collision constraint for pair"
                ),
            }
        }
        trace!(
            contacts = contacts.len(),
            a_to_b = batch.a_to_b.len(),
            b_to_a = batch.b_to_a.len(),
            "collision constraints assembled"
        );
        batch
    }
}
