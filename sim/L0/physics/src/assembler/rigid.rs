//! Contacts to rigid body constraint rows.

use nalgebra::{Point3, Unit, Vector3};
use sim_contact::{edge_to_edge_closest_points, ContactManifold};
use sim_rigid::{BodyHandle, ConstraintBody, RbdConstraint, RigidBodyConstraintSolver};
use sim_types::tolerance::GEOM_EPSILON;
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{FeatureContact, FeatureElement};

/// Contact point on body A with the direction A must move to separate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointContact {
    /// Contact point, on the feature of A.
    pub point: Point3<f64>,
    /// Unit separation direction for A.
    pub normal: Vector3<f64>,
    /// Penetration depth.
    pub depth: f64,
}

impl PointContact {
    /// Resolve a mesh feature pair into a point contact for body A.
    ///
    /// | A | B | normal | depth |
    /// |---|---|---|---|
    /// | vertex | triangle | triangle winding normal | distance behind the plane |
    /// | edge | edge | closest point on A toward B | closest distance |
    /// | edge | vertex | edge toward the vertex | distance to the edge line |
    /// | vertex | edge | vertex toward the edge line | distance to the edge line |
    /// | vertex | vertex | A toward B | distance |
    ///
    /// Returns `None` for other pairs, degenerate geometry, out of range ids,
    /// and a vertex in front of its triangle.
    #[must_use]
    pub fn from_features(
        contact: &FeatureContact,
        vertices_a: &[Point3<f64>],
        vertices_b: &[Point3<f64>],
    ) -> Option<Self> {
        match (contact.a, contact.b) {
            (FeatureElement::Vertex(v), FeatureElement::Triangle(tri)) => {
                let p = *vertices_a.get(v)?;
                let [x0, x1, x2] = gather(vertices_b, tri)?;
                let n = (x1 - x0).cross(&(x2 - x0)).try_normalize(GEOM_EPSILON)?;
                let height = (p - x0).dot(&n);
                (height < 0.0).then_some(Self {
                    point: p,
                    normal: n,
                    depth: -height,
                })
            }
            (FeatureElement::Edge(ea), FeatureElement::Edge(eb)) => {
                let [a0, a1] = gather(vertices_a, ea)?;
                let [b0, b1] = gather(vertices_b, eb)?;
                let closest = edge_to_edge_closest_points(&a0, &a1, &b0, &b1);
                let (normal, depth) = direction(closest.point_b - closest.point_a)?;
                Some(Self {
                    point: closest.point_a,
                    normal,
                    depth,
                })
            }
            (FeatureElement::Edge(edge), FeatureElement::Vertex(v)) => {
                let [e0, e1] = gather(vertices_a, edge)?;
                let p = *vertices_b.get(v)?;
                let (n, l) = offset_from_line(&p, &e0, &e1)?;
                Some(Self {
                    point: p - n * l,
                    normal: n,
                    depth: l,
                })
            }
            (FeatureElement::Vertex(v), FeatureElement::Edge(edge)) => {
                let p = *vertices_a.get(v)?;
                let [e0, e1] = gather(vertices_b, edge)?;
                let (n, l) = offset_from_line(&p, &e0, &e1)?;
                Some(Self {
                    point: p,
                    normal: -n,
                    depth: l,
                })
            }
            (FeatureElement::Vertex(va), FeatureElement::Vertex(vb)) => {
                let a = *vertices_a.get(va)?;
                let b = *vertices_b.get(vb)?;
                let (normal, depth) = direction(b - a)?;
                Some(Self {
                    point: a,
                    normal,
                    depth,
                })
            }
            _ => None,
        }
    }
}

fn gather<const N: usize>(vertices: &[Point3<f64>], ids: [usize; N]) -> Option<[Point3<f64>; N]> {
    let mut out = [Point3::origin(); N];
    for (slot, id) in out.iter_mut().zip(ids) {
        *slot = *vertices.get(id)?;
    }
    Some(out)
}

/// Unit direction and distance from the line through `e0`, `e1` to `p`.
fn offset_from_line(
    p: &Point3<f64>,
    e0: &Point3<f64>,
    e1: &Point3<f64>,
) -> Option<(Vector3<f64>, f64)> {
    let dir = (e1 - e0).try_normalize(GEOM_EPSILON)?;
    let diff = p - e0;
    let perpendicular = diff - dir * dir.dot(&diff);
    direction(perpendicular)
}

/// Unit direction and length of `v`.
fn direction(v: Vector3<f64>) -> Option<(Vector3<f64>, f64)> {
    Unit::try_new_and_get(v, GEOM_EPSILON).map(|(n, l)| (n.into_inner(), l))
}

/// Queues contact and friction rows on a [`RigidBodyConstraintSolver`].
///
/// Every contact becomes one non-penetration row with Baumgarte factor
/// `beta`. When `friction` holds a coefficient, a friction row opposing the
/// sliding velocity is added as well.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidContactAssembler {
    /// Fraction of the penetration removed per step.
    pub beta: f64,
    /// Coulomb coefficient, `None` for frictionless contact.
    pub friction: Option<f64>,
}

impl Default for RigidContactAssembler {
    fn default() -> Self {
        Self {
            beta: 0.05,
            friction: None,
        }
    }
}

impl RigidContactAssembler {
    /// Set the Baumgarte factor.
    #[must_use]
    pub const fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Set the friction coefficient.
    #[must_use]
    pub const fn with_friction(mut self, friction: Option<f64>) -> Self {
        self.friction = friction;
        self
    }

    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error message if `beta` is outside `[0, 1]` or the friction
    /// coefficient is negative or not finite.
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if !(0.0..=1.0).contains(&self.beta) {
            return Err("beta must be in [0, 1]");
        }
        if let Some(mu) = self.friction {
            if !mu.is_finite() || mu < 0.0 {
                return Err("friction coefficient must be finite and non-negative");
            }
        }
        Ok(())
    }

    /// One-way contact pushing `body` along `normal`.
    ///
    /// Returns the number of rows queued, zero if the body is unknown.
    pub fn add_contact(
        &self,
        solver: &mut RigidBodyConstraintSolver,
        body: BodyHandle,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        depth: f64,
    ) -> usize {
        let Some(a) = solver.constraint_body(body) else {
            debug!(%body, "contact on unknown body skipped");
            return 0;
        };
        self.push(solver, &a, None, point, normal, depth)
    }

    /// Two-way contact between bodies of the same solver.
    ///
    /// A single row couples both bodies when both are live. If only one is,
    /// it gets a one-way row, with `-normal` for body B.
    pub fn add_two_way_contact(
        &self,
        solver: &mut RigidBodyConstraintSolver,
        body_a: BodyHandle,
        body_b: BodyHandle,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        depth: f64,
    ) -> usize {
        match (solver.constraint_body(body_a), solver.constraint_body(body_b)) {
            (Some(a), Some(b)) => self.push(solver, &a, Some(&b), point, normal, depth),
            (Some(a), None) => self.push(solver, &a, None, point, normal, depth),
            (None, Some(b)) => self.push(solver, &b, None, point, &-normal, depth),
            (None, None) => {
                debug!(%body_a, %body_b, "contact between unknown bodies skipped");
                0
            }
        }
    }

    /// Contact between bodies owned by two different solvers.
    ///
    /// Each solver gets a one-way row for its own body.
    #[allow(clippy::too_many_arguments)]
    pub fn add_cross_solver_contact(
        &self,
        solver_a: &mut RigidBodyConstraintSolver,
        body_a: BodyHandle,
        solver_b: &mut RigidBodyConstraintSolver,
        body_b: BodyHandle,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        depth: f64,
    ) -> usize {
        self.add_contact(solver_a, body_a, point, normal, depth)
            + self.add_contact(solver_b, body_b, point, &-normal, depth)
    }

    /// Contact from a narrow-phase manifold.
    ///
    /// Uses the manifold's A side. Without `body_b` the contact is one-way.
    pub fn handle_manifold(
        &self,
        solver: &mut RigidBodyConstraintSolver,
        body_a: BodyHandle,
        body_b: Option<BodyHandle>,
        manifold: &ContactManifold,
    ) -> usize {
        match body_b {
            Some(b) => self.add_two_way_contact(
                solver,
                body_a,
                b,
                &manifold.point_a,
                &manifold.normal_a,
                manifold.depth,
            ),
            None => self.add_contact(
                solver,
                body_a,
                &manifold.point_a,
                &manifold.normal_a,
                manifold.depth,
            ),
        }
    }

    /// One-way contacts for `body` from mesh feature pairs.
    ///
    /// `vertices_a` is the mesh of `body`, `vertices_b` the mesh it touches.
    /// Pairs that do not resolve to a [`PointContact`] are skipped.
    pub fn handle_mesh_contacts(
        &self,
        solver: &mut RigidBodyConstraintSolver,
        body: BodyHandle,
        vertices_a: &[Point3<f64>],
        vertices_b: &[Point3<f64>],
        contacts: &[FeatureContact],
    ) -> usize {
        let mut added = 0;
        for contact in contacts {
            match PointContact::from_features(contact, vertices_a, vertices_b) {
                Some(c) => added += self.add_contact(solver, body, &c.point, &c.normal, c.depth),
                None => debug!(
                    a = contact.a.kind(),
                    b = contact.b.kind(),
                    "mesh contact not resolved"
                ),
            }
        }
        trace!(%body, contacts = contacts.len(), rows = added, "mesh contacts queued");
        added
    }

    fn push(
        &self,
        solver: &mut RigidBodyConstraintSolver,
        a: &ConstraintBody,
        b: Option<&ConstraintBody>,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        depth: f64,
    ) -> usize {
        let dt = solver.dt();
        solver.add_constraint(RbdConstraint::contact(
            a, b, point, normal, depth, self.beta, dt,
        ));
        let Some(mu) = self.friction else {
            return 1;
        };
        match RbdConstraint::friction(a, b, point, normal, depth, mu, self.beta, dt) {
            Some(row) => {
                solver.add_constraint(row);
                2
            }
            None => 1,
        }
    }
}
