//! Velocity-level rigid body constraints.
//!
//! Each [`RbdConstraint`] contributes one row to the global Jacobian. Its
//! 3x4 block holds the linear and angular Jacobian of body A in columns 0
//! and 1 and those of body B in columns 2 and 3. Bodies are referenced by
//! [`BodyHandle`]; a missing body contributes nothing.

use nalgebra::{Matrix3x4, Point3, Vector3};
use sim_types::tolerance::GEOM_EPSILON;
use sim_types::BodyHandle;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;

/// Snapshot of a constrained body taken when the constraint is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintBody {
    /// Handle of the body.
    pub handle: BodyHandle,
    /// Center of mass.
    pub center: Point3<f64>,
    /// Linear velocity.
    pub velocity: Vector3<f64>,
    /// Angular velocity.
    pub angular_velocity: Vector3<f64>,
}

impl ConstraintBody {
    /// Snapshot `body` under `handle`.
    #[must_use]
    pub fn new(handle: BodyHandle, body: &RigidBody) -> Self {
        Self {
            handle,
            center: body.position,
            velocity: body.velocity,
            angular_velocity: body.angular_velocity,
        }
    }

    fn point_velocity(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.velocity + self.angular_velocity.cross(&(point - self.center))
    }
}

/// One row of the rigid body constraint system.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RbdConstraint {
    /// Jacobian block: `[lin_a, ang_a, lin_b, ang_b]`.
    pub jacobian: Matrix3x4<f64>,
    /// First body.
    pub body_a: Option<BodyHandle>,
    /// Second body.
    pub body_b: Option<BodyHandle>,
    /// Target velocity along the constraint row.
    pub vu: f64,
    /// Bounds `(min, max)` on the constraint force.
    pub range: (f64, f64),
}

impl RbdConstraint {
    /// Non-penetration contact.
    ///
    /// `normal` is the direction body A must move to separate. Body B, when
    /// present, is pushed along `-normal`. The target velocity
    /// `depth * beta / dt` is a Baumgarte push-out.
    #[must_use]
    pub fn contact(
        body_a: &ConstraintBody,
        body_b: Option<&ConstraintBody>,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        depth: f64,
        beta: f64,
        dt: f64,
    ) -> Self {
        let n = normal.try_normalize(GEOM_EPSILON).unwrap_or_else(Vector3::zeros);
        let mut jacobian = Matrix3x4::zeros();
        jacobian.set_column(0, &n);
        jacobian.set_column(1, &(point - body_a.center).cross(&n));
        if let Some(b) = body_b {
            jacobian.set_column(2, &-n);
            jacobian.set_column(3, &-(point - b.center).cross(&n));
        }

        Self {
            jacobian,
            body_a: Some(body_a.handle),
            body_b: body_b.map(|b| b.handle),
            vu: depth * beta / dt,
            range: (0.0, f64::INFINITY),
        }
    }

    /// Coulomb friction row opposing the relative sliding velocity.
    ///
    /// Returns `None` when the tangential speed is negligible. The force
    /// bound `mu * depth * beta / dt` scales with the contact push-out.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn friction(
        body_a: &ConstraintBody,
        body_b: Option<&ConstraintBody>,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        depth: f64,
        mu: f64,
        beta: f64,
        dt: f64,
    ) -> Option<Self> {
        let n = normal.try_normalize(GEOM_EPSILON)?;
        let mut rel = body_a.point_velocity(point);
        if let Some(b) = body_b {
            rel -= b.point_velocity(point);
        }
        let tangential = rel - n * rel.dot(&n);
        let t = -tangential.try_normalize(GEOM_EPSILON)?;

        let mut jacobian = Matrix3x4::zeros();
        jacobian.set_column(0, &t);
        jacobian.set_column(1, &(point - body_a.center).cross(&t));
        if let Some(b) = body_b {
            jacobian.set_column(2, &-t);
            jacobian.set_column(3, &-(point - b.center).cross(&t));
        }

        Some(Self {
            jacobian,
            body_a: Some(body_a.handle),
            body_b: body_b.map(|b| b.handle),
            vu: 0.0,
            range: (0.0, mu * depth * beta / dt),
        })
    }

    /// Linear Jacobian of body A.
    #[must_use]
    pub fn linear_a(&self) -> Vector3<f64> {
        self.jacobian.column(0).into_owned()
    }

    /// Angular Jacobian of body A.
    #[must_use]
    pub fn angular_a(&self) -> Vector3<f64> {
        self.jacobian.column(1).into_owned()
    }

    /// Linear Jacobian of body B.
    #[must_use]
    pub fn linear_b(&self) -> Vector3<f64> {
        self.jacobian.column(2).into_owned()
    }

    /// Angular Jacobian of body B.
    #[must_use]
    pub fn angular_b(&self) -> Vector3<f64> {
        self.jacobian.column(3).into_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn snapshot(index: u32, center: Point3<f64>, velocity: Vector3<f64>) -> ConstraintBody {
        ConstraintBody {
            handle: BodyHandle::new(index, 0),
            center,
            velocity,
            angular_velocity: Vector3::zeros(),
        }
    }

    #[test]
    fn test_one_way_contact() {
        let a = snapshot(0, Point3::new(0.0, 0.5, 0.0), Vector3::zeros());
        let c = RbdConstraint::contact(
            &a,
            None,
            &Point3::new(0.5, 0.0, 0.0),
            &Vector3::y(),
            0.1,
            0.2,
            0.01,
        );
        assert_relative_eq!(c.linear_a(), Vector3::y(), epsilon = 1e-12);
        // r = (0.5, -0.5, 0), r x n = (0, 0, 0.5)
        assert_relative_eq!(c.angular_a(), Vector3::new(0.0, 0.0, 0.5), epsilon = 1e-12);
        assert_eq!(c.linear_b(), Vector3::zeros());
        assert_relative_eq!(c.vu, 2.0, epsilon = 1e-12);
        assert_eq!(c.range, (0.0, f64::INFINITY));
        assert!(c.body_b.is_none());
    }

    #[test]
    fn test_two_way_contact_is_antisymmetric() {
        let a = snapshot(0, Point3::new(0.0, 1.0, 0.0), Vector3::zeros());
        let b = snapshot(1, Point3::new(0.0, -1.0, 0.0), Vector3::zeros());
        let c = RbdConstraint::contact(&a, Some(&b), &Point3::origin(), &Vector3::y(), 0.0, 0.2, 0.01);
        assert_relative_eq!(c.linear_b(), -Vector3::y(), epsilon = 1e-12);
        assert_eq!(c.body_b, Some(b.handle));
    }

    #[test]
    fn test_friction_opposes_sliding() {
        let a = snapshot(0, Point3::new(0.0, 0.5, 0.0), Vector3::new(2.0, -1.0, 0.0));
        let f = RbdConstraint::friction(
            &a,
            None,
            &Point3::origin(),
            &Vector3::y(),
            0.1,
            0.5,
            0.2,
            0.01,
        )
        .unwrap();
        assert_relative_eq!(f.linear_a(), -Vector3::x(), epsilon = 1e-12);
        assert_eq!(f.vu, 0.0);
        assert_relative_eq!(f.range.1, 0.5 * 0.1 * 0.2 / 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_friction_skipped_without_sliding() {
        let a = snapshot(0, Point3::new(0.0, 0.5, 0.0), Vector3::new(0.0, -1.0, 0.0));
        assert!(RbdConstraint::friction(
            &a,
            None,
            &Point3::origin(),
            &Vector3::y(),
            0.1,
            0.5,
            0.2,
            0.01
        )
        .is_none());
    }
}
