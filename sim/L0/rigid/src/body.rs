//! Rigid body description.

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid body owned by the
/// [`RigidBodyConstraintSolver`](crate::RigidBodyConstraintSolver).
///
/// Kinematic fields mirror the solver state: they are written back after
/// every step, and edits made through
/// [`body_mut`](crate::RigidBodyConstraintSolver::body_mut) are pulled into
/// the state before the next step. Mass and inertia edits take effect on
/// [`update_mass`](crate::RigidBodyConstraintSolver::update_mass).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBody {
    /// Mass. Zero means infinite mass (inverse mass 0).
    pub mass: f64,
    /// Inertia tensor in world frame.
    pub inertia: Matrix3<f64>,
    /// Center of mass position.
    pub position: Point3<f64>,
    /// Orientation.
    pub orientation: UnitQuaternion<f64>,
    /// Linear velocity.
    pub velocity: Vector3<f64>,
    /// Angular velocity.
    pub angular_velocity: Vector3<f64>,
    /// Accumulated force, cleared after integration.
    pub force: Vector3<f64>,
    /// Accumulated torque, cleared after integration.
    pub torque: Vector3<f64>,
    /// Static bodies never move and have zero inverse mass.
    pub is_static: bool,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            mass: 1.0,
            inertia: Matrix3::identity(),
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            is_static: false,
        }
    }
}

impl RigidBody {
    /// Dynamic body with the given mass and inertia, at rest at `position`.
    #[must_use]
    pub fn new(mass: f64, inertia: Matrix3<f64>, position: Point3<f64>) -> Self {
        Self {
            mass,
            inertia,
            position,
            ..Self::default()
        }
    }

    /// Static body at `position`.
    #[must_use]
    pub fn new_static(position: Point3<f64>) -> Self {
        Self {
            mass: 0.0,
            position,
            is_static: true,
            ..Self::default()
        }
    }

    /// Solid sphere of uniform density.
    #[must_use]
    pub fn sphere(mass: f64, radius: f64, position: Point3<f64>) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self::new(mass, Matrix3::from_diagonal_element(i), position)
    }

    /// Set the initial linear velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the initial angular velocity.
    #[must_use]
    pub fn with_angular_velocity(mut self, angular_velocity: Vector3<f64>) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Set the orientation.
    #[must_use]
    pub fn with_orientation(mut self, orientation: UnitQuaternion<f64>) -> Self {
        self.orientation = orientation;
        self
    }

    /// Inverse mass, 0 for static or massless bodies.
    #[must_use]
    pub fn inv_mass(&self) -> f64 {
        if self.is_static || self.mass == 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Inverse inertia tensor, `None` when the tensor is singular.
    #[must_use]
    pub fn inv_inertia(&self) -> Option<Matrix3<f64>> {
        if self.inertia.determinant() == 0.0 {
            return None;
        }
        self.inertia.try_inverse()
    }

    /// Velocity of the material point at `point`.
    #[must_use]
    pub fn point_velocity(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.velocity + self.angular_velocity.cross(&(point - self.position))
    }
}
