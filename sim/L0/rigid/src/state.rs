//! Structure-of-arrays body state indexed by dense solver slot.

use nalgebra::{DVector, Matrix3, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;

/// Per-slot body state.
///
/// Slot `i` of every array belongs to the same body. Slots are assigned when
/// the solver rebuilds and stay fixed until the next rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyState {
    /// Center of mass positions.
    pub positions: Vec<Point3<f64>>,
    /// Orientations.
    pub orientations: Vec<UnitQuaternion<f64>>,
    /// Linear velocities.
    pub velocities: Vec<Vector3<f64>>,
    /// Angular velocities.
    pub angular_velocities: Vec<Vector3<f64>>,
    /// Linear velocities before constraint resolution.
    pub tentative_velocities: Vec<Vector3<f64>>,
    /// Angular velocities before constraint resolution.
    pub tentative_angular_velocities: Vec<Vector3<f64>>,
    /// Accumulated forces.
    pub forces: Vec<Vector3<f64>>,
    /// Accumulated torques.
    pub torques: Vec<Vector3<f64>>,
    /// Static flags.
    pub is_static: Vec<bool>,
    /// Inverse masses.
    pub inv_masses: Vec<f64>,
    /// Inverse inertia tensors.
    pub inv_inertias: Vec<Matrix3<f64>>,
}

impl RigidBodyState {
    /// Empty state with room for `capacity` bodies.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            orientations: Vec::with_capacity(capacity),
            velocities: Vec::with_capacity(capacity),
            angular_velocities: Vec::with_capacity(capacity),
            tentative_velocities: Vec::with_capacity(capacity),
            tentative_angular_velocities: Vec::with_capacity(capacity),
            forces: Vec::with_capacity(capacity),
            torques: Vec::with_capacity(capacity),
            is_static: Vec::with_capacity(capacity),
            inv_masses: Vec::with_capacity(capacity),
            inv_inertias: Vec::with_capacity(capacity),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the state holds no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Append a body in the next slot.
    ///
    /// Tentative velocities start equal to the body velocities.
    pub fn push(&mut self, body: &RigidBody, inv_inertia: Matrix3<f64>) {
        self.positions.push(body.position);
        self.orientations.push(body.orientation);
        self.velocities.push(body.velocity);
        self.angular_velocities.push(body.angular_velocity);
        self.tentative_velocities.push(body.velocity);
        self.tentative_angular_velocities.push(body.angular_velocity);
        self.forces.push(body.force);
        self.torques.push(body.torque);
        self.is_static.push(body.is_static);
        self.inv_masses.push(body.inv_mass());
        self.inv_inertias.push(inv_inertia);
    }

    /// Overwrite slot `slot` with the kinematic fields of `body`.
    pub fn load_kinematics(&mut self, slot: usize, body: &RigidBody) {
        self.positions[slot] = body.position;
        self.orientations[slot] = body.orientation;
        self.velocities[slot] = body.velocity;
        self.angular_velocities[slot] = body.angular_velocity;
        self.tentative_velocities[slot] = body.velocity;
        self.tentative_angular_velocities[slot] = body.angular_velocity;
        self.forces[slot] = body.force;
        self.torques[slot] = body.torque;
        self.is_static[slot] = body.is_static;
    }

    /// Copy slot `slot` into the kinematic fields of `body`.
    pub fn store_kinematics(&self, slot: usize, body: &mut RigidBody) {
        body.position = self.positions[slot];
        body.orientation = self.orientations[slot];
        body.velocity = self.velocities[slot];
        body.angular_velocity = self.angular_velocities[slot];
        body.force = self.forces[slot];
        body.torque = self.torques[slot];
    }

    /// Stack tentative velocities into a `6N` vector, zero for static slots.
    #[must_use]
    pub fn stacked_tentative_velocities(&self) -> DVector<f64> {
        self.stack(&self.tentative_velocities, &self.tentative_angular_velocities)
    }

    /// Stack forces and torques into a `6N` vector, zero for static slots.
    #[must_use]
    pub fn stacked_forces(&self) -> DVector<f64> {
        self.stack(&self.forces, &self.torques)
    }

    fn stack(&self, linear: &[Vector3<f64>], angular: &[Vector3<f64>]) -> DVector<f64> {
        let mut out = DVector::zeros(self.len() * 6);
        for (i, (lin, ang)) in linear.iter().zip(angular).enumerate() {
            if self.is_static[i] {
                continue;
            }
            out.fixed_rows_mut::<3>(i * 6).copy_from(lin);
            out.fixed_rows_mut::<3>(i * 6 + 3).copy_from(ang);
        }
        out
    }
}
