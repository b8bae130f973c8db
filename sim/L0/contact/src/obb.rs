//! Oriented bounding box tests.

use nalgebra::{Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::manifold::ContactManifold;

/// Oriented box given by its center, orientation and half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Obb {
    /// Box center in world space.
    pub center: Point3<f64>,
    /// Rotation from box space to world space.
    pub rotation: UnitQuaternion<f64>,
    /// Half extents along the box axes.
    pub half_extents: Vector3<f64>,
}

impl Obb {
    /// Create a box.
    #[must_use]
    pub fn new(center: Point3<f64>, rotation: UnitQuaternion<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            center,
            rotation,
            half_extents,
        }
    }

    /// Axis-aligned box.
    #[must_use]
    pub fn axis_aligned(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self::new(center, UnitQuaternion::identity(), half_extents)
    }

    /// World-space direction of box axis `i` (0, 1 or 2).
    #[must_use]
    pub fn axis(&self, i: usize) -> Vector3<f64> {
        let mut local = Vector3::zeros();
        local[i.min(2)] = 1.0;
        self.rotation * local
    }

    /// Express a world point in box space.
    #[must_use]
    pub fn to_local(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(&(point - self.center))
    }

    /// Express a world direction in box space.
    #[must_use]
    pub fn to_local_dir(&self, dir: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(dir)
    }
}

/// Box A against point B.
///
/// A point inside the box is pushed out through the nearest face.
#[must_use]
pub fn test_obb_to_point(obb: &Obb, point: &Point3<f64>) -> Option<ContactManifold> {
    let local = obb.to_local(point);
    if (0..3).any(|i| local[i].abs() >= obb.half_extents[i]) {
        return None;
    }

    let mut best_axis = 0;
    let mut best_depth = f64::INFINITY;
    for i in 0..3 {
        let depth = obb.half_extents[i] - local[i].abs();
        if depth < best_depth {
            best_depth = depth;
            best_axis = i;
        }
    }

    let outward = obb.axis(best_axis) * local[best_axis].signum();
    Some(ContactManifold::new(
        point + outward * best_depth,
        -outward,
        *point,
        best_depth,
    ))
}
