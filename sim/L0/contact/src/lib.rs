//! Narrow-phase contact geometry.
//!
//! Stateless primitive-vs-primitive tests. Boolean tests answer "do these
//! overlap"; contact tests return `Option<ContactManifold>`, where `None`
//! means no contact and `Some` carries the contact points, unit normals and
//! penetration depth.
//!
//! # Conventions
//!
//! Shape A is the first argument, shape B the second. `normal_a` points from
//! B toward A (the direction A must move to separate), `normal_b` is its
//! negation and `depth` is never negative.
//!
//! # Degenerate Input
//!
//! Zero-length segments and axes, coincident centers and zero-area triangles
//! never produce NaN. Each test falls back to a well-defined answer: the
//! segment's first endpoint, an arbitrary perpendicular axis, or the
//! triangle's longest edge.
//!
//! # Example
//!
//! ```
//! use nalgebra::Point3;
//! use sim_contact::test_sphere_to_sphere;
//!
//! let contact = test_sphere_to_sphere(
//!     &Point3::new(0.0, 0.0, 0.0),
//!     1.0,
//!     &Point3::new(1.5, 0.0, 0.0),
//!     1.0,
//! )
//! .expect("spheres overlap");
//! assert!((contact.depth - 0.5).abs() < 1e-12);
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.

#![doc(html_root_url = "https://docs.rs/sim-contact/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::module_name_repetitions)]

mod closest;
mod cylinder;
mod interval;
mod manifold;
mod obb;
mod plane;
mod ray;
mod sphere;
mod tetra;
mod triangle;

pub use closest::{
    barycentric, closest_point_on_segment, closest_point_on_triangle, edge_to_edge_closest_points,
    point_segment_closest_distance, point_triangle_closest_distance,
};
pub use cylinder::{test_capsule_to_point, test_cylinder_to_point, test_sphere_to_cylinder};
pub use interval::{is_intersect, test_aabb_to_aabb, test_line_to_line_aabb, test_point_to_tri_aabb};
pub use manifold::{
    ContactManifold, EdgeEdgeClosest, SegmentRegion, SphereTriangleFeature, TriangleContact,
    TriangleRegion,
};
pub use obb::{test_obb_to_point, Obb};
pub use plane::{
    test_bidirectional_plane_to_sphere, test_plane_line, test_plane_to_point, test_plane_to_sphere,
};
pub use ray::{test_ray_to_obb, test_ray_to_plane, test_ray_to_sphere, RayHit};
pub use sphere::{
    test_sphere_to_point, test_sphere_to_sphere, test_sphere_to_triangle,
    test_sphere_to_triangle_feature,
};
pub use tetra::{test_point_to_tetrahedron, test_tet_to_segment};
pub use triangle::{test_segment_triangle, triangle_to_triangle};
