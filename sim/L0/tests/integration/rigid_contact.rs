//! Rigid bodies resting on and colliding with each other.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use sim_contact::{test_plane_to_sphere, test_sphere_to_sphere};
use sim_physics::RigidContactAssembler;
use sim_rigid::{BodyHandle, RigidBody, RigidBodyConfig, RigidBodyConstraintSolver};
use sim_types::SimError;

use super::init_tracing;

const RADIUS: f64 = 0.5;

// ============================================================================
// Helpers
// ============================================================================

fn solver() -> RigidBodyConstraintSolver {
    RigidBodyConstraintSolver::new(
        RigidBodyConfig::default()
            .with_dt(0.01)
            .with_max_num_iterations(50),
    )
}

fn center(solver: &RigidBodyConstraintSolver, body: BodyHandle) -> Point3<f64> {
    solver.body(body).expect("live body").position
}

/// Queue ground contact for `ball` against the plane `y = 0`.
fn ground_contact(
    solver: &mut RigidBodyConstraintSolver,
    assembler: &RigidContactAssembler,
    ball: BodyHandle,
    ground: Option<BodyHandle>,
) {
    let c = center(solver, ball);
    if let Some(m) = test_plane_to_sphere(&Point3::origin(), &Vector3::y(), &c, RADIUS) {
        assembler.handle_manifold(solver, ball, ground, &m.flipped());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_ball_settles_on_ground() {
    init_tracing();
    let mut solver = solver();
    let ball = solver.add_rigid_body(RigidBody::sphere(1.0, RADIUS, Point3::new(0.0, 2.0, 0.0)));
    let assembler = RigidContactAssembler::default().with_beta(0.2);

    for _ in 0..300 {
        ground_contact(&mut solver, &assembler, ball, None);
        solver.step().expect("step");
    }

    let y = center(&solver, ball).y;
    assert!(y > 0.45 && y < 0.55, "ball not resting on the ground: y = {y}");
    assert_eq!(solver.num_constraints(), 0);
}

#[test]
fn test_stacked_spheres_stay_separated() {
    init_tracing();
    let mut solver = solver();
    let ground = solver.add_rigid_body(RigidBody::new_static(Point3::new(0.0, -RADIUS, 0.0)));
    let lower = solver.add_rigid_body(RigidBody::sphere(1.0, RADIUS, Point3::new(0.0, 0.5, 0.0)));
    let upper = solver.add_rigid_body(RigidBody::sphere(1.0, RADIUS, Point3::new(0.0, 1.5, 0.0)));
    let assembler = RigidContactAssembler::default().with_beta(0.2);

    for _ in 0..200 {
        ground_contact(&mut solver, &assembler, lower, Some(ground));
        let (cu, cl) = (center(&solver, upper), center(&solver, lower));
        if let Some(m) = test_sphere_to_sphere(&cu, RADIUS, &cl, RADIUS) {
            assembler.handle_manifold(&mut solver, upper, Some(lower), &m);
        }
        solver.step().expect("step");
    }

    let (cu, cl) = (center(&solver, upper), center(&solver, lower));
    assert!(cl.y > 0.3, "lower sphere sank: {}", cl.y);
    assert!(cu.y - cl.y > 0.7, "spheres interpenetrate: gap {}", cu.y - cl.y);
    assert_eq!(center(&solver, ground), Point3::new(0.0, -RADIUS, 0.0));
}

#[test]
fn test_head_on_collision_across_solvers() {
    init_tracing();
    let config = RigidBodyConfig::default()
        .with_dt(0.01)
        .with_gravity(Vector3::zeros());
    let mut left_solver = RigidBodyConstraintSolver::new(config);
    let mut right_solver = RigidBodyConstraintSolver::new(config);

    let left = left_solver.add_rigid_body(
        RigidBody::sphere(1.0, RADIUS, Point3::new(-0.45, 0.0, 0.0))
            .with_velocity(Vector3::new(1.0, 0.0, 0.0)),
    );
    let right = right_solver.add_rigid_body(
        RigidBody::sphere(1.0, RADIUS, Point3::new(0.45, 0.0, 0.0))
            .with_velocity(Vector3::new(-1.0, 0.0, 0.0)),
    );

    let m = test_sphere_to_sphere(
        &Point3::new(-0.45, 0.0, 0.0),
        RADIUS,
        &Point3::new(0.45, 0.0, 0.0),
        RADIUS,
    )
    .expect("overlap");
    let added = RigidContactAssembler::default().add_cross_solver_contact(
        &mut left_solver,
        left,
        &mut right_solver,
        right,
        &m.point_a,
        &m.normal_a,
        m.depth,
    );
    assert_eq!(added, 2);

    left_solver.step().expect("step");
    right_solver.step().expect("step");

    let vl = left_solver.body(left).expect("left").velocity;
    let vr = right_solver.body(right).expect("right").velocity;
    let push_out = 0.1 * 0.05 / 0.01;
    assert_relative_eq!(vl.x, -push_out, epsilon = 1e-6);
    assert_relative_eq!(vr.x, push_out, epsilon = 1e-6);
}

#[test]
fn test_contact_on_removed_body_is_dropped() {
    let mut solver = solver();
    let ball = solver.add_rigid_body(RigidBody::sphere(1.0, RADIUS, Point3::new(0.0, 0.45, 0.0)));
    let other = solver.add_rigid_body(RigidBody::sphere(1.0, RADIUS, Point3::new(3.0, 0.45, 0.0)));
    solver.remove_rigid_body(ball).expect("remove");

    let err = solver.remove_rigid_body(ball).expect_err("stale handle");
    assert!(err.is_handle_error());
    assert!(matches!(err, SimError::InvalidHandle { handle } if handle == ball));

    let assembler = RigidContactAssembler::default();
    let c = Point3::new(0.0, 0.45, 0.0);
    let m = test_plane_to_sphere(&Point3::origin(), &Vector3::y(), &c, RADIUS).expect("overlap");
    assert_eq!(assembler.handle_manifold(&mut solver, ball, None, &m.flipped()), 0);

    solver.step().expect("step");
    assert_eq!(solver.num_bodies(), 1);
    assert!(solver.body(other).expect("other").velocity.y < 0.0);
}
