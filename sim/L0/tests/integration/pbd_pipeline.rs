//! Cloth stepped with PBD and collided against a static floor mesh.

use nalgebra::Point3;
use sim_deformable::{
    CollisionBody, DistanceConstraint, PbdCollisionSolver, PbdModel, PbdModelConfig, PbdParticles,
};
use sim_physics::{FeatureContact, FeatureElement, PbdCollisionAssembler};

use super::init_tracing;

const GRID: usize = 6;
const SPACING: f64 = 0.2;

// ============================================================================
// Helpers
// ============================================================================

/// Square cloth in the XZ plane at height `y`, with structural links.
fn cloth(y: f64, config: PbdModelConfig) -> (PbdModel, Vec<[usize; 2]>) {
    let offset = SPACING * (GRID - 1) as f64 / 2.0;
    let mut positions = Vec::with_capacity(GRID * GRID);
    for i in 0..GRID {
        for j in 0..GRID {
            positions.push(Point3::new(
                i as f64 * SPACING - offset,
                y,
                j as f64 * SPACING - offset,
            ));
        }
    }

    let mut links = Vec::new();
    for i in 0..GRID {
        for j in 0..GRID {
            let id = i * GRID + j;
            if j + 1 < GRID {
                links.push([id, id + 1]);
            }
            if i + 1 < GRID {
                links.push([id, id + GRID]);
            }
        }
    }

    let mut model = PbdModel::new(PbdParticles::from_positions(&positions, 0.1), config)
        .expect("valid config");
    for &[a, b] in &links {
        model.add_constraint(DistanceConstraint::from_positions(a, b, &positions, 1.0));
    }
    (model, links)
}

/// Two triangles covering `[-10, 10]^2` at `y = 0`, normal +Y.
fn floor() -> (Vec<Point3<f64>>, [[usize; 3]; 2]) {
    let vertices = vec![
        Point3::new(-10.0, 0.0, -10.0),
        Point3::new(-10.0, 0.0, 10.0),
        Point3::new(10.0, 0.0, -10.0),
        Point3::new(10.0, 0.0, 10.0),
    ];
    (vertices, [[0, 1, 2], [1, 3, 2]])
}

fn max_stretch(model: &PbdModel, links: &[[usize; 2]]) -> f64 {
    let x = &model.particles().positions;
    links
        .iter()
        .map(|&[a, b]| ((x[b] - x[a]).norm() - SPACING).abs() / SPACING)
        .fold(0.0, f64::max)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_cloth_lands_on_floor() {
    init_tracing();
    let config = PbdModelConfig::default().with_iterations(20, 5);
    let dt = config.dt;
    let (mut model, links) = cloth(0.5, config);
    let (mut floor, triangles) = floor();
    let floor_mass = vec![0.0; floor.len()];
    let assembler = PbdCollisionAssembler::default().with_proximity(0.05);

    for _ in 0..150 {
        model.integrate_position(dt);
        model.solve_constraints();

        // Broad phase: every vertex near the floor against both triangles
        let contacts: Vec<_> = model
            .particles()
            .positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.y < 0.2)
            .flat_map(|(i, _)| {
                triangles.map(|t| {
                    FeatureContact::new(FeatureElement::Vertex(i), FeatureElement::Triangle(t))
                })
            })
            .collect();
        let batch = assembler.assemble(&contacts);

        let mut solver = PbdCollisionSolver::new(model.config().collision_iterations);
        let a = solver.add_body(model.collision_body());
        let b = solver.add_body(CollisionBody::new(&mut floor, &floor_mass));
        batch.submit(&mut solver, a, b).expect("distinct bodies");
        solver.solve();
        drop(solver);

        model.update_velocity(dt);
    }

    let lowest = model
        .particles()
        .positions
        .iter()
        .map(|p| p.y)
        .fold(f64::INFINITY, f64::min);
    assert!(lowest >= 0.05 - 1e-9, "cloth fell through the floor: {lowest}");
    assert!(lowest < 0.1, "cloth never reached the floor: {lowest}");
    assert!(max_stretch(&model, &links) < 0.1);
    assert_eq!(floor, self::floor().0);
}

#[test]
fn test_pinned_cloth_hangs() {
    init_tracing();
    let config = PbdModelConfig::default()
        .with_iterations(30, 0)
        .with_partition_threshold(1);
    let (mut model, links) = cloth(1.0, config);

    // Pin two corners of one side
    let corners = [0, GRID - 1];
    for &c in &corners {
        model.particles_mut().set_fixed(c);
    }
    let pinned: Vec<_> = corners.iter().map(|&c| model.particles().positions[c]).collect();

    for _ in 0..100 {
        model.step();
    }

    for (&c, p) in corners.iter().zip(&pinned) {
        assert_eq!(model.particles().positions[c], *p);
    }
    assert!(!model.constraints().partitions().is_empty());
    let com = model.particles().center_of_mass().expect("free particles");
    assert!(com.y < 1.0, "cloth did not sag: {}", com.y);
    assert!(max_stretch(&model, &links) < 0.2);
}
