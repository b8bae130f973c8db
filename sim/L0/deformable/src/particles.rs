//! Particle buffers for position-based dynamics.
//!
//! Buffers are stored as parallel arrays so the solvers can borrow
//! positions mutably while reading inverse masses.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Per-particle state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ParticleFlags: u32 {
        /// Particle is fixed in place (inverse mass 0).
        const FIXED = 0b0000_0001;
        /// Particle took part in a collision this frame.
        const COLLIDING = 0b0000_0010;
    }
}

/// Particle state for a PBD model.
///
/// Slot `i` of every array belongs to particle `i`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PbdParticles {
    /// Current (predicted, then corrected) positions.
    pub positions: Vec<Point3<f64>>,
    /// Positions at the start of the step.
    pub previous_positions: Vec<Point3<f64>>,
    /// Velocities.
    pub velocities: Vec<Vector3<f64>>,
    /// Inverse masses, exactly 0 for fixed particles.
    pub inv_masses: Vec<f64>,
    /// External forces, cleared after each position integration.
    pub external_forces: Vec<Vector3<f64>>,
    /// State flags.
    pub flags: Vec<ParticleFlags>,
}

impl PbdParticles {
    /// Empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers for particles at `positions`, each with `mass`.
    #[must_use]
    pub fn from_positions(positions: &[Point3<f64>], mass: f64) -> Self {
        let mut particles = Self::new();
        for p in positions {
            particles.add_particle(*p, mass);
        }
        particles
    }

    /// Append a particle at rest and return its index.
    ///
    /// A non-positive mass makes the particle fixed.
    pub fn add_particle(&mut self, position: Point3<f64>, mass: f64) -> usize {
        let index = self.positions.len();
        let fixed = mass <= 0.0;
        self.positions.push(position);
        self.previous_positions.push(position);
        self.velocities.push(Vector3::zeros());
        self.inv_masses.push(if fixed { 0.0 } else { 1.0 / mass });
        self.external_forces.push(Vector3::zeros());
        self.flags.push(if fixed {
            ParticleFlags::FIXED
        } else {
            ParticleFlags::empty()
        });
        index
    }

    /// Number of particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether there are no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Pin particle `index` in place.
    pub fn set_fixed(&mut self, index: usize) {
        self.flags[index].insert(ParticleFlags::FIXED);
        self.inv_masses[index] = 0.0;
        self.velocities[index] = Vector3::zeros();
    }

    /// Release a fixed particle with the given mass.
    pub fn set_free(&mut self, index: usize, mass: f64) {
        if mass <= 0.0 {
            return;
        }
        self.flags[index].remove(ParticleFlags::FIXED);
        self.inv_masses[index] = 1.0 / mass;
    }

    /// Whether particle `index` is fixed.
    #[must_use]
    pub fn is_fixed(&self, index: usize) -> bool {
        self.flags[index].contains(ParticleFlags::FIXED)
    }

    /// Add to the external force on particle `index`.
    pub fn apply_force(&mut self, index: usize, force: Vector3<f64>) {
        self.external_forces[index] += force;
    }

    /// Mass-weighted center of the free particles.
    #[must_use]
    pub fn center_of_mass(&self) -> Option<Point3<f64>> {
        let mut total = 0.0;
        let mut sum = Vector3::zeros();
        for (p, &w) in self.positions.iter().zip(&self.inv_masses) {
            if w > 0.0 {
                let m = 1.0 / w;
                total += m;
                sum += p.coords * m;
            }
        }
        (total > 0.0).then(|| Point3::from(sum / total))
    }
}
