//! Constraint container with graph-coloring partitions.
//!
//! Two constraints are adjacent when they share a particle. Greedy coloring
//! in insertion order assigns each constraint the smallest color not used by
//! any earlier neighbor, so every color class touches pairwise disjoint
//! particle sets and can be projected in parallel.

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::constraints::PbdConstraint;

/// Boxed constraint as stored by the container.
pub type BoxedConstraint = Box<dyn PbdConstraint>;

/// Sequential constraints plus disjoint partitions.
///
/// Every constraint keeps its insertion index, so the sequential list is
/// always in insertion order however often the container is repartitioned.
#[derive(Debug, Default)]
pub struct PbdConstraintContainer {
    sequential: Vec<BoxedConstraint>,
    sequential_order: Vec<usize>,
    partitions: Vec<Vec<BoxedConstraint>>,
    partition_order: Vec<Vec<usize>>,
    next_order: usize,
}

impl PbdConstraintContainer {
    /// Empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constraint to the sequential list.
    pub fn add(&mut self, constraint: impl PbdConstraint + 'static) {
        self.add_boxed(Box::new(constraint));
    }

    /// Append an already boxed constraint to the sequential list.
    pub fn add_boxed(&mut self, constraint: BoxedConstraint) {
        self.sequential.push(constraint);
        self.sequential_order.push(self.next_order);
        self.next_order += 1;
    }

    /// Total number of constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequential.len() + self.partitions.iter().map(Vec::len).sum::<usize>()
    }

    /// Whether the container holds no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Constraints solved one after another, in insertion order.
    #[must_use]
    pub fn sequential(&self) -> &[BoxedConstraint] {
        &self.sequential
    }

    /// Partitions, each free of shared particles.
    #[must_use]
    pub fn partitions(&self) -> &[Vec<BoxedConstraint>] {
        &self.partitions
    }

    /// Recolor all constraints.
    ///
    /// Coloring always runs over the constraints in insertion order. Color
    /// classes with fewer than `threshold` members go back to the sequential
    /// list in insertion order.
    pub fn partition(&mut self, threshold: usize) {
        self.clear_partitions();
        let constraints = std::mem::take(&mut self.sequential);
        let order = std::mem::take(&mut self.sequential_order);

        let colors = greedy_coloring(&constraints);
        let num_colors = colors.iter().max().map_or(0, |&c| c + 1);
        let mut sizes = vec![0usize; num_colors];
        for &c in &colors {
            sizes[c] += 1;
        }

        // Kept color classes get consecutive partition slots
        let mut slot_of_color = vec![None; num_colors];
        let mut kept = 0;
        for (color, &size) in sizes.iter().enumerate() {
            if size >= threshold.max(1) {
                slot_of_color[color] = Some(kept);
                kept += 1;
            }
        }

        let mut partitions: Vec<Vec<BoxedConstraint>> = (0..kept).map(|_| Vec::new()).collect();
        let mut partition_order: Vec<Vec<usize>> = vec![Vec::new(); kept];
        for ((constraint, index), color) in constraints.into_iter().zip(order).zip(colors) {
            match slot_of_color[color] {
                Some(slot) => {
                    partitions[slot].push(constraint);
                    partition_order[slot].push(index);
                }
                None => {
                    self.sequential.push(constraint);
                    self.sequential_order.push(index);
                }
            }
        }

        debug!(
            colors = num_colors,
            partitions = partitions.len(),
            sequential = self.sequential.len(),
            "constraints partitioned"
        );
        self.partitions = partitions;
        self.partition_order = partition_order;
    }

    /// Move every partitioned constraint back to the sequential list,
    /// restoring insertion order.
    pub fn clear_partitions(&mut self) {
        if self.partitions.is_empty() {
            return;
        }

        let mut entries: Vec<(usize, BoxedConstraint)> = Vec::with_capacity(self.len());
        entries.extend(
            self.sequential_order
                .drain(..)
                .zip(self.sequential.drain(..)),
        );
        for (order, partition) in self.partition_order.drain(..).zip(self.partitions.drain(..)) {
            entries.extend(order.into_iter().zip(partition));
        }
        entries.sort_unstable_by_key(|(index, _)| *index);

        for (index, constraint) in entries {
            self.sequential_order.push(index);
            self.sequential.push(constraint);
        }
    }

    /// Drop all constraints.
    pub fn clear(&mut self) {
        self.sequential.clear();
        self.sequential_order.clear();
        self.partitions.clear();
        self.partition_order.clear();
        self.next_order = 0;
    }
}

/// Color of each constraint, in order.
fn greedy_coloring(constraints: &[BoxedConstraint]) -> Vec<usize> {
    // Colors already used around each particle
    let mut used: HashMap<usize, SmallVec<[usize; 8]>> = HashMap::new();
    let mut colors = Vec::with_capacity(constraints.len());

    for constraint in constraints {
        let particles = constraint.particles();
        let mut color = 0;
        while particles
            .iter()
            .any(|p| used.get(p).is_some_and(|c| c.contains(&color)))
        {
            color += 1;
        }
        for p in particles {
            let entry = used.entry(p).or_default();
            if !entry.contains(&color) {
                entry.push(color);
            }
        }
        colors.push(color);
    }
    colors
}
