use rendezvous_core::{DistanceTable, Problem};
use std::ops::Range;

/// Read-only view of a scanned problem used while building the model.
pub struct ModelContext<'a> {
    pub problem: &'a Problem,

    // Flattened matrix, nodes laid out people first
    pub distances: DistanceTable,

    pub n_people: usize,
    pub n_destinations: usize,
    pub n_nodes: usize,
}

impl<'a> ModelContext<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        let n_people = problem.people.len();
        let n_destinations = problem.destinations.len();

        ModelContext {
            problem,
            distances: DistanceTable::from_problem(problem),
            n_people,
            n_destinations,
            n_nodes: n_people + n_destinations,
        }
    }

    /// Node indices of the people.
    pub fn people(&self) -> Range<usize> {
        0..self.n_people
    }

    /// Node indices of the destinations.
    pub fn destination_nodes(&self) -> Range<usize> {
        self.n_people..self.n_nodes
    }

    pub fn all_nodes(&self) -> Range<usize> {
        0..self.n_nodes
    }

    /// Mean person-to-destination distance over every pair.
    pub fn mean_person_to_destination(&self) -> f64 {
        let pairs = self.n_people * self.n_destinations;
        if pairs == 0 {
            return 0.0;
        }
        let total: f64 = self
            .people()
            .flat_map(|i| self.destination_nodes().map(move |j| (i, j)))
            .map(|(i, j)| self.distances.get(i, j))
            .sum();
        total / pairs as f64
    }
}
