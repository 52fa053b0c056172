use crate::models::{Location, Node, Problem};
use crate::utils::euclidean_distance;

/// Pairwise straight-line distances between every node, people first.
///
/// Flattened row-major for cache locality.
#[derive(Clone, Debug)]
pub struct DistanceTable {
    data: Vec<f64>,
    size: usize,
}

impl DistanceTable {
    pub fn from_locations(locations: &[Location]) -> Self {
        let size = locations.len();
        let mut data = vec![0.0; size * size];

        for i in 0..size {
            for j in (i + 1)..size {
                let d = euclidean_distance(&locations[i], &locations[j]);
                data[i * size + j] = d;
                data[j * size + i] = d;
            }
        }

        Self { data, size }
    }

    pub fn from_problem(problem: &Problem) -> Self {
        let locations: Vec<Location> = (0..problem.node_count())
            .map(|idx| *problem.location(problem.node_at(idx)))
            .collect();
        Self::from_locations(&locations)
    }

    #[inline(always)]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    pub fn between(&self, problem: &Problem, from: Node, to: Node) -> f64 {
        self.get(problem.node_index(from), problem.node_index(to))
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
