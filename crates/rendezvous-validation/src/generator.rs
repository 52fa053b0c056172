//! Seeded random planning instances.

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rendezvous_core::{
    ActivityConfig, Availability, CapacityConfig, DestinationRecord, Location, OptimizerConfig,
    PersonRecord, PlanningInput,
};

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub people: (usize, usize),
    pub destinations: (usize, usize),
    pub horizon: usize,
    /// Side of the square map centred on the origin.
    pub map_size: f64,
    pub max_duration: u32,
    /// Share all cars one drawn limit instead of each driver's own.
    pub global_capacity: bool,
    pub time_limit_secs: Option<f64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            people: (3, 4),
            destinations: (2, 3),
            horizon: 24,
            map_size: 100.0,
            max_duration: 3,
            global_capacity: false,
            time_limit_secs: Some(30.0),
        }
    }
}

pub struct InstanceGenerator {
    rng: Xoshiro256PlusPlus,
    config: GeneratorConfig,
}

impl InstanceGenerator {
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, GeneratorConfig::default())
    }

    pub fn with_config(seed: u64, config: GeneratorConfig) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            config,
        }
    }

    /// Draws the next instance.
    ///
    /// Cars and seat counts are redrawn until every person can be seated.
    pub fn next_input(&mut self) -> PlanningInput {
        let n_people = self.rng.gen_range(self.config.people.0..=self.config.people.1);
        let n_destinations = self
            .rng
            .gen_range(self.config.destinations.0..=self.config.destinations.1);

        let (cars, seats, shared_limit) = loop {
            let cars: Vec<bool> = (0..n_people).map(|_| self.rng.gen_bool(0.5)).collect();
            let seats: Vec<u32> = (0..n_people).map(|_| self.rng.gen_range(1..=4)).collect();
            let shared_limit: u32 = self.rng.gen_range(2..=4);

            let owners = cars.iter().filter(|&&car| car).count();
            let own_seats: u32 = cars
                .iter()
                .zip(&seats)
                .filter(|&(car, _)| *car)
                .map(|(_, s)| *s)
                .sum();
            let enough = if self.config.global_capacity {
                owners * shared_limit as usize >= n_people
            } else {
                own_seats as usize >= n_people
            };
            if enough {
                break (cars, seats, shared_limit);
            }
        };

        let people = (0..n_people)
            .map(|k| PersonRecord {
                name: format!("person_{k}"),
                location: self.location(),
                car: cars[k],
                max_passengers: seats[k],
                availability: self.availability(),
            })
            .collect();
        let destinations = (0..n_destinations)
            .map(|k| DestinationRecord {
                name: format!("place_{k}"),
                location: self.location(),
                fun_score: self.rng.gen_range(0.0..=10.0),
                availability: self.availability(),
            })
            .collect();

        let capacity = if self.config.global_capacity {
            CapacityConfig::Global {
                max_passengers: shared_limit,
            }
        } else {
            CapacityConfig::default()
        };

        PlanningInput {
            people,
            destinations,
            optimizer: OptimizerConfig {
                capacity,
                time_limit_secs: self.config.time_limit_secs,
                ..OptimizerConfig::default()
            },
            activity: ActivityConfig {
                name: None,
                duration: self.rng.gen_range(1..=self.config.max_duration),
                start_timestamp: "2019-01-01T00:00:00".to_string(),
            },
        }
    }

    fn location(&mut self) -> Location {
        let half = self.config.map_size / 2.0;
        Location::new(self.rng.gen_range(-half..half), self.rng.gen_range(-half..half))
    }

    fn availability(&mut self) -> Availability {
        Availability::new((0..self.config.horizon).map(|_| self.rng.gen_bool(0.5)).collect())
    }
}

impl Iterator for InstanceGenerator {
    type Item = PlanningInput;

    fn next(&mut self) -> Option<PlanningInput> {
        Some(self.next_input())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_core::Problem;

    #[test]
    fn same_seed_same_instances() {
        let a: Vec<_> = InstanceGenerator::new(7).take(3).collect();
        let b: Vec<_> = InstanceGenerator::new(7).take(3).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn instances_validate_and_seat_everyone() {
        for input in InstanceGenerator::new(11).take(50) {
            let seats: u32 = input
                .people
                .iter()
                .filter(|p| p.car)
                .map(|p| p.max_passengers)
                .sum();
            assert!(seats as usize >= input.people.len());
            assert!((3..=4).contains(&input.people.len()));
            assert!((2..=3).contains(&input.destinations.len()));

            let problem = Problem::from_input(input).unwrap();
            assert_eq!(problem.horizon(), 24);
        }
    }

    #[test]
    fn global_mode_sizes_the_shared_limit() {
        let config = GeneratorConfig {
            global_capacity: true,
            ..GeneratorConfig::default()
        };
        for input in InstanceGenerator::with_config(3, config).take(20) {
            let owners = input.people.iter().filter(|p| p.car).count();
            match input.optimizer.capacity {
                CapacityConfig::Global { max_passengers } => {
                    assert!(owners * max_passengers as usize >= input.people.len());
                }
                other => panic!("unexpected capacity {other:?}"),
            }
        }
    }
}
