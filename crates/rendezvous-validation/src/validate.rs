//! Independent checks of a returned plan against the problem it came from.
//!
//! Nothing here reads the linear program: routes are walked from the
//! entities and scores are recomputed from scratch.

use rendezvous_core::{CapacityConfig, DistanceTable, Node, Problem};
use rendezvous_milp::{ModelContext, Plan, ScoringPolicy};
use thiserror::Error;

/// Absolute slack allowed when comparing recomputed scores.
const SCORE_TOL: f64 = 1e-3;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Violation {
    #[error("{0} destinations are marked chosen")]
    DestinationCount(usize),
    #[error("plan names `{plan}` but `{marked}` is marked chosen")]
    DestinationMismatch { plan: String, marked: String },
    #[error("{0} has no next hop")]
    MissingHop(String),
    #[error("{0} drives without owning a car")]
    NonOwnerDrives(String),
    #[error("{rider} is picked up by {driver}, who is driving")]
    BoardsDrivingCar { rider: String, driver: String },
    #[error("{0} is picked up by more than one person")]
    MergedChains(String),
    #[error("{0} never reaches a destination")]
    Cycle(String),
    #[error("{person} ends at {reached}, not at the chosen destination")]
    WrongDestination { person: String, reached: String },
    #[error("{0} starts a chain without driving")]
    WalkingChain(String),
    #[error("{driver}'s car carries {carried} people, limit {limit}")]
    OverCapacity {
        driver: String,
        carried: usize,
        limit: u32,
    },
    #[error("{score}: plan reports {reported}, recomputed {expected}")]
    ScoreMismatch {
        score: &'static str,
        reported: f64,
        expected: f64,
    },
}

/// Every way `plan` disagrees with `problem`; empty when the plan is sound.
pub fn check_plan(problem: &Problem, plan: &Plan) -> Vec<Violation> {
    let mut violations = Vec::new();
    let n_people = problem.people.len();

    let marked: Vec<usize> = problem
        .destinations
        .iter()
        .enumerate()
        .filter(|(_, d)| d.chosen)
        .map(|(idx, _)| idx)
        .collect();
    let chosen = match marked.as_slice() {
        [only] => *only,
        _ => {
            violations.push(Violation::DestinationCount(marked.len()));
            return violations;
        }
    };
    let chosen_name = &problem.destinations[chosen].name;
    if &plan.destination != chosen_name {
        violations.push(Violation::DestinationMismatch {
            plan: plan.destination.clone(),
            marked: chosen_name.clone(),
        });
    }

    let mut hops = Vec::with_capacity(n_people);
    for person in &problem.people {
        match person.going_to {
            Some(node) => hops.push(node),
            None => {
                violations.push(Violation::MissingHop(person.name.clone()));
                return violations;
            }
        }
    }

    let mut boarded = vec![0usize; n_people];
    for (idx, person) in problem.people.iter().enumerate() {
        if person.use_car && !person.car {
            violations.push(Violation::NonOwnerDrives(person.name.clone()));
        }
        if let Node::Person(next) = hops[idx] {
            boarded[next] += 1;
            if problem.people[next].use_car {
                violations.push(Violation::BoardsDrivingCar {
                    rider: problem.people[next].name.clone(),
                    driver: person.name.clone(),
                });
            }
        }
    }
    for (idx, &count) in boarded.iter().enumerate() {
        if count > 1 {
            violations.push(Violation::MergedChains(problem.people[idx].name.clone()));
        }
    }

    for (start, person) in problem.people.iter().enumerate() {
        match walk(&hops, start) {
            None => violations.push(Violation::Cycle(person.name.clone())),
            Some((end, _)) if end != chosen => violations.push(Violation::WrongDestination {
                person: person.name.clone(),
                reached: problem.destinations[end].name.clone(),
            }),
            Some(_) => {}
        }
        if boarded[start] == 0 && !person.use_car {
            violations.push(Violation::WalkingChain(person.name.clone()));
        }
    }

    for (start, person) in problem.people.iter().enumerate() {
        if !person.use_car {
            continue;
        }
        let Some((_, carried)) = walk(&hops, start) else {
            continue;
        };
        let limit = match problem.optimizer.capacity {
            CapacityConfig::Global { max_passengers } => max_passengers,
            CapacityConfig::PerDriver { .. } => person.max_passengers,
        };
        if carried > limit as usize {
            violations.push(Violation::OverCapacity {
                driver: person.name.clone(),
                carried,
                limit,
            });
        }
    }

    violations.extend(check_scores(problem, plan, &hops, chosen));
    violations
}

/// Follows next hops from `start`; the reached destination and the number of
/// people on the way, or `None` when no destination comes within |P| hops.
fn walk(hops: &[Node], start: usize) -> Option<(usize, usize)> {
    let mut current = start;
    for visited in 1..=hops.len() {
        match hops[current] {
            Node::Destination(end) => return Some((end, visited)),
            Node::Person(next) => current = next,
        }
    }
    None
}

fn check_scores(problem: &Problem, plan: &Plan, hops: &[Node], chosen: usize) -> Vec<Violation> {
    let distances = DistanceTable::from_problem(problem);
    let total_distance: f64 = hops
        .iter()
        .enumerate()
        .map(|(idx, &hop)| distances.between(problem, Node::Person(idx), hop))
        .sum();

    let destination = &problem.destinations[chosen];
    let fun_score = destination.fun_score;
    let interval_score = f64::from(destination.interval_score);

    let ctx = ModelContext::new(problem);
    let distance_score = match ScoringPolicy::from_config(&problem.optimizer) {
        Ok(policy) => policy.distance_score(&ctx, total_distance),
        Err(_) => f64::NAN,
    };
    let alpha = problem.optimizer.alpha;
    let objective = alpha * distance_score + (1.0 - alpha) * (fun_score + interval_score) / 2.0;

    [
        ("total_distance", plan.scores.total_distance, total_distance),
        ("fun_score", plan.scores.fun_score, fun_score),
        ("interval_score", plan.scores.interval_score, interval_score),
        ("distance_score", plan.scores.distance_score, distance_score),
        ("objective", plan.scores.objective, objective),
    ]
    .into_iter()
    .filter(|&(_, reported, expected)| {
        !expected.is_finite() || (reported - expected).abs() > SCORE_TOL
    })
    .map(|(score, reported, expected)| Violation::ScoreMismatch {
        score,
        reported,
        expected,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_milp::plan_json;

    const LINE: &str = r#"{
        "people": [
            {"name": "p1", "location": [0, 0], "car": true, "max_passengers": 3, "availability": [1, 1, 1, 1]},
            {"name": "p2", "location": [1, 0], "car": false, "max_passengers": 0, "availability": [1, 1, 1, 1]},
            {"name": "p3", "location": [2, 0], "car": false, "max_passengers": 0, "availability": [1, 1, 1, 1]}
        ],
        "destinations": [
            {"name": "d", "location": [3, 0], "fun_score": 8, "availability": [1, 1, 1, 1]}
        ],
        "activity": {"duration": 2, "start_timestamp": "2019-01-01T00:00:00"}
    }"#;

    #[test]
    fn solved_plan_passes() {
        let (problem, plan) = plan_json(LINE).unwrap();
        assert_eq!(check_plan(&problem, &plan), Vec::<Violation>::new());
    }

    #[test]
    fn tampered_routes_are_caught() {
        let (mut problem, plan) = plan_json(LINE).unwrap();

        problem.people[1].use_car = true;
        problem.people[2].going_to = Some(Node::Person(0));
        let violations = check_plan(&problem, &plan);

        assert!(violations.contains(&Violation::NonOwnerDrives("p2".to_string())));
        assert!(violations.iter().any(|v| matches!(v, Violation::Cycle(_))));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::ScoreMismatch { score: "total_distance", .. })));
    }

    #[test]
    fn overfull_car_is_caught() {
        let (mut problem, plan) = plan_json(LINE).unwrap();
        problem.people[0].max_passengers = 2;

        assert_eq!(
            check_plan(&problem, &plan),
            vec![Violation::OverCapacity {
                driver: "p1".to_string(),
                carried: 3,
                limit: 2,
            }]
        );
    }

    #[test]
    fn missing_destination_stops_early() {
        let (mut problem, plan) = plan_json(LINE).unwrap();
        problem.destinations[0].chosen = false;
        assert_eq!(check_plan(&problem, &plan), vec![Violation::DestinationCount(0)]);
    }
}
