//! Reads an oracle's assignment back onto the problem's entities.
//!
//! Decoding is pure and checks the assignment before anything is written, so
//! a rejected solution leaves the problem exactly as the scanner left it.

use crate::builder::BuiltModel;
use crate::error::PlanError;
use crate::oracle::{OracleOutcome, OracleStatus};
use crate::plan::{Plan, Route, Scores, Timings};
use crate::program::VarId;
use rendezvous_core::utils::format_timestamp;
use rendezvous_core::{Node, Problem};
use tracing::warn;

/// Values within this distance of 0 or 1 count as that bit.
pub const TOL: f64 = 1e-4;

/// A consistent assignment, not yet written back.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub status: OracleStatus,
    pub destination: usize,
    /// Next-hop node index per person.
    pub going_to: Vec<usize>,
    pub use_car: Vec<bool>,
    pub scores: Scores,
}

fn bit(values: &[f64], var: VarId) -> Option<bool> {
    let value = values[var.index()];
    if value.abs() <= TOL {
        Some(false)
    } else if (value - 1.0).abs() <= TOL {
        Some(true)
    } else {
        None
    }
}

fn inconsistent(reason: String) -> PlanError {
    warn!(%reason, "solution rejected");
    PlanError::InconsistentSolution(reason)
}

/// Decodes the oracle outcome without touching any entity.
pub fn decode(model: &BuiltModel, outcome: &OracleOutcome) -> Result<Assignment, PlanError> {
    match outcome.status {
        OracleStatus::Infeasible => return Err(PlanError::InfeasibleModel),
        OracleStatus::Timeout => return Err(PlanError::OracleTimeout),
        OracleStatus::Error => {
            let message = outcome.message.clone().unwrap_or_else(|| "unknown error".to_string());
            return Err(PlanError::OracleFailure(message));
        }
        OracleStatus::Feasible | OracleStatus::Optimal => {}
    }

    let values = &outcome.values;
    let expected = model.program.variables().len();
    if values.len() != expected {
        return Err(inconsistent(format!(
            "{} values for {expected} variables",
            values.len()
        )));
    }

    let vars = &model.vars;
    let read = |var: VarId| {
        bit(values, var).ok_or_else(|| {
            inconsistent(format!(
                "{} = {} is not binary",
                model.program.variable(var).name,
                values[var.index()]
            ))
        })
    };

    let mut chosen = Vec::new();
    for (d, &x) in vars.destinations.iter().enumerate() {
        if read(x)? {
            chosen.push(d);
        }
    }
    let destination = match chosen.as_slice() {
        [only] => *only,
        _ => {
            return Err(inconsistent(format!(
                "{} destinations chosen",
                chosen.len()
            )))
        }
    };

    let mut going_to = Vec::with_capacity(vars.n_people);
    for i in 0..vars.n_people {
        let mut targets = Vec::new();
        for j in 0..vars.n_nodes {
            if read(vars.arc(i, j))? {
                targets.push(j);
            }
        }
        match targets.as_slice() {
            [j] if *j != i => going_to.push(*j),
            _ => {
                return Err(inconsistent(format!(
                    "person {i} has outgoing arcs to {targets:?}"
                )))
            }
        }
    }

    // Every chain has to end at the chosen destination within |P| hops.
    let target = vars.n_people + destination;
    for start in 0..vars.n_people {
        let mut node = start;
        let mut hops = 0;
        while node < vars.n_people && hops <= vars.n_people {
            node = going_to[node];
            hops += 1;
        }
        if node != target {
            return Err(inconsistent(format!(
                "person {start} does not reach the chosen destination"
            )));
        }
    }

    let use_car = vars
        .cars
        .iter()
        .map(|&a| read(a))
        .collect::<Result<Vec<_>, _>>()?;

    let scalar = |var: VarId| values[var.index()];
    Ok(Assignment {
        status: outcome.status,
        destination,
        going_to,
        use_car,
        scores: Scores {
            total_distance: scalar(vars.total_distance),
            fun_score: scalar(vars.fun_score),
            interval_score: scalar(vars.interval_score),
            distance_score: scalar(vars.distance_score),
            objective: scalar(vars.total_score),
        },
    })
}

impl Assignment {
    /// Writes `going_to`, `use_car` and `chosen` and summarises the result.
    pub fn apply(&self, problem: &mut Problem, timings: Timings) -> Plan {
        for destination in &mut problem.destinations {
            destination.chosen = false;
        }
        problem.destinations[self.destination].chosen = true;

        let hops: Vec<Node> = self.going_to.iter().map(|&j| problem.node_at(j)).collect();
        for ((person, hop), &use_car) in problem.people.iter_mut().zip(hops).zip(&self.use_car) {
            person.going_to = Some(hop);
            person.use_car = use_car;
        }

        let routes = problem
            .people
            .iter()
            .zip(&self.going_to)
            .map(|(person, &j)| Route {
                person: person.name.clone(),
                going_to: problem.name(problem.node_at(j)).to_string(),
                use_car: person.use_car,
            })
            .collect();

        let chosen = &problem.destinations[self.destination];
        Plan {
            destination: chosen.name.clone(),
            activity_start: chosen.activity_start.as_ref().map(format_timestamp),
            activity_end: chosen.activity_end.as_ref().map(format_timestamp),
            routes,
            scores: self.scores,
            status: self.status,
            timings,
        }
    }
}

/// Decodes and, only when the assignment is consistent, applies it.
pub fn interpret(
    problem: &mut Problem,
    model: &BuiltModel,
    outcome: &OracleOutcome,
    timings: Timings,
) -> Result<Plan, PlanError> {
    let assignment = decode(model, outcome)?;
    Ok(assignment.apply(problem, timings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::capacity::{CapacityPolicy, GlobalCapacity};
    use crate::context::ModelContext;
    use crate::scoring::ScoringPolicy;
    use rendezvous_core::{
        utils::parse_timestamp, Activity, Availability, Destination, Location, OptimizerConfig,
        Person,
    };
    use std::time::Duration;

    fn pair() -> Problem {
        let always = Availability::always(4);
        let mut problem = Problem {
            people: vec![
                Person::new("a", Location::new(0.0, 0.0), true, 2, always.clone()),
                Person::new("b", Location::new(1.0, 0.0), false, 0, always.clone()),
            ],
            destinations: vec![
                Destination::new("near", Location::new(2.0, 0.0), 5.0, always.clone()),
                Destination::new("far", Location::new(9.0, 0.0), 5.0, always),
            ],
            optimizer: OptimizerConfig::default(),
            activity: Activity {
                name: None,
                duration: 1,
                start: parse_timestamp("2019-01-01T00:00:00").unwrap(),
            },
        };
        problem.scan_intervals();
        problem
    }

    fn build(problem: &Problem) -> BuiltModel {
        let ctx = ModelContext::new(problem);
        ModelBuilder::new(
            CapacityPolicy::Global(GlobalCapacity { max_passengers: 2 }),
            ScoringPolicy::MeanDistance,
            0.5,
            200.0,
        )
        .build(&ctx)
        .unwrap()
    }

    /// a drives, picks up b, both arrive at `near`.
    fn solved(model: &BuiltModel) -> OracleOutcome {
        let vars = &model.vars;
        let mut values = vec![0.0; model.program.variables().len()];
        values[vars.arc(0, 1).index()] = 1.0;
        values[vars.arc(1, 2).index()] = 1.0;
        values[vars.cars[0].index()] = 1.0;
        values[vars.destinations[0].index()] = 1.0;
        values[vars.total_distance.index()] = 2.0;
        values[vars.total_score.index()] = 7.5;
        OracleOutcome::solved(OracleStatus::Optimal, values, Duration::ZERO)
    }

    #[test]
    fn consistent_solution_is_written_back() {
        let mut problem = pair();
        let model = build(&problem);

        let plan = interpret(&mut problem, &model, &solved(&model), Timings::default()).unwrap();

        assert_eq!(plan.destination, "near");
        assert_eq!(plan.route("a").unwrap().going_to, "b");
        assert_eq!(plan.route("b").unwrap().going_to, "near");
        assert_eq!(plan.drivers().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(plan.activity_start.as_deref(), Some("2019-01-01T01:00:00"));
        assert_eq!(plan.scores.objective, 7.5);

        assert!(problem.destinations[0].chosen);
        assert!(!problem.destinations[1].chosen);
        assert_eq!(problem.people[1].going_to, Some(Node::Destination(0)));
        assert!(problem.people[0].use_car);
    }

    #[test]
    fn failures_map_to_errors_and_mutate_nothing() {
        let mut problem = pair();
        let model = build(&problem);

        let infeasible = OracleOutcome::unsolved(OracleStatus::Infeasible, "x", Duration::ZERO);
        assert!(matches!(
            interpret(&mut problem, &model, &infeasible, Timings::default()),
            Err(PlanError::InfeasibleModel)
        ));
        let timeout = OracleOutcome::unsolved(OracleStatus::Timeout, "x", Duration::ZERO);
        assert!(matches!(
            interpret(&mut problem, &model, &timeout, Timings::default()),
            Err(PlanError::OracleTimeout)
        ));
        let error = OracleOutcome::unsolved(OracleStatus::Error, "boom", Duration::ZERO);
        assert!(matches!(
            interpret(&mut problem, &model, &error, Timings::default()),
            Err(PlanError::OracleFailure(message)) if message == "boom"
        ));

        assert!(problem.destinations.iter().all(|d| !d.chosen));
        assert!(problem.people.iter().all(|p| p.going_to.is_none()));
    }

    #[test]
    fn two_chosen_destinations_are_rejected() {
        let mut problem = pair();
        let model = build(&problem);
        let mut outcome = solved(&model);
        outcome.values[model.vars.destinations[1].index()] = 1.0;

        assert!(matches!(
            interpret(&mut problem, &model, &outcome, Timings::default()),
            Err(PlanError::InconsistentSolution(_))
        ));
        assert!(problem.destinations.iter().all(|d| !d.chosen));
    }

    #[test]
    fn fractional_and_missing_arcs_are_rejected() {
        let problem = pair();
        let model = build(&problem);

        let mut fractional = solved(&model);
        fractional.values[model.vars.arc(0, 1).index()] = 0.5;
        assert!(decode(&model, &fractional).is_err());

        let mut missing = solved(&model);
        missing.values[model.vars.arc(1, 2).index()] = 0.0;
        assert!(decode(&model, &missing).is_err());

        let mut elsewhere = solved(&model);
        elsewhere.values[model.vars.arc(1, 2).index()] = 0.0;
        elsewhere.values[model.vars.arc(1, 3).index()] = 1.0;
        assert!(decode(&model, &elsewhere).is_err());
    }

    #[test]
    fn near_integral_values_are_accepted() {
        let problem = pair();
        let model = build(&problem);
        let mut outcome = solved(&model);
        outcome.values[model.vars.arc(0, 1).index()] = 1.0 - 5e-5;
        outcome.values[model.vars.arc(0, 2).index()] = 5e-5;

        let assignment = decode(&model, &outcome).unwrap();
        assert_eq!(assignment.going_to, vec![1, 2]);
        assert_eq!(assignment.use_car, vec![true, false]);
    }
}
