//! Validation harness: random instances in, checked plans out.

pub mod generator;
pub mod validate;

pub use generator::{GeneratorConfig, InstanceGenerator};
pub use validate::{check_plan, Violation};

use rendezvous_core::Problem;
use rendezvous_milp::{Planner, PlanError};

/// Outcome of planning and checking one generated instance.
#[derive(Debug)]
pub struct SweepRow {
    pub instance: usize,
    pub people: usize,
    pub destinations: usize,
    pub result: Result<(rendezvous_milp::Plan, Vec<Violation>), PlanError>,
}

impl SweepRow {
    pub const HEADER: &'static str =
        "instance,people,destinations,status,destination,objective,total_distance,build_secs,solve_secs,violations";

    pub fn to_csv(&self) -> String {
        let prefix = format!("{},{},{}", self.instance, self.people, self.destinations);
        match &self.result {
            Ok((plan, violations)) => format!(
                "{prefix},{:?},{},{:.4},{:.4},{:.6},{:.6},{}",
                plan.status,
                plan.destination,
                plan.scores.objective,
                plan.scores.total_distance,
                plan.timings.build_secs,
                plan.timings.solve_secs,
                violations.len(),
            ),
            Err(err) => format!("{prefix},{},,,,,,", error_kind(err)),
        }
    }
}

fn error_kind(err: &PlanError) -> &'static str {
    match err {
        PlanError::MalformedInput(_) => "malformed_input",
        PlanError::BigMTooSmall { .. } => "big_m_too_small",
        PlanError::LevelRangeTooNarrow { .. } => "level_range_too_narrow",
        PlanError::UnsupportedSolver { .. } => "unsupported_solver",
        PlanError::InfeasibleModel => "infeasible",
        PlanError::OracleTimeout => "timeout",
        PlanError::OracleFailure(_) => "error",
        PlanError::InconsistentSolution(_) => "inconsistent",
    }
}

/// Plans and checks `count` instances drawn from `generator`.
pub fn sweep(generator: InstanceGenerator, count: usize) -> impl Iterator<Item = SweepRow> {
    generator.take(count).enumerate().map(|(instance, input)| {
        let people = input.people.len();
        let destinations = input.destinations.len();
        let result = Problem::from_input(input)
            .map_err(PlanError::from)
            .and_then(|mut problem| {
                let plan = Planner::from_config(&problem.optimizer)?.plan(&mut problem)?;
                let violations = check_plan(&problem, &plan);
                Ok((plan, violations))
            });
        SweepRow {
            instance,
            people,
            destinations,
            result,
        }
    })
}
