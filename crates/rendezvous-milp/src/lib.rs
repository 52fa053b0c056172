#![deny(clippy::all)]

//! Exact planner: scan, build, solve, interpret.

pub mod builder;
pub mod capacity;
pub mod context;
pub mod error;
pub mod interpret;
pub mod oracle;
pub mod plan;
pub mod program;
pub mod scoring;

use rendezvous_core::{PlanningInput, Problem};
use std::time::Instant;
use tracing::info;

pub use builder::{BuiltModel, ModelBuilder, ModelVars};
pub use capacity::{CapacityModel, CapacityPolicy, CapacityVars, GlobalCapacity, PerDriverCapacity};
pub use context::ModelContext;
pub use error::PlanError;
pub use interpret::{decode, interpret, Assignment};
pub use oracle::{
    oracle_for, Cancellation, MicroLp, Oracle, OracleOutcome, OracleStatus, TimeLimited,
};
pub use plan::{Plan, Route, Scores, Timings};
pub use program::LinearProgram;
pub use scoring::ScoringPolicy;

pub struct Planner {
    oracle: Box<dyn Oracle>,
}

impl Planner {
    pub fn new(oracle: Box<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub fn from_config(config: &rendezvous_core::OptimizerConfig) -> Result<Self, PlanError> {
        Ok(Self::new(oracle_for(config)?))
    }

    /// Runs one full planning pass over `problem`.
    ///
    /// The scan results stay on the destinations even when solving fails;
    /// routing fields are written only for a consistent solution.
    pub fn plan(&self, problem: &mut Problem) -> Result<Plan, PlanError> {
        let builder = ModelBuilder::from_config(&problem.optimizer)?;

        let report = problem.scan_intervals();
        info!(
            rounds = report.rounds,
            windows = report.windows_found,
            exhausted = report.exhausted,
            "interval scan finished"
        );

        let started = Instant::now();
        let model = {
            let ctx = ModelContext::new(problem);
            builder.build(&ctx)?
        };
        let build_secs = started.elapsed().as_secs_f64();

        let outcome = self.oracle.solve(&model.program, &Cancellation::default());
        info!(
            oracle = self.oracle.name(),
            status = ?outcome.status,
            elapsed = ?outcome.elapsed,
            "oracle finished"
        );

        let timings = Timings {
            build_secs,
            solve_secs: outcome.elapsed.as_secs_f64(),
        };
        interpret(problem, &model, &outcome, timings)
    }
}

/// Validates `input`, then plans it with the oracle its configuration names.
pub fn plan(input: PlanningInput) -> Result<(Problem, Plan), PlanError> {
    let mut problem = Problem::from_input(input)?;
    let plan = Planner::from_config(&problem.optimizer)?.plan(&mut problem)?;
    Ok((problem, plan))
}

/// [`plan`] for a raw JSON document.
pub fn plan_json(raw: &str) -> Result<(Problem, Plan), PlanError> {
    let mut problem = Problem::from_json(raw)?;
    let plan = Planner::from_config(&problem.optimizer)?.plan(&mut problem)?;
    Ok((problem, plan))
}
