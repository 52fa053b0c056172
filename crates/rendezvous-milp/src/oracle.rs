//! The optimization oracle: anything that can solve a [`LinearProgram`].

use crate::error::PlanError;
use crate::program::{Comparison, Domain, LinearExpr, LinearProgram, Sense, Variable};
use crossbeam_channel::RecvTimeoutError;
use good_lp::{
    variable, Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus,
    SolverModel, WithTimeLimit,
};
use rendezvous_core::{OptimizerConfig, SolverBackend};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Termination status, ordered so that better outcomes compare greater.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleStatus {
    Error,
    Timeout,
    Infeasible,
    Feasible,
    Optimal,
}

impl OracleStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, OracleStatus::Feasible | OracleStatus::Optimal)
    }
}

#[derive(Clone, Debug)]
pub struct OracleOutcome {
    pub status: OracleStatus,
    /// One value per program variable, indexed by `VarId`; empty without a solution.
    pub values: Vec<f64>,
    pub message: Option<String>,
    pub elapsed: Duration,
}

impl OracleOutcome {
    pub fn solved(status: OracleStatus, values: Vec<f64>, elapsed: Duration) -> Self {
        Self {
            status,
            values,
            message: None,
            elapsed,
        }
    }

    pub fn unsolved(status: OracleStatus, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status,
            values: Vec::new(),
            message: Some(message.into()),
            elapsed,
        }
    }
}

/// Raised by whoever stopped waiting for a solve.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    /// Solves `program`. Oracles that work in steps check `cancel` between
    /// them and return [`OracleStatus::Timeout`] once it is raised.
    fn solve(&self, program: &LinearProgram, cancel: &Cancellation) -> OracleOutcome;
}

/// Pure-Rust branch and bound through good_lp's microlp backend.
///
/// The time limit is handed to microlp itself, which checks its deadline
/// inside the simplex loop and stops there.
#[derive(Clone, Copy, Debug, Default)]
pub struct MicroLp {
    time_limit: Option<Duration>,
}

impl MicroLp {
    pub fn with_time_limit(limit: Duration) -> Self {
        Self {
            time_limit: Some(limit),
        }
    }
}

impl Oracle for MicroLp {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, program: &LinearProgram, cancel: &Cancellation) -> OracleOutcome {
        let started = Instant::now();

        let mut vars = ProblemVariables::new();
        let handles: Vec<good_lp::Variable> = program
            .variables()
            .iter()
            .map(|var| vars.add(definition(var)))
            .collect();

        let objective = to_expression(program.objective(), &handles);
        let unsolved = match program.sense() {
            Sense::Maximise => vars.maximise(objective),
            Sense::Minimise => vars.minimise(objective),
        };

        let mut model = unsolved.using(good_lp::microlp);
        if let Some(limit) = self.time_limit {
            model = model.with_time_limit(limit.as_secs_f64());
        }
        for labelled in program.constraints() {
            let constraint = &labelled.constraint;
            let lhs = to_expression(&constraint.expr, &handles);
            model = model.with(match constraint.comparison {
                Comparison::LessEq => lhs.leq(constraint.rhs),
                Comparison::GreaterEq => lhs.geq(constraint.rhs),
                Comparison::Equal => lhs.eq(constraint.rhs),
            });
        }

        if cancel.is_cancelled() {
            return OracleOutcome::unsolved(OracleStatus::Timeout, "cancelled", started.elapsed());
        }

        match model.solve() {
            Ok(solution) => {
                let status = match solution.status() {
                    SolutionStatus::Optimal => OracleStatus::Optimal,
                    _ => OracleStatus::Feasible,
                };
                let values = handles.iter().map(|&var| solution.value(var)).collect();
                OracleOutcome::solved(status, values, started.elapsed())
            }
            Err(ResolutionError::Infeasible) => {
                OracleOutcome::unsolved(OracleStatus::Infeasible, "infeasible", started.elapsed())
            }
            // microlp reports a deadline hit before any incumbent as `Other`.
            Err(ResolutionError::Other(message))
                if self.time_limit.is_some_and(|limit| started.elapsed() >= limit) =>
            {
                OracleOutcome::unsolved(OracleStatus::Timeout, message, started.elapsed())
            }
            Err(err) => OracleOutcome::unsolved(OracleStatus::Error, err.to_string(), started.elapsed()),
        }
    }
}

fn definition(var: &Variable) -> good_lp::VariableDefinition {
    let def = variable().name(var.name.clone());
    match var.domain {
        Domain::Binary => def.binary(),
        Domain::Integer { min, max } => bounded(def.integer(), min, max),
        Domain::Continuous { min, max } => bounded(def, min, max),
    }
}

fn bounded(mut def: good_lp::VariableDefinition, min: f64, max: f64) -> good_lp::VariableDefinition {
    if min.is_finite() {
        def = def.min(min);
    }
    if max.is_finite() {
        def = def.max(max);
    }
    def
}

fn to_expression(expr: &LinearExpr, handles: &[good_lp::Variable]) -> Expression {
    let mut out = Expression::with_capacity(expr.terms().len());
    for &(var, coef) in expr.terms() {
        out.add_mul(coef, handles[var.index()]);
    }
    out
}

/// Workers a [`TimeLimited`] may leave running before it refuses new solves.
const MAX_ABANDONED: usize = 2;

/// How long a timed-out solve waits for its worker to notice the cancellation.
const CANCEL_GRACE: Duration = Duration::from_millis(100);

/// Runs the wrapped oracle on a worker thread and gives up after `limit`.
///
/// On timeout the worker's [`Cancellation`] is raised. A worker that ignores
/// it keeps running and counts against [`MAX_ABANDONED`]; once that many are
/// still alive, further solves fail immediately with [`OracleStatus::Error`].
pub struct TimeLimited<O> {
    inner: Arc<O>,
    limit: Duration,
    running: Arc<AtomicUsize>,
}

impl<O: Oracle + 'static> TimeLimited<O> {
    pub fn new(inner: O, limit: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            limit,
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Workers started by this wrapper that have not returned yet.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }
}

impl<O: Oracle + 'static> Oracle for TimeLimited<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn solve(&self, program: &LinearProgram, cancel: &Cancellation) -> OracleOutcome {
        let started = Instant::now();
        let still_running = self.running();
        if still_running >= MAX_ABANDONED {
            warn!(still_running, oracle = self.name(), "refusing solve while abandoned workers run");
            return OracleOutcome::unsolved(
                OracleStatus::Error,
                format!("{still_running} abandoned solves are still running"),
                started.elapsed(),
            );
        }

        let (sender, receiver) = crossbeam_channel::bounded(1);
        let inner = Arc::clone(&self.inner);
        let running = Arc::clone(&self.running);
        let worker_cancel = cancel.clone();
        let program = program.clone();

        running.fetch_add(1, Ordering::AcqRel);
        let spawned = thread::Builder::new()
            .name("rendezvous-oracle".to_string())
            .spawn(move || {
                let outcome = inner.solve(&program, &worker_cancel);
                running.fetch_sub(1, Ordering::AcqRel);
                // The receiver is gone once the caller has timed out.
                let _ = sender.send(outcome);
            });
        if let Err(err) = spawned {
            self.running.fetch_sub(1, Ordering::AcqRel);
            return OracleOutcome::unsolved(OracleStatus::Error, err.to_string(), started.elapsed());
        }

        match receiver.recv_timeout(self.limit) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                let stopped = receiver.recv_timeout(CANCEL_GRACE).is_ok();
                warn!(limit = ?self.limit, oracle = self.name(), stopped, "solve cancelled at time limit");
                OracleOutcome::unsolved(OracleStatus::Timeout, "time limit reached", started.elapsed())
            }
            Err(RecvTimeoutError::Disconnected) => OracleOutcome::unsolved(
                OracleStatus::Error,
                "oracle thread exited without a result",
                started.elapsed(),
            ),
        }
    }
}

/// Extra wall-clock time granted on top of the solver's own limit.
const TRANSLATION_MARGIN: Duration = Duration::from_secs(1);

/// Picks the oracle named by the optimizer configuration.
pub fn oracle_for(config: &OptimizerConfig) -> Result<Box<dyn Oracle>, PlanError> {
    let unsupported = || PlanError::UnsupportedSolver {
        name: config.solver_name.clone(),
        backend: config.solver_backend,
    };

    if config.solver_backend == SolverBackend::Remote {
        return Err(unsupported());
    }

    match config.solver_name.to_ascii_lowercase().as_str() {
        "microlp" | "default" => {
            info!(solver = "microlp", limit = ?config.time_limit(), "oracle selected");
            // microlp stops itself at the limit; the wrapper also bounds the
            // model translation, which microlp's deadline does not cover.
            Ok(match config.time_limit() {
                Some(limit) => Box::new(TimeLimited::new(
                    MicroLp::with_time_limit(limit),
                    limit + TRANSLATION_MARGIN,
                )),
                None => Box::new(MicroLp::default()),
            })
        }
        _ => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::LinearExpr;

    /// Sleeps through the whole solve without looking at the cancellation.
    struct Sleepy(Duration);

    impl Oracle for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn solve(&self, program: &LinearProgram, _cancel: &Cancellation) -> OracleOutcome {
            thread::sleep(self.0);
            OracleOutcome::solved(
                OracleStatus::Optimal,
                vec![0.0; program.variables().len()],
                self.0,
            )
        }
    }

    /// Works in fixed steps and stops between them once cancelled.
    struct Stepping {
        steps: usize,
        step: Duration,
        done: Arc<AtomicUsize>,
    }

    impl Oracle for Stepping {
        fn name(&self) -> &str {
            "stepping"
        }

        fn solve(&self, _program: &LinearProgram, cancel: &Cancellation) -> OracleOutcome {
            for _ in 0..self.steps {
                if cancel.is_cancelled() {
                    return OracleOutcome::unsolved(OracleStatus::Timeout, "cancelled", Duration::ZERO);
                }
                thread::sleep(self.step);
                self.done.fetch_add(1, Ordering::AcqRel);
            }
            OracleOutcome::solved(OracleStatus::Optimal, Vec::new(), Duration::ZERO)
        }
    }

    fn knapsack() -> LinearProgram {
        let mut program = LinearProgram::new();
        let x = program.binary("x");
        let y = program.binary("y");
        let z = program.binary("z");
        program.add_constraint("weight", (3.0 * x + 4.0 * y + 2.0 * z).leq(6.0));
        program.set_objective(5.0 * x + 6.0 * y + 3.0 * z, Sense::Maximise);
        program
    }

    #[test]
    fn status_ordering_prefers_solutions() {
        assert!(OracleStatus::Optimal > OracleStatus::Feasible);
        assert!(OracleStatus::Feasible > OracleStatus::Infeasible);
        assert!(OracleStatus::Infeasible > OracleStatus::Timeout);
        assert!(!OracleStatus::Timeout.has_solution());
    }

    #[test]
    fn microlp_solves_a_small_knapsack() {
        let program = knapsack();
        let outcome = MicroLp::default().solve(&program, &Cancellation::default());

        assert_eq!(outcome.status, OracleStatus::Optimal);
        let picked: Vec<bool> = outcome.values.iter().map(|v| (v - 1.0).abs() < 1e-6).collect();
        assert_eq!(picked, vec![false, true, true]);
        assert!(program.violations(&outcome.values, 1e-6).is_empty());
    }

    #[test]
    fn microlp_reports_infeasibility() {
        let mut program = LinearProgram::new();
        let x = program.binary("x");
        program.add_constraint("impossible", LinearExpr::from(x).geq(2.0));
        program.set_objective(x, Sense::Maximise);

        let outcome = MicroLp::default().solve(&program, &Cancellation::default());
        assert_eq!(outcome.status, OracleStatus::Infeasible);
    }

    #[test]
    fn microlp_stops_at_its_own_deadline() {
        let mut program = LinearProgram::new();
        let x = program.add_variable("x", Domain::Continuous { min: 0.0, max: 2.0 });
        let y = program.add_variable("y", Domain::Continuous { min: 1.0, max: 3.0 });
        program.add_constraint("budget", (2.0 * x + y).leq(4.0));
        program.set_objective(x + y, Sense::Maximise);

        // a zero budget expires before the relaxation is even started
        let oracle = MicroLp::with_time_limit(Duration::ZERO);
        let outcome = oracle.solve(&program, &Cancellation::default());

        assert_eq!(outcome.status, OracleStatus::Timeout);
        assert!(outcome.values.is_empty());
    }

    #[test]
    fn microlp_skips_a_cancelled_solve() {
        let cancel = Cancellation::default();
        cancel.cancel();
        let outcome = MicroLp::default().solve(&knapsack(), &cancel);
        assert_eq!(outcome.status, OracleStatus::Timeout);
    }

    #[test]
    fn time_limit_surfaces_as_timeout() {
        let program = LinearProgram::new();
        let oracle = TimeLimited::new(Sleepy(Duration::from_millis(500)), Duration::from_millis(20));

        let outcome = oracle.solve(&program, &Cancellation::default());

        assert_eq!(outcome.status, OracleStatus::Timeout);
        assert!(outcome.values.is_empty());
    }

    #[test]
    fn timed_out_workers_stop_stepping() {
        let done = Arc::new(AtomicUsize::new(0));
        let oracle = TimeLimited::new(
            Stepping {
                steps: 10,
                step: Duration::from_millis(20),
                done: Arc::clone(&done),
            },
            Duration::from_millis(30),
        );
        let cancel = Cancellation::default();

        let outcome = oracle.solve(&LinearProgram::new(), &cancel);
        assert_eq!(outcome.status, OracleStatus::Timeout);
        assert!(cancel.is_cancelled());

        // The worker has already returned inside the grace period.
        assert_eq!(oracle.running(), 0);
        let stopped_at = done.load(Ordering::Acquire);
        thread::sleep(Duration::from_millis(250));
        assert_eq!(done.load(Ordering::Acquire), stopped_at);
        assert!(stopped_at < 10);
    }

    #[test]
    fn stubborn_workers_are_capped() {
        let oracle = TimeLimited::new(Sleepy(Duration::from_secs(3)), Duration::from_millis(10));
        let program = LinearProgram::new();

        for _ in 0..MAX_ABANDONED {
            let outcome = oracle.solve(&program, &Cancellation::default());
            assert_eq!(outcome.status, OracleStatus::Timeout);
        }
        assert_eq!(oracle.running(), MAX_ABANDONED);

        let refused = oracle.solve(&program, &Cancellation::default());
        assert_eq!(refused.status, OracleStatus::Error);
        assert_eq!(oracle.running(), MAX_ABANDONED);
    }

    #[test]
    fn fast_solves_pass_through_the_limit() {
        let program = LinearProgram::new();
        let oracle = TimeLimited::new(Sleepy(Duration::from_millis(1)), Duration::from_secs(5));
        assert_eq!(
            oracle.solve(&program, &Cancellation::default()).status,
            OracleStatus::Optimal
        );
        assert_eq!(oracle.running(), 0);
    }

    #[test]
    fn remote_backends_are_rejected() {
        let config = OptimizerConfig {
            solver_backend: SolverBackend::Remote,
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            oracle_for(&config),
            Err(PlanError::UnsupportedSolver { .. })
        ));

        let config = OptimizerConfig {
            solver_name: "gurobi".to_string(),
            ..OptimizerConfig::default()
        };
        assert!(oracle_for(&config).is_err());
        assert_eq!(oracle_for(&OptimizerConfig::default()).unwrap().name(), "microlp");
    }
}
