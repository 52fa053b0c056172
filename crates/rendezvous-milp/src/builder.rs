//! Turns a scanned [`Problem`](rendezvous_core::Problem) into a [`LinearProgram`].

use crate::capacity::{CapacityModel, CapacityPolicy, CapacityVars};
use crate::context::ModelContext;
use crate::error::PlanError;
use crate::program::{Domain, LinearExpr, LinearProgram, Sense, VarId};
use crate::scoring::ScoringPolicy;
use rendezvous_core::OptimizerConfig;
use tracing::debug;

/// Handles to every variable the shared model declares.
///
/// Per-node vectors follow the node layout of [`ModelContext`]: people first,
/// then destinations. Per-destination vectors are indexed by destination.
#[derive(Clone, Debug)]
pub struct ModelVars {
    pub n_people: usize,
    pub n_nodes: usize,
    /// `b[i,j]`, row-major over all nodes.
    pub arcs: Vec<VarId>,
    /// `a[i]`: person i drives.
    pub cars: Vec<VarId>,
    /// `x[d]`: destination d is chosen.
    pub destinations: Vec<VarId>,
    /// `u[i]`: ordering level.
    pub levels: Vec<VarId>,
    /// `f`: fewer cars on the road than people.
    pub spare_car: VarId,
    /// `z1[i,d] = a[i] * x[d]`, row-major `i * n_destinations + d`.
    pub car_arrivals: Vec<VarId>,
    /// `z2[i,d] = a[i] * b[i,d]`, same layout as `car_arrivals`.
    pub direct_drives: Vec<VarId>,
    pub fun_score: VarId,
    pub interval_score: VarId,
    pub total_distance: VarId,
    pub distance_score: VarId,
    pub total_score: VarId,
}

impl ModelVars {
    #[inline(always)]
    pub fn arc(&self, from: usize, to: usize) -> VarId {
        self.arcs[from * self.n_nodes + to]
    }

    pub fn n_destinations(&self) -> usize {
        self.destinations.len()
    }
}

/// A program together with the handles needed to read a solution back.
#[derive(Clone, Debug)]
pub struct BuiltModel {
    pub program: LinearProgram,
    pub vars: ModelVars,
    pub capacity: CapacityVars,
}

#[derive(Clone, Copy, Debug)]
pub struct ModelBuilder {
    pub capacity: CapacityPolicy,
    pub scoring: ScoringPolicy,
    pub alpha: f64,
    pub big_m: f64,
}

impl ModelBuilder {
    pub fn new(capacity: CapacityPolicy, scoring: ScoringPolicy, alpha: f64, big_m: f64) -> Self {
        Self {
            capacity,
            scoring,
            alpha,
            big_m,
        }
    }

    pub fn from_config(config: &OptimizerConfig) -> Result<Self, PlanError> {
        config.validate()?;
        Ok(Self::new(
            CapacityPolicy::from(config.capacity),
            ScoringPolicy::from_config(config)?,
            config.alpha,
            config.big_m,
        ))
    }

    pub fn build(&self, ctx: &ModelContext) -> Result<BuiltModel, PlanError> {
        self.capacity.check(ctx)?;
        if let Some(required) = self.capacity.required_big_m(ctx) {
            if self.big_m < required {
                return Err(PlanError::BigMTooSmall {
                    configured: self.big_m,
                    required,
                });
            }
        }

        let mut program = LinearProgram::new();
        let vars = self.declare(ctx, &mut program);

        add_routing(ctx, &vars, &mut program);
        add_spare_car(ctx, &vars, &mut program);
        self.capacity.add_ordering(ctx, &vars, &mut program, self.big_m);
        let capacity = self.capacity.add_capacity(ctx, &vars, &mut program, self.big_m);
        self.add_scores(ctx, &vars, &mut program);

        program.set_objective(vars.total_score, Sense::Maximise);

        debug!(
            variables = program.variables().len(),
            constraints = program.constraints().len(),
            people = ctx.n_people,
            destinations = ctx.n_destinations,
            "model built"
        );

        Ok(BuiltModel {
            program,
            vars,
            capacity,
        })
    }

    fn declare(&self, ctx: &ModelContext, program: &mut LinearProgram) -> ModelVars {
        let problem = ctx.problem;
        let node_name = |idx: usize| problem.name(problem.node_at(idx)).to_string();

        let mut arcs = Vec::with_capacity(ctx.n_nodes * ctx.n_nodes);
        for i in ctx.all_nodes() {
            for j in ctx.all_nodes() {
                arcs.push(program.binary(format!("b[{},{}]", node_name(i), node_name(j))));
            }
        }

        let cars = problem
            .people
            .iter()
            .map(|p| program.binary(format!("a[{}]", p.name)))
            .collect();
        let destinations = problem
            .destinations
            .iter()
            .map(|d| program.binary(format!("x[{}]", d.name)))
            .collect();
        let level_domain = self.capacity.level_domain(ctx);
        let levels = problem
            .people
            .iter()
            .map(|p| program.add_variable(format!("u[{}]", p.name), level_domain))
            .collect();
        let spare_car = program.binary("f");

        let mut car_arrivals = Vec::with_capacity(ctx.n_people * ctx.n_destinations);
        let mut direct_drives = Vec::with_capacity(ctx.n_people * ctx.n_destinations);
        for person in &problem.people {
            for destination in &problem.destinations {
                let tag = format!("[{},{}]", person.name, destination.name);
                car_arrivals.push(program.binary(format!("z1{tag}")));
                direct_drives.push(program.binary(format!("z2{tag}")));
            }
        }

        ModelVars {
            n_people: ctx.n_people,
            n_nodes: ctx.n_nodes,
            arcs,
            cars,
            destinations,
            levels,
            spare_car,
            car_arrivals,
            direct_drives,
            fun_score: program.add_variable("fun_score", Domain::non_negative()),
            interval_score: program.add_variable("interval_score", Domain::non_negative()),
            total_distance: program.add_variable("total_distance", Domain::non_negative()),
            distance_score: program.add_variable("distance_score", Domain::free()),
            total_score: program.add_variable("total_score", Domain::free()),
        }
    }

    fn add_scores(&self, ctx: &ModelContext, vars: &ModelVars, program: &mut LinearProgram) {
        let destinations = &ctx.problem.destinations;

        let fun: LinearExpr = destinations
            .iter()
            .zip(&vars.destinations)
            .map(|(d, &x)| d.fun_score * x)
            .sum();
        program.add_constraint("fun_score", LinearExpr::from(vars.fun_score).equals(fun));

        let interval: LinearExpr = destinations
            .iter()
            .zip(&vars.destinations)
            .map(|(d, &x)| f64::from(d.interval_score) * x)
            .sum();
        program.add_constraint(
            "interval_score",
            LinearExpr::from(vars.interval_score).equals(interval),
        );

        let mut travelled = LinearExpr::new();
        for i in ctx.all_nodes() {
            for j in ctx.all_nodes() {
                let dist = ctx.distances.get(i, j);
                if dist > 0.0 {
                    travelled.add_term(vars.arc(i, j), dist);
                }
            }
        }
        program.add_constraint(
            "total_distance",
            LinearExpr::from(vars.total_distance).equals(travelled),
        );

        let (slope, intercept) = self.scoring.affine(ctx);
        program.add_constraint(
            "distance_score",
            LinearExpr::from(vars.distance_score).equals(slope * vars.total_distance + intercept),
        );

        let blend = self.alpha * vars.distance_score
            + ((1.0 - self.alpha) / 2.0) * (vars.fun_score + vars.interval_score);
        program.add_constraint("total_score", LinearExpr::from(vars.total_score).equals(blend));
    }
}

/// Flow, assignment and car-eligibility constraints shared by every policy.
fn add_routing(ctx: &ModelContext, vars: &ModelVars, program: &mut LinearProgram) {
    let n_dest = ctx.n_destinations;

    // Nobody boards a car that is already driving.
    for j in ctx.people() {
        let inflow: LinearExpr = ctx.people().map(|i| vars.arc(i, j)).sum();
        program.add_constraint("person_inflow", inflow.leq(1.0 - vars.cars[j]));
    }

    for (d, node) in ctx.destination_nodes().enumerate() {
        let x = vars.destinations[d];
        let inflow: LinearExpr = ctx.people().map(|i| vars.arc(i, node)).sum();
        let arriving_cars: LinearExpr = ctx
            .people()
            .map(|i| vars.car_arrivals[i * n_dest + d])
            .sum();
        program.add_constraint("destination_inflow", inflow.equals(arriving_cars));

        for i in ctx.people() {
            let z1 = vars.car_arrivals[i * n_dest + d];
            let a = vars.cars[i];
            program.add_constraint("car_arrival_le_car", LinearExpr::from(z1).leq(a));
            program.add_constraint("car_arrival_le_choice", LinearExpr::from(z1).leq(x));
            program.add_constraint("car_arrival_ge_both", LinearExpr::from(z1).geq(a + x - 1.0));
        }
    }

    let chosen: LinearExpr = vars.destinations.iter().copied().sum();
    program.add_constraint("one_destination", chosen.equals(1.0));

    for i in ctx.people() {
        let outgoing: LinearExpr = ctx.all_nodes().map(|j| vars.arc(i, j)).sum();
        program.add_constraint("one_outgoing_arc", outgoing.equals(1.0));
    }

    for d in ctx.destination_nodes() {
        let outgoing: LinearExpr = ctx.all_nodes().map(|j| vars.arc(d, j)).sum();
        program.add_constraint("destination_outgoing", outgoing.equals(0.0));
    }

    for (i, person) in ctx.problem.people.iter().enumerate() {
        let owned = if person.car { 1.0 } else { 0.0 };
        program.add_constraint("car_ownership", LinearExpr::from(vars.cars[i]).leq(owned));
    }
}

/// When fewer cars drive than there are people, at least one driver must
/// pick someone up instead of heading straight to the destination.
fn add_spare_car(ctx: &ModelContext, vars: &ModelVars, program: &mut LinearProgram) {
    let n = ctx.n_people as f64;
    let n_dest = ctx.n_destinations;
    let f = vars.spare_car;
    let driving: LinearExpr = vars.cars.iter().copied().sum();

    program.add_constraint("spare_car_upper", LinearExpr::from(f).leq(n - driving.clone()));
    program.add_constraint("spare_car_lower", (n * f).geq(n - driving.clone()));

    for (d, node) in ctx.destination_nodes().enumerate() {
        let mut direct = LinearExpr::new();
        for i in ctx.people() {
            let z2 = vars.direct_drives[i * n_dest + d];
            let (a, b) = (vars.cars[i], vars.arc(i, node));
            program.add_constraint("direct_drive_le_car", LinearExpr::from(z2).leq(a));
            program.add_constraint("direct_drive_le_arc", LinearExpr::from(z2).leq(b));
            program.add_constraint("direct_drive_ge_both", LinearExpr::from(z2).geq(a + b - 1.0));
            direct.add_term(z2, 1.0);
        }
        program.add_constraint("direct_drives", direct.leq(driving.clone() - f));
    }
}
