//! Ordering and occupancy constraints, one implementation per capacity policy.
//!
//! Both policies give every person a level `u` that strictly increases along
//! active arcs between people, which rules out cycles. They differ in how a
//! car's occupancy is read off those levels:
//!
//! - [`GlobalCapacity`] numbers each car's chain 1, 2, 3, … and caps every
//!   level at one shared limit.
//! - [`PerDriverCapacity`] pins each driver to `base_level + 1`, where base
//!   levels are `level_range` apart, and counts the people whose level lies
//!   within `ceil(level_range / 2)` of the driver's. A chain longer than that
//!   window is only partly counted, so [`CapacityModel::check`] rejects any
//!   owner whose car could legally hold as many people as the window.

use crate::builder::ModelVars;
use crate::context::ModelContext;
use crate::error::PlanError;
use crate::program::{Domain, LinearExpr, LinearProgram, VarId};
use rendezvous_core::{CapacityConfig, InputError};

pub trait CapacityModel {
    /// Rejects instances the policy cannot model faithfully.
    fn check(&self, _ctx: &ModelContext) -> Result<(), PlanError> {
        Ok(())
    }

    /// Domain of the ordering level variables.
    fn level_domain(&self, ctx: &ModelContext) -> Domain;

    /// Smallest big-M that keeps every relaxed constraint vacuous, if big-M
    /// is used at all.
    fn required_big_m(&self, ctx: &ModelContext) -> Option<f64>;

    fn add_ordering(
        &self,
        ctx: &ModelContext,
        vars: &ModelVars,
        program: &mut LinearProgram,
        big_m: f64,
    );

    fn add_capacity(
        &self,
        ctx: &ModelContext,
        vars: &ModelVars,
        program: &mut LinearProgram,
        big_m: f64,
    ) -> CapacityVars;
}

/// Variables a policy adds on top of the shared model.
#[derive(Clone, Debug)]
pub enum CapacityVars {
    Global,
    PerDriver {
        n_people: usize,
        /// `delta1[i,j]`: level of j is below level of i.
        below: Vec<VarId>,
        /// `delta2[i,j]`: level of j is at least one window above level of i.
        beyond: Vec<VarId>,
        /// `v[i,j]`: level of j lies in the window starting at level of i.
        in_window: Vec<VarId>,
        /// `z3[i,j] = v[i,j] * a[i]`.
        riding_with: Vec<VarId>,
        /// People counted in i's car, driver included.
        occupancy: Vec<VarId>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalCapacity {
    pub max_passengers: u32,
}

impl CapacityModel for GlobalCapacity {
    fn level_domain(&self, ctx: &ModelContext) -> Domain {
        Domain::Integer {
            min: 1.0,
            max: ctx.n_people as f64,
        }
    }

    fn required_big_m(&self, _ctx: &ModelContext) -> Option<f64> {
        None
    }

    fn add_ordering(
        &self,
        ctx: &ModelContext,
        vars: &ModelVars,
        program: &mut LinearProgram,
        _big_m: f64,
    ) {
        // Levels live in [1, n], so n already deactivates the inequality.
        let n = ctx.n_people as f64;
        for i in ctx.people() {
            for j in ctx.people() {
                let b = vars.arc(i, j);
                program.add_constraint(
                    "ordering",
                    (n * (1.0 - b) + vars.levels[j]).geq(vars.levels[i] + 1.0),
                );
            }
        }
    }

    fn add_capacity(
        &self,
        ctx: &ModelContext,
        vars: &ModelVars,
        program: &mut LinearProgram,
        _big_m: f64,
    ) -> CapacityVars {
        for i in ctx.people() {
            program.add_constraint(
                "global_capacity",
                LinearExpr::from(vars.levels[i]).leq(f64::from(self.max_passengers)),
            );
        }
        CapacityVars::Global
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PerDriverCapacity {
    pub level_range: u32,
}

impl PerDriverCapacity {
    pub fn base_level(&self, person: usize) -> f64 {
        (person as f64 + 1.0) * f64::from(self.level_range)
    }

    /// Level gap below which a person counts as riding in a driver's car.
    pub fn hop_window(&self) -> f64 {
        f64::from(self.window())
    }

    fn window(&self) -> u32 {
        self.level_range.div_ceil(2)
    }

    /// Highest level any person can take.
    pub fn max_level(&self, n_people: usize) -> f64 {
        (f64::from(self.level_range) + 1.0) * n_people as f64
    }
}

impl CapacityModel for PerDriverCapacity {
    fn check(&self, ctx: &ModelContext) -> Result<(), PlanError> {
        if self.level_range < 2 {
            return Err(InputError::InvalidLevelRange(self.level_range).into());
        }
        // A car never holds more than the whole group, and a limit at or
        // above the group size never binds.
        let group = u32::try_from(ctx.n_people).unwrap_or(u32::MAX);
        let window = self.window();
        for person in ctx.problem.people.iter().filter(|p| p.car) {
            let binding = person.max_passengers.min(group.saturating_sub(1));
            if binding >= window {
                return Err(PlanError::LevelRangeTooNarrow {
                    person: person.name.clone(),
                    seats: binding,
                    level_range: self.level_range,
                    required: binding.saturating_mul(2).saturating_add(1),
                });
            }
        }
        Ok(())
    }

    fn level_domain(&self, ctx: &ModelContext) -> Domain {
        Domain::Integer {
            min: 0.0,
            max: self.max_level(ctx.n_people),
        }
    }

    fn required_big_m(&self, ctx: &ModelContext) -> Option<f64> {
        // Level gaps span at most [-max_level, max_level]; the window
        // indicators shift that by up to one hop window.
        Some(self.max_level(ctx.n_people) + self.hop_window())
    }

    fn add_ordering(
        &self,
        ctx: &ModelContext,
        vars: &ModelVars,
        program: &mut LinearProgram,
        big_m: f64,
    ) {
        for i in ctx.people() {
            for j in ctx.people() {
                let b = vars.arc(i, j);
                let (u_i, u_j) = (vars.levels[i], vars.levels[j]);
                program.add_constraint(
                    "ordering",
                    (big_m * (1.0 - b) + u_j).geq(u_i + 1.0),
                );
                program.add_constraint(
                    "ordering_step",
                    LinearExpr::from(u_j).leq(u_i + 1.0 + big_m * (1.0 - b)),
                );
            }
        }

        for i in ctx.people() {
            let (u, a) = (vars.levels[i], vars.cars[i]);
            let base = self.base_level(i);
            program.add_constraint(
                "driver_level_floor",
                LinearExpr::from(u).geq((1.0 + base) * a),
            );
            program.add_constraint(
                "driver_level_ceiling",
                LinearExpr::from(u).leq(a + big_m * (1.0 - a) + base),
            );
        }
    }

    fn add_capacity(
        &self,
        ctx: &ModelContext,
        vars: &ModelVars,
        program: &mut LinearProgram,
        big_m: f64,
    ) -> CapacityVars {
        let n = ctx.n_people;
        let window = self.hop_window();
        let people = &ctx.problem.people;

        let mut below = Vec::with_capacity(n * n);
        let mut beyond = Vec::with_capacity(n * n);
        let mut in_window = Vec::with_capacity(n * n);
        let mut riding_with = Vec::with_capacity(n * n);

        for i in ctx.people() {
            for j in ctx.people() {
                let tag = format!("[{},{}]", people[i].name, people[j].name);
                below.push(program.binary(format!("delta1{tag}")));
                beyond.push(program.binary(format!("delta2{tag}")));
                in_window.push(program.binary(format!("v{tag}")));
                riding_with.push(program.binary(format!("z3{tag}")));
            }
        }
        let occupancy: Vec<VarId> = people
            .iter()
            .map(|p| program.add_variable(format!("PPC[{}]", p.name), Domain::non_negative_integer()))
            .collect();

        for i in ctx.people() {
            let a = vars.cars[i];
            for j in ctx.people() {
                let k = i * n + j;
                let gap = vars.levels[j] - vars.levels[i];
                let (d1, d2, v, z3) = (below[k], beyond[k], in_window[k], riding_with[k]);

                program.add_constraint(
                    "below_window_on",
                    (gap.clone() - big_m * (1.0 - d1)).leq(-1.0),
                );
                program.add_constraint("below_window_off", (gap.clone() + big_m * d1).geq(0.0));
                program.add_constraint(
                    "beyond_window_on",
                    gap.clone().geq(window - big_m * (1.0 - d2)),
                );
                program.add_constraint(
                    "beyond_window_off",
                    gap.leq(big_m * d2 + (window - 1.0)),
                );
                program.add_constraint("in_window", LinearExpr::from(v).equals(1.0 - d1 - d2));

                program.add_constraint("riding_with_le_window", LinearExpr::from(z3).leq(v));
                program.add_constraint("riding_with_le_car", LinearExpr::from(z3).leq(a));
                program.add_constraint("riding_with_ge_both", LinearExpr::from(z3).geq(v + a - 1.0));
            }

            let riders: LinearExpr = (0..n).map(|j| riding_with[i * n + j]).sum();
            program.add_constraint("occupancy", riders.equals(occupancy[i]));
            program.add_constraint(
                "driver_capacity",
                LinearExpr::from(occupancy[i]).leq(f64::from(people[i].max_passengers)),
            );
        }

        CapacityVars::PerDriver {
            n_people: n,
            below,
            beyond,
            in_window,
            riding_with,
            occupancy,
        }
    }
}

/// The capacity policy, chosen once when the builder is configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapacityPolicy {
    Global(GlobalCapacity),
    PerDriver(PerDriverCapacity),
}

impl From<CapacityConfig> for CapacityPolicy {
    fn from(config: CapacityConfig) -> Self {
        match config {
            CapacityConfig::Global { max_passengers } => {
                CapacityPolicy::Global(GlobalCapacity { max_passengers })
            }
            CapacityConfig::PerDriver { level_range } => {
                CapacityPolicy::PerDriver(PerDriverCapacity { level_range })
            }
        }
    }
}

impl CapacityPolicy {
    fn model(&self) -> &dyn CapacityModel {
        match self {
            CapacityPolicy::Global(policy) => policy as &dyn CapacityModel,
            CapacityPolicy::PerDriver(policy) => policy,
        }
    }
}

impl CapacityModel for CapacityPolicy {
    fn check(&self, ctx: &ModelContext) -> Result<(), PlanError> {
        self.model().check(ctx)
    }

    fn level_domain(&self, ctx: &ModelContext) -> Domain {
        self.model().level_domain(ctx)
    }

    fn required_big_m(&self, ctx: &ModelContext) -> Option<f64> {
        self.model().required_big_m(ctx)
    }

    fn add_ordering(
        &self,
        ctx: &ModelContext,
        vars: &ModelVars,
        program: &mut LinearProgram,
        big_m: f64,
    ) {
        self.model().add_ordering(ctx, vars, program, big_m)
    }

    fn add_capacity(
        &self,
        ctx: &ModelContext,
        vars: &ModelVars,
        program: &mut LinearProgram,
        big_m: f64,
    ) -> CapacityVars {
        self.model().add_capacity(ctx, vars, program, big_m)
    }
}
