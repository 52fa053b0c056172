//! Solver-neutral integer program: variables, linear constraints, objective.
//!
//! The builder writes into a [`LinearProgram`]; an oracle translates it into
//! whatever its backend needs. Keeping the model as plain data lets it cross
//! thread boundaries and lets tests inspect or evaluate it without solving.

use serde::Serialize;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Domain {
    Binary,
    Integer { min: f64, max: f64 },
    Continuous { min: f64, max: f64 },
}

impl Domain {
    pub fn non_negative_integer() -> Self {
        Domain::Integer {
            min: 0.0,
            max: f64::INFINITY,
        }
    }

    pub fn non_negative() -> Self {
        Domain::Continuous {
            min: 0.0,
            max: f64::INFINITY,
        }
    }

    pub fn free() -> Self {
        Domain::Continuous {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Domain::Binary => (0.0, 1.0),
            Domain::Integer { min, max } | Domain::Continuous { min, max } => (min, max),
        }
    }

    pub fn is_integral(&self) -> bool {
        !matches!(self, Domain::Continuous { .. })
    }
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub domain: Domain,
}

/// `Σ coef·var + constant`.
#[derive(Clone, Debug, Default)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values[var.index()])
            .sum::<f64>()
            + self.constant
    }

    pub fn leq(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearConstraint::new(self, Comparison::LessEq, rhs.into())
    }

    pub fn geq(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearConstraint::new(self, Comparison::GreaterEq, rhs.into())
    }

    pub fn equals(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearConstraint::new(self, Comparison::Equal, rhs.into())
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        Self {
            terms: vec![(var, 1.0)],
            constant: 0.0,
        }
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl<R: Into<LinearExpr>> Add<R> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: R) -> LinearExpr {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl<R: Into<LinearExpr>> Sub<R> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: R) -> LinearExpr {
        let rhs: LinearExpr = rhs.into();
        self + (-rhs)
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1.0
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, factor: f64) -> LinearExpr {
        for (_, coef) in &mut self.terms {
            *coef *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl<R: Into<LinearExpr>> Add<R> for VarId {
    type Output = LinearExpr;

    fn add(self, rhs: R) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<R: Into<LinearExpr>> Sub<R> for VarId {
    type Output = LinearExpr;

    fn sub(self, rhs: R) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Mul<VarId> for f64 {
    type Output = LinearExpr;

    fn mul(self, var: VarId) -> LinearExpr {
        LinearExpr {
            terms: vec![(var, self)],
            constant: 0.0,
        }
    }
}

impl Mul<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn mul(self, expr: LinearExpr) -> LinearExpr {
        expr * self
    }
}

impl Sub<VarId> for f64 {
    type Output = LinearExpr;

    fn sub(self, var: VarId) -> LinearExpr {
        LinearExpr::constant(self) - var
    }
}

impl Sub<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn sub(self, expr: LinearExpr) -> LinearExpr {
        LinearExpr::constant(self) - expr
    }
}

impl Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, expr| acc + expr)
    }
}

impl Sum<VarId> for LinearExpr {
    fn sum<I: Iterator<Item = VarId>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, var| acc + var)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    LessEq,
    GreaterEq,
    Equal,
}

/// `expr (<=|>=|=) rhs`, with every variable moved to the left and every
/// constant to the right.
#[derive(Clone, Debug)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub comparison: Comparison,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(lhs: LinearExpr, comparison: Comparison, rhs: LinearExpr) -> Self {
        let mut expr = lhs - rhs;
        let rhs = -expr.constant;
        expr.constant = 0.0;
        Self {
            expr,
            comparison,
            rhs,
        }
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.comparison {
            Comparison::LessEq => lhs <= self.rhs + tolerance,
            Comparison::GreaterEq => lhs >= self.rhs - tolerance,
            Comparison::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    Maximise,
    Minimise,
}

#[derive(Clone, Debug)]
pub struct LabelledConstraint {
    /// Constraint family, e.g. `"one_outgoing_arc"`.
    pub label: &'static str,
    pub constraint: LinearConstraint,
}

#[derive(Clone, Debug)]
pub struct LinearProgram {
    variables: Vec<Variable>,
    constraints: Vec<LabelledConstraint>,
    objective: LinearExpr,
    sense: Sense,
}

impl Default for LinearProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearProgram {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::new(),
            sense: Sense::Maximise,
        }
    }

    pub fn add_variable(&mut self, name: impl Into<String>, domain: Domain) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            domain,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name, Domain::Binary)
    }

    pub fn add_constraint(&mut self, label: &'static str, constraint: LinearConstraint) {
        self.constraints.push(LabelledConstraint { label, constraint });
    }

    pub fn set_objective(&mut self, objective: impl Into<LinearExpr>, sense: Sense) {
        self.objective = objective.into();
        self.sense = sense;
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.index()]
    }

    pub fn constraints(&self) -> &[LabelledConstraint] {
        &self.constraints
    }

    pub fn constraints_labelled<'a>(
        &'a self,
        label: &'a str,
    ) -> impl Iterator<Item = &'a LinearConstraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| c.label == label)
            .map(|c| &c.constraint)
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Labels of every constraint the assignment violates, plus the names of
    /// variables outside their domain.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<String> {
        let mut violated = Vec::new();

        for (var, value) in self.variables.iter().zip(values) {
            let (min, max) = var.domain.bounds();
            let off_grid = var.domain.is_integral() && (value - value.round()).abs() > tolerance;
            if *value < min - tolerance || *value > max + tolerance || off_grid {
                violated.push(var.name.clone());
            }
        }
        for labelled in &self.constraints {
            if !labelled.constraint.is_satisfied(values, tolerance) {
                violated.push(labelled.label.to_string());
            }
        }

        violated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_move_to_the_right_hand_side() {
        let mut program = LinearProgram::new();
        let a = program.binary("a");
        let x = program.binary("x");

        // z >= a + x - 1  written with z := 0 becomes  -a - x >= -1
        let c = LinearExpr::constant(0.0).geq(a + x - 1.0);
        assert_eq!(c.rhs, -1.0);
        assert_eq!(c.expr.terms(), &[(a, -1.0), (x, -1.0)]);
        assert!(c.is_satisfied(&[1.0, 0.0], 1e-9));
        assert!(!c.is_satisfied(&[1.0, 1.0], 1e-9));
    }

    #[test]
    fn big_m_expression_evaluates() {
        let mut program = LinearProgram::new();
        let b = program.binary("b");
        let u_i = program.add_variable("u_i", Domain::non_negative_integer());
        let u_j = program.add_variable("u_j", Domain::non_negative_integer());

        let c = (200.0 * (1.0 - b) + u_j).geq(u_i + 1.0);
        assert!(c.is_satisfied(&[1.0, 3.0, 4.0], 1e-9));
        assert!(!c.is_satisfied(&[1.0, 4.0, 4.0], 1e-9));
        assert!(c.is_satisfied(&[0.0, 4.0, 4.0], 1e-9));
    }

    #[test]
    fn violations_report_labels_and_domains() {
        let mut program = LinearProgram::new();
        let x = program.binary("x");
        let y = program.binary("y");
        program.add_constraint("pick_one", (x + y).equals(1.0));

        assert!(program.violations(&[1.0, 0.0], 1e-6).is_empty());
        assert_eq!(program.violations(&[1.0, 1.0], 1e-6), vec!["pick_one"]);
        assert_eq!(program.violations(&[0.5, 0.5], 1e-6), vec!["x", "y"]);
    }
}
