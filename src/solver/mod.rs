//! Integer model builder and the solver seam.
//!
//! Placement models are written against [`Model`]: boolean, bounded integer
//! and bounded continuous variables, linear constraints with integer coefficients and one
//! maximization objective. A [`Solver`] turns a model into a [`Solution`].

pub mod lp;

use serde::Serialize;

pub use lp::LpSolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Bool,
    Int { min: i64, max: i64 },
    /// Continuous, for values pinned down by integer variables. The solver
    /// never branches on these.
    Real { min: i64, max: i64 },
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub kind: VarKind,
}

/// `Σ coefficient × variable + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, i64)>,
    pub constant: i64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Sum of variables, each with coefficient 1.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1)).collect(),
            constant: 0,
        }
    }

    pub fn term(mut self, var: VarId, coefficient: i64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    pub fn add_term(&mut self, var: VarId, coefficient: i64) {
        if coefficient != 0 {
            self.terms.push((var, coefficient));
        }
    }

    pub fn plus(mut self, value: i64) -> Self {
        self.constant += value;
        self
    }

    pub fn evaluate(&self, values: &[i64]) -> i64 {
        self.terms
            .iter()
            .map(|&(v, c)| c * values[v.index()])
            .sum::<i64>()
            + self.constant
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::new().term(var, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Eq,
    Ge,
}

/// `expr <relation> rhs`.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: i64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::Le => lhs <= self.rhs,
            Relation::Eq => lhs == self.rhs,
            Relation::Ge => lhs >= self.rhs,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    vars: Vec<VarDecl>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_bool(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), VarKind::Bool)
    }

    /// Integer variable in `[min, max]`. Bounds are swapped if given reversed.
    pub fn new_int(&mut self, min: i64, max: i64, name: impl Into<String>) -> VarId {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.push_var(name.into(), VarKind::Int { min, max })
    }

    /// Continuous variable in `[min, max]`, for auxiliaries whose value
    /// follows from the integer variables they are linked to.
    pub fn new_real(&mut self, min: i64, max: i64, name: impl Into<String>) -> VarId {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.push_var(name.into(), VarKind::Real { min, max })
    }

    fn push_var(&mut self, name: String, kind: VarKind) -> VarId {
        self.vars.push(VarDecl { name, kind });
        VarId(self.vars.len() - 1)
    }

    pub fn add_le(&mut self, expr: impl Into<LinearExpr>, rhs: i64) {
        self.add(expr.into(), Relation::Le, rhs);
    }

    pub fn add_eq(&mut self, expr: impl Into<LinearExpr>, rhs: i64) {
        self.add(expr.into(), Relation::Eq, rhs);
    }

    pub fn add_ge(&mut self, expr: impl Into<LinearExpr>, rhs: i64) {
        self.add(expr.into(), Relation::Ge, rhs);
    }

    fn add(&mut self, expr: LinearExpr, relation: Relation, rhs: i64) {
        self.constraints.push(Constraint {
            expr,
            relation,
            rhs,
        });
    }

    /// Pin a variable to a single value.
    pub fn fix(&mut self, var: VarId, value: i64) {
        self.add_eq(var, value);
    }

    pub fn maximize(&mut self, objective: impl Into<LinearExpr>) {
        self.objective = objective.into();
    }

    pub fn vars(&self) -> &[VarDecl] {
        &self.vars
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Whether an assignment respects every bound and constraint.
    pub fn is_feasible(&self, values: &[i64]) -> bool {
        if values.len() != self.vars.len() {
            return false;
        }
        let in_bounds = self.vars.iter().zip(values).all(|(decl, &v)| match decl.kind {
            VarKind::Bool => v == 0 || v == 1,
            VarKind::Int { min, max } | VarKind::Real { min, max } => (min..=max).contains(&v),
        });
        in_bounds && self.constraints.iter().all(|c| c.is_satisfied(values))
    }
}

/// Outcome class of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Timeout,
    Unknown,
}

impl SolveStatus {
    pub fn has_values(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolveStatus,
    values: Option<Vec<i64>>,
    pub objective: Option<i64>,
}

impl Solution {
    pub fn with_values(status: SolveStatus, values: Vec<i64>, objective: i64) -> Self {
        Self {
            status,
            values: Some(values),
            objective: Some(objective),
        }
    }

    pub fn without_values(status: SolveStatus) -> Self {
        Self {
            status,
            values: None,
            objective: None,
        }
    }

    /// Whether the solve produced an assignment at all. A status may claim
    /// feasibility without one.
    pub fn has_values(&self) -> bool {
        self.values.is_some()
    }

    /// Assigned value, or 0 when the solve produced no assignment.
    pub fn value(&self, var: VarId) -> i64 {
        self.values
            .as_ref()
            .and_then(|values| values.get(var.index()))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_true(&self, var: VarId) -> bool {
        self.value(var) != 0
    }
}

/// Anything that can solve a [`Model`].
pub trait Solver: Send + Sync {
    fn solve(&self, model: &Model) -> Solution;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expressions_evaluate() {
        let mut model = Model::new();
        let a = model.new_bool("a");
        let b = model.new_int(0, 10, "b");
        let expr = LinearExpr::from(a).term(b, 3).plus(2);
        assert_eq!(expr.evaluate(&[1, 4]), 1 + 12 + 2);
        assert_eq!(LinearExpr::sum([a, b]).evaluate(&[1, 4]), 5);
    }

    #[test]
    fn zero_coefficients_dropped() {
        let mut model = Model::new();
        let a = model.new_bool("a");
        let expr = LinearExpr::new().term(a, 0);
        assert!(expr.terms.is_empty());
    }

    #[test]
    fn reversed_bounds_normalized() {
        let mut model = Model::new();
        let v = model.new_int(5, -2, "v");
        assert_eq!(model.vars()[v.index()].kind, VarKind::Int { min: -2, max: 5 });
    }

    #[test]
    fn feasibility_check_covers_bounds_and_constraints() {
        let mut model = Model::new();
        let a = model.new_bool("a");
        let b = model.new_bool("b");
        model.add_le(LinearExpr::sum([a, b]), 1);
        assert!(model.is_feasible(&[1, 0]));
        assert!(!model.is_feasible(&[1, 1]));
        assert!(!model.is_feasible(&[2, 0]));
        assert!(!model.is_feasible(&[0]));
    }

    #[test]
    fn solution_without_values_reads_zero() {
        let mut model = Model::new();
        let a = model.new_bool("a");
        let solution = Solution::without_values(SolveStatus::Timeout);
        assert_eq!(solution.value(a), 0);
        assert!(!solution.is_true(a));
        assert!(!solution.status.has_values());
        assert!(!solution.has_values());
    }

    #[test]
    fn real_variables_checked_against_bounds() {
        let mut model = Model::new();
        let r = model.new_real(4, -1, "r");
        assert_eq!(model.vars()[r.index()].kind, VarKind::Real { min: -1, max: 4 });
        assert!(model.is_feasible(&[3]));
        assert!(!model.is_feasible(&[5]));
    }
}
