use std::time::{Duration, Instant};

use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution as _,
    SolutionStatus, SolverModel, Variable, WithTimeLimit,
};
use tracing::{debug, warn};

use super::{LinearExpr, Model, Relation, Solution, SolveStatus, Solver, VarKind};

/// Mixed-integer backend on top of `good_lp` with the pure-Rust microlp solver.
///
/// The time budget is handed to microlp itself, so a solve really stops when
/// it runs out. The best assignment found by then comes back as
/// [`SolveStatus::Feasible`]; with none found the result is
/// [`SolveStatus::Timeout`].
#[derive(Debug, Clone)]
pub struct LpSolver {
    time_budget: Option<Duration>,
}

impl LpSolver {
    pub fn new(time_budget: Duration) -> Self {
        Self {
            time_budget: Some(time_budget),
        }
    }

    /// Solve with no time limit.
    pub fn unbounded() -> Self {
        Self { time_budget: None }
    }
}

impl Solver for LpSolver {
    fn solve(&self, model: &Model) -> Solution {
        let start = Instant::now();
        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = model
            .vars()
            .iter()
            .map(|decl| {
                let definition = match decl.kind {
                    VarKind::Bool => variable().binary(),
                    VarKind::Int { min, max } => {
                        variable().integer().min(min as f64).max(max as f64)
                    }
                    VarKind::Real { min, max } => variable().min(min as f64).max(max as f64),
                };
                problem.add(definition.name(decl.name.clone()))
            })
            .collect();

        let mut lp = problem
            .maximise(linear_part(model.objective(), &vars))
            .using(microlp);
        if let Some(budget) = self.time_budget {
            lp = lp.with_time_limit(budget.as_secs_f64());
        }
        for c in model.constraints() {
            let lhs = linear_part(&c.expr, &vars);
            let rhs = (c.rhs - c.expr.constant) as f64;
            lp = match c.relation {
                Relation::Le => lp.with(constraint!(lhs <= rhs)),
                Relation::Eq => lp.with(constraint!(lhs == rhs)),
                Relation::Ge => lp.with(constraint!(lhs >= rhs)),
            };
        }

        let result = lp.solve();
        let elapsed_ms = start.elapsed().as_secs_f32() * 1000.0;
        match result {
            Ok(solved) => {
                let status = match solved.status() {
                    SolutionStatus::Optimal => SolveStatus::Optimal,
                    SolutionStatus::TimeLimit | SolutionStatus::GapLimit => {
                        SolveStatus::Feasible
                    }
                };
                let values: Vec<i64> =
                    vars.iter().map(|&v| solved.value(v).round() as i64).collect();
                if !model.is_feasible(&values) {
                    warn!(
                        vars = model.num_vars(),
                        "Solver assignment violates the model after rounding"
                    );
                    return Solution::without_values(SolveStatus::Unknown);
                }
                let objective = model.objective().evaluate(&values);
                debug!(
                    vars = model.num_vars(),
                    constraints = model.num_constraints(),
                    status = ?status,
                    objective,
                    elapsed_ms,
                    "Model solved"
                );
                Solution::with_values(status, values, objective)
            }
            Err(ResolutionError::Infeasible) => {
                debug!(elapsed_ms, "Model infeasible");
                Solution::without_values(SolveStatus::Infeasible)
            }
            Err(e) if self.time_budget.is_some_and(|budget| start.elapsed() >= budget) => {
                warn!(
                    error = %e,
                    vars = model.num_vars(),
                    elapsed_ms,
                    "Solver time budget exhausted without a solution"
                );
                Solution::without_values(SolveStatus::Timeout)
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms, "Solver failed");
                Solution::without_values(SolveStatus::Unknown)
            }
        }
    }
}

/// Variable terms of an expression; constants are folded into the other side.
fn linear_part(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    let mut out = Expression::with_capacity(expr.terms.len());
    for &(var, coefficient) in &expr.terms {
        out += vars[var.index()] * coefficient as f64;
    }
    out
}
