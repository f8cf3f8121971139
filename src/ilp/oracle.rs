//! The solver seam: the `SolverOracle` trait and its default implementation on top of `good_lp`.

use super::{AssignmentProblem, Comparison};
use crate::preferences::Direction;
use crate::Error;
use good_lp::solvers::microlp::microlp;
use good_lp::{
    variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
};
use log::{debug, info};
use std::time::Instant;

/// An integer linear programming solver, treated as a black box.
///
/// Implementations must return a globally optimal 0/1 value for each of the problem's variables
/// (in the order of `AssignmentProblem::variables`) or fail with `Error::InfeasibleProblem` if no
/// feasible assignment exists. Ties may be broken arbitrarily.
pub trait SolverOracle {
    fn solve(&self, problem: &AssignmentProblem) -> Result<Vec<f64>, Error>;
}

/// Oracle using the pure Rust `microlp` backend of `good_lp`
#[derive(Clone, Copy, Debug, Default)]
pub struct GoodLpOracle;

impl SolverOracle for GoodLpOracle {
    fn solve(&self, problem: &AssignmentProblem) -> Result<Vec<f64>, Error> {
        let start_time = Instant::now();

        // Constraints without any variables can be decided right away. The solver backends handle
        // empty rows differently, so they are not passed on.
        for constraint in problem.constraints.iter() {
            if constraint.variables.is_empty() && !constraint.is_satisfied(&[]) {
                debug!("Constraint {:?} can never be satisfied", constraint.kind);
                return Err(Error::InfeasibleProblem(format!(
                    "Constraint {:?} can not be satisfied by any member.",
                    constraint.kind
                )));
            }
        }
        if problem.variables.is_empty() {
            return Ok(Vec::new());
        }

        let mut vars = ProblemVariables::new();
        let decision: Vec<Variable> = problem
            .variables
            .iter()
            .map(|_| vars.add(variable().binary()))
            .collect();

        let mut objective = Expression::with_capacity(decision.len());
        for (var, dv) in decision.iter().zip(problem.variables.iter()) {
            objective.add_mul(dv.weight as f64, *var);
        }
        let unsolved = match problem.direction {
            Direction::Minimize => vars.minimise(objective),
            Direction::Maximize => vars.maximise(objective),
        };
        let mut model = unsolved.using(microlp);

        for constraint in problem.constraints.iter() {
            if constraint.variables.is_empty() {
                continue;
            }
            let mut lhs = Expression::with_capacity(constraint.variables.len());
            for v in constraint.variables.iter() {
                lhs.add_mul(1.0, decision[*v]);
            }
            let rhs = constraint.rhs as f64;
            model = model.with(match constraint.comparison {
                Comparison::Equal => lhs.eq(rhs),
                Comparison::LessOrEqual => lhs.leq(rhs),
                Comparison::GreaterOrEqual => lhs.geq(rhs),
            });
        }

        info!("Starting ILP solver ...");
        let solution = match model.solve() {
            Ok(s) => s,
            Err(ResolutionError::Infeasible) => {
                return Err(Error::InfeasibleProblem(String::from(
                    "The solver found no assignment satisfying all constraints.",
                )));
            }
            Err(e) => return Err(Error::Solver(e.to_string())),
        };
        info!("Solution found in {:.2?}", start_time.elapsed());

        Ok(decision.iter().map(|v| solution.value(*v)).collect())
    }
}
