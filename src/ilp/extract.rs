//! Assignment Extractor: interpretation of the solver's variable values as an `Assignment`.

use super::AssignmentProblem;
use crate::{Assignment, Error};
use log::debug;

/// Maximum distance of a solved value from 0 or 1
const VALUE_TOLERANCE: f64 = 1e-6;

/// Read the assignment from the solved variable values.
///
/// For every member, exactly one of its variables must be 1 and all others 0. Afterwards, all
/// constraints of the problem are checked against the extracted selection.
///
/// # Errors
///
/// Fails with `Error::IntegrityViolation`, if the number of values does not match the problem, any
/// value is not (close to) 0 or 1, a member has zero or more than one group selected or any
/// constraint is violated.
pub fn extract_assignment(
    problem: &AssignmentProblem,
    values: &[f64],
) -> Result<Assignment, Error> {
    if values.len() != problem.variables.len() {
        return Err(Error::IntegrityViolation(format!(
            "Got {} values for {} variables.",
            values.len(),
            problem.variables.len()
        )));
    }

    let mut selected = vec![false; values.len()];
    for (v, value) in values.iter().enumerate() {
        if (value - 1.0).abs() <= VALUE_TOLERANCE {
            selected[v] = true;
        } else if value.abs() > VALUE_TOLERANCE {
            return Err(Error::IntegrityViolation(format!(
                "Variable {} has the non-binary value {}.",
                v, value
            )));
        }
    }

    let mut assignment = Assignment::with_capacity(problem.member_variables.len());
    for (member, vars) in problem.member_variables.iter().enumerate() {
        let mut chosen = vars.iter().filter(|v| selected[**v]);
        let group = match (chosen.next(), chosen.next()) {
            (Some(v), None) => problem.variables[*v].group,
            (None, _) => {
                return Err(Error::IntegrityViolation(format!(
                    "Member {} is not assigned to any group.",
                    member
                )));
            }
            (Some(_), Some(_)) => {
                return Err(Error::IntegrityViolation(format!(
                    "Member {} is assigned to more than one group.",
                    member
                )));
            }
        };
        assignment.push(group);
    }

    if let Some(c) = problem
        .constraints
        .iter()
        .find(|c| !c.is_satisfied(&selected))
    {
        return Err(Error::IntegrityViolation(format!(
            "The solution violates the constraint {:?}.",
            c.kind
        )));
    }

    debug!("Extracted assignment of {} members", assignment.len());
    Ok(assignment)
}
