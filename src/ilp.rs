//! Formulation of the group assignment problem as an integer linear program.
//!
//! The module provides a solver independent representation of the program (`AssignmentProblem`),
//! the `build_problem()` function creating it from the Preference and Capacity Repositories, a
//! quick feasibility pre-check and the `solve()` function, which hands the problem to a
//! `SolverOracle` and reads the assignment from the solved values.

pub mod extract;
pub mod oracle;
pub mod solution_score;


use crate::capacities::CapacityRepository;
use crate::preferences::{Direction, PreferenceRepository};
use crate::{Assignment, Error};
use log::{debug, trace, warn};
use oracle::SolverOracle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Demographic balance settings: every group must get at least `floor` members of each of the
/// tracked `categories`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BalanceConfig {
    pub categories: Vec<String>,
    pub floor: usize,
}

impl BalanceConfig {
    /// The tracked categories in configured order, each category listed once
    pub fn tracked_categories(&self) -> Vec<&str> {
        let mut seen = HashSet::with_capacity(self.categories.len());
        self.categories
            .iter()
            .map(String::as_str)
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

/// Selection of the optional constraints of the program
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelOptions {
    /// Add a quorum constraint (min occupancy) for every group
    pub enforce_quorum: bool,
    /// Add demographic floor constraints for every group and tracked category
    pub balance: Option<BalanceConfig>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions {
            enforce_quorum: true,
            balance: None,
        }
    }
}

/// A binary decision variable: 1 iff `member` is assigned to `group`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionVariable {
    pub member: usize,
    pub group: usize,
    /// Objective coefficient (the preference weight)
    pub weight: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    LessOrEqual,
    GreaterOrEqual,
}

/// The rule a constraint has been generated from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    ExactlyOne { member: usize },
    Capacity { group: usize },
    Quorum { group: usize },
    DemographicFloor { group: usize, category: String },
}

/// A linear constraint `sum(variables) <cmp> rhs`. All coefficients are 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    /// Indexes into `AssignmentProblem::variables`
    pub variables: Vec<usize>,
    pub comparison: Comparison,
    pub rhs: usize,
}

impl LinearConstraint {
    /// Check if the constraint holds for the given 0/1 selection of the variables
    pub fn is_satisfied(&self, selected: &[bool]) -> bool {
        let lhs = self.variables.iter().filter(|v| selected[**v]).count();
        match self.comparison {
            Comparison::Equal => lhs == self.rhs,
            Comparison::LessOrEqual => lhs <= self.rhs,
            Comparison::GreaterOrEqual => lhs >= self.rhs,
        }
    }
}

/// The complete integer linear program
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignmentProblem {
    pub direction: Direction,
    pub variables: Vec<DecisionVariable>,
    /// The variable indexes of each member (by member index), in choice order
    pub member_variables: Vec<Vec<usize>>,
    pub constraints: Vec<LinearConstraint>,
}

/// Enumerate the (member, group, weight) pairs to create decision variables for.
///
/// Only groups chosen by a member are paired with the member, so the number of variables is the
/// total length of all preference lists instead of members × groups.
pub fn candidate_pairs(preferences: &PreferenceRepository) -> Vec<(usize, usize, u64)> {
    preferences
        .members()
        .iter()
        .flat_map(|m| {
            preferences
                .weighted_choices(m.index)
                .map(move |(group, weight)| (m.index, group, weight))
        })
        .collect()
}

/// Generate the integer linear program from the repositories.
///
/// Construction is deterministic: variables are ordered by member, then by choice. Constraints are
/// ordered: exactly-one constraints (by member), then per group (in group order) the capacity,
/// quorum and demographic floor constraints (in the configured category order, duplicates skipped).
pub fn build_problem(
    preferences: &PreferenceRepository,
    capacities: &CapacityRepository,
    options: &ModelOptions,
) -> AssignmentProblem {
    let members = preferences.members();
    let groups = capacities.groups();

    let mut variables = Vec::new();
    let mut member_variables = vec![Vec::new(); members.len()];
    let mut group_variables = vec![Vec::new(); groups.len()];
    for (member, group, weight) in candidate_pairs(preferences) {
        let v = variables.len();
        trace!(
            "Variable {}: member '{}' in group '{}' with weight {}",
            v,
            members[member].id,
            groups[group].name,
            weight
        );
        variables.push(DecisionVariable {
            member,
            group,
            weight,
        });
        member_variables[member].push(v);
        group_variables[group].push(v);
    }

    let mut constraints = Vec::new();
    for (member, vars) in member_variables.iter().enumerate() {
        constraints.push(LinearConstraint {
            kind: ConstraintKind::ExactlyOne { member },
            variables: vars.clone(),
            comparison: Comparison::Equal,
            rhs: 1,
        });
    }
    for (group, vars) in group_variables.iter().enumerate() {
        constraints.push(LinearConstraint {
            kind: ConstraintKind::Capacity { group },
            variables: vars.clone(),
            comparison: Comparison::LessOrEqual,
            rhs: groups[group].num_max,
        });
        if options.enforce_quorum {
            constraints.push(LinearConstraint {
                kind: ConstraintKind::Quorum { group },
                variables: vars.clone(),
                comparison: Comparison::GreaterOrEqual,
                rhs: groups[group].num_min,
            });
        }
        if let Some(balance) = &options.balance {
            for category in balance.tracked_categories() {
                constraints.push(LinearConstraint {
                    kind: ConstraintKind::DemographicFloor {
                        group,
                        category: category.to_owned(),
                    },
                    variables: vars
                        .iter()
                        .copied()
                        .filter(|v| {
                            members[variables[*v].member].demographic.as_deref() == Some(category)
                        })
                        .collect(),
                    comparison: Comparison::GreaterOrEqual,
                    rhs: demographic_floor(capacities, group, category, balance),
                });
            }
            for category in groups[group].demographic_min.keys() {
                if !balance.categories.contains(category) {
                    warn!(
                        "Ignoring minimum for untracked category '{}' of group '{}'.",
                        category, groups[group].name
                    );
                }
            }
        }
    }

    debug!(
        "Generated {} variables (of {} possible pairings) and {} constraints",
        variables.len(),
        members.len() * groups.len(),
        constraints.len()
    );

    AssignmentProblem {
        direction: preferences.policy().direction(),
        variables,
        member_variables,
        constraints,
    }
}

/// The minimum number of members of `category` in the group: the group's own minimum, if given,
/// otherwise the configured floor
fn demographic_floor(
    capacities: &CapacityRepository,
    group: usize,
    category: &str,
    balance: &BalanceConfig,
) -> usize {
    capacities.groups()[group]
        .demographic_min
        .get(category)
        .copied()
        .unwrap_or(balance.floor)
}

/// Check for obvious infeasibility of the problem, which can be detected without solving it.
///
/// Fails with `Error::InfeasibleProblem`, if
/// * the group minimums sum up to more than the number of members
/// * the group maximums sum up to less than the number of members
/// * a member has chosen only groups with a maximum of 0
/// * less members have chosen a group than its minimum (or one of its demographic floors) demands
/// * the demographic floors of a group sum up to more than its maximum
pub fn check_feasibility(
    preferences: &PreferenceRepository,
    capacities: &CapacityRepository,
    options: &ModelOptions,
) -> Result<(), Error> {
    let members = preferences.members();
    let groups = capacities.groups();

    if options.enforce_quorum {
        let sum_min: usize = groups.iter().map(|g| g.num_min).sum();
        if sum_min > members.len() {
            debug!("Skipping solver, since too many group places are enforced");
            return Err(Error::InfeasibleProblem(format!(
                "The groups' minimums sum up to {}, but there are only {} members.",
                sum_min,
                members.len()
            )));
        }
    }
    let sum_max: usize = groups.iter().map(|g| g.num_max).sum();
    if sum_max < members.len() {
        debug!("Skipping solver, since not enough group places are available");
        return Err(Error::InfeasibleProblem(format!(
            "The groups offer {} places, but there are {} members.",
            sum_max,
            members.len()
        )));
    }
    for m in members.iter() {
        if m.choices.iter().all(|c| groups[*c].num_max == 0) {
            return Err(Error::InfeasibleProblem(format!(
                "None of the groups chosen by member '{}' has a place.",
                m.id
            )));
        }
    }

    for g in groups.iter() {
        let candidates: Vec<usize> = members
            .iter()
            .filter(|m| m.choices.contains(&g.index))
            .map(|m| m.index)
            .collect();
        if options.enforce_quorum && candidates.len() < g.num_min {
            return Err(Error::InfeasibleProblem(format!(
                "Group '{}' needs at least {} members, but only {} members have chosen it.",
                g.name,
                g.num_min,
                candidates.len()
            )));
        }
        if let Some(balance) = &options.balance {
            let mut sum_floors = 0;
            for category in balance.tracked_categories() {
                let floor = demographic_floor(capacities, g.index, category, balance);
                let num_candidates = candidates
                    .iter()
                    .filter(|m| members[**m].demographic.as_deref() == Some(category))
                    .count();
                if num_candidates < floor {
                    return Err(Error::InfeasibleProblem(format!(
                        "Group '{}' needs at least {} members of category '{}', but only {} of them have chosen it.",
                        g.name, floor, category, num_candidates
                    )));
                }
                sum_floors += floor;
            }
            if sum_floors > g.num_max {
                return Err(Error::InfeasibleProblem(format!(
                    "The demographic minimums of group '{}' sum up to {}, which exceeds its maximum of {}.",
                    g.name, sum_floors, g.num_max
                )));
            }
        }
    }

    Ok(())
}

/// Solve the problem with the given oracle and extract the assignment from the solved values.
pub fn solve<O: SolverOracle + ?Sized>(
    problem: &AssignmentProblem,
    oracle: &O,
) -> Result<Assignment, Error> {
    debug!(
        "Solving problem with {} variables and {} constraints",
        problem.variables.len(),
        problem.constraints.len()
    );
    let values = oracle.solve(problem)?;
    extract::extract_assignment(problem, &values)
}
