//! Preference Repository: normalization of the members' ranked preference lists into `Member`
//! objects with a preference weight for every listed group.
//!
//! The order of a member's choices is preserved exactly, since it defines the weights. Which
//! weights are used, and thereby whether the objective is minimized or maximized, is selected by
//! the `WeightingPolicy`.

use crate::capacities::CapacityRepository;
use crate::{Error, Member};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Longest preference list the exponential policy accepts (weights up to 2^51).
pub const MAX_EXPONENTIAL_RANKS: usize = 52;

/// Upper bound for the sum of every member's largest weight. Up to 2^53, every partial sum of the
/// objective is an exact integer in the solver's `f64` arithmetic.
pub const MAX_EXACT_OBJECTIVE: u64 = 1 << 53;

/// Optimization direction of the objective function
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// Policy to derive a preference weight from the rank of a choice
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightingPolicy {
    /// Rank i (counted from 0) gets the weight 2^i. The weight is a cost, i.e. it is minimized.
    #[default]
    Exponential,
    /// Rank i (counted from 0) gets the weight `total_ranks - i`, i.e. it is maximized.
    DescendingLinear,
}

impl WeightingPolicy {
    /// The objective direction belonging to this policy
    pub fn direction(self) -> Direction {
        match self {
            WeightingPolicy::Exponential => Direction::Minimize,
            WeightingPolicy::DescendingLinear => Direction::Maximize,
        }
    }

    /// Weight of the choice with 0-based `rank`, if `total_ranks` are ranked in the dataset.
    ///
    /// Returns None if the weight can not be represented.
    pub fn weight(self, rank: usize, total_ranks: usize) -> Option<u64> {
        match self {
            WeightingPolicy::Exponential => {
                if rank >= MAX_EXPONENTIAL_RANKS {
                    None
                } else {
                    Some(1u64 << rank)
                }
            }
            WeightingPolicy::DescendingLinear => {
                if rank >= total_ranks {
                    None
                } else {
                    Some((total_ranks - rank) as u64)
                }
            }
        }
    }
}

impl fmt::Display for WeightingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightingPolicy::Exponential => write!(f, "exponential"),
            WeightingPolicy::DescendingLinear => write!(f, "descending-linear"),
        }
    }
}

impl FromStr for WeightingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exponential" => Ok(WeightingPolicy::Exponential),
            "descending-linear" | "linear" => Ok(WeightingPolicy::DescendingLinear),
            _ => Err(format!("Unknown weighting policy '{}'", s)),
        }
    }
}

/// Whether all members must rank the same number of groups
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankLists {
    #[default]
    Uniform,
    Variable,
}

/// One raw preference record, as read from the input files
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PreferenceRecord {
    /// The member's identifier
    pub id: String,
    #[serde(default)]
    pub demographic: Option<String>,
    /// Names of the chosen groups, most-preferred first
    pub choices: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct PreferenceRepository {
    members: Vec<Member>,
    /// Weight of each choice, in the same order as the members' `choices`
    weights: Vec<Vec<u64>>,
    policy: WeightingPolicy,
    total_ranks: usize,
}

impl PreferenceRepository {
    /// Build the repository from raw records in input order, resolving the chosen group names
    /// with the given capacity repository.
    ///
    /// # Errors
    ///
    /// Fails with `Error::MalformedInput`, if
    /// * a member identifier is used more than once
    /// * a member has no choices or chooses a group more than once
    /// * a choice references a group unknown to `capacities`
    /// * the lists differ in length while `rank_lists` is `RankLists::Uniform`
    /// * a list is too long for the weighting policy
    /// * the worst possible objective value exceeds `MAX_EXACT_OBJECTIVE`
    pub fn new(
        records: Vec<PreferenceRecord>,
        capacities: &CapacityRepository,
        policy: WeightingPolicy,
        rank_lists: RankLists,
    ) -> Result<PreferenceRepository, Error> {
        let total_ranks = records.iter().map(|r| r.choices.len()).max().unwrap_or(0);
        if matches!(rank_lists, RankLists::Uniform) {
            if let Some(r) = records.iter().find(|r| r.choices.len() != total_ranks) {
                return Err(Error::MalformedInput(format!(
                    "Member '{}' ranks {} groups, but {} ranks are expected.",
                    r.id,
                    r.choices.len(),
                    total_ranks
                )));
            }
        }

        let mut members = Vec::with_capacity(records.len());
        let mut weights = Vec::with_capacity(records.len());
        let mut known_ids = HashSet::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            if !known_ids.insert(record.id.clone()) {
                return Err(Error::MalformedInput(format!(
                    "Member '{}' is listed more than once.",
                    record.id
                )));
            }
            if record.choices.is_empty() {
                return Err(Error::MalformedInput(format!(
                    "Member '{}' has no preferences.",
                    record.id
                )));
            }

            let mut choices = Vec::with_capacity(record.choices.len());
            let mut member_weights = Vec::with_capacity(record.choices.len());
            for (rank, name) in record.choices.iter().enumerate() {
                let group = capacities.index_of(name).ok_or_else(|| {
                    Error::MalformedInput(format!(
                        "Member '{}' chooses unknown group '{}'.",
                        record.id, name
                    ))
                })?;
                if choices.contains(&group) {
                    return Err(Error::MalformedInput(format!(
                        "Member '{}' chooses group '{}' more than once.",
                        record.id, name
                    )));
                }
                let weight = policy.weight(rank, total_ranks).ok_or_else(|| {
                    Error::MalformedInput(format!(
                        "Member '{}' ranks too many groups for the {} weighting policy.",
                        record.id, policy
                    ))
                })?;
                choices.push(group);
                member_weights.push(weight);
            }

            members.push(Member {
                index,
                id: record.id,
                demographic: record.demographic,
                choices,
            });
            weights.push(member_weights);
        }

        // The first choice of the maximized policy has the largest weight, the last choice of the
        // minimized one.
        let worst_objective = weights
            .iter()
            .map(|w| w.iter().copied().max().unwrap_or(0))
            .try_fold(0u64, u64::checked_add)
            .filter(|sum| *sum <= MAX_EXACT_OBJECTIVE);
        if worst_objective.is_none() {
            return Err(Error::MalformedInput(format!(
                "{} members with {} ranks exceed the exactly representable objective values of the {} weighting policy.",
                members.len(),
                total_ranks,
                policy
            )));
        }

        Ok(PreferenceRepository {
            members,
            weights,
            policy,
            total_ranks,
        })
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn policy(&self) -> WeightingPolicy {
        self.policy
    }

    /// Length of the longest preference list
    pub fn total_ranks(&self) -> usize {
        self.total_ranks
    }

    /// Weights of the member's choices, in choice order
    pub fn weights(&self, member: usize) -> &[u64] {
        &self.weights[member]
    }

    /// Iterate the (group index, weight) pairs of the member's choices, most-preferred first
    pub fn weighted_choices(&self, member: usize) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.members[member]
            .choices
            .iter()
            .copied()
            .zip(self.weights[member].iter().copied())
    }

    /// Weight of assigning the member to the group, if the member has chosen it
    pub fn weight(&self, member: usize, group: usize) -> Option<u64> {
        self.weighted_choices(member)
            .find(|(g, _)| *g == group)
            .map(|(_, w)| w)
    }
}
