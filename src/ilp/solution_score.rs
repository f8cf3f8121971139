//! Fulfillment Analyzer and scoring of assignments.

use crate::preferences::PreferenceRepository;
use crate::{Assignment, Error, Member};
use serde::Serialize;

/// Calculate the fulfillment level of each member: the 1-based rank of the assigned group within
/// the member's choices.
///
/// Fails with `Error::IntegrityViolation`, if the assignment does not cover exactly the given
/// members or any member is assigned to a group it has not chosen.
pub fn fulfillment_levels(members: &[Member], assignment: &Assignment) -> Result<Vec<usize>, Error> {
    if assignment.len() != members.len() {
        return Err(Error::IntegrityViolation(format!(
            "The assignment covers {} members instead of {}.",
            assignment.len(),
            members.len()
        )));
    }
    members
        .iter()
        .zip(assignment.iter())
        .map(|(m, group)| {
            m.choices
                .iter()
                .position(|c| c == group)
                .map(|p| p + 1)
                .ok_or_else(|| {
                    Error::IntegrityViolation(format!(
                        "Member '{}' is assigned to group {}, which is not among its choices.",
                        m.id, group
                    ))
                })
        })
        .collect()
}

/// Frequency distribution of fulfillment levels: how many members got their k-th choice, for
/// k in 1..=max_rank
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FulfillmentDistribution {
    counts: Vec<usize>,
}

impl FulfillmentDistribution {
    /// Count the given levels. Levels above `max_rank` extend the distribution.
    pub fn from_levels(levels: &[usize], max_rank: usize) -> FulfillmentDistribution {
        let max_level = levels.iter().copied().max().unwrap_or(0).max(max_rank);
        let mut counts = vec![0usize; max_level];
        for level in levels.iter().filter(|l| **l > 0) {
            counts[level - 1] += 1;
        }
        FulfillmentDistribution { counts }
    }

    /// Number of members who got their `level`-th choice
    pub fn count(&self, level: usize) -> usize {
        if level == 0 {
            return 0;
        }
        self.counts.get(level - 1).copied().unwrap_or(0)
    }

    /// The counts for levels 1..=max_rank
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn max_rank(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Iterate (level, count) pairs, starting with level 1
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().enumerate().map(|(i, c)| (i + 1, *c))
    }
}

/// Calculate the objective value of an assignment: the sum of the preference weights of the
/// assigned groups.
pub fn objective_value(
    preferences: &PreferenceRepository,
    assignment: &Assignment,
) -> Result<u64, Error> {
    assignment
        .iter()
        .enumerate()
        .try_fold(0u64, |sum, (member, group)| {
            let weight = preferences.weight(member, *group).ok_or_else(|| {
                Error::IntegrityViolation(format!(
                    "Member {} is assigned to group {}, which is not among its choices.",
                    member, group
                ))
            })?;
            sum.checked_add(weight).ok_or_else(|| {
                Error::IntegrityViolation(String::from("The objective value overflows."))
            })
        })
}

/// Objective value if all members got their first choice. This is a lower bound for minimized
/// and an upper bound for maximized objectives.
pub fn best_case_objective(preferences: &PreferenceRepository) -> u64 {
    preferences
        .members()
        .iter()
        .map(|m| preferences.weights(m.index).first().copied().unwrap_or(0))
        .sum()
}

/// Comparable quality score of the assignment: the mean fulfillment level (1.0 is best)
pub fn mean_level(levels: &[usize]) -> f32 {
    if levels.is_empty() {
        return 0.0;
    }
    levels.iter().sum::<usize>() as f32 / levels.len() as f32
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::capacities::{CapacityRecord, CapacityRepository};
    use crate::preferences::{PreferenceRecord, RankLists, WeightingPolicy};
    use assert_float_eq::*;
    use std::collections::BTreeMap;

    fn create_preferences(policy: WeightingPolicy) -> PreferenceRepository {
        let capacities = CapacityRepository::new(
            ["A", "B", "C"]
                .iter()
                .map(|name| CapacityRecord {
                    name: name.to_string(),
                    min: None,
                    max: 2,
                    demographic_min: BTreeMap::new(),
                })
                .collect(),
            0,
        )
        .unwrap();
        let records = vec![
            vec!["A", "B", "C"],
            vec!["B", "C", "A"],
            vec!["A", "C", "B"],
        ]
        .into_iter()
        .enumerate()
        .map(|(i, choices)| PreferenceRecord {
            id: format!("000{}", i),
            demographic: None,
            choices: choices.into_iter().map(String::from).collect(),
        })
        .collect();
        PreferenceRepository::new(records, &capacities, policy, RankLists::Uniform).unwrap()
    }

    #[test]
    fn levels_and_distribution() {
        let preferences = create_preferences(WeightingPolicy::DescendingLinear);
        let assignment: Assignment = vec![0, 1, 2];
        let levels = fulfillment_levels(preferences.members(), &assignment).unwrap();
        assert_eq!(levels, vec![1, 1, 2]);

        let distribution = FulfillmentDistribution::from_levels(&levels, 3);
        assert_eq!(distribution.counts(), &[2, 1, 0]);
        assert_eq!(distribution.count(1), 2);
        assert_eq!(distribution.count(3), 0);
        assert_eq!(distribution.count(0), 0);
        assert_eq!(distribution.count(7), 0);
        assert_eq!(distribution.total(), 3);
        assert_eq!(distribution.max_rank(), 3);
        assert_eq!(
            distribution.iter().collect::<Vec<_>>(),
            vec![(1, 2), (2, 1), (3, 0)]
        );
        assert_float_absolute_eq!(mean_level(&levels), 4.0 / 3.0, 1e-6);
    }

    #[test]
    fn unchosen_group() {
        let members = vec![Member {
            index: 0,
            id: String::from("0000"),
            demographic: None,
            choices: vec![0, 1],
        }];
        let result = fulfillment_levels(&members, &vec![2]);
        assert!(matches!(result, Err(Error::IntegrityViolation(_))));
        let result = fulfillment_levels(&members, &vec![]);
        assert!(matches!(result, Err(Error::IntegrityViolation(_))));
    }

    #[test]
    fn objective_values() {
        let preferences = create_preferences(WeightingPolicy::DescendingLinear);
        assert_eq!(objective_value(&preferences, &vec![0, 1, 2]).unwrap(), 3 + 3 + 2);
        assert_eq!(best_case_objective(&preferences), 9);

        let preferences = create_preferences(WeightingPolicy::Exponential);
        assert_eq!(objective_value(&preferences, &vec![0, 1, 2]).unwrap(), 1 + 1 + 2);
        assert_eq!(objective_value(&preferences, &vec![2, 0, 1]).unwrap(), 4 + 4 + 4);
        assert_eq!(best_case_objective(&preferences), 3);

        let result = objective_value(&preferences, &vec![0, 1, 5]);
        assert!(matches!(result, Err(Error::IntegrityViolation(_))));
    }
}
