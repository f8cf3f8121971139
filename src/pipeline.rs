//! The assignment pipeline: raw records → repositories → model → oracle → assignment →
//! fulfillment analysis.
//!
//! All settings are passed explicitly with a `Config`. The pipeline runs exactly once per call; it
//! either returns a complete `Outcome` or an error, never a partial result.

use crate::capacities::{CapacityRecord, CapacityRepository};
use crate::ilp::oracle::SolverOracle;
use crate::ilp::solution_score::{self, FulfillmentDistribution};
use crate::ilp::{self, BalanceConfig, ModelOptions};
use crate::preferences::{PreferenceRecord, PreferenceRepository, RankLists, WeightingPolicy};
use crate::{Assignment, Error, Group, Member};
use log::info;
use std::path::PathBuf;

/// File name of the exported assignment within the output directory
pub const ASSIGNMENT_FILE_NAME: &str = "selected_courses.csv";
/// File name of the exported result document (incl. fulfillment summary)
pub const RESULT_FILE_NAME: &str = "fulfillment.json";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub policy: WeightingPolicy,
    pub rank_lists: RankLists,
    /// Minimum occupancy of groups without explicit minimum
    pub default_min_occupancy: usize,
    pub enforce_quorum: bool,
    pub balance: Option<BalanceConfig>,
    /// Directory to export the results into
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            policy: WeightingPolicy::default(),
            rank_lists: RankLists::default(),
            default_min_occupancy: 0,
            enforce_quorum: true,
            balance: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            enforce_quorum: self.enforce_quorum,
            balance: self.balance.clone(),
        }
    }
}

/// Result of a successful pipeline run
#[derive(Clone, Debug)]
pub struct Outcome {
    pub members: Vec<Member>,
    pub groups: Vec<Group>,
    pub assignment: Assignment,
    /// Objective value of the assignment (sum of preference weights)
    pub objective: u64,
    /// Fulfillment level of each member (by member index)
    pub levels: Vec<usize>,
    pub distribution: FulfillmentDistribution,
}

/// Run the whole pipeline on the raw records with the given oracle.
pub fn run<O: SolverOracle + ?Sized>(
    config: &Config,
    preference_records: Vec<PreferenceRecord>,
    capacity_records: Vec<CapacityRecord>,
    oracle: &O,
) -> Result<Outcome, Error> {
    let capacities = CapacityRepository::new(capacity_records, config.default_min_occupancy)?;
    let preferences = PreferenceRepository::new(
        preference_records,
        &capacities,
        config.policy,
        config.rank_lists,
    )?;
    info!(
        "Read {} groups and {} members",
        capacities.len(),
        preferences.members().len()
    );

    let options = config.model_options();
    ilp::check_feasibility(&preferences, &capacities, &options)?;
    let problem = ilp::build_problem(&preferences, &capacities, &options);
    let assignment = ilp::solve(&problem, oracle)?;

    let objective = solution_score::objective_value(&preferences, &assignment)?;
    let levels = solution_score::fulfillment_levels(preferences.members(), &assignment)?;
    let distribution = FulfillmentDistribution::from_levels(&levels, preferences.total_ranks());
    info!(
        "Found assignment with objective value {} ({} policy, best case {}); mean fulfilled preference level {:.2}",
        objective,
        config.policy,
        solution_score::best_case_objective(&preferences),
        solution_score::mean_level(&levels)
    );

    Ok(Outcome {
        members: preferences.members().to_vec(),
        groups: capacities.groups().to_vec(),
        assignment,
        objective,
        levels,
        distribution,
    })
}

/// Write the assignment (CSV) and the result document (JSON) into the configured output directory,
/// which is created if it does not exist.
pub fn export(config: &Config, outcome: &Outcome) -> Result<(), Error> {
    std::fs::create_dir_all(&config.output_dir)?;

    let path = config.output_dir.join(ASSIGNMENT_FILE_NAME);
    let file = std::fs::File::create(&path)?;
    crate::io::csv::write_assignment(file, &outcome.assignment, &outcome.members, &outcome.groups)?;

    let path = config.output_dir.join(RESULT_FILE_NAME);
    let file = std::fs::File::create(&path)?;
    crate::io::simple::write(file, outcome)?;

    info!("Results written to {}", config.output_dir.display());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{run, Config};
    use crate::capacities::CapacityRecord;
    use crate::ilp::oracle::GoodLpOracle;
    use crate::preferences::{PreferenceRecord, WeightingPolicy};
    use crate::Error;
    use std::collections::BTreeMap;

    fn members(choices: &[&[&str]]) -> Vec<PreferenceRecord> {
        choices
            .iter()
            .enumerate()
            .map(|(i, c)| PreferenceRecord {
                id: format!("{:04}", i + 1),
                demographic: None,
                choices: c.iter().map(|s| s.to_string()).collect(),
            })
            .collect()
    }

    fn groups(capacities: &[(&str, usize, usize)]) -> Vec<CapacityRecord> {
        capacities
            .iter()
            .map(|(name, min, max)| CapacityRecord {
                name: name.to_string(),
                min: Some(*min),
                max: *max,
                demographic_min: BTreeMap::new(),
            })
            .collect()
    }

    fn linear_config() -> Config {
        Config {
            policy: WeightingPolicy::DescendingLinear,
            ..Config::default()
        }
    }

    #[test]
    fn all_first_choices() {
        let outcome = run(
            &linear_config(),
            members(&[&["X", "Y"], &["X", "Y"], &["Y", "X"]]),
            groups(&[("X", 0, 2), ("Y", 0, 2)]),
            &GoodLpOracle,
        )
        .unwrap();
        assert_eq!(outcome.assignment, vec![0, 0, 1]);
        assert_eq!(outcome.levels, vec![1, 1, 1]);
        assert_eq!(outcome.objective, 6);
        assert_eq!(outcome.distribution.counts(), &[3, 0]);
    }

    #[test]
    fn first_choice_overbooked() {
        let config = linear_config();
        let outcome = run(
            &config,
            members(&[&["X", "Y"], &["X", "Y"], &["X", "Y"]]),
            groups(&[("X", 0, 2), ("Y", 0, 2)]),
            &GoodLpOracle,
        )
        .unwrap();
        assert_eq!(outcome.assignment.iter().filter(|g| **g == 0).count(), 2);
        assert_eq!(outcome.objective, 2 + 2 + 1);
        assert_eq!(outcome.distribution.counts(), &[2, 1]);

        // Running again gives the same objective value
        let outcome2 = run(
            &config,
            members(&[&["X", "Y"], &["X", "Y"], &["X", "Y"]]),
            groups(&[("X", 0, 2), ("Y", 0, 2)]),
            &GoodLpOracle,
        )
        .unwrap();
        assert_eq!(outcome.objective, outcome2.objective);
    }

    #[test]
    fn exponential_policy() {
        let outcome = run(
            &Config::default(),
            members(&[&["X", "Y"], &["X", "Y"], &["X", "Y"]]),
            groups(&[("X", 0, 2), ("Y", 0, 2)]),
            &GoodLpOracle,
        )
        .unwrap();
        assert_eq!(outcome.objective, 1 + 1 + 2);
        assert_eq!(outcome.distribution.counts(), &[2, 1]);
    }

    #[test]
    fn group_bounds_respected() {
        let outcome = run(
            &linear_config(),
            members(&[
                &["A", "B", "C"],
                &["A", "B", "C"],
                &["A", "C", "B"],
                &["A", "B", "C"],
                &["B", "A", "C"],
                &["A", "C", "B"],
            ]),
            groups(&[("A", 1, 2), ("B", 2, 3), ("C", 2, 2)]),
            &GoodLpOracle,
        )
        .unwrap();
        let mut sizes = [0usize; 3];
        for g in outcome.assignment.iter() {
            sizes[*g] += 1;
        }
        assert_eq!(sizes.iter().sum::<usize>(), 6);
        for (g, size) in outcome.groups.iter().zip(sizes.iter()) {
            assert!(g.num_min <= *size && *size <= g.num_max);
        }
    }

    #[test]
    fn quorum_not_reachable() {
        // Minimum of 5, but only 3 members choose Y at all
        let result = run(
            &linear_config(),
            members(&[&["X", "Y"], &["Y", "X"], &["X", "Y"], &["X", "Z"], &["Z", "X"]]),
            groups(&[("X", 0, 5), ("Y", 5, 6), ("Z", 0, 5)]),
            &GoodLpOracle,
        );
        assert!(matches!(result, Err(Error::InfeasibleProblem(_))));
    }

    #[test]
    fn minimums_exceed_members() {
        let result = run(
            &linear_config(),
            members(&[&["X", "Y"], &["Y", "X"]]),
            groups(&[("X", 2, 2), ("Y", 1, 2)]),
            &GoodLpOracle,
        );
        assert!(matches!(result, Err(Error::InfeasibleProblem(_))));

        // Callers may relax the problem by dropping the quorum constraints
        let config = Config {
            enforce_quorum: false,
            ..linear_config()
        };
        let outcome = run(
            &config,
            members(&[&["X", "Y"], &["Y", "X"]]),
            groups(&[("X", 2, 2), ("Y", 1, 2)]),
            &GoodLpOracle,
        )
        .unwrap();
        assert_eq!(outcome.assignment, vec![0, 1]);
    }

    #[test]
    fn duplicate_preference() {
        let result = run(
            &linear_config(),
            members(&[&["X", "X"], &["Y", "X"]]),
            groups(&[("X", 0, 2), ("Y", 0, 2)]),
            &GoodLpOracle,
        );
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }

    #[test]
    fn export_results() {
        let output_dir = std::env::temp_dir().join(format!("coursesel-test-{}", std::process::id()));
        let config = Config {
            output_dir: output_dir.clone(),
            ..linear_config()
        };
        let outcome = run(
            &config,
            members(&[&["X", "Y"], &["X", "Y"], &["Y", "X"]]),
            groups(&[("X", 0, 2), ("Y", 0, 2)]),
            &GoodLpOracle,
        )
        .unwrap();
        super::export(&config, &outcome).unwrap();

        let csv = std::fs::read_to_string(output_dir.join(super::ASSIGNMENT_FILE_NAME)).unwrap();
        assert_eq!(csv, "4桁番号,講座名\n0001,X\n0002,X\n0003,Y\n");
        let json: serde_json::Value = serde_json::from_reader(
            std::fs::File::open(output_dir.join(super::RESULT_FILE_NAME)).unwrap(),
        )
        .unwrap();
        assert_eq!(json["objective"], 6);
        std::fs::remove_dir_all(output_dir).unwrap();
    }
}
