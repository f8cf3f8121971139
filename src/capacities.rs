//! Capacity Repository: normalization of the raw per-group records (quorum, capacity and optional
//! demographic minimums) into the list of `Group` objects.

use crate::{Error, Group};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One raw capacity record, as read from the input files
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CapacityRecord {
    /// Name of the group
    pub name: String,
    /// Minimum occupancy. If not given, the dataset's default minimum applies.
    #[serde(default)]
    pub min: Option<usize>,
    /// Maximum occupancy
    pub max: usize,
    #[serde(default)]
    pub demographic_min: BTreeMap<String, usize>,
}

#[derive(Clone, Debug)]
pub struct CapacityRepository {
    groups: Vec<Group>,
    index_by_name: HashMap<String, usize>,
}

impl CapacityRepository {
    /// Build the repository from raw records, keeping the input order of first occurrence.
    ///
    /// `default_min_occupancy` is used for records without an explicit minimum. A group, which is
    /// listed twice with identical values, is only added once. Fails with `Error::MalformedInput`
    /// if max < min for any group or a group is listed twice with conflicting values.
    pub fn new(
        records: Vec<CapacityRecord>,
        default_min_occupancy: usize,
    ) -> Result<CapacityRepository, Error> {
        let mut groups: Vec<Group> = Vec::with_capacity(records.len());
        let mut index_by_name = HashMap::with_capacity(records.len());

        for record in records {
            let num_min = record.min.unwrap_or(default_min_occupancy);
            if record.max < num_min {
                return Err(Error::MalformedInput(format!(
                    "Group '{}' has a maximum of {} members, which is less than its minimum of {}.",
                    record.name, record.max, num_min
                )));
            }

            if let Some(&index) = index_by_name.get(&record.name) {
                let existing: &Group = &groups[index];
                if existing.num_min != num_min
                    || existing.num_max != record.max
                    || existing.demographic_min != record.demographic_min
                {
                    return Err(Error::MalformedInput(format!(
                        "Group '{}' is defined more than once with conflicting values.",
                        record.name
                    )));
                }
                warn!("Ignoring duplicate definition of group '{}'.", record.name);
                continue;
            }

            let index = groups.len();
            index_by_name.insert(record.name.clone(), index);
            groups.push(Group {
                index,
                name: record.name,
                num_min,
                num_max: record.max,
                demographic_min: record.demographic_min,
            });
        }

        Ok(CapacityRepository {
            groups,
            index_by_name,
        })
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Index of the group with the given name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::{CapacityRecord, CapacityRepository};
    use crate::Error;
    use std::collections::BTreeMap;

    fn record(name: &str, min: Option<usize>, max: usize) -> CapacityRecord {
        CapacityRecord {
            name: String::from(name),
            min,
            max,
            demographic_min: BTreeMap::new(),
        }
    }

    #[test]
    fn build_groups() {
        let repository = CapacityRepository::new(
            vec![record("X", Some(1), 4), record("Y", None, 2)],
            2,
        )
        .unwrap();

        assert_eq!(repository.len(), 2);
        let groups = repository.groups();
        assert_eq!(groups[0].name, "X");
        assert_eq!(groups[0].num_min, 1);
        assert_eq!(groups[0].num_max, 4);
        assert_eq!(groups[1].index, 1);
        assert_eq!(groups[1].num_min, 2, "Default minimum should be applied");
        assert_eq!(repository.index_of("Y"), Some(1));
        assert_eq!(repository.index_of("Z"), None);
    }

    #[test]
    fn max_below_min() {
        let result = CapacityRepository::new(vec![record("X", Some(5), 4)], 0);
        assert!(matches!(result, Err(Error::MalformedInput(_))));

        // The default minimum is checked as well
        let result = CapacityRepository::new(vec![record("X", None, 4)], 5);
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }

    #[test]
    fn duplicate_groups() {
        let repository = CapacityRepository::new(
            vec![
                record("X", Some(1), 4),
                record("Y", None, 2),
                record("X", Some(1), 4),
            ],
            0,
        )
        .unwrap();
        assert_eq!(repository.len(), 2);
        assert_eq!(repository.index_of("X"), Some(0));

        let result =
            CapacityRepository::new(vec![record("X", Some(1), 4), record("X", Some(1), 5)], 0);
        assert!(matches!(result, Err(Error::MalformedInput(_))));

        let mut with_floor = record("X", Some(1), 4);
        with_floor.demographic_min.insert(String::from("Female"), 1);
        let result = CapacityRepository::new(vec![record("X", Some(1), 4), with_floor], 0);
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }
}
