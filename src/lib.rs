pub mod capacities;
pub mod error;
pub mod ilp;
pub mod io;
pub mod pipeline;
pub mod preferences;

use serde::Serialize;
use std::collections::BTreeMap;

pub use error::Error;

/// Representation of a member's (e.g. a student's) data
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Member {
    /// id/index of the Member in the list of members
    pub index: usize,
    /// Member's identifier from the input data (e.g. a 4-digit code)
    pub id: String,
    /// Demographic label (e.g. gender). Only used for balance constraints.
    pub demographic: Option<String>,
    /// Group choices of the member as indexes into the list of groups, most-preferred first
    pub choices: Vec<usize>,
}

/// Representation of a group's (e.g. a course's) data
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Group {
    /// id/index of the Group in the list of groups
    pub index: usize,
    /// Group's name, as referenced by the members' choices
    pub name: String,
    /// Minimum number of members (quorum)
    pub num_min: usize,
    /// Maximum number of members (capacity)
    pub num_max: usize,
    /// Minimum number of members per demographic category, overriding the configured floor
    pub demographic_min: BTreeMap<String, usize>,
}

/// The assignment: the index of the assigned group for each member (by member index)
pub type Assignment = Vec<usize>;

#[cfg(test)]
fn assert_data_consistency(members: &[Member], groups: &[Group]) {
    for (i, m) in members.iter().enumerate() {
        assert_eq!(i, m.index, "Member {} has index {}", i, m.index);
        assert!(!m.choices.is_empty(), "Member {} has no choices", m.id);
        for c in m.choices.iter() {
            assert!(*c < groups.len(), "Choice {} of member {} is invalid", c, m.id);
        }
    }
    for (i, g) in groups.iter().enumerate() {
        assert_eq!(i, g.index, "Group {} has index {}", i, g.index);
        assert!(g.num_min <= g.num_max, "Group {} has min > max", g.name);
    }
}
