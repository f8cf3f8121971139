//! IO functionality for the CSV files of the course selection survey: the members' preferences,
//! the group capacities and the resulting assignment.
//!
//! Preferences have one row per member with the columns `4桁番号` (identifier), optionally `性別`
//! (demographic label) and the rank columns `no1` … `noN`. Capacities have one row per group with
//! the columns `講座名` (name), optionally `最少人数` (minimum) and `最大人数` or `人数` (maximum).
//! The English column names `id`, `gender`, `group`, `min` and `max` are accepted as well.

use crate::capacities::CapacityRecord;
use crate::preferences::PreferenceRecord;
use crate::{Assignment, Error, Group, Member};
use ::csv::{ReaderBuilder, StringRecord, Trim, Writer};
use log::debug;
use std::collections::BTreeMap;

const ID_COLUMNS: [&str; 2] = ["4桁番号", "id"];
const DEMOGRAPHIC_COLUMNS: [&str; 2] = ["性別", "gender"];
const RANK_COLUMN_PREFIX: &str = "no";
const GROUP_COLUMNS: [&str; 2] = ["講座名", "group"];
const MIN_COLUMNS: [&str; 2] = ["最少人数", "min"];
const MAX_COLUMNS: [&str; 3] = ["最大人数", "人数", "max"];

/// Read the members' preference records from a CSV file.
///
/// Blank rank cells at the end of a row shorten the member's list. Whether lists of different
/// length are accepted is decided by the `PreferenceRepository`.
///
/// # Errors
///
/// Fails with `Error::MalformedInput`, if the identifier column is missing, the rank columns are
/// missing or not numbered contiguously from `no1`, a row has a blank identifier, a filled rank
/// cell follows a blank one or the CSV structure is broken.
pub fn read_preferences<R: std::io::Read>(reader: R) -> Result<Vec<PreferenceRecord>, Error> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv_reader.headers().map_err(from_csv_error)?.clone();

    let id_column = find_column(&headers, &ID_COLUMNS).ok_or_else(|| {
        Error::MalformedInput(String::from("No member id column found in preferences."))
    })?;
    let demographic_column = find_column(&headers, &DEMOGRAPHIC_COLUMNS);
    let rank_columns = rank_columns(&headers)?;
    debug!(
        "Found {} rank columns in preferences file",
        rank_columns.len()
    );

    let mut records = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let record = result.map_err(from_csv_error)?;
        let id = record.get(id_column).unwrap_or("");
        if id.is_empty() {
            return Err(Error::MalformedInput(format!(
                "Row {} of preferences has no member id.",
                row + 1
            )));
        }

        let mut choices = Vec::with_capacity(rank_columns.len());
        let mut blank_rank = None;
        for (rank, column) in rank_columns.iter().enumerate() {
            let value = record.get(*column).unwrap_or("");
            if value.is_empty() {
                blank_rank.get_or_insert(rank + 1);
            } else if let Some(blank) = blank_rank {
                return Err(Error::MalformedInput(format!(
                    "Member '{}' has no choice of rank {}, but a choice of rank {}.",
                    id,
                    blank,
                    rank + 1
                )));
            } else {
                choices.push(value.to_owned());
            }
        }

        records.push(PreferenceRecord {
            id: id.to_owned(),
            demographic: demographic_column
                .and_then(|c| record.get(c))
                .filter(|v| !v.is_empty())
                .map(String::from),
            choices,
        });
    }
    Ok(records)
}

/// Read the groups' capacity records from a CSV file.
///
/// A blank minimum cell or a missing minimum column results in no explicit minimum.
pub fn read_capacities<R: std::io::Read>(reader: R) -> Result<Vec<CapacityRecord>, Error> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv_reader.headers().map_err(from_csv_error)?.clone();

    let name_column = find_column(&headers, &GROUP_COLUMNS).ok_or_else(|| {
        Error::MalformedInput(String::from("No group name column found in capacities."))
    })?;
    let min_column = find_column(&headers, &MIN_COLUMNS);
    let max_column = find_column(&headers, &MAX_COLUMNS).ok_or_else(|| {
        Error::MalformedInput(String::from("No maximum column found in capacities."))
    })?;

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(from_csv_error)?;
        let name = record.get(name_column).unwrap_or("");
        if name.is_empty() {
            return Err(Error::MalformedInput(String::from(
                "A row of capacities has no group name.",
            )));
        }
        let min = match min_column.and_then(|c| record.get(c)) {
            None | Some("") => None,
            Some(value) => Some(parse_number(name, value)?),
        };
        let max = parse_number(name, record.get(max_column).unwrap_or(""))?;
        records.push(CapacityRecord {
            name: name.to_owned(),
            min,
            max,
            demographic_min: BTreeMap::new(),
        });
    }
    Ok(records)
}

/// Write the calculated assignment as CSV file with one row (member id, group name) per member.
pub fn write_assignment<W: std::io::Write>(
    writer: W,
    assignment: &Assignment,
    members: &[Member],
    groups: &[Group],
) -> Result<(), Error> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer
        .write_record([ID_COLUMNS[0], GROUP_COLUMNS[0]])
        .map_err(from_csv_error)?;
    for (member, group) in members.iter().zip(assignment.iter()) {
        let group = groups.get(*group).ok_or_else(|| {
            Error::IntegrityViolation(format!(
                "Member '{}' is assigned to the unknown group {}.",
                member.id, group
            ))
        })?;
        csv_writer
            .write_record([member.id.as_str(), group.name.as_str()])
            .map_err(from_csv_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim_start_matches('\u{feff}')))
}

/// Find the column indexes of the rank columns `no1` … `noN`, ordered by rank
fn rank_columns(headers: &StringRecord) -> Result<Vec<usize>, Error> {
    let mut columns: Vec<(usize, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| {
            h.strip_prefix(RANK_COLUMN_PREFIX)
                .and_then(|n| n.parse::<usize>().ok())
                .map(|n| (n, i))
        })
        .collect();
    if columns.is_empty() {
        return Err(Error::MalformedInput(String::from(
            "No rank columns (no1, no2, …) found in preferences.",
        )));
    }
    columns.sort_unstable();
    for (i, (n, _)) in columns.iter().enumerate() {
        if *n != i + 1 {
            return Err(Error::MalformedInput(format!(
                "Rank column no{} is missing in preferences.",
                i + 1
            )));
        }
    }
    Ok(columns.into_iter().map(|(_, i)| i).collect())
}

fn parse_number(group: &str, value: &str) -> Result<usize, Error> {
    value.parse().map_err(|e: std::num::ParseIntError| {
        Error::MalformedInput(format!(
            "Invalid number '{}' for group '{}': {}",
            value, group, e
        ))
    })
}

fn from_csv_error(err: ::csv::Error) -> Error {
    if err.is_io_error() {
        Error::Io(err.to_string())
    } else {
        Error::MalformedInput(err.to_string())
    }
}
