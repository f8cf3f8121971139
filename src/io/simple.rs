use crate::capacities::CapacityRecord;
use crate::pipeline::Outcome;
use crate::preferences::PreferenceRecord;
use crate::Error;
use chrono::{SecondsFormat, Utc};
use serde_json::json;

/// Read the preference and capacity records from the simple JSON representation (canonical
/// serde_json serialization of `PreferenceRecord` and `CapacityRecord` objects).
pub fn read<R: std::io::Read>(
    reader: R,
) -> Result<(Vec<PreferenceRecord>, Vec<CapacityRecord>), Error> {
    let mut value: serde_json::Value = serde_json::from_reader(reader).map_err(from_json_error)?;
    let data = value.as_object_mut().ok_or_else(|| {
        Error::MalformedInput(String::from("The input data must be a JSON object."))
    })?;

    let members: Vec<PreferenceRecord> =
        serde_json::from_value(take_field(data, "members")).map_err(from_json_error)?;
    let groups: Vec<CapacityRecord> =
        serde_json::from_value(take_field(data, "groups")).map_err(from_json_error)?;

    Ok((members, groups))
}

/// Write the result of the pipeline (the assignment with each member's fulfilled preference level,
/// the objective value and the fulfillment distribution) as simple JSON representation to a Writer
/// (e.g. an output file).
pub fn write<W: std::io::Write>(writer: W, outcome: &Outcome) -> Result<(), Error> {
    let mut assignment = Vec::with_capacity(outcome.members.len());
    for ((member, group), level) in outcome
        .members
        .iter()
        .zip(outcome.assignment.iter())
        .zip(outcome.levels.iter())
    {
        let group = outcome.groups.get(*group).ok_or_else(|| {
            Error::IntegrityViolation(format!(
                "Member '{}' is assigned to the unknown group {}.",
                member.id, group
            ))
        })?;
        assignment.push(json!({
            "member": member.id,
            "group": group.name,
            "level": level,
        }));
    }

    let data = json!({
        "format": "X-groupassignment-simple",
        "version": "1.0",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "objective": outcome.objective,
        "assignment": assignment,
        "distribution": outcome.distribution.counts(),
    });
    serde_json::to_writer_pretty(writer, &data).map_err(from_json_error)?;

    Ok(())
}

/// Remove a field from the object. A missing field is returned as `Null`, which fails to
/// deserialize as list.
fn take_field(
    data: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> serde_json::Value {
    data.remove(key).unwrap_or(serde_json::Value::Null)
}

fn from_json_error(err: serde_json::Error) -> Error {
    if err.is_io() {
        Error::Io(err.to_string())
    } else {
        Error::MalformedInput(err.to_string())
    }
}
