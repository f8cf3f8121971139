pub mod csv;
pub mod simple;

use super::ilp::solution_score::FulfillmentDistribution;
use super::{Assignment, Group, Member};
use std::fmt::Write;

/// Format the calculated group assignment into a human readable String (e.g. to print it to
/// stdout).
///
/// The output format will look like
/// ```text
/// ===== Group name =====
/// 0123 (1)
/// 4711 (3)
///
/// ===== Another group name =====
///
/// ===== A third group name =====
/// …
/// ```
/// with the fulfilled preference level of each member in parentheses.
pub fn format_assignment(
    assignment: &Assignment,
    levels: &[usize],
    groups: &[Group],
    members: &[Member],
) -> String {
    let mut result = String::new();
    for g in groups.iter() {
        write!(result, "\n===== {} =====\n", g.name).unwrap();
        for (am, ag) in assignment.iter().enumerate() {
            if *ag == g.index {
                write!(result, "{}", members[am].id).unwrap();
                if let Some(level) = levels.get(am) {
                    write!(result, " ({})", level).unwrap();
                }
                result.push('\n');
            }
        }
    }
    result
}

/// Maximum width of the histogram bars in `format_distribution()`
const MAX_BAR_WIDTH: usize = 50;

/// Format the fulfillment distribution as a text histogram with one line per preference level:
/// ```text
/// Fulfilled preference level | Number of members
///  1 | ##########                     10
///  2 | ###                             3
/// ```
pub fn format_distribution(distribution: &FulfillmentDistribution) -> String {
    let max_count = distribution.counts().iter().copied().max().unwrap_or(0);
    let mut result = String::from("Fulfilled preference level | Number of members\n");
    for (level, count) in distribution.iter() {
        let width = if max_count == 0 {
            0
        } else {
            (count * MAX_BAR_WIDTH + max_count - 1) / max_count
        };
        writeln!(
            result,
            "{:>2} | {:<bar_width$} {:>4}",
            level,
            "#".repeat(width),
            count,
            bar_width = MAX_BAR_WIDTH
        )
        .unwrap();
    }
    result
}
