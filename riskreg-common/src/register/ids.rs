//! Identifier allocation for risks and tasks
//!
//! IDs are never stored in a counter. Each allocation scans every existing
//! key in the sheet and returns max + 1, so IDs only grow and are never
//! reused even after rows are blanked.
//!
//! - Risks: `R-<year>-<seq>`, sequence restarts each calendar year
//! - Tasks: `T-<seq>`, one sequence per register. Legacy dashboard IDs of
//!   the form `<PROJECT>-T<seq>` share that sequence.
//!
//! Sequences are zero-padded to at least 3 digits. Keys that do not parse,
//! or whose sequence has no successor, are ignored.

/// Next risk ID for `year`, given every key currently in the Risk Register
pub fn next_risk_id<'a, I>(existing: I, year: i32) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = format!("R-{}-", year);
    let max = existing
        .into_iter()
        .filter_map(|id| id.trim().strip_prefix(prefix.as_str()))
        .filter_map(|rest| parse_sequence(rest.rsplit('-').next().unwrap_or(rest)))
        .max()
        .unwrap_or(0);

    format!("{}{:03}", prefix, max + 1)
}

/// Next task ID, given every key currently in the Tasks sheet
pub fn next_task_id<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(task_sequence)
        .max()
        .unwrap_or(0);

    format!("T-{:03}", max + 1)
}

/// Sequence number of a task key, in either accepted form
fn task_sequence(id: &str) -> Option<u64> {
    let id = id.trim();
    if let Some(rest) = id.strip_prefix("T-") {
        return parse_sequence(rest);
    }

    // Legacy `<PROJECT>-T<seq>`
    let (project, rest) = id.rsplit_once("-T")?;
    if project.is_empty() || !project.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    parse_sequence(rest)
}

fn parse_sequence(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits
        .parse::<u64>()
        .ok()
        .filter(|n| n.checked_add(1).is_some())
}
