//! Canonical project-number handling. Every project identifier that crosses a
//! source boundary goes through `normalize_project_no` before it is grouped,
//! joined, or compared — joins on un-normalized identifiers silently drop
//! matches.

/// Canonical form of a project number: numeric inputs become a fixed
/// two-decimal string (`1928` -> `"1928.00"`, `"1928.1"` -> `"1928.10"`),
/// everything else is trimmed and passed through unchanged.
///
/// Total (never fails) and idempotent.
pub fn normalize_project_no(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => format!("{n:.2}"),
        _ => trimmed.to_string(),
    }
}

/// Number of leading characters of a jobcode that carry the project number.
const JOBCODE_PREFIX_LEN: usize = 7;

/// Extract the project number from a timesheet row's jobcode fields.
///
/// The primary jobcode carries the project number in its first 7 characters.
/// When that value starts with `internal_prefix` the entry was logged against
/// an internal/overhead bucket, and the secondary jobcode field holds the
/// real client project number instead.
pub fn project_from_jobcode(jobcode_2: &str, jobcode_3: &str, internal_prefix: &str) -> String {
    let primary: String = jobcode_2
        .chars()
        .take(JOBCODE_PREFIX_LEN)
        .collect::<String>()
        .trim()
        .to_string();
    if !internal_prefix.is_empty() && primary.starts_with(internal_prefix) {
        jobcode_3
            .chars()
            .take(JOBCODE_PREFIX_LEN)
            .collect::<String>()
            .trim()
            .to_string()
    } else {
        primary
    }
}
