//! Duplicate-registry merging. The project registry is maintained by hand
//! and routinely carries several rows for the same project number; every
//! group is collapsed into one authoritative record before any aggregation
//! step sees the registry.

use std::collections::HashMap;

use crate::models::ProjectRecord;

/// Status values in pick priority order. Unknown statuses rank below all of
/// these; ties go to the first occurrence in the group.
const STATUS_PRIORITY: &[&str] = &["Active", "On Hold", "Completed", "Cancelled"];

fn status_rank(status: &str) -> usize {
    STATUS_PRIORITY
        .iter()
        .position(|s| s.eq_ignore_ascii_case(status.trim()))
        .unwrap_or(STATUS_PRIORITY.len())
}

fn join_distinct<'a>(values: impl Iterator<Item = &'a str>, sep: &str) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for v in values {
        let v = v.trim();
        if !v.is_empty() && !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen.join(sep)
}

/// Most frequent client name; a tie joins all distinct values with `" / "`.
fn pick_client(group: &[ProjectRecord]) -> String {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for rec in group {
        let c = rec.client.trim();
        if c.is_empty() {
            continue;
        }
        if !counts.contains_key(c) {
            order.push(c);
        }
        *counts.entry(c).or_insert(0) += 1;
    }
    let Some(max) = counts.values().copied().max() else {
        return String::new();
    };
    let tied = counts.values().filter(|&&n| n == max).count();
    if tied == 1 {
        order
            .iter()
            .find(|c| counts[**c] == max)
            .copied()
            .unwrap_or_default()
            .to_string()
    } else {
        order.join(" / ")
    }
}

fn sum_opt(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum())
    }
}

fn merge_group(mut group: Vec<ProjectRecord>) -> ProjectRecord {
    if group.len() == 1 {
        return group.remove(0);
    }
    let mut out = group[0].clone();

    out.description = join_distinct(group.iter().map(|r| r.description.as_str()), " + ");
    out.client = pick_client(&group);
    out.project_type = join_distinct(group.iter().map(|r| r.project_type.as_str()), " / ");

    // Status by fixed priority ranking; first occurrence wins ties.
    for rec in &group[1..] {
        if status_rank(&rec.status) < status_rank(&out.status) {
            out.status = rec.status.clone();
        }
    }

    out.hours = group.iter().map(|r| r.hours).sum();
    out.cost = group.iter().map(|r| r.cost).sum();
    out.cost_type1 = group.iter().map(|r| r.cost_type1).sum();
    out.cost_type2 = group.iter().map(|r| r.cost_type2).sum();
    out.contracted_amount = sum_opt(group.iter().map(|r| r.contracted_amount));
    out.invoiced_pct = sum_opt(group.iter().map(|r| r.invoiced_pct)).map(|p| p.min(100.0));

    // First occurrence keeps the secondary jobcode; any other distinct
    // values are retained rather than discarded.
    for rec in &group[1..] {
        let j = rec.jobcode_3.trim();
        if !j.is_empty() && j != out.jobcode_3 && !out.extra_jobcodes.iter().any(|e| e == j) {
            out.extra_jobcodes.push(j.to_string());
        }
    }

    // Descriptive singletons (service line, market, manager, award date,
    // raw contracted string) keep the first occurrence's value.
    out
}

/// Collapse registry rows sharing a canonical project number into one
/// record per project. Groups of one pass through unchanged; output order
/// follows first appearance in the input.
pub fn merge_duplicates(records: Vec<ProjectRecord>) -> Vec<ProjectRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<ProjectRecord>> = Vec::new();
    for rec in records {
        match index.get(&rec.project_no) {
            Some(&i) => groups[i].push(rec),
            None => {
                index.insert(rec.project_no.clone(), groups.len());
                groups.push(vec![rec]);
            }
        }
    }
    groups.into_iter().map(merge_group).collect()
}
