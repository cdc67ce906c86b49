//! Cost calculation: joins timesheet entries with the rate table to assign
//! a monetary day-cost and a staff category to every worked time entry.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::models::{RateKey, RatePeriod, RateRecord, TimesheetEntry};

/// Day-of-month threshold for the bifurcated month: day <= 15 falls in the
/// first-half column, day > 15 in the second-half column.
pub const MID_MONTH_DAY: u32 = 15;

/// Resolve the rate-column key for a work date. `split_month` is the
/// (year, month) containing the mid-month rate change, if any.
pub fn rate_key_for(date: NaiveDate, split_month: Option<(i32, u32)>) -> RateKey {
    let (year, month, day) = (date.year(), date.month(), date.day());
    let period = match split_month {
        Some((sy, sm)) if sy == year && sm == month => {
            if day <= MID_MONTH_DAY {
                RatePeriod::FirstHalf(month)
            } else {
                RatePeriod::SecondHalf(month)
            }
        }
        _ => RatePeriod::FullMonth(month),
    };
    RateKey { year, period }
}

/// Uppercased, whitespace-collapsed form used for the name-based fallback
/// when a timesheet row carries no usable employee id.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CostingOutcome {
    /// Entries that resolved to a rate and received a day-cost.
    pub costed: usize,
    /// Entries whose employee matched but whose period had no rate column;
    /// their cost is zero, counted rather than raised.
    pub missing_rate: usize,
    /// Entries that matched no rate row by id or by name. They keep
    /// identifier zero and will not join downstream.
    pub unmatched_employees: usize,
}

/// Assign `day_cost = rate * hours` and a staff category to every entry.
///
/// Matching is by employee id first; rows with a missing/zero id fall back
/// to a normalized-name lookup, which also restores the identifier on the
/// entry so later joins see it.
pub fn assign_costs(
    entries: &mut [TimesheetEntry],
    rates: &[RateRecord],
    split_month: Option<(i32, u32)>,
) -> CostingOutcome {
    let by_id: HashMap<i64, &RateRecord> = rates
        .iter()
        .filter(|r| r.employee_id != 0)
        .map(|r| (r.employee_id, r))
        .collect();
    let by_name: HashMap<String, &RateRecord> = rates
        .iter()
        .map(|r| (normalize_name(&r.employee_name), r))
        .collect();

    let mut outcome = CostingOutcome::default();
    for entry in entries.iter_mut() {
        let matched = if entry.employee_id != 0 {
            by_id.get(&entry.employee_id).copied()
        } else {
            None
        }
        .or_else(|| by_name.get(&normalize_name(&entry.employee_name)).copied());

        let Some(record) = matched else {
            entry.day_cost = 0.0;
            entry.rate_found = false;
            outcome.unmatched_employees += 1;
            continue;
        };

        if entry.employee_id == 0 {
            entry.employee_id = record.employee_id;
        }
        entry.category = record.category;

        let key = rate_key_for(entry.work_date, split_month);
        match record.rates.get(&key) {
            Some(rate) => {
                entry.day_cost = rate * entry.hours;
                entry.rate_found = true;
                outcome.costed += 1;
            }
            None => {
                entry.day_cost = 0.0;
                entry.rate_found = false;
                outcome.missing_rate += 1;
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StaffCategory;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(employee_id: i64, name: &str, work_date: NaiveDate, hours: f64) -> TimesheetEntry {
        TimesheetEntry {
            employee_id,
            employee_name: name.to_string(),
            work_date,
            jobcode_2: String::new(),
            jobcode_3: String::new(),
            project_no: "1001.00".to_string(),
            hours,
            day_cost: 0.0,
            rate_found: false,
            category: StaffCategory::Type1,
        }
    }

    fn rate_record(id: i64, name: &str, category: StaffCategory, rates: &[(RateKey, f64)]) -> RateRecord {
        RateRecord {
            employee_id: id,
            employee_name: name.to_string(),
            category,
            rates: rates.iter().copied().collect(),
        }
    }

    #[test]
    fn test_rate_key_for_plain_month() {
        let key = rate_key_for(date(2024, 1, 20), None);
        assert_eq!(key, RateKey { year: 2024, period: RatePeriod::FullMonth(1) });
        assert_eq!(key.column_label(), "2024JAN");
    }

    #[test]
    fn test_rate_key_for_bifurcated_month() {
        let split = Some((2024, 6));
        let first = rate_key_for(date(2024, 6, 15), split);
        assert_eq!(first.period, RatePeriod::FirstHalf(6));
        let second = rate_key_for(date(2024, 6, 16), split);
        assert_eq!(second.period, RatePeriod::SecondHalf(6));
        // Other months of the split year are unaffected
        let other = rate_key_for(date(2024, 5, 16), split);
        assert_eq!(other.period, RatePeriod::FullMonth(5));
        // Same month of a different year is unaffected
        let other_year = rate_key_for(date(2023, 6, 16), split);
        assert_eq!(other_year.period, RatePeriod::FullMonth(6));
    }

    #[test]
    fn test_day_cost_is_rate_times_hours() {
        let jan = RateKey { year: 2024, period: RatePeriod::FullMonth(1) };
        let rates = vec![rate_record(7, "Jane Doe", StaffCategory::Type2, &[(jan, 85.0)])];
        let mut entries = vec![entry(7, "Jane Doe", date(2024, 1, 10), 6.0)];
        let outcome = assign_costs(&mut entries, &rates, None);
        assert_eq!(outcome.costed, 1);
        assert!((entries[0].day_cost - 510.0).abs() < 1e-9);
        assert!(entries[0].rate_found);
        assert_eq!(entries[0].category, StaffCategory::Type2);
    }

    #[test]
    fn test_missing_rate_column_is_zero_cost_not_error() {
        let jan = RateKey { year: 2024, period: RatePeriod::FullMonth(1) };
        let rates = vec![rate_record(7, "Jane Doe", StaffCategory::Type1, &[(jan, 85.0)])];
        // Dated in a month with no rate column
        let mut entries = vec![entry(7, "Jane Doe", date(2024, 3, 10), 6.0)];
        let outcome = assign_costs(&mut entries, &rates, None);
        assert_eq!(outcome.missing_rate, 1);
        assert_eq!(entries[0].day_cost, 0.0);
        // Distinguishable from an entry that legitimately had zero hours
        assert!(!entries[0].rate_found);
        let mut zero_hours = vec![entry(7, "Jane Doe", date(2024, 1, 10), 0.0)];
        assign_costs(&mut zero_hours, &rates, None);
        assert_eq!(zero_hours[0].day_cost, 0.0);
        assert!(zero_hours[0].rate_found);
    }

    #[test]
    fn test_name_fallback_restores_identifier() {
        let jan = RateKey { year: 2024, period: RatePeriod::FullMonth(1) };
        let rates = vec![rate_record(42, "Jane Doe", StaffCategory::Type1, &[(jan, 100.0)])];
        let mut entries = vec![entry(0, "  jane   DOE ", date(2024, 1, 5), 8.0)];
        let outcome = assign_costs(&mut entries, &rates, None);
        assert_eq!(outcome.costed, 1);
        assert_eq!(entries[0].employee_id, 42);
        assert!((entries[0].day_cost - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_unmatched_entries_are_counted_not_dropped() {
        let rates = vec![rate_record(7, "Jane Doe", StaffCategory::Type1, &[])];
        let mut entries = vec![
            entry(0, "Nobody Known", date(2024, 1, 5), 8.0),
            entry(99, "Also Unknown", date(2024, 1, 5), 4.0),
        ];
        let outcome = assign_costs(&mut entries, &rates, None);
        assert_eq!(outcome.unmatched_employees, 2);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].employee_id, 0);
        assert_eq!(entries[0].day_cost, 0.0);
    }

    #[test]
    fn test_split_month_picks_half_rates() {
        let first = RateKey { year: 2024, period: RatePeriod::FirstHalf(6) };
        let second = RateKey { year: 2024, period: RatePeriod::SecondHalf(6) };
        let rates = vec![rate_record(
            7,
            "Jane Doe",
            StaffCategory::Type1,
            &[(first, 80.0), (second, 90.0)],
        )];
        let mut entries = vec![
            entry(7, "Jane Doe", date(2024, 6, 14), 1.0),
            entry(7, "Jane Doe", date(2024, 6, 20), 1.0),
        ];
        assign_costs(&mut entries, &rates, Some((2024, 6)));
        assert!((entries[0].day_cost - 80.0).abs() < 1e-9);
        assert!((entries[1].day_cost - 90.0).abs() < 1e-9);
    }
}
