//! Cross-source aggregation: groups costs, hours, and invoice amounts by
//! canonical project number and left-joins them onto the merged registry.
//! Every key passes through the normalizer before grouping or joining.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::models::{
    InvoiceRecord, ProjectRecord, ProjectSummary, StaffCategory, TimesheetEntry, TOTAL_ROW_ID,
};
use crate::normalize::normalize_project_no;

/// Optional invoice-date restriction for date-ranged reporting. An open
/// window aggregates over all invoices; an undated invoice is excluded
/// whenever either boundary is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    fn contains(&self, date: Option<NaiveDate>) -> bool {
        if self.is_open() {
            return true;
        }
        let Some(d) = date else {
            return false;
        };
        if let Some(from) = self.from {
            if d < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if d > to {
                return false;
            }
        }
        true
    }
}

/// Keys excluded from aggregation: blanks and the total-row sentinel.
fn is_aggregatable(key: &str) -> bool {
    !key.is_empty() && !key.eq_ignore_ascii_case(TOTAL_ROW_ID)
}

#[derive(Debug, Default, Clone, Copy)]
struct CostAgg {
    hours: f64,
    hours_type1: f64,
    hours_type2: f64,
    cost: f64,
    cost_type1: f64,
    cost_type2: f64,
}

/// Grouping map that preserves first-seen key order, so orphan rows come
/// out deterministically.
struct Grouped<T> {
    order: Vec<String>,
    map: HashMap<String, T>,
}

impl<T: Default> Grouped<T> {
    fn new() -> Self {
        Self { order: Vec::new(), map: HashMap::new() }
    }

    fn entry(&mut self, key: String) -> &mut T {
        if !self.map.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.map.entry(key).or_default()
    }
}

fn group_costs(entries: &[TimesheetEntry]) -> Grouped<CostAgg> {
    let mut grouped: Grouped<CostAgg> = Grouped::new();
    for entry in entries {
        let key = normalize_project_no(&entry.project_no);
        if !is_aggregatable(&key) {
            continue;
        }
        let agg = grouped.entry(key);
        agg.hours += entry.hours;
        agg.cost += entry.day_cost;
        match entry.category {
            StaffCategory::Type1 => {
                agg.hours_type1 += entry.hours;
                agg.cost_type1 += entry.day_cost;
            }
            StaffCategory::Type2 => {
                agg.hours_type2 += entry.hours;
                agg.cost_type2 += entry.day_cost;
            }
        }
    }
    grouped
}

fn group_invoices(invoices: &[InvoiceRecord], window: DateWindow) -> Grouped<f64> {
    let mut grouped = Grouped::new();
    for inv in invoices {
        if !window.contains(inv.invoice_date) {
            continue;
        }
        let key = normalize_project_no(&inv.project_no);
        if !is_aggregatable(&key) {
            continue;
        }
        *grouped.entry(key) += inv.amount;
    }
    grouped
}

fn attach_cost(row: &mut ProjectSummary, agg: &CostAgg) {
    row.hours = agg.hours;
    row.hours_type1 = agg.hours_type1;
    row.hours_type2 = agg.hours_type2;
    row.cost = agg.cost;
    row.cost_type1 = agg.cost_type1;
    row.cost_type2 = agg.cost_type2;
    row.matched_cost = true;
}

/// Join the grouped cost/hours/invoice aggregates onto the merged registry.
///
/// Left join semantics: every registry project appears even with no
/// matching cost or invoice rows (zero-filled, `matched_* = false`).
/// Aggregate keys with no registry row are appended with empty registry
/// fields rather than silently dropped.
pub fn build_summaries(
    registry: &[ProjectRecord],
    entries: &[TimesheetEntry],
    invoices: &[InvoiceRecord],
    window: DateWindow,
) -> Vec<ProjectSummary> {
    let costs = group_costs(entries);
    let invoiced = group_invoices(invoices, window);

    let mut out: Vec<ProjectSummary> = Vec::with_capacity(registry.len());
    let mut joined: HashSet<String> = HashSet::new();

    for rec in registry {
        let key = normalize_project_no(&rec.project_no);
        if !is_aggregatable(&key) {
            continue;
        }
        let mut row = ProjectSummary {
            project_no: key.clone(),
            client: rec.client.clone(),
            status: rec.status.clone(),
            project_type: rec.project_type.clone(),
            service_line: rec.service_line.clone(),
            market: rec.market.clone(),
            manager: rec.manager.clone(),
            description: rec.description.clone(),
            contracted_amount: rec.contracted_amount,
            matched_registry: true,
            ..Default::default()
        };
        match costs.map.get(&key) {
            Some(agg) => attach_cost(&mut row, agg),
            None => {
                // No timesheet match: the registry's own carried numbers
                // (merged across duplicates) are the best available values.
                row.hours = rec.hours;
                row.cost = rec.cost;
                row.cost_type1 = rec.cost_type1;
                row.cost_type2 = rec.cost_type2;
            }
        }
        if let Some(total) = invoiced.map.get(&key) {
            row.invoiced = *total;
            row.matched_invoice = true;
        }
        joined.insert(key);
        out.push(row);
    }

    // Cost or invoice activity against a project number the registry does
    // not know. These rows survive, flagged, so nothing is silently lost.
    for key in costs.order.iter().chain(invoiced.order.iter()) {
        if joined.contains(key) {
            continue;
        }
        let mut row = ProjectSummary {
            project_no: key.clone(),
            matched_registry: false,
            ..Default::default()
        };
        if let Some(agg) = costs.map.get(key) {
            attach_cost(&mut row, agg);
        }
        if let Some(total) = invoiced.map.get(key) {
            row.invoiced = *total;
            row.matched_invoice = true;
        }
        joined.insert(key.clone());
        out.push(row);
    }

    out
}
