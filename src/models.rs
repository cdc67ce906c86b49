use std::collections::HashMap;

use chrono::NaiveDate;

/// Sentinel project id for the appended summary row. Excluded from all
/// aggregation and never treated as a data row.
pub const TOTAL_ROW_ID: &str = "TOTAL";

/// Which legal entity employs the worker. Drives the category-specific
/// cost split and the primary-entity ER formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaffCategory {
    #[default]
    Type1,
    Type2,
}

impl StaffCategory {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Type1 => 1,
            Self::Type2 => 2,
        }
    }

    pub fn from_i64(v: i64) -> Self {
        if v == 2 {
            Self::Type2
        } else {
            Self::Type1
        }
    }
}

/// Rate-table period. One month normally has a single full-month rate
/// column; the month containing a mid-month rate change is bifurcated into
/// two half-month columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatePeriod {
    FullMonth(u32),
    FirstHalf(u32),
    SecondHalf(u32),
}

impl RatePeriod {
    pub fn month(self) -> u32 {
        match self {
            Self::FullMonth(m) | Self::FirstHalf(m) | Self::SecondHalf(m) => m,
        }
    }
}

const MONTH_ABBREV: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Key into an employee's sparse rate table, computed once per work date
/// instead of re-deriving column label strings at every lookup site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub year: i32,
    pub period: RatePeriod,
}

impl RateKey {
    /// The column label as it appears in the rate spreadsheet:
    /// `"2024JAN"`, `"2024JUN 1st half"`, `"2024JUN 2nd half"`.
    pub fn column_label(&self) -> String {
        let month = MONTH_ABBREV[(self.period.month() as usize - 1).min(11)];
        match self.period {
            RatePeriod::FullMonth(_) => format!("{}{}", self.year, month),
            RatePeriod::FirstHalf(_) => format!("{}{} 1st half", self.year, month),
            RatePeriod::SecondHalf(_) => format!("{}{} 2nd half", self.year, month),
        }
    }

    /// Parse a rate-sheet column label back into a key. Returns `None` for
    /// non-rate columns (employee id, name, category, ...).
    pub fn parse_label(label: &str) -> Option<Self> {
        let re = regex::Regex::new(
            r"^(\d{4})(JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)( 1st half| 2nd half)?$",
        )
        .ok()?;
        let caps = re.captures(label.trim())?;
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month = MONTH_ABBREV.iter().position(|m| *m == &caps[2])? as u32 + 1;
        let period = match caps.get(3).map(|m| m.as_str()) {
            Some(" 1st half") => RatePeriod::FirstHalf(month),
            Some(" 2nd half") => RatePeriod::SecondHalf(month),
            _ => RatePeriod::FullMonth(month),
        };
        Some(Self { year, period })
    }
}

/// One worked time record from the payroll/timesheet export. Enriched in
/// place by the cost calculator; never mutated afterward.
#[derive(Debug, Clone)]
pub struct TimesheetEntry {
    pub employee_id: i64,
    pub employee_name: String,
    pub work_date: NaiveDate,
    pub jobcode_2: String,
    pub jobcode_3: String,
    /// Canonical project number derived from the jobcode fields.
    pub project_no: String,
    pub hours: f64,
    pub day_cost: f64,
    /// False when no rate column existed for the work date's period —
    /// distinguishes "rate missing" from "entry had zero hours".
    pub rate_found: bool,
    pub category: StaffCategory,
}

/// One employee row from the rate table, with a sparse set of period-keyed
/// rates.
#[derive(Debug, Clone)]
pub struct RateRecord {
    pub employee_id: i64,
    pub employee_name: String,
    pub category: StaffCategory,
    pub rates: HashMap<RateKey, f64>,
}

/// One project from the project registry. Duplicate rows sharing a
/// canonical project number are merged into one record before any
/// aggregation sees them.
#[derive(Debug, Clone, Default)]
pub struct ProjectRecord {
    pub project_no: String,
    pub client: String,
    pub status: String,
    pub project_type: String,
    pub service_line: String,
    pub market: String,
    pub manager: String,
    pub description: String,
    /// Contracted amount as it appeared in the source, e.g. "$12,500.00".
    pub contracted_raw: String,
    /// Parsed contracted amount; `None` when absent or malformed.
    pub contracted_amount: Option<f64>,
    pub award_date: Option<NaiveDate>,
    pub jobcode_3: String,
    /// Additional distinct secondary jobcodes found on merged duplicates.
    pub extra_jobcodes: Vec<String>,
    // Per-row numeric carry fields from the registry sheet. Summed across
    // duplicates by the merger; the aggregator prefers recomputed totals
    // from the timesheet/invoice sources when a match exists.
    pub hours: f64,
    pub cost: f64,
    pub cost_type1: f64,
    pub cost_type2: f64,
    pub invoiced_pct: Option<f64>,
}

/// One invoice line from the invoicing ledger. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct InvoiceRecord {
    pub project_no: String,
    pub invoice_date: Option<NaiveDate>,
    pub amount: f64,
    pub invoice_no: String,
    pub payment_status: String,
    pub payment_date: Option<NaiveDate>,
}

/// The pipeline's output: one row per canonical project number, recomputed
/// wholesale on every refresh.
#[derive(Debug, Clone, Default)]
pub struct ProjectSummary {
    pub project_no: String,
    pub client: String,
    pub status: String,
    pub project_type: String,
    pub service_line: String,
    pub market: String,
    pub manager: String,
    pub description: String,
    pub hours: f64,
    pub hours_type1: f64,
    pub hours_type2: f64,
    pub cost: f64,
    pub cost_type1: f64,
    pub cost_type2: f64,
    pub invoiced: f64,
    pub contracted_amount: Option<f64>,
    pub er_contract: Option<f64>,
    pub er_invoiced: Option<f64>,
    pub invoiced_percent: Option<f64>,
    pub er_primary: Option<f64>,
    /// Join provenance: distinguishes "legitimately zero" from "no match
    /// found" for audits and tests.
    pub matched_registry: bool,
    pub matched_cost: bool,
    pub matched_invoice: bool,
}

impl ProjectSummary {
    pub fn is_total_row(&self) -> bool {
        self.project_no == TOTAL_ROW_ID
    }
}
