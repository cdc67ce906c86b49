//! Source loaders: adapt the four raw spreadsheets (timesheet export, rate
//! table, project registry, invoice ledger) onto the entity schemas. Column
//! headers are mapped once per source; a required column absent from a
//! whole source fails loudly instead of being guessed at per call site.

use std::path::Path;

use calamine::{Data, Reader};
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::error::{RecountError, Result};
use crate::metrics::parse_currency;
use crate::models::{InvoiceRecord, ProjectRecord, RateKey, RateRecord, StaffCategory, TimesheetEntry};
use crate::normalize::{normalize_project_no, project_from_jobcode};

/// Bounded attempts against a source that may sit on a flaky network share.
const RETRY_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// Cell/date helpers
// ---------------------------------------------------------------------------

pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

/// Parse a date in any of the shapes the sources use: ISO, M/D/Y, or an
/// Excel serial number.
pub fn parse_date_any(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() == 3 {
        let m: u32 = parts[0].trim().parse().ok()?;
        let d: u32 = parts[1].trim().parse().ok()?;
        let y: i32 = parts[2].trim().parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    if let Ok(serial) = raw.parse::<f64>() {
        if serial > 20000.0 && serial < 80000.0 {
            return NaiveDate::parse_from_str(&excel_serial_to_date(serial), "%Y-%m-%d").ok();
        }
    }
    None
}

fn cell_to_string(data: &Data) -> String {
    match data {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                format!("{f}")
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        _ => String::new(),
    }
}

fn parse_number(raw: &str) -> f64 {
    parse_currency(raw).unwrap_or(0.0)
}

fn parse_id(raw: &str) -> i64 {
    raw.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Raw table reading (CSV or XLSX), with retry + local-copy fallback
// ---------------------------------------------------------------------------

fn read_csv_table(path: &Path) -> Result<Vec<Vec<String>>> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }
    Ok(rows)
}

fn read_xlsx_table(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| RecountError::Spreadsheet(format!("{}: {e}", path.display())))?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Err(RecountError::Spreadsheet(format!(
            "{}: workbook has no sheets",
            path.display()
        )));
    };
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| RecountError::Spreadsheet(format!("{}: {e}", path.display())))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

/// Read a whole sheet as strings. Dispatches on file extension.
pub fn read_table(path: &Path) -> Result<Vec<Vec<String>>> {
    let is_excel = path
        .extension()
        .map(|e| {
            e.eq_ignore_ascii_case("xlsx")
                || e.eq_ignore_ascii_case("xls")
                || e.eq_ignore_ascii_case("xlsm")
        })
        .unwrap_or(false);
    if is_excel {
        read_xlsx_table(path)
    } else {
        read_csv_table(path)
    }
}

/// Read a source with bounded retries, then fall back to a local copy.
/// Both failing aborts the run — never an empty table.
pub fn read_table_with_fallback(
    name: &str,
    primary: &Path,
    fallback: Option<&Path>,
) -> Result<Vec<Vec<String>>> {
    let mut detail = String::new();
    for _ in 0..RETRY_ATTEMPTS {
        match read_table(primary) {
            Ok(table) => return Ok(table),
            Err(e) => detail = e.to_string(),
        }
    }
    if let Some(fb) = fallback {
        match read_table(fb) {
            Ok(table) => return Ok(table),
            Err(e) => detail = format!("{detail}; fallback: {e}"),
        }
    }
    Err(RecountError::SourceUnavailable {
        name: name.to_string(),
        detail,
    })
}

pub fn file_checksum(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Header mapping
// ---------------------------------------------------------------------------

fn split_header(table: &[Vec<String>]) -> Option<(&Vec<String>, &[Vec<String>])> {
    let idx = table.iter().position(|row| row.iter().any(|c| !c.is_empty()))?;
    Some((&table[idx], &table[idx + 1..]))
}

fn header_index(header: &[String], candidates: &[&str]) -> Option<usize> {
    header.iter().position(|h| {
        let h = h.trim();
        candidates.iter().any(|c| h.eq_ignore_ascii_case(c))
    })
}

fn require_column(source: &str, header: &[String], candidates: &[&str]) -> Result<usize> {
    header_index(header, candidates)
        .ok_or_else(|| RecountError::MissingColumn(source.to_string(), candidates[0].to_string()))
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    match idx {
        Some(i) => row.get(i).map(String::as_str).unwrap_or(""),
        None => "",
    }
}

const PROJECT_NO_HEADERS: &[&str] = &["Project No", "Project Number", "Project #", "Project No."];

// ---------------------------------------------------------------------------
// Timesheet
// ---------------------------------------------------------------------------

pub fn load_timesheet(path: &Path, internal_prefix: &str) -> Result<Vec<TimesheetEntry>> {
    let table = read_table(path)?;
    let Some((header, body)) = split_header(&table) else {
        return Err(RecountError::MissingColumn("timesheet".into(), "Date".into()));
    };
    let idx_id = header_index(header, &["Employee Id", "Employee No", "Employee Number"]);
    let idx_name = require_column("timesheet", header, &["Employee Name", "Employee", "Name"])?;
    let idx_date = require_column("timesheet", header, &["Date", "Work Date", "Day"])?;
    let idx_job2 = require_column("timesheet", header, &["Jobcode 2", "Job Code 2", "Jobcode2"])?;
    let idx_job3 = header_index(header, &["Jobcode 3", "Job Code 3", "Jobcode3"]);
    let idx_hours = require_column("timesheet", header, &["Hours", "Hours Worked"])?;

    let mut entries = Vec::new();
    for row in body {
        let Some(work_date) = parse_date_any(cell(row, Some(idx_date))) else {
            continue;
        };
        let jobcode_2 = cell(row, Some(idx_job2)).to_string();
        let jobcode_3 = cell(row, idx_job3).to_string();
        let project_no =
            normalize_project_no(&project_from_jobcode(&jobcode_2, &jobcode_3, internal_prefix));
        entries.push(TimesheetEntry {
            employee_id: parse_id(cell(row, idx_id)),
            employee_name: cell(row, Some(idx_name)).to_string(),
            work_date,
            jobcode_2,
            jobcode_3,
            project_no,
            hours: parse_number(cell(row, Some(idx_hours))),
            day_cost: 0.0,
            rate_found: false,
            category: StaffCategory::Type1,
        });
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Rate table
// ---------------------------------------------------------------------------

pub fn load_rates(path: &Path) -> Result<Vec<RateRecord>> {
    let table = read_table(path)?;
    let Some((header, body)) = split_header(&table) else {
        return Err(RecountError::MissingColumn("rates".into(), "Employee Name".into()));
    };
    let idx_id = header_index(header, &["Employee Id", "Employee No", "Employee Number"]);
    let idx_name = require_column("rates", header, &["Employee Name", "Employee", "Name"])?;
    let idx_cat = require_column("rates", header, &["Category", "Entity", "Staff Category"])?;

    // Every remaining column whose label parses as a rate period is a rate
    // column; anything else is ignored.
    let rate_columns: Vec<(usize, RateKey)> = header
        .iter()
        .enumerate()
        .filter_map(|(i, label)| RateKey::parse_label(label).map(|key| (i, key)))
        .collect();

    let mut records = Vec::new();
    for row in body {
        let name = cell(row, Some(idx_name)).to_string();
        if name.is_empty() {
            continue;
        }
        let mut rates = std::collections::HashMap::new();
        for (i, key) in &rate_columns {
            if let Some(rate) = parse_currency(cell(row, Some(*i))) {
                rates.insert(*key, rate);
            }
        }
        records.push(RateRecord {
            employee_id: parse_id(cell(row, idx_id)),
            employee_name: name,
            category: StaffCategory::from_i64(parse_id(cell(row, Some(idx_cat)))),
            rates,
        });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Project registry
// ---------------------------------------------------------------------------

pub fn load_registry(primary: &Path, fallback: Option<&Path>) -> Result<Vec<ProjectRecord>> {
    let table = read_table_with_fallback("registry", primary, fallback)?;
    let Some((header, body)) = split_header(&table) else {
        return Err(RecountError::MissingColumn("registry".into(), "Project No".into()));
    };
    // Absent an exact project-number header the first column is taken as
    // the project number rather than failing the whole source.
    let idx_project = header_index(header, PROJECT_NO_HEADERS).unwrap_or(0);
    let idx_client = header_index(header, &["Client", "Client Name"]);
    let idx_status = header_index(header, &["Status"]);
    let idx_type = header_index(header, &["Type", "Project Type"]);
    let idx_service = header_index(header, &["Service Line", "Service"]);
    let idx_market = header_index(header, &["Market", "Market Segment"]);
    let idx_manager = header_index(header, &["Project Manager", "PM", "Manager"]);
    let idx_desc = header_index(header, &["Description", "Project Description"]);
    let idx_contract = header_index(header, &["Contracted Amount", "Contract Amount", "Contract Value"]);
    let idx_award = header_index(header, &["Award Date", "Awarded"]);
    let idx_job3 = header_index(header, &["Jobcode 3", "Job Code 3", "Jobcode3"]);
    let idx_hours = header_index(header, &["Hours", "Total Hours"]);
    let idx_cost = header_index(header, &["Cost", "Total Cost"]);
    let idx_cost1 = header_index(header, &["Cost Type 1", "Cost T1"]);
    let idx_cost2 = header_index(header, &["Cost Type 2", "Cost T2"]);
    let idx_invpct = header_index(header, &["Invoiced %", "Invoiced Percent"]);

    let mut records = Vec::new();
    for row in body {
        let raw_project = cell(row, Some(idx_project));
        if raw_project.is_empty() && row.iter().all(|c| c.is_empty()) {
            continue;
        }
        let contracted_raw = cell(row, idx_contract).to_string();
        records.push(ProjectRecord {
            project_no: normalize_project_no(raw_project),
            client: cell(row, idx_client).to_string(),
            status: cell(row, idx_status).to_string(),
            project_type: cell(row, idx_type).to_string(),
            service_line: cell(row, idx_service).to_string(),
            market: cell(row, idx_market).to_string(),
            manager: cell(row, idx_manager).to_string(),
            description: cell(row, idx_desc).to_string(),
            contracted_amount: parse_currency(&contracted_raw),
            contracted_raw,
            award_date: parse_date_any(cell(row, idx_award)),
            jobcode_3: cell(row, idx_job3).to_string(),
            extra_jobcodes: Vec::new(),
            hours: parse_number(cell(row, idx_hours)),
            cost: parse_number(cell(row, idx_cost)),
            cost_type1: parse_number(cell(row, idx_cost1)),
            cost_type2: parse_number(cell(row, idx_cost2)),
            invoiced_pct: parse_currency(cell(row, idx_invpct)),
        });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Invoice ledger
// ---------------------------------------------------------------------------

pub fn load_invoices(path: &Path) -> Result<Vec<InvoiceRecord>> {
    let table = read_table(path)?;
    let Some((header, body)) = split_header(&table) else {
        return Err(RecountError::MissingColumn("invoices".into(), "Project No".into()));
    };
    let idx_project = header_index(header, PROJECT_NO_HEADERS).unwrap_or(0);
    let idx_date = require_column("invoices", header, &["Invoice Date", "Date"])?;
    let idx_amount = require_column("invoices", header, &["Amount", "Invoiced Amount", "Invoice Amount"])?;
    let idx_number = header_index(header, &["Invoice No", "Invoice Number", "Invoice #"]);
    let idx_status = header_index(header, &["Payment Status", "Status"]);
    let idx_paid = header_index(header, &["Payment Date", "Paid Date"]);

    let mut records = Vec::new();
    for row in body {
        let raw_project = cell(row, Some(idx_project));
        if raw_project.is_empty() {
            continue;
        }
        records.push(InvoiceRecord {
            project_no: normalize_project_no(raw_project),
            invoice_date: parse_date_any(cell(row, Some(idx_date))),
            amount: parse_number(cell(row, Some(idx_amount))),
            invoice_no: cell(row, idx_number).to_string(),
            payment_status: cell(row, idx_status).to_string(),
            payment_date: parse_date_any(cell(row, idx_paid)),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatePeriod;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_date_any() {
        let expect = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(parse_date_any("2025-01-15"), Some(expect));
        assert_eq!(parse_date_any("1/15/2025"), Some(expect));
        assert_eq!(parse_date_any("45672"), Some(expect));
        assert_eq!(parse_date_any("not a date"), None);
        assert_eq!(parse_date_any(""), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), "2025-01-10");
    }

    #[test]
    fn test_load_timesheet_derives_project_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "timesheet.csv",
            "Employee Id,Employee Name,Date,Jobcode 2,Jobcode 3,Hours\n\
             7,Jane Doe,2024-01-10,1928.00 Site Visit,,6.0\n\
             7,Jane Doe,2024-01-11,OVH-ADM General,2044.00 Client,2.5\n\
             ,No Date Row,,1111.00,,1.0\n",
        );
        let entries = load_timesheet(&path, "OVH").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].project_no, "1928.00");
        assert!((entries[0].hours - 6.0).abs() < 1e-9);
        // Internal bucket redirected to secondary jobcode
        assert_eq!(entries[1].project_no, "2044.00");
    }

    #[test]
    fn test_load_timesheet_missing_required_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "timesheet.csv",
            "Employee Name,Date,Hours\nJane Doe,2024-01-10,6.0\n",
        );
        let err = load_timesheet(&path, "OVH").unwrap_err();
        assert!(matches!(err, RecountError::MissingColumn(_, _)), "got {err}");
    }

    #[test]
    fn test_load_rates_parses_period_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "rates.csv",
            "Employee Id,Employee Name,Category,2024JAN,2024JUN 1st half,2024JUN 2nd half\n\
             7,Jane Doe,1,$85.00,90,95\n\
             0,Raj Patel,2,70,,\n",
        );
        let records = load_rates(&path).unwrap();
        assert_eq!(records.len(), 2);
        let jan = RateKey { year: 2024, period: RatePeriod::FullMonth(1) };
        let jun2 = RateKey { year: 2024, period: RatePeriod::SecondHalf(6) };
        assert_eq!(records[0].rates.get(&jan), Some(&85.0));
        assert_eq!(records[0].rates.get(&jun2), Some(&95.0));
        assert_eq!(records[0].category, StaffCategory::Type1);
        // Sparse rates: missing cells simply absent
        assert_eq!(records[1].rates.len(), 1);
        assert_eq!(records[1].category, StaffCategory::Type2);
        assert_eq!(records[1].employee_id, 0);
    }

    #[test]
    fn test_load_registry_normalizes_and_parses_currency() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "registry.csv",
            "Project No,Client,Status,Type,Description,Contracted Amount,Award Date\n\
             1928,Acme,Active,Design,Lobby remodel,\"$12,500.00\",2024-01-05\n\
             2044.5,Beta Corp,On Hold,Build,Warehouse,TBD,\n",
        );
        let records = load_registry(&path, None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].project_no, "1928.00");
        assert_eq!(records[0].contracted_amount, Some(12500.0));
        assert_eq!(records[1].project_no, "2044.50");
        // Malformed contracted amount is None, not zero
        assert_eq!(records[1].contracted_amount, None);
        assert_eq!(records[1].contracted_raw, "TBD");
    }

    #[test]
    fn test_load_registry_without_project_header_uses_first_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "registry.csv",
            "Job,Client\n1928,Acme\n",
        );
        let records = load_registry(&path, None).unwrap();
        assert_eq!(records[0].project_no, "1928.00");
        assert_eq!(records[0].client, "Acme");
    }

    #[test]
    fn test_load_registry_falls_back_to_local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-mounted").join("registry.csv");
        let local = write(dir.path(), "registry-local.csv", "Project No,Client\n1928,Acme\n");
        let records = load_registry(&missing, Some(local.as_path())).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].client, "Acme");
    }

    #[test]
    fn test_load_registry_both_paths_failing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.csv");
        let also_missing = dir.path().join("gone-too.csv");
        let err = load_registry(&missing, Some(also_missing.as_path())).unwrap_err();
        assert!(matches!(err, RecountError::SourceUnavailable { .. }), "got {err}");
    }

    #[test]
    fn test_load_invoices() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "invoices.csv",
            "Project No,Invoice Date,Amount,Invoice No,Payment Status,Payment Date\n\
             1928,2024-02-01,\"$4,000.00\",INV-101,Paid,2024-03-01\n\
             1928,2024-03-01,1500,INV-102,Open,\n",
        );
        let records = load_invoices(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].project_no, "1928.00");
        assert!((records[0].amount - 4000.0).abs() < 1e-9);
        assert_eq!(records[1].payment_date, None);
        assert_eq!(records[1].invoice_no, "INV-102");
    }

    #[test]
    fn test_file_checksum_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "data.csv", "a,b,c\n");
        let c1 = file_checksum(&path).unwrap();
        let c2 = file_checksum(&path).unwrap();
        assert_eq!(c1, c2);
        assert_eq!(c1.len(), 64);
    }
}
