use colored::Colorize;

use crate::db::get_connection;
use crate::error::Result;
use crate::reports;
use crate::settings::db_path;

fn opt_num(val: Option<f64>) -> String {
    val.map(|v| v.to_string()).unwrap_or_default()
}

/// Flat CSV row-set with the exact numeric values (no currency formatting,
/// nulls as empty cells) so downstream consumers can keep doing arithmetic.
pub fn summary(output: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let report = reports::get_summary(&conn)?;

    let mut wtr = csv::Writer::from_path(output)?;
    wtr.write_record([
        "project_no", "client", "status", "project_type", "service_line", "market", "manager",
        "description", "hours", "hours_type1", "hours_type2", "cost", "cost_type1", "cost_type2",
        "invoiced", "contracted", "er_contract", "er_invoiced", "invoiced_percent", "er_primary",
        "matched_registry", "matched_cost", "matched_invoice",
    ])?;
    for row in &report.rows {
        wtr.write_record([
            row.project_no.clone(),
            row.client.clone(),
            row.status.clone(),
            row.project_type.clone(),
            row.service_line.clone(),
            row.market.clone(),
            row.manager.clone(),
            row.description.clone(),
            row.hours.to_string(),
            row.hours_type1.to_string(),
            row.hours_type2.to_string(),
            row.cost.to_string(),
            row.cost_type1.to_string(),
            row.cost_type2.to_string(),
            row.invoiced.to_string(),
            opt_num(row.contracted_amount),
            opt_num(row.er_contract),
            opt_num(row.er_invoiced),
            opt_num(row.invoiced_percent),
            opt_num(row.er_primary),
            (row.matched_registry as i64).to_string(),
            (row.matched_cost as i64).to_string(),
            (row.matched_invoice as i64).to_string(),
        ])?;
    }
    wtr.flush()?;
    println!("{} Wrote {} rows to {output}", "✓".green(), report.rows.len());
    Ok(())
}
