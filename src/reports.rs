//! Read-side queries against the persisted summary, for the report and
//! export commands. Rollups re-aggregate the stored numeric values, never
//! the formatted strings.

use rusqlite::Connection;

use crate::error::Result;
use crate::metrics;
use crate::models::ProjectSummary;

pub struct SummaryReport {
    pub rows: Vec<ProjectSummary>,
    pub last_refresh: Option<String>,
}

pub fn get_summary(conn: &Connection) -> Result<SummaryReport> {
    Ok(SummaryReport {
        rows: crate::db::load_summary(conn)?,
        last_refresh: crate::db::get_metadata(conn, "last_refresh"),
    })
}

pub struct ClientRollup {
    pub client: String,
    pub projects: i64,
    pub hours: f64,
    pub cost: f64,
    pub invoiced: f64,
    pub contracted: Option<f64>,
    pub er_invoiced: Option<f64>,
}

/// Client-level totals across projects, excluding the TOTAL sentinel row.
/// The ER is recomputed from the summed components.
pub fn get_client_rollup(conn: &Connection) -> Result<Vec<ClientRollup>> {
    let mut stmt = conn.prepare(
        "SELECT client, count(*), SUM(hours), SUM(cost), SUM(invoiced), SUM(contracted), \
         count(contracted) \
         FROM project_summary \
         WHERE project_no != 'TOTAL' \
         GROUP BY client ORDER BY SUM(cost) DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        let cost: f64 = row.get(3)?;
        let invoiced: f64 = row.get(4)?;
        let contracted_present: i64 = row.get(6)?;
        let contracted: Option<f64> = if contracted_present > 0 { row.get(5)? } else { None };
        Ok(ClientRollup {
            client: row.get(0)?,
            projects: row.get(1)?,
            hours: row.get(2)?,
            cost,
            invoiced,
            contracted,
            er_invoiced: metrics::er_invoiced(invoiced, cost),
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
