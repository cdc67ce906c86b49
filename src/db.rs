use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::ProjectSummary;

/// Column list shared by the live summary table and its staging twin, so a
/// refresh can build the replacement off to the side and swap it in.
const SUMMARY_COLUMNS: &str = "
    project_no TEXT PRIMARY KEY,
    client TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    project_type TEXT NOT NULL DEFAULT '',
    service_line TEXT NOT NULL DEFAULT '',
    market TEXT NOT NULL DEFAULT '',
    manager TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    hours REAL NOT NULL DEFAULT 0,
    hours_type1 REAL NOT NULL DEFAULT 0,
    hours_type2 REAL NOT NULL DEFAULT 0,
    cost REAL NOT NULL DEFAULT 0,
    cost_type1 REAL NOT NULL DEFAULT 0,
    cost_type2 REAL NOT NULL DEFAULT 0,
    invoiced REAL NOT NULL DEFAULT 0,
    contracted REAL,
    er_contract REAL,
    er_invoiced REAL,
    invoiced_percent REAL,
    er_primary REAL,
    matched_registry INTEGER NOT NULL DEFAULT 0,
    matched_cost INTEGER NOT NULL DEFAULT 0,
    matched_invoice INTEGER NOT NULL DEFAULT 0";

pub fn schema() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS project_summary ({SUMMARY_COLUMNS});
         CREATE TABLE IF NOT EXISTS metadata (
             key TEXT PRIMARY KEY,
             value TEXT
         );"
    )
}

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(&schema())?;
    Ok(())
}

pub fn get_metadata(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .ok()
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

fn insert_summary_row(conn: &Connection, table: &str, row: &ProjectSummary) -> Result<()> {
    let sql = format!(
        "INSERT INTO {table} (project_no, client, status, project_type, service_line, market, \
         manager, description, hours, hours_type1, hours_type2, cost, cost_type1, cost_type2, \
         invoiced, contracted, er_contract, er_invoiced, invoiced_percent, er_primary, \
         matched_registry, matched_cost, matched_invoice) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
         ?18, ?19, ?20, ?21, ?22, ?23)"
    );
    conn.execute(
        &sql,
        rusqlite::params![
            row.project_no,
            row.client,
            row.status,
            row.project_type,
            row.service_line,
            row.market,
            row.manager,
            row.description,
            row.hours,
            row.hours_type1,
            row.hours_type2,
            row.cost,
            row.cost_type1,
            row.cost_type2,
            row.invoiced,
            row.contracted_amount,
            row.er_contract,
            row.er_invoiced,
            row.invoiced_percent,
            row.er_primary,
            row.matched_registry as i64,
            row.matched_cost as i64,
            row.matched_invoice as i64,
        ],
    )?;
    Ok(())
}

/// Replace the persisted summary atomically: build the new row-set in a
/// staging table and swap it for the live one inside a single transaction.
/// A run that fails partway leaves the previous summary untouched.
pub fn replace_summary(
    conn: &mut Connection,
    rows: &[ProjectSummary],
    refreshed_at: &str,
) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS project_summary_staging;
         CREATE TABLE project_summary_staging ({SUMMARY_COLUMNS});"
    ))?;
    for row in rows {
        insert_summary_row(&tx, "project_summary_staging", row)?;
    }
    tx.execute_batch(
        "DROP TABLE IF EXISTS project_summary;
         ALTER TABLE project_summary_staging RENAME TO project_summary;",
    )?;
    tx.execute(
        "INSERT INTO metadata (key, value) VALUES ('last_refresh', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [refreshed_at],
    )?;
    tx.commit()?;
    Ok(())
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectSummary> {
    Ok(ProjectSummary {
        project_no: row.get(0)?,
        client: row.get(1)?,
        status: row.get(2)?,
        project_type: row.get(3)?,
        service_line: row.get(4)?,
        market: row.get(5)?,
        manager: row.get(6)?,
        description: row.get(7)?,
        hours: row.get(8)?,
        hours_type1: row.get(9)?,
        hours_type2: row.get(10)?,
        cost: row.get(11)?,
        cost_type1: row.get(12)?,
        cost_type2: row.get(13)?,
        invoiced: row.get(14)?,
        contracted_amount: row.get(15)?,
        er_contract: row.get(16)?,
        er_invoiced: row.get(17)?,
        invoiced_percent: row.get(18)?,
        er_primary: row.get(19)?,
        matched_registry: row.get::<_, i64>(20)? != 0,
        matched_cost: row.get::<_, i64>(21)? != 0,
        matched_invoice: row.get::<_, i64>(22)? != 0,
    })
}

/// Load the persisted summary, data rows first and the TOTAL row last.
pub fn load_summary(conn: &Connection) -> Result<Vec<ProjectSummary>> {
    let mut stmt = conn.prepare(
        "SELECT project_no, client, status, project_type, service_line, market, manager, \
         description, hours, hours_type1, hours_type2, cost, cost_type1, cost_type2, invoiced, \
         contracted, er_contract, er_invoiced, invoiced_percent, er_primary, matched_registry, \
         matched_cost, matched_invoice \
         FROM project_summary \
         ORDER BY (project_no = 'TOTAL'), project_no",
    )?;
    let rows = stmt.query_map([], |row| row_to_summary(row))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn sample_row(project_no: &str) -> ProjectSummary {
        ProjectSummary {
            project_no: project_no.to_string(),
            client: "Acme".to_string(),
            hours: 12.5,
            cost: 1050.0,
            invoiced: 900.0,
            contracted_amount: Some(1884.0),
            er_contract: Some(1.794),
            matched_registry: true,
            matched_cost: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["project_summary", "metadata"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_metadata_round_trip() {
        let (_dir, conn) = test_db();
        assert_eq!(get_metadata(&conn, "last_refresh"), None);
        set_metadata(&conn, "last_refresh", "2025-01-10 08:00:00").unwrap();
        set_metadata(&conn, "last_refresh", "2025-01-11 08:00:00").unwrap();
        assert_eq!(
            get_metadata(&conn, "last_refresh").as_deref(),
            Some("2025-01-11 08:00:00")
        );
    }

    #[test]
    fn test_replace_summary_round_trips_without_precision_loss() {
        let (_dir, mut conn) = test_db();
        let rows = vec![sample_row("1001.00"), sample_row("1002.00")];
        replace_summary(&mut conn, &rows, "2025-01-10 08:00:00").unwrap();
        let loaded = load_summary(&conn).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].project_no, "1001.00");
        assert_eq!(loaded[0].contracted_amount, Some(1884.0));
        assert_eq!(loaded[0].cost, 1050.0);
        assert_eq!(loaded[0].er_contract, Some(1.794));
        assert!(loaded[0].matched_registry);
        assert!(!loaded[0].matched_invoice);
        assert_eq!(get_metadata(&conn, "last_refresh").as_deref(), Some("2025-01-10 08:00:00"));
    }

    #[test]
    fn test_replace_summary_swaps_wholesale() {
        let (_dir, mut conn) = test_db();
        replace_summary(&mut conn, &[sample_row("1001.00")], "t1").unwrap();
        replace_summary(&mut conn, &[sample_row("2001.00"), sample_row("2002.00")], "t2").unwrap();
        let loaded = load_summary(&conn).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|r| r.project_no.starts_with("200")));
    }

    #[test]
    fn test_null_metrics_stay_null_in_storage() {
        let (_dir, mut conn) = test_db();
        let mut row = sample_row("1001.00");
        row.contracted_amount = None;
        row.er_contract = None;
        replace_summary(&mut conn, &[row], "t1").unwrap();
        let loaded = load_summary(&conn).unwrap();
        assert_eq!(loaded[0].contracted_amount, None);
        assert_eq!(loaded[0].er_contract, None);
    }

    #[test]
    fn test_total_row_sorts_last() {
        let (_dir, mut conn) = test_db();
        let rows = vec![
            sample_row("TOTAL"),
            sample_row("1001.00"),
            sample_row("0500.00"),
        ];
        replace_summary(&mut conn, &rows, "t1").unwrap();
        let loaded = load_summary(&conn).unwrap();
        assert_eq!(loaded.last().unwrap().project_no, "TOTAL");
    }
}
