use crate::db::{get_connection, get_metadata};
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("recount.db");

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!(
        "Split month: {}",
        if settings.split_month.is_empty() { "(none)" } else { settings.split_month.as_str() }
    );

    if db_path.exists() {
        let conn = get_connection(&db_path)?;

        let refresh = get_metadata(&conn, "last_refresh");
        println!("Last refresh: {}", refresh.as_deref().unwrap_or("(never)"));

        let projects: i64 = conn
            .query_row(
                "SELECT count(*) FROM project_summary WHERE project_no != 'TOTAL'",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0);
        let unregistered: i64 = conn
            .query_row(
                "SELECT count(*) FROM project_summary WHERE matched_registry = 0 AND project_no != 'TOTAL'",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0);

        println!();
        println!("Projects:      {projects}");
        println!("Unregistered:  {unregistered}");
        if let Some(n) = get_metadata(&conn, "unmatched_employees") {
            println!("Unmatched timesheet rows: {n}");
        }
        if let Some(n) = get_metadata(&conn, "missing_rate_entries") {
            println!("Entries missing a rate:   {n}");
        }
    } else {
        println!();
        println!("Database not found. Run `recount init` to set up.");
    }

    Ok(())
}
