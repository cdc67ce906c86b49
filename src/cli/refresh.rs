use colored::Colorize;

use crate::aggregate::DateWindow;
use crate::cli::parse_date_opt;
use crate::db::{get_connection, init_db, replace_summary, set_metadata};
use crate::error::Result;
use crate::pipeline::PipelineRun;
use crate::settings::{db_path, load_settings};

pub fn run(from: Option<String>, to: Option<String>) -> Result<()> {
    let settings = load_settings();
    let window = DateWindow {
        from: parse_date_opt(&from)?,
        to: parse_date_opt(&to)?,
    };

    let run = PipelineRun::load(&settings)?;
    println!(
        "Loaded {} timesheet entries, {} rate rows, {} registry rows, {} invoices",
        run.timesheet.len(),
        run.rates.len(),
        run.registry.len(),
        run.invoices.len()
    );
    let checksums = run.checksums.clone();
    let out = run.execute(window);

    let mut conn = get_connection(&db_path())?;
    init_db(&conn)?;
    replace_summary(&mut conn, &out.summaries, &out.refreshed_at)?;
    for (name, sum) in &checksums {
        set_metadata(&conn, &format!("checksum_{name}"), sum)?;
    }
    set_metadata(&conn, "unmatched_employees", &out.costing.unmatched_employees.to_string())?;
    set_metadata(&conn, "missing_rate_entries", &out.costing.missing_rate.to_string())?;

    let projects = out.summaries.len().saturating_sub(1); // minus TOTAL row
    println!(
        "{} Summary rebuilt: {} projects, {} duplicate registry rows merged",
        "✓".green(),
        projects,
        out.merged_duplicates
    );
    println!(
        "  Entries costed: {}  missing rate column: {}",
        out.costing.costed, out.costing.missing_rate
    );
    if out.costing.unmatched_employees > 0 {
        println!(
            "{} {} timesheet entries matched no rate row (costed at zero)",
            "!".yellow(),
            out.costing.unmatched_employees
        );
    }
    if out.orphan_projects > 0 {
        println!(
            "{} {} project numbers with activity but no registry entry",
            "!".yellow(),
            out.orphan_projects
        );
    }
    if !window.is_open() {
        let edge = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.to_string()).unwrap_or_else(|| "open".to_string())
        };
        println!("  Invoice window: {} .. {}", edge(window.from), edge(window.to));
    }
    println!("  Refreshed at {}", out.refreshed_at);
    Ok(())
}
