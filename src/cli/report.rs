use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::{hours, money, money_opt, percent, ratio};
use crate::models::ProjectSummary;
use crate::reports;
use crate::settings::db_path;

fn summary_cells(row: &ProjectSummary) -> Vec<String> {
    vec![
        row.project_no.clone(),
        row.client.clone(),
        row.status.clone(),
        hours(row.hours),
        money(row.cost),
        money(row.invoiced),
        money_opt(row.contracted_amount),
        ratio(row.er_contract),
        ratio(row.er_invoiced),
        percent(row.invoiced_percent),
        ratio(row.er_primary),
    ]
}

pub fn summary() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let report = reports::get_summary(&conn)?;

    let mut table = Table::new();
    table.set_header(vec![
        "Project", "Client", "Status", "Hours", "Cost", "Invoiced", "Contract", "ER Contr",
        "ER Inv", "Inv %", "ER T1",
    ]);
    for row in &report.rows {
        if row.is_total_row() {
            table.add_row(
                summary_cells(row)
                    .into_iter()
                    .map(|c| Cell::new(c.bold()))
                    .collect::<Vec<_>>(),
            );
        } else {
            let mut cells = summary_cells(row);
            if !row.matched_registry {
                cells[2] = "(unregistered)".to_string();
            }
            table.add_row(cells);
        }
    }
    println!("Project Financial Summary\n{table}");
    if let Some(ts) = &report.last_refresh {
        println!("Last data refresh: {ts}");
    }
    Ok(())
}

pub fn clients() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let rollup = reports::get_client_rollup(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Client", "Projects", "Hours", "Cost", "Invoiced", "Contract", "ER Inv"]);
    for item in &rollup {
        table.add_row(vec![
            Cell::new(if item.client.is_empty() { "(no client)" } else { item.client.as_str() }),
            Cell::new(item.projects),
            Cell::new(hours(item.hours)),
            Cell::new(money(item.cost)),
            Cell::new(money(item.invoiced)),
            Cell::new(money_opt(item.contracted)),
            Cell::new(ratio(item.er_invoiced)),
        ]);
    }
    println!("Client Rollup\n{table}");
    Ok(())
}
