use colored::Colorize;

use crate::error::{RecountError, Result};
use crate::settings::{load_settings, save_settings};

pub fn set(source: &str, path: &str, fallback: Option<&str>) -> Result<()> {
    if fallback.is_some() && source != "registry" {
        return Err(RecountError::Other(
            "--fallback only applies to the registry source".to_string(),
        ));
    }
    let mut settings = load_settings();
    match source {
        "timesheet" => settings.sources.timesheet = path.to_string(),
        "rates" => settings.sources.rates = path.to_string(),
        "registry" => {
            settings.sources.registry = path.to_string();
            if let Some(fb) = fallback {
                settings.sources.registry_fallback = fb.to_string();
            }
        }
        "invoices" => settings.sources.invoices = path.to_string(),
        other => return Err(RecountError::UnknownSource(other.to_string())),
    }
    save_settings(&settings)?;
    println!("{} {source}: {path}", "✓".green());
    Ok(())
}

fn show(name: &str, value: &str) {
    if value.is_empty() {
        println!("{name:<10} {}", "(not set)".yellow());
    } else {
        println!("{name:<10} {value}");
    }
}

pub fn list() -> Result<()> {
    let settings = load_settings();
    show("timesheet", &settings.sources.timesheet);
    show("rates", &settings.sources.rates);
    show("registry", &settings.sources.registry);
    if !settings.sources.registry_fallback.is_empty() {
        show("  fallback", &settings.sources.registry_fallback);
    }
    show("invoices", &settings.sources.invoices);
    Ok(())
}
