use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, Settings};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = if settings_file_exists() {
        load_settings()
    } else {
        Settings::default()
    };
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    std::fs::create_dir_all(&settings.data_dir)?;

    let db_path = std::path::Path::new(&settings.data_dir).join("recount.db");
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    save_settings(&settings)?;

    println!("{} Initialized database at {}", "✓".green(), db_path.display());
    println!("Next: configure sources with `recount sources set <name> <path>`.");
    Ok(())
}
