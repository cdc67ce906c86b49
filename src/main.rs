mod aggregate;
mod cli;
mod costing;
mod db;
mod error;
mod fmt;
mod loader;
mod merge;
mod metrics;
mod models;
mod normalize;
mod pipeline;
mod reports;
mod settings;

use clap::Parser;

use cli::{Cli, Commands, ExportCommands, ReportCommands, SourcesCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Sources { command } => match command {
            SourcesCommands::Set {
                source,
                path,
                fallback,
            } => cli::sources::set(&source, &path, fallback.as_deref()),
            SourcesCommands::List => cli::sources::list(),
        },
        Commands::Refresh { from, to } => cli::refresh::run(from, to),
        Commands::Report { command } => match command {
            ReportCommands::Summary => cli::report::summary(),
            ReportCommands::Clients => cli::report::clients(),
        },
        Commands::Export { command } => match command {
            ExportCommands::Summary { output } => cli::export::summary(&output),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
