use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecountError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Source '{name}' unreachable: {detail}")]
    SourceUnavailable { name: String, detail: String },

    #[error("Source '{0}' is missing required column '{1}'")]
    MissingColumn(String, String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RecountError>;
