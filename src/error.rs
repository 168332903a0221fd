use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Anything that reaches this type aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("contact store not found at {0:?}")]
    StoreNotFound(PathBuf),

    #[error("contact store {path:?} is unusable: {reason}")]
    SchemaMissing { path: PathBuf, reason: String },

    #[error("contact store {0:?} must be an .xlsx workbook or a .csv file")]
    UnsupportedFormat(PathBuf),

    #[error("row {0} is outside the contact store")]
    RowOutOfRange(usize),

    #[error("spreadsheet read error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    #[error("spreadsheet write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("readiness gate error: {0}")]
    Gate(String),
}

pub type Result<T> = std::result::Result<T, Error>;
