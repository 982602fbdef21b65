//! Check-in Import
//!
//! Bulk-loading historical check-ins from exported files:
//! - CSV (header-mapped columns)

mod csv_import;

pub use csv_import::{CheckinCsvImporter, CheckinImportResult};

/// Errors that abort an import as a whole
///
/// Row-level problems are collected in the import result instead.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),
}
