use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error("Missing source table: {0} was not supplied or is empty")]
    MissingSourceTable(String),

    #[error("Statement imbalance: balance sheet debit ({balance_sheet_debit}) + profit/loss difference ({profit_loss_difference}) != balance sheet credit ({balance_sheet_credit}), off by {discrepancy}")]
    StatementImbalance {
        balance_sheet_debit: f64,
        balance_sheet_credit: f64,
        profit_loss_difference: f64,
        discrepancy: f64,
    },

    #[error("Invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Invalid tolerance {0}: must be finite and not negative")]
    InvalidTolerance(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid column reference: {0}")]
    InvalidColumn(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[cfg(feature = "gemini")]
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
}

pub type Result<T> = std::result::Result<T, ReconciliationError>;
