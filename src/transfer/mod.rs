//! CSV import/export and the JSON backup bundle.

mod backup;
mod csv_rows;

pub use backup::{BackupBundle, BACKUP_VERSION};
pub use csv_rows::{
    history_from_csv, history_to_csv, players_from_csv, players_to_csv, rating_logs_from_csv,
    rating_logs_to_csv,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("unsupported backup version {0}")]
    UnsupportedVersion(u32),
}

/// Which entity a CSV file carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvKind {
    Players,
    History,
    RatingLog,
}
