//! Crate-level error: everything a controller operation can report.

use crate::models::SessionError;
use crate::store::StoreError;
use crate::transfer::TransferError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Precondition not met; nothing changed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Persistence failed; in-memory state was left as it was.
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

pub type AppResult<T> = Result<T, AppError>;
