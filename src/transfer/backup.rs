//! Full JSON backup of one group.

use super::TransferError;
use crate::models::{MatchHistory, Player, RatingLogEntry, MATCH_TIME_FORMAT};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Format version written into every bundle.
pub const BACKUP_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackupBundle {
    pub version: u32,
    /// When the bundle was made, `dd/mm/yyyy HH:MM`.
    pub date: String,
    pub players: Vec<Player>,
    pub history: Vec<MatchHistory>,
    pub logs: Vec<RatingLogEntry>,
}

impl BackupBundle {
    pub fn new(
        created_at: NaiveDateTime,
        players: Vec<Player>,
        history: Vec<MatchHistory>,
        logs: Vec<RatingLogEntry>,
    ) -> Self {
        Self {
            version: BACKUP_VERSION,
            date: created_at.format(MATCH_TIME_FORMAT).to_string(),
            players,
            history,
            logs,
        }
    }

    pub fn to_json(&self) -> Result<String, TransferError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, TransferError> {
        let bundle: BackupBundle = serde_json::from_str(data)?;
        if bundle.version > BACKUP_VERSION {
            return Err(TransferError::UnsupportedVersion(bundle.version));
        }
        Ok(bundle)
    }
}
