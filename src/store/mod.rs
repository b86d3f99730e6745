//! Persistence seam: the operations the core needs from durable storage.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::models::{GroupConfig, MatchHistory, Player, PlayerId, RatingLogEntry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything a finished match writes. Committed all-or-nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchRecord {
    /// Winners and losers with their post-match ratings and counters.
    pub players: Vec<Player>,
    pub log_entries: Vec<RatingLogEntry>,
    pub history: MatchHistory,
}

pub trait Store {
    /// All players, highest rating first.
    fn players(&self) -> StoreResult<Vec<Player>>;
    fn players_in_group(&self, group: &str) -> StoreResult<Vec<Player>>;
    fn player(&self, id: PlayerId) -> StoreResult<Option<Player>>;
    /// Insert or replace.
    fn insert_player(&mut self, player: &Player) -> StoreResult<()>;
    /// Insert each player whose id is not stored yet. Returns how many were inserted.
    fn insert_players_if_absent(&mut self, players: &[Player]) -> StoreResult<usize>;
    fn update_player(&mut self, player: &Player) -> StoreResult<()>;
    fn update_players(&mut self, players: &[Player]) -> StoreResult<()>;
    fn delete_player(&mut self, id: PlayerId) -> StoreResult<()>;

    /// Match history of a group, newest first.
    fn history(&self, group: &str) -> StoreResult<Vec<MatchHistory>>;
    /// Append a match; returns its id.
    fn insert_match(&mut self, record: &MatchHistory) -> StoreResult<i64>;
    /// Insert rows whose id is unset or not stored yet. Returns how many were inserted.
    fn insert_history_if_absent(&mut self, records: &[MatchHistory]) -> StoreResult<usize>;

    /// Append a rating log row; returns its id.
    fn insert_rating_log(&mut self, entry: &RatingLogEntry) -> StoreResult<i64>;
    /// Insert rows not stored yet (by id, or by content for rows without one).
    fn insert_rating_logs_if_absent(&mut self, entries: &[RatingLogEntry]) -> StoreResult<usize>;
    /// Rating log of a group, oldest first.
    fn rating_logs(&self, group: &str) -> StoreResult<Vec<RatingLogEntry>>;

    fn group_config(&self, group: &str) -> StoreResult<Option<GroupConfig>>;
    fn save_group_config(&mut self, config: &GroupConfig) -> StoreResult<()>;
    /// Rename across players, history, configs and rating log.
    fn rename_group(&mut self, old: &str, new: &str) -> StoreResult<()>;
    /// Delete across players, history, configs and rating log.
    fn delete_group(&mut self, group: &str) -> StoreResult<()>;
    /// Every group name referenced by a config or a player, sorted.
    fn group_names(&self) -> StoreResult<Vec<String>>;

    /// Apply player updates, log rows and the history row in one transaction.
    fn commit_match(&mut self, record: &MatchRecord) -> StoreResult<()>;
}
