//! Volleyball pickup-session manager: library with models, business logic and storage.

pub mod error;
pub mod logic;
pub mod manager;
pub mod models;
pub mod settings;
pub mod store;
pub mod transfer;

pub use error::{AppError, AppResult};
pub use logic::{BalanceStrategy, RankTier, RankingEntry, RatingSeries, Teams};
pub use manager::{SessionSnapshot, VolleyManager};
pub use models::{
    Gender, GroupConfig, MatchHistory, Player, PlayerId, RatingLogEntry, Session, SessionError,
    SessionPhase, Side, Streak, DEFAULT_GROUP,
};
pub use settings::Settings;
pub use store::{MatchRecord, SqliteStore, Store, StoreError};
pub use transfer::{BackupBundle, CsvKind, TransferError};
