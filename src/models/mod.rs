//! Data structures: players, group rules, match records, session state.

mod game;
mod group;
mod player;
mod session;

pub use game::{MatchHistory, RatingLogEntry, Side, Streak, MATCH_TIME_FORMAT};
pub use group::{GroupConfig, DEFAULT_GROUP, DEFAULT_TEAM_SIZE, DEFAULT_VICTORY_LIMIT};
pub use player::{join_names, rating_average, rating_sum, Gender, Player, PlayerId, DEFAULT_RATING};
pub use session::{Session, SessionError, SessionPhase};
