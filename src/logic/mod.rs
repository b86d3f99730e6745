//! Core logic: rating, team balancing, session transitions, ranking queries.

pub mod balancer;
pub mod ranking;
pub mod rating;
pub mod session;

pub use balancer::{form_teams, BalanceStrategy, Teams};
pub use ranking::{RankingEntry, RatingSeries};
pub use rating::{compute_delta, rank_tier, RankTier, K_FACTOR};
pub use session::{
    apply_finish, cancel_match, prepare_finish, propose_role_teams, set_all_present,
    start_automatic_match, start_manual_match, start_next_round, substitute, toggle_presence,
};
