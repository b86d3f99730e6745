//! Session state: presence, teams, waiting queue and streak.

use crate::models::game::{Side, Streak};
use crate::models::player::{Player, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Reasons an intent is refused. State is left untouched whenever one is returned.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SessionError {
    #[error("Need at least {required} present players (have {present})")]
    NotEnoughPlayers { required: usize, present: usize },
    #[error("Both teams must have players")]
    EmptyTeam,
    #[error("A match is already in progress")]
    MatchInProgress,
    #[error("No finished match is waiting for a next round")]
    NoFinishedMatch,
    #[error("Not enough available players to fill both teams")]
    CannotFillTeams,
    #[error("Player is not on either team")]
    PlayerNotOnTeam(PlayerId),
    #[error("Player cannot be substituted in")]
    InvalidSubstitution(PlayerId),
    #[error("Player not found")]
    PlayerNotFound(PlayerId),
    #[error("Team size and victory limit must be at least 1")]
    InvalidConfig,
    #[error("Group name must not be empty")]
    InvalidGroupName,
    #[error("Player name must not be empty")]
    InvalidPlayerName,
}

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No match on court and no finished match pending.
    #[default]
    Idle,
    /// Both teams populated.
    Active,
    /// A match just finished; waiting for the next round to be triggered.
    AwaitingNextRound,
}

/// Full in-memory session state for the active group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub team_a: Vec<Player>,
    pub team_b: Vec<Player>,
    /// Present players not on court, in queue order.
    pub waiting: Vec<Player>,
    pub present: BTreeSet<PlayerId>,
    pub streak: Streak,
    pub awaiting_next_round: bool,
    /// Rosters of the last finished match, with post-match ratings.
    pub last_winners: Vec<Player>,
    pub last_losers: Vec<Player>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.awaiting_next_round {
            SessionPhase::AwaitingNextRound
        } else if !self.team_a.is_empty() && !self.team_b.is_empty() {
            SessionPhase::Active
        } else {
            SessionPhase::Idle
        }
    }

    pub fn team(&self, side: Side) -> &[Player] {
        match side {
            Side::A => &self.team_a,
            Side::B => &self.team_b,
        }
    }

    pub fn is_present(&self, id: PlayerId) -> bool {
        self.present.contains(&id)
    }

    /// Side the player is on, if any.
    pub fn side_of(&self, id: PlayerId) -> Option<Side> {
        if self.team_a.iter().any(|p| p.id == id) {
            Some(Side::A)
        } else if self.team_b.iter().any(|p| p.id == id) {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn is_waiting(&self, id: PlayerId) -> bool {
        self.waiting.iter().any(|p| p.id == id)
    }

    /// A winner parked between rounds re-enters through the next-round flow.
    pub fn is_parked_winner(&self, id: PlayerId) -> bool {
        self.awaiting_next_round && self.last_winners.iter().any(|p| p.id == id)
    }

    /// Drop teams, queue, streak and pending round. Presence is kept.
    pub fn clear_match(&mut self) {
        self.team_a.clear();
        self.team_b.clear();
        self.waiting.clear();
        self.streak.reset();
        self.awaiting_next_round = false;
    }

    /// Drop a player from presence, both teams, the queue and the parked rosters.
    pub fn forget_player(&mut self, id: PlayerId) {
        self.present.remove(&id);
        for list in [
            &mut self.team_a,
            &mut self.team_b,
            &mut self.waiting,
            &mut self.last_winners,
            &mut self.last_losers,
        ] {
            list.retain(|p| p.id != id);
        }
    }

    /// Back to a fresh session (used when switching groups).
    pub fn reset(&mut self) {
        *self = Session::default();
    }

    /// Replace the snapshot of a player wherever the session holds one.
    pub fn refresh_player(&mut self, updated: &Player) {
        for list in [
            &mut self.team_a,
            &mut self.team_b,
            &mut self.waiting,
            &mut self.last_winners,
            &mut self.last_losers,
        ] {
            for p in list.iter_mut().filter(|p| p.id == updated.id) {
                *p = updated.clone();
            }
        }
    }
}
