//! Player, Gender and rating defaults.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player (used in teams, logs and lookups).
pub type PlayerId = Uuid;

/// Rating every new player starts with.
pub const DEFAULT_RATING: f64 = 1200.0;

/// Gender tag, only consulted by gender-priority balancing.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "M")]
    Male,
}

impl Gender {
    /// Single-letter code used in the store and in CSV files.
    pub fn code(self) -> &'static str {
        match self {
            Gender::Female => "F",
            Gender::Male => "M",
        }
    }

    /// Parse a stored code. Anything unrecognised is treated as untagged.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "F" | "f" => Some(Gender::Female),
            "M" | "m" => Some(Gender::Male),
            _ => None,
        }
    }
}

/// A player registered in a group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub rating: f64,
    pub matches_played: u32,
    pub victories: u32,
    pub group: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Role tag used by the simple role-priority balancer.
    #[serde(default)]
    pub is_setter: bool,
}

impl Player {
    /// Create a new player in `group` with the default rating. Counters start at zero.
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            rating: DEFAULT_RATING,
            matches_played: 0,
            victories: 0,
            group: group.into(),
            gender: None,
            is_setter: false,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_setter(mut self, is_setter: bool) -> Self {
        self.is_setter = is_setter;
        self
    }

    pub fn is_female(&self) -> bool {
        self.gender == Some(Gender::Female)
    }

    /// Record a won match worth `delta` rating points.
    pub fn add_win(&mut self, delta: f64) {
        self.rating += delta;
        self.matches_played += 1;
        self.victories += 1;
    }

    /// Record a lost match costing `delta` rating points.
    pub fn add_loss(&mut self, delta: f64) {
        self.rating -= delta;
        self.matches_played += 1;
    }
}

/// Sum of ratings over a roster.
pub fn rating_sum(players: &[Player]) -> f64 {
    players.iter().map(|p| p.rating).sum()
}

/// Average rating over a roster; zero for an empty roster.
pub fn rating_average(players: &[Player]) -> f64 {
    if players.is_empty() {
        return 0.0;
    }
    rating_sum(players) / players.len() as f64
}

/// Comma-joined names, as stored in match history.
pub fn join_names(players: &[Player]) -> String {
    players
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
