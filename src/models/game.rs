//! Side, Streak and the immutable match/rating records.

use crate::models::player::PlayerId;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display format of a match timestamp (`dd/mm/yyyy HH:MM`).
pub const MATCH_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// One side of the court.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Side {
    #[default]
    A,
    B,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Label stored in match history ("Team A" / "Team B").
    pub fn label(self) -> &'static str {
        match self {
            Side::A => "Team A",
            Side::B => "Team B",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Consecutive wins by the same side.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub count: u32,
    pub owner: Option<Side>,
}

impl Streak {
    /// Record a win: same owner extends the streak, a new owner starts at 1.
    pub fn record_win(&mut self, side: Side) {
        if self.owner == Some(side) {
            self.count += 1;
        } else {
            self.owner = Some(side);
            self.count = 1;
        }
    }

    pub fn reset(&mut self) {
        *self = Streak::default();
    }
}

/// A finished match. Never updated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchHistory {
    /// Assigned by the store; `None` until persisted.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(with = "match_time")]
    pub played_at: NaiveDateTime,
    pub team_a: String,
    pub team_b: String,
    pub winner: String,
    pub rating_delta: f64,
    pub group: String,
}

impl MatchHistory {
    pub fn display_time(&self) -> String {
        self.played_at.format(MATCH_TIME_FORMAT).to_string()
    }
}

/// One player's rating after one match. Survives player deletion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingLogEntry {
    /// Assigned by the store; `None` until persisted.
    #[serde(default)]
    pub id: Option<i64>,
    pub player_id: PlayerId,
    /// Name at the time of the match.
    pub name: String,
    pub date: NaiveDate,
    pub rating: f64,
    pub group: String,
}

/// Serde adapter keeping history timestamps in their display format.
mod match_time {
    use super::MATCH_TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(MATCH_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, MATCH_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_extends_for_same_side_and_restarts_on_change() {
        let mut s = Streak::default();
        s.record_win(Side::A);
        s.record_win(Side::A);
        assert_eq!(s, Streak { count: 2, owner: Some(Side::A) });
        s.record_win(Side::B);
        assert_eq!(s, Streak { count: 1, owner: Some(Side::B) });
    }

    #[test]
    fn history_time_serializes_in_display_format() {
        let played_at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(18, 5, 0)
            .unwrap();
        let h = MatchHistory {
            id: None,
            played_at,
            team_a: "Ana, Bia".into(),
            team_b: "Caio, Davi".into(),
            winner: Side::A.label().into(),
            rating_delta: 16.0,
            group: "General".into(),
        };
        let json = serde_json::to_value(&h).unwrap();
        assert_eq!(json["played_at"], "09/03/2024 18:05");
        let back: MatchHistory = serde_json::from_value(json).unwrap();
        assert_eq!(back.played_at, played_at);
    }
}
