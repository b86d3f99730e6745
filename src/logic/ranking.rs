//! Read-only views over players, rating logs and match history.

use crate::logic::rating::{rank_tier, RankTier};
use crate::models::{MatchHistory, Player, PlayerId, RatingLogEntry};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One leaderboard row. Dated rankings come from log snapshots, not live players.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub rating: f64,
    pub tier: RankTier,
}

impl RankingEntry {
    fn new(player_id: PlayerId, name: String, rating: f64) -> Self {
        Self {
            player_id,
            name,
            rating,
            tier: rank_tier(rating),
        }
    }
}

/// Rating history of one player, one point per day (end-of-day rating).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingSeries {
    pub player_id: PlayerId,
    /// Most recent name snapshot.
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

fn sort_ranking(entries: &mut [RankingEntry]) {
    entries.sort_by(|a, b| b.rating.total_cmp(&a.rating));
}

/// Live leaderboard from current player rows.
pub fn live_ranking(players: &[Player]) -> Vec<RankingEntry> {
    let mut entries: Vec<_> = players
        .iter()
        .map(|p| RankingEntry::new(p.id, p.name.clone(), p.rating))
        .collect();
    sort_ranking(&mut entries);
    entries
}

/// Leaderboard as of `date`: each player's last log entry of that day.
///
/// `logs` must be in insertion order (oldest first), as the store returns them.
pub fn ranking_on(logs: &[RatingLogEntry], date: NaiveDate) -> Vec<RankingEntry> {
    let mut latest: HashMap<PlayerId, &RatingLogEntry> = HashMap::new();
    for entry in logs.iter().filter(|e| e.date == date) {
        latest.insert(entry.player_id, entry);
    }
    let mut entries: Vec<_> = latest
        .into_values()
        .map(|e| RankingEntry::new(e.player_id, e.name.clone(), e.rating))
        .collect();
    sort_ranking(&mut entries);
    entries
}

/// Days with at least one log entry, newest first.
pub fn ranking_dates(logs: &[RatingLogEntry]) -> Vec<NaiveDate> {
    let days: BTreeSet<NaiveDate> = logs.iter().map(|e| e.date).collect();
    days.into_iter().rev().collect()
}

/// Days with at least one finished match, newest first.
pub fn history_dates(history: &[MatchHistory]) -> Vec<NaiveDate> {
    let days: BTreeSet<NaiveDate> = history.iter().map(|h| h.played_at.date()).collect();
    days.into_iter().rev().collect()
}

/// Matches of one day (or all of them), newest first.
pub fn history_on(history: &[MatchHistory], date: Option<NaiveDate>) -> Vec<MatchHistory> {
    let mut rows: Vec<MatchHistory> = history
        .iter()
        .filter(|h| date.map_or(true, |d| h.played_at.date() == d))
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.played_at.cmp(&a.played_at).then(b.id.cmp(&a.id)));
    rows
}

/// Chart data: end-of-day ratings per player within `[from, to]`.
///
/// An empty `player_ids` selects every player found in the log.
pub fn rating_series(
    logs: &[RatingLogEntry],
    player_ids: &[PlayerId],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<RatingSeries> {
    let mut per_player: BTreeMap<PlayerId, (String, BTreeMap<NaiveDate, f64>)> = BTreeMap::new();
    for entry in logs {
        if !player_ids.is_empty() && !player_ids.contains(&entry.player_id) {
            continue;
        }
        if from.is_some_and(|f| entry.date < f) || to.is_some_and(|t| entry.date > t) {
            continue;
        }
        let (name, points) = per_player
            .entry(entry.player_id)
            .or_insert_with(|| (entry.name.clone(), BTreeMap::new()));
        name.clone_from(&entry.name);
        points.insert(entry.date, entry.rating);
    }

    per_player
        .into_iter()
        .map(|(player_id, (name, points))| RatingSeries {
            player_id,
            name,
            points: points.into_iter().collect(),
        })
        .collect()
}

/// Matches per player on `today`, or on the most recent logged day if nobody
/// played today.
pub fn games_on_latest_day(logs: &[RatingLogEntry], today: NaiveDate) -> HashMap<PlayerId, usize> {
    let target = if logs.iter().any(|e| e.date == today) {
        Some(today)
    } else {
        logs.iter().map(|e| e.date).max()
    };
    let mut counts = HashMap::new();
    if let Some(day) = target {
        for entry in logs.iter().filter(|e| e.date == day) {
            *counts.entry(entry.player_id).or_insert(0) += 1;
        }
    }
    counts
}

/// Players ordered for the presence list: most games on the latest day first,
/// then by rating.
pub fn presence_order(players: &[Player], logs: &[RatingLogEntry], today: NaiveDate) -> Vec<Player> {
    let games = games_on_latest_day(logs, today);
    let mut ordered = players.to_vec();
    ordered.sort_by(|a, b| {
        let ga = games.get(&a.id).copied().unwrap_or(0);
        let gb = games.get(&b.id).copied().unwrap_or(0);
        gb.cmp(&ga).then(b.rating.total_cmp(&a.rating))
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn log(player_id: PlayerId, name: &str, d: u32, rating: f64) -> RatingLogEntry {
        RatingLogEntry {
            id: None,
            player_id,
            name: name.to_string(),
            date: day(d),
            rating,
            group: "General".into(),
        }
    }

    #[test]
    fn dated_ranking_keeps_last_entry_of_the_day() {
        let ana = Uuid::new_v4();
        let bia = Uuid::new_v4();
        let logs = vec![
            log(ana, "Ana", 1, 1216.0),
            log(bia, "Bia", 1, 1184.0),
            log(ana, "Ana", 1, 1230.0),
            log(ana, "Ana", 2, 1250.0),
        ];
        let ranking = ranking_on(&logs, day(1));
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].name, "Ana");
        assert_eq!(ranking[0].rating, 1230.0);
        assert_eq!(ranking[1].tier, RankTier::Intermediate);
    }

    #[test]
    fn dates_are_distinct_and_newest_first() {
        let id = Uuid::new_v4();
        let logs = vec![log(id, "A", 3, 1.0), log(id, "A", 1, 1.0), log(id, "A", 3, 1.0)];
        assert_eq!(ranking_dates(&logs), vec![day(3), day(1)]);
    }

    #[test]
    fn series_uses_end_of_day_rating_and_latest_name() {
        let id = Uuid::new_v4();
        let logs = vec![
            log(id, "Old", 1, 1216.0),
            log(id, "Old", 1, 1232.0),
            log(id, "New", 4, 1200.0),
        ];
        let series = rating_series(&logs, &[], None, Some(day(3)));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "Old");
        assert_eq!(series[0].points, vec![(day(1), 1232.0)]);

        let all = rating_series(&logs, &[id], None, None);
        assert_eq!(all[0].name, "New");
        assert_eq!(all[0].points.len(), 2);
    }

    #[test]
    fn presence_order_falls_back_to_latest_logged_day() {
        let busy = Player::new("Busy", "General").with_rating(1100.0);
        let idle = Player::new("Idle", "General").with_rating(1300.0);
        let logs = vec![log(busy.id, "Busy", 2, 1100.0), log(busy.id, "Busy", 2, 1100.0)];
        let ordered = presence_order(&[idle.clone(), busy.clone()], &logs, day(9));
        assert_eq!(ordered[0].id, busy.id);
        assert_eq!(ordered[1].id, idle.id);
    }
}
