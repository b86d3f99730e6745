//! Integration tests for leaderboards, history and rating series across days.

use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use volley_manager::{PlayerId, RankTier, Side, SqliteStore, VolleyManager};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

fn at(d: u32, hour: u32) -> NaiveDateTime {
    day(d).and_hms_opt(hour, 0, 0).unwrap()
}

/// Four players; P0+P1 beat P2+P3 on day 3 and again on day 10.
fn two_days_played() -> (VolleyManager<SqliteStore>, Vec<PlayerId>) {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut m = VolleyManager::with_rng(store, "Beach", StdRng::seed_from_u64(1)).unwrap();
    let ids: Vec<PlayerId> = (0..4)
        .map(|i| m.add_player(&format!("P{i}"), None, None, false).unwrap().id)
        .collect();
    for d in [3, 10] {
        m.start_manual_match(&ids[..2], &ids[2..], &[]).unwrap();
        m.finish_match_at(Side::A, at(d, 20)).unwrap();
    }
    (m, ids)
}

#[test]
fn dated_ranking_is_the_end_of_that_day() {
    let (m, ids) = two_days_played();

    let first_day = m.ranking_for_date(Some(day(3))).unwrap();
    assert_eq!(first_day.len(), 4);
    assert_eq!(first_day[0].rating, 1216.0);
    assert_eq!(first_day[3].rating, 1184.0);
    assert_eq!(first_day[0].tier, RankTier::Advanced);
    assert_eq!(first_day[3].tier, RankTier::Intermediate);

    let live = m.ranking_for_date(None).unwrap();
    let leader = live.iter().find(|e| e.player_id == ids[0]).unwrap();
    assert!(leader.rating > 1216.0);
    assert!(m.ranking_for_date(Some(day(4))).unwrap().is_empty());
}

#[test]
fn dates_are_listed_newest_first() {
    let (m, _) = two_days_played();
    assert_eq!(m.ranking_dates().unwrap(), vec![day(10), day(3)]);
    assert_eq!(m.history_dates().unwrap(), vec![day(10), day(3)]);
    assert_eq!(m.history_for_date(None).unwrap().len(), 2);

    let newest = &m.history_for_date(Some(day(10))).unwrap()[0];
    assert_eq!(newest.team_a, "P0, P1");
    assert_eq!(newest.winner, "Team A");
}

#[test]
fn rating_series_respects_the_range() {
    let (m, ids) = two_days_played();
    let all = m.rating_series(&ids[..1], None, None).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].points.len(), 2);
    assert_eq!(all[0].points[0], (day(3), 1216.0));

    let late = m.rating_series(&[], Some(day(5)), None).unwrap();
    assert_eq!(late.len(), 4);
    assert!(late.iter().all(|s| s.points.len() == 1 && s.points[0].0 == day(10)));
}

#[test]
fn renamed_player_keeps_old_name_in_past_rankings() {
    let (mut m, ids) = two_days_played();
    m.rename_player(ids[0], "Ana").unwrap();
    let past = m.ranking_for_date(Some(day(3))).unwrap();
    assert!(past.iter().any(|e| e.name == "P0"));
    let live = m.ranking_for_date(None).unwrap();
    assert!(live.iter().any(|e| e.name == "Ana"));
}
