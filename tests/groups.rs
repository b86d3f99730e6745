//! Integration tests for group switching, renaming and deletion.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use volley_manager::{
    AppError, SessionError, SessionPhase, Side, SqliteStore, Store, VolleyManager, DEFAULT_GROUP,
};

fn manager(group: &str) -> VolleyManager<SqliteStore> {
    let store = SqliteStore::open_in_memory().unwrap();
    VolleyManager::with_rng(store, group, StdRng::seed_from_u64(5)).unwrap()
}

fn play_one_match(m: &mut VolleyManager<SqliteStore>) {
    m.update_config(2, 3, false).unwrap();
    for i in 0..4 {
        m.add_player(&format!("P{i}"), None, None, false).unwrap();
    }
    m.set_all_present(true).unwrap();
    m.start_automatic_match().unwrap();
    let at = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap().and_hms_opt(18, 0, 0).unwrap();
    m.finish_match_at(Side::B, at).unwrap();
}

#[test]
fn opening_a_group_creates_default_rules() {
    let m = manager("Monday");
    let config = m.config();
    assert_eq!(config.group, "Monday");
    assert_eq!(config.team_size, 6);
    assert_eq!(config.victory_limit, 3);
    assert!(config.gender_priority);
    assert_eq!(m.group_names().unwrap(), vec!["Monday".to_string()]);
}

#[test]
fn switching_groups_resets_the_session() {
    let mut m = manager("Monday");
    play_one_match(&mut m);
    assert_eq!(m.snapshot().phase, SessionPhase::AwaitingNextRound);

    m.load_group("Friday").unwrap();
    let s = m.snapshot();
    assert_eq!(s.phase, SessionPhase::Idle);
    assert!(s.present.is_empty());
    assert_eq!(s.streak.count, 0);
    assert!(m.players().unwrap().is_empty());

    // Rules are per group.
    m.load_group("Monday").unwrap();
    assert_eq!(m.config().team_size, 2);
    assert_eq!(m.players().unwrap().len(), 4);
}

#[test]
fn reloading_the_active_group_keeps_the_session() {
    let mut m = manager("Monday");
    play_one_match(&mut m);
    m.load_group("Monday").unwrap();
    assert_eq!(m.snapshot().phase, SessionPhase::AwaitingNextRound);
}

#[test]
fn blank_group_names_are_refused() {
    let mut m = manager("Monday");
    assert!(matches!(
        m.load_group("   "),
        Err(AppError::Session(SessionError::InvalidGroupName))
    ));
    assert!(matches!(
        m.rename_group("Monday", ""),
        Err(AppError::Session(SessionError::InvalidGroupName))
    ));
    assert_eq!(m.config().group, "Monday");
}

#[test]
fn renaming_carries_players_history_and_log() {
    let mut m = manager("Monday");
    play_one_match(&mut m);

    m.rename_group("Monday", "Thursday").unwrap();
    assert_eq!(m.config().group, "Thursday");
    assert_eq!(m.config().team_size, 2);
    assert_eq!(m.snapshot().phase, SessionPhase::Idle);

    let players = m.players().unwrap();
    assert_eq!(players.len(), 4);
    assert!(players.iter().all(|p| p.group == "Thursday"));
    assert_eq!(m.history_for_date(None).unwrap().len(), 1);
    assert_eq!(m.store().rating_logs("Thursday").unwrap().len(), 4);
    assert!(m.store().rating_logs("Monday").unwrap().is_empty());
    assert_eq!(m.group_names().unwrap(), vec!["Thursday".to_string()]);
}

#[test]
fn renaming_an_inactive_group_leaves_the_session_alone() {
    let mut m = manager("Monday");
    m.load_group("Friday").unwrap();
    m.add_player("Zoe", None, None, true).unwrap();
    m.load_group("Monday").unwrap();
    play_one_match(&mut m);

    m.rename_group("Friday", "Saturday").unwrap();
    assert_eq!(m.config().group, "Monday");
    assert_eq!(m.snapshot().phase, SessionPhase::AwaitingNextRound);
    assert_eq!(m.store().players_in_group("Saturday").unwrap().len(), 1);
}

#[test]
fn deleting_the_active_group_falls_back_to_the_default() {
    let mut m = manager("Monday");
    play_one_match(&mut m);

    m.delete_group("Monday").unwrap();
    assert_eq!(m.config().group, DEFAULT_GROUP);
    assert_eq!(m.snapshot().phase, SessionPhase::Idle);
    assert!(m.store().players_in_group("Monday").unwrap().is_empty());
    assert!(m.store().history("Monday").unwrap().is_empty());
    assert!(m.store().rating_logs("Monday").unwrap().is_empty());
    assert!(m.store().group_config("Monday").unwrap().is_none());
    assert_eq!(m.group_names().unwrap(), vec![DEFAULT_GROUP.to_string()]);
}
