//! The session controller: owns the store, the active group's rules and the
//! in-memory session, and is the only entry point for mutations.
//!
//! State is published through `tokio::sync::watch` channels. Subscribers see the
//! current snapshot immediately and every later one (last value wins).

use crate::error::{AppError, AppResult};
use crate::logic::{self, ranking, RankingEntry, RatingSeries, Teams};
use crate::models::{
    Gender, GroupConfig, MatchHistory, Player, PlayerId, Session, SessionError, SessionPhase,
    Side, Streak, DEFAULT_GROUP,
};
use crate::store::{Store, StoreResult};
use crate::transfer::{self, BackupBundle, CsvKind};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::watch;

/// What the presentation layer renders for the active group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub config: GroupConfig,
    pub phase: SessionPhase,
    pub team_a: Vec<Player>,
    pub team_b: Vec<Player>,
    pub waiting: Vec<Player>,
    pub present: Vec<PlayerId>,
    pub streak: Streak,
    pub awaiting_next_round: bool,
}

impl SessionSnapshot {
    fn new(config: &GroupConfig, session: &Session) -> Self {
        Self {
            config: config.clone(),
            phase: session.phase(),
            team_a: session.team_a.clone(),
            team_b: session.team_b.clone(),
            waiting: session.waiting.clone(),
            present: session.present.iter().copied().collect(),
            streak: session.streak,
            awaiting_next_round: session.awaiting_next_round,
        }
    }
}

fn persisted<T>(action: &str, result: StoreResult<T>) -> AppResult<T> {
    result.map_err(|e| {
        log::error!("Failed to {action}: {e}");
        AppError::Store(e)
    })
}

fn refused(e: SessionError) -> AppError {
    log::debug!("Intent refused: {e}");
    AppError::Session(e)
}

fn group_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(refused(SessionError::InvalidGroupName));
    }
    Ok(name.to_string())
}

fn fetch_or_create_config<S: Store>(store: &mut S, group: &str) -> AppResult<GroupConfig> {
    if let Some(config) = persisted("load group config", store.group_config(group))? {
        return Ok(config);
    }
    let config = GroupConfig::new(group);
    persisted("save group config", store.save_group_config(&config))?;
    log::info!("Created group {group} with default rules");
    Ok(config)
}

pub struct VolleyManager<S: Store> {
    store: S,
    config: GroupConfig,
    session: Session,
    rng: StdRng,
    state_tx: watch::Sender<SessionSnapshot>,
    players_tx: watch::Sender<Vec<Player>>,
}

impl<S: Store> VolleyManager<S> {
    /// Open `group` (creating its config if needed) with a fresh session.
    pub fn open(store: S, group: &str) -> AppResult<Self> {
        Self::with_rng(store, group, StdRng::from_entropy())
    }

    /// Like [`VolleyManager::open`] with a caller-provided RNG (reproducible shuffles).
    pub fn with_rng(mut store: S, group: &str, rng: StdRng) -> AppResult<Self> {
        let group = group_name(group)?;
        let config = fetch_or_create_config(&mut store, &group)?;
        let session = Session::new();
        let players = persisted("load players", store.players_in_group(&group))?;
        let (state_tx, _) = watch::channel(SessionSnapshot::new(&config, &session));
        let (players_tx, _) = watch::channel(players);
        Ok(Self {
            store,
            config,
            session,
            rng,
            state_tx,
            players_tx,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(&self.config, &self.session)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_tx.subscribe()
    }

    /// Live list of the active group's players.
    pub fn subscribe_players(&self) -> watch::Receiver<Vec<Player>> {
        self.players_tx.subscribe()
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.snapshot());
    }

    fn publish_players(&self) -> AppResult<()> {
        let players = self.players()?;
        self.players_tx.send_replace(players);
        Ok(())
    }

    // --- groups ---

    /// Switch to `name`. Switching to a different group drops all session state.
    pub fn load_group(&mut self, name: &str) -> AppResult<()> {
        let name = group_name(name)?;
        let config = fetch_or_create_config(&mut self.store, &name)?;
        if name != self.config.group {
            log::info!("Switching group {} -> {}", self.config.group, name);
            self.session.reset();
        }
        self.config = config;
        self.publish();
        self.publish_players()
    }

    /// Overwrite the active group's rules. Applies from the next team assembly.
    pub fn update_config(
        &mut self,
        team_size: usize,
        victory_limit: u32,
        gender_priority: bool,
    ) -> AppResult<()> {
        if team_size == 0 || victory_limit == 0 {
            return Err(refused(SessionError::InvalidConfig));
        }
        let updated = GroupConfig {
            group: self.config.group.clone(),
            team_size,
            victory_limit,
            gender_priority,
        };
        persisted("save group config", self.store.save_group_config(&updated))?;
        self.config = updated;
        self.publish();
        Ok(())
    }

    pub fn rename_group(&mut self, old: &str, new: &str) -> AppResult<()> {
        let new = group_name(new)?;
        if old == new {
            return Ok(());
        }
        persisted("rename group", self.store.rename_group(old, &new))?;
        log::info!("Renamed group {old} -> {new}");
        if self.config.group == old {
            self.load_group(&new)?;
        }
        Ok(())
    }

    /// Delete a group and everything in it. If it was active, fall back to the default group.
    pub fn delete_group(&mut self, name: &str) -> AppResult<()> {
        persisted("delete group", self.store.delete_group(name))?;
        log::info!("Deleted group {name}");
        if self.config.group == name {
            self.session.reset();
            self.load_group(DEFAULT_GROUP)?;
        }
        Ok(())
    }

    pub fn group_names(&self) -> AppResult<Vec<String>> {
        persisted("list groups", self.store.group_names())
    }

    // --- players ---

    /// Players of the active group, highest rating first.
    pub fn players(&self) -> AppResult<Vec<Player>> {
        persisted("load players", self.store.players_in_group(&self.config.group))
    }

    fn group_player(&self, id: PlayerId) -> AppResult<Player> {
        persisted("load player", self.store.player(id))?
            .filter(|p| p.group == self.config.group)
            .ok_or_else(|| refused(SessionError::PlayerNotFound(id)))
    }

    pub fn add_player(
        &mut self,
        name: &str,
        rating: Option<f64>,
        gender: Option<Gender>,
        is_setter: bool,
    ) -> AppResult<Player> {
        let name = name.trim();
        if name.is_empty() {
            return Err(refused(SessionError::InvalidPlayerName));
        }
        let mut player = Player::new(name, self.config.group.clone()).with_setter(is_setter);
        if let Some(rating) = rating {
            player.rating = rating;
        }
        player.gender = gender;
        persisted("add player", self.store.insert_player(&player))?;
        self.publish_players()?;
        Ok(player)
    }

    fn edit_player(&mut self, id: PlayerId, edit: impl FnOnce(&mut Player)) -> AppResult<Player> {
        let mut player = self.group_player(id)?;
        edit(&mut player);
        persisted("update player", self.store.update_player(&player))?;
        self.session.refresh_player(&player);
        self.publish();
        self.publish_players()?;
        Ok(player)
    }

    /// Rename a player everywhere, including the current teams and queue.
    pub fn rename_player(&mut self, id: PlayerId, name: &str) -> AppResult<Player> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(refused(SessionError::InvalidPlayerName));
        }
        self.edit_player(id, |p| p.name = name)
    }

    pub fn set_setter(&mut self, id: PlayerId, is_setter: bool) -> AppResult<Player> {
        self.edit_player(id, |p| p.is_setter = is_setter)
    }

    pub fn set_gender(&mut self, id: PlayerId, gender: Option<Gender>) -> AppResult<Player> {
        self.edit_player(id, |p| p.gender = gender)
    }

    /// Remove a player of the active group. Their rating log stays; they are
    /// marked absent and taken off the court and the queue.
    pub fn delete_player(&mut self, id: PlayerId) -> AppResult<()> {
        let player = self.group_player(id)?;
        persisted("delete player", self.store.delete_player(player.id))?;
        self.session.forget_player(player.id);
        log::info!("Deleted player {}", player.name);
        self.publish();
        self.publish_players()
    }

    // --- session intents ---

    pub fn toggle_presence(&mut self, id: PlayerId) -> AppResult<bool> {
        let player = self.group_player(id)?;
        let present = logic::toggle_presence(&mut self.session, &player);
        self.publish();
        Ok(present)
    }

    pub fn set_all_present(&mut self, present: bool) -> AppResult<()> {
        let players = self.players()?;
        logic::set_all_present(&mut self.session, &players, present);
        self.publish();
        Ok(())
    }

    pub fn start_automatic_match(&mut self) -> AppResult<()> {
        let players = self.players()?;
        logic::start_automatic_match(&mut self.session, &players, &self.config, &mut self.rng)
            .map_err(refused)?;
        self.publish();
        Ok(())
    }

    /// Start a match with operator-chosen rosters, given as player ids.
    pub fn start_manual_match(
        &mut self,
        team_a: &[PlayerId],
        team_b: &[PlayerId],
        bench: &[PlayerId],
    ) -> AppResult<()> {
        let by_id: HashMap<PlayerId, Player> =
            self.players()?.into_iter().map(|p| (p.id, p)).collect();
        let resolve = |ids: &[PlayerId]| -> AppResult<Vec<Player>> {
            ids.iter()
                .map(|id| {
                    by_id
                        .get(id)
                        .cloned()
                        .ok_or_else(|| refused(SessionError::PlayerNotFound(*id)))
                })
                .collect()
        };
        let (a, b, rest) = (resolve(team_a)?, resolve(team_b)?, resolve(bench)?);
        logic::start_manual_match(&mut self.session, a, b, rest).map_err(refused)?;
        self.publish();
        Ok(())
    }

    /// Role-balanced suggestion over the present players, for manual setup.
    pub fn propose_role_teams(&self) -> AppResult<Teams> {
        let players = self.players()?;
        Ok(logic::propose_role_teams(&self.session, &players, &self.config))
    }

    pub fn cancel_match(&mut self) {
        logic::cancel_match(&mut self.session);
        self.publish();
    }

    /// Record a win for `side` now.
    pub fn finish_match(&mut self, side: Side) -> AppResult<MatchHistory> {
        self.finish_match_at(side, Local::now().naive_local())
    }

    /// Record a win for `side` at `now`.
    ///
    /// Ratings, log rows and the history row are committed in one transaction;
    /// the session only moves on once that commit succeeds.
    pub fn finish_match_at(&mut self, side: Side, now: NaiveDateTime) -> AppResult<MatchHistory> {
        let record = logic::prepare_finish(&self.session, side, &self.config.group, now)
            .map_err(refused)?;
        persisted("record match", self.store.commit_match(&record))?;
        logic::apply_finish(&mut self.session, side, &record);
        self.publish();
        self.publish_players()?;
        Ok(record.history)
    }

    pub fn substitute(&mut self, out: PlayerId, incoming: PlayerId) -> AppResult<()> {
        logic::substitute(&mut self.session, out, incoming).map_err(refused)?;
        self.publish();
        Ok(())
    }

    pub fn start_next_round(&mut self) -> AppResult<()> {
        logic::start_next_round(&mut self.session, &self.config, &mut self.rng).map_err(refused)?;
        self.publish();
        Ok(())
    }

    // --- queries ---

    /// Live leaderboard (`None`) or the snapshot of a past day.
    pub fn ranking_for_date(&self, date: Option<NaiveDate>) -> AppResult<Vec<RankingEntry>> {
        match date {
            None => Ok(ranking::live_ranking(&self.players()?)),
            Some(day) => Ok(ranking::ranking_on(&self.rating_logs()?, day)),
        }
    }

    pub fn ranking_dates(&self) -> AppResult<Vec<NaiveDate>> {
        Ok(ranking::ranking_dates(&self.rating_logs()?))
    }

    pub fn history_for_date(&self, date: Option<NaiveDate>) -> AppResult<Vec<MatchHistory>> {
        Ok(ranking::history_on(&self.history()?, date))
    }

    pub fn history_dates(&self) -> AppResult<Vec<NaiveDate>> {
        Ok(ranking::history_dates(&self.history()?))
    }

    pub fn rating_series(
        &self,
        player_ids: &[PlayerId],
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<RatingSeries>> {
        Ok(ranking::rating_series(&self.rating_logs()?, player_ids, from, to))
    }

    /// Players ordered for the presence list.
    pub fn presence_order(&self) -> AppResult<Vec<Player>> {
        let today = Local::now().date_naive();
        Ok(ranking::presence_order(&self.players()?, &self.rating_logs()?, today))
    }

    fn history(&self) -> AppResult<Vec<MatchHistory>> {
        persisted("load history", self.store.history(&self.config.group))
    }

    fn rating_logs(&self) -> AppResult<Vec<crate::models::RatingLogEntry>> {
        persisted("load rating log", self.store.rating_logs(&self.config.group))
    }

    // --- import / export ---

    /// CSV of the active group's rows of `kind`.
    pub fn export_csv(&self, kind: CsvKind) -> AppResult<String> {
        let csv = match kind {
            CsvKind::Players => transfer::players_to_csv(&self.players()?)?,
            CsvKind::History => transfer::history_to_csv(&self.history()?)?,
            CsvKind::RatingLog => transfer::rating_logs_to_csv(&self.rating_logs()?)?,
        };
        Ok(csv)
    }

    /// Import CSV rows, keeping existing ones. Returns how many rows were added.
    pub fn import_csv(&mut self, kind: CsvKind, data: &str) -> AppResult<usize> {
        let inserted = match kind {
            CsvKind::Players => {
                let rows = transfer::players_from_csv(data);
                persisted("import players", self.store.insert_players_if_absent(&rows))?
            }
            CsvKind::History => {
                let rows = transfer::history_from_csv(data);
                persisted("import history", self.store.insert_history_if_absent(&rows))?
            }
            CsvKind::RatingLog => {
                let rows = transfer::rating_logs_from_csv(data);
                persisted("import rating log", self.store.insert_rating_logs_if_absent(&rows))?
            }
        };
        log::info!("Imported {inserted} {kind:?} rows");
        self.publish_players()?;
        Ok(inserted)
    }

    /// JSON bundle of the active group's players, history and rating log.
    pub fn export_backup(&self) -> AppResult<String> {
        let bundle = BackupBundle::new(
            Local::now().naive_local(),
            self.players()?,
            self.history()?,
            self.rating_logs()?,
        );
        Ok(bundle.to_json()?)
    }

    /// Restore a bundle without overwriting existing rows. Returns rows added.
    pub fn import_backup(&mut self, data: &str) -> AppResult<usize> {
        let bundle = BackupBundle::from_json(data)?;
        let mut inserted = persisted(
            "restore players",
            self.store.insert_players_if_absent(&bundle.players),
        )?;
        inserted += persisted(
            "restore history",
            self.store.insert_history_if_absent(&bundle.history),
        )?;
        inserted += persisted(
            "restore rating log",
            self.store.insert_rating_logs_if_absent(&bundle.logs),
        )?;
        log::info!("Restored {inserted} rows from backup (version {})", bundle.version);
        self.publish_players()?;
        Ok(inserted)
    }
}
