//! Session transitions: presence, match start/cancel/finish, substitutions and
//! the king-of-the-court rotation.
//!
//! Every function either applies its whole transition or returns a
//! [`SessionError`] with the session untouched.

use crate::logic::balancer::{balance_by_role, complete_teams, form_teams, BalanceStrategy, Teams};
use crate::logic::rating::compute_delta;
use crate::models::{
    join_names, rating_average, GroupConfig, MatchHistory, Player, PlayerId, RatingLogEntry,
    Session, SessionError, SessionPhase, Side,
};
use crate::store::MatchRecord;
use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Flip a player's presence. Returns `true` if the player is now present.
///
/// A newly present player joins the waiting queue unless already on court,
/// already queued, or parked as a winner of the last match. An absent player
/// leaves the queue but stays on court until substituted.
pub fn toggle_presence(session: &mut Session, player: &Player) -> bool {
    if session.present.remove(&player.id) {
        session.waiting.retain(|p| p.id != player.id);
        return false;
    }

    session.present.insert(player.id);
    let queued = session.side_of(player.id).is_some()
        || session.is_waiting(player.id)
        || session.is_parked_winner(player.id);
    if !queued {
        session.waiting.push(player.clone());
    }
    true
}

/// Mark every player in `players` present (queueing those not on court), or
/// clear presence and the queue entirely.
pub fn set_all_present(session: &mut Session, players: &[Player], present: bool) {
    if !present {
        session.present.clear();
        session.waiting.clear();
        return;
    }
    for p in players {
        session.present.insert(p.id);
        let queued = session.side_of(p.id).is_some()
            || session.is_waiting(p.id)
            || session.is_parked_winner(p.id);
        if !queued {
            session.waiting.push(p.clone());
        }
    }
}

/// Pick `team_size * 2` present players, balance them, queue the rest.
pub fn start_automatic_match<R: Rng + ?Sized>(
    session: &mut Session,
    players: &[Player],
    config: &GroupConfig,
    rng: &mut R,
) -> Result<(), SessionError> {
    ensure_court_free(session)?;
    let available: Vec<Player> = players
        .iter()
        .filter(|p| session.is_present(p.id))
        .cloned()
        .collect();
    let required = config.players_required();
    if config.team_size == 0 || available.len() < required {
        return Err(SessionError::NotEnoughPlayers {
            required,
            present: available.len(),
        });
    }

    let strategy = BalanceStrategy::GenderAware {
        priority: config.gender_priority,
    };
    let teams = form_teams(&available, config.team_size, Vec::new(), Vec::new(), strategy, rng);
    if !teams.is_complete(config.team_size) {
        return Err(SessionError::CannotFillTeams);
    }

    log::info!(
        "Automatic match: {} vs {} ({} waiting)",
        join_names(&teams.team_a),
        join_names(&teams.team_b),
        teams.bench.len()
    );
    install_teams(session, teams);
    Ok(())
}

/// Accept operator-chosen rosters as they are.
pub fn start_manual_match(
    session: &mut Session,
    team_a: Vec<Player>,
    team_b: Vec<Player>,
    bench: Vec<Player>,
) -> Result<(), SessionError> {
    ensure_court_free(session)?;
    log::info!(
        "Manual match: {} vs {}",
        join_names(&team_a),
        join_names(&team_b)
    );
    install_teams(
        session,
        Teams {
            team_a,
            team_b,
            bench,
        },
    );
    Ok(())
}

/// A running match must be finished or cancelled before another starts.
fn ensure_court_free(session: &Session) -> Result<(), SessionError> {
    if session.phase() == SessionPhase::Active {
        return Err(SessionError::MatchInProgress);
    }
    Ok(())
}

/// Preview role-balanced teams over the present players (no mutation).
pub fn propose_role_teams(session: &Session, players: &[Player], config: &GroupConfig) -> Teams {
    let present: Vec<Player> = players
        .iter()
        .filter(|p| session.is_present(p.id))
        .cloned()
        .collect();
    balance_by_role(present, config.team_size, Vec::new(), Vec::new())
}

fn install_teams(session: &mut Session, teams: Teams) {
    session.team_a = teams.team_a;
    session.team_b = teams.team_b;
    session.waiting = teams.bench;
    session.streak.reset();
    session.awaiting_next_round = false;
}

/// Abandon the current match. Leaves no history and no rating changes.
pub fn cancel_match(session: &mut Session) {
    session.clear_match();
    log::info!("Match cancelled");
}

/// Build everything a win by `side` writes, without touching the session.
pub fn prepare_finish(
    session: &Session,
    side: Side,
    group: &str,
    now: NaiveDateTime,
) -> Result<MatchRecord, SessionError> {
    if session.team_a.is_empty() || session.team_b.is_empty() {
        return Err(SessionError::EmptyTeam);
    }

    let winners = session.team(side);
    let losers = session.team(side.opposite());
    let delta = compute_delta(rating_average(winners), rating_average(losers));
    let date = now.date();

    let mut players = Vec::with_capacity(winners.len() + losers.len());
    let mut log_entries = Vec::with_capacity(winners.len() + losers.len());
    for (roster, won) in [(winners, true), (losers, false)] {
        for p in roster {
            let mut updated = p.clone();
            if won {
                updated.add_win(delta);
            } else {
                updated.add_loss(delta);
            }
            log_entries.push(RatingLogEntry {
                id: None,
                player_id: updated.id,
                name: updated.name.clone(),
                date,
                rating: updated.rating,
                group: group.to_string(),
            });
            players.push(updated);
        }
    }

    let history = MatchHistory {
        id: None,
        played_at: now,
        team_a: join_names(&session.team_a),
        team_b: join_names(&session.team_b),
        winner: side.label().to_string(),
        rating_delta: delta,
        group: group.to_string(),
    };

    Ok(MatchRecord {
        players,
        log_entries,
        history,
    })
}

/// Apply a committed win: streak bookkeeping, park both rosters, clear the court.
pub fn apply_finish(session: &mut Session, side: Side, record: &MatchRecord) {
    let winner_ids: HashSet<PlayerId> = session.team(side).iter().map(|p| p.id).collect();
    let (winners, losers): (Vec<Player>, Vec<Player>) = record
        .players
        .iter()
        .cloned()
        .partition(|p| winner_ids.contains(&p.id));

    session.streak.record_win(side);
    session.last_winners = winners;
    session.last_losers = losers;
    session.awaiting_next_round = true;
    session.team_a.clear();
    session.team_b.clear();

    log::info!(
        "{} won (+/-{:.2}); streak {}",
        side,
        record.history.rating_delta,
        session.streak.count
    );
}

/// Swap `out` (on court) with `incoming` (waiting, or on the opposite side).
///
/// Any change to the streak-holding side's roster forfeits the streak.
pub fn substitute(
    session: &mut Session,
    out: PlayerId,
    incoming: PlayerId,
) -> Result<(), SessionError> {
    let out_side = session.side_of(out).ok_or(SessionError::PlayerNotOnTeam(out))?;
    let out_idx = session
        .team(out_side)
        .iter()
        .position(|p| p.id == out)
        .ok_or(SessionError::PlayerNotOnTeam(out))?;
    let out_player = session.team(out_side)[out_idx].clone();

    let touched: Vec<Side> = if let Some(wait_idx) =
        session.waiting.iter().position(|p| p.id == incoming)
    {
        let in_player = std::mem::replace(&mut session.waiting[wait_idx], out_player);
        team_mut(session, out_side)[out_idx] = in_player;
        vec![out_side]
    } else if session.side_of(incoming) == Some(out_side.opposite()) {
        let other = out_side.opposite();
        let in_idx = session
            .team(other)
            .iter()
            .position(|p| p.id == incoming)
            .ok_or(SessionError::InvalidSubstitution(incoming))?;
        let in_player = std::mem::replace(&mut team_mut(session, other)[in_idx], out_player);
        team_mut(session, out_side)[out_idx] = in_player;
        vec![out_side, other]
    } else {
        return Err(SessionError::InvalidSubstitution(incoming));
    };

    if let Some(owner) = session.streak.owner {
        if touched.contains(&owner) {
            log::info!("Substitution on {owner} resets its streak");
            session.streak.reset();
        }
    }
    Ok(())
}

fn team_mut(session: &mut Session, side: Side) -> &mut Vec<Player> {
    match side {
        Side::A => &mut session.team_a,
        Side::B => &mut session.team_b,
    }
}

/// King-of-the-court rotation after a finished match.
///
/// Absent players are dropped from consideration. Once the streak reaches the
/// victory limit the winners are split across both sides and topped up;
/// otherwise the winners stay together and face a challenger team built from
/// the queue, then from the losers who have played the least.
pub fn start_next_round<R: Rng + ?Sized>(
    session: &mut Session,
    config: &GroupConfig,
    rng: &mut R,
) -> Result<(), SessionError> {
    if !session.awaiting_next_round {
        return Err(SessionError::NoFinishedMatch);
    }

    let winners: Vec<Player> = session
        .last_winners
        .iter()
        .filter(|p| session.is_present(p.id))
        .cloned()
        .collect();
    let winner_ids: HashSet<PlayerId> = winners.iter().map(|p| p.id).collect();
    let losers: Vec<Player> = session
        .last_losers
        .iter()
        .filter(|p| session.is_present(p.id) && !winner_ids.contains(&p.id))
        .cloned()
        .collect();
    let loser_ids: HashSet<PlayerId> = losers.iter().map(|p| p.id).collect();
    let waiting: Vec<Player> = session
        .waiting
        .iter()
        .filter(|p| {
            session.is_present(p.id) && !winner_ids.contains(&p.id) && !loser_ids.contains(&p.id)
        })
        .cloned()
        .collect();

    if session.streak.count >= config.victory_limit {
        reshuffle(session, config, winners, waiting, losers)
    } else {
        challenge(session, config, winners, waiting, losers, rng)
    }
}

fn reshuffle(
    session: &mut Session,
    config: &GroupConfig,
    mut winners: Vec<Player>,
    waiting: Vec<Player>,
    losers: Vec<Player>,
) -> Result<(), SessionError> {
    let size = config.team_size;
    winners.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    let keep = winners.len().min(size * 2);
    let dropped = winners.split_off(keep);

    let mut seed_a = Vec::with_capacity(size);
    let mut seed_b = Vec::with_capacity(size);
    for (i, p) in winners.into_iter().enumerate() {
        if i % 2 == 0 {
            seed_a.push(p);
        } else {
            seed_b.push(p);
        }
    }

    let pool: Vec<Player> = dropped.into_iter().chain(waiting).chain(losers).collect();
    let teams = complete_teams(seed_a, seed_b, pool, size, config.gender_priority);
    if !teams.is_complete(size) {
        log::debug!("Reshuffle refused: not enough players to fill both sides");
        return Err(SessionError::CannotFillTeams);
    }

    session.team_a = teams.team_a;
    session.team_b = teams.team_b;
    session.waiting = teams.bench;
    session.streak.reset();
    session.awaiting_next_round = false;
    log::info!("Victory limit reached; winners split across both sides");
    Ok(())
}

fn challenge<R: Rng + ?Sized>(
    session: &mut Session,
    config: &GroupConfig,
    mut team_win: Vec<Player>,
    waiting: Vec<Player>,
    mut losers: Vec<Player>,
    rng: &mut R,
) -> Result<(), SessionError> {
    let size = config.team_size;

    // Excess winners go back to the front of the queue.
    let extra = if team_win.len() > size {
        team_win.split_off(size)
    } else {
        Vec::new()
    };
    let mut queue: Vec<Player> = extra.into_iter().chain(waiting).collect();

    if team_win.len() < size {
        let needed = size - team_win.len();
        if queue.len() + losers.len() < needed {
            log::debug!("Next round refused: cannot complete the winning side");
            return Err(SessionError::CannotFillTeams);
        }
        let from_queue = needed.min(queue.len());
        team_win.extend(queue.drain(..from_queue));
        team_win.extend(losers.drain(..needed - from_queue));
    }

    let mut challengers = Vec::with_capacity(size);
    if config.gender_priority {
        if let Some(idx) = queue.iter().position(Player::is_female) {
            challengers.push(queue.remove(idx));
        } else if let Some(idx) = strongest_woman(&losers) {
            challengers.push(losers.remove(idx));
        }
    }

    let from_queue = size.saturating_sub(challengers.len()).min(queue.len());
    challengers.extend(queue.drain(..from_queue));

    let needed = size.saturating_sub(challengers.len());
    if needed > 0 {
        losers.sort_by_key(|p| p.matches_played);
        let take = needed.min(losers.len());
        challengers.extend(losers.drain(..take));
    }

    if challengers.len() != size {
        log::debug!("Next round refused: only {} challengers available", challengers.len());
        return Err(SessionError::CannotFillTeams);
    }

    losers.shuffle(rng);
    let winner_side = session.streak.owner.unwrap_or(Side::A);
    match winner_side {
        Side::A => {
            session.team_a = team_win;
            session.team_b = challengers;
        }
        Side::B => {
            session.team_b = team_win;
            session.team_a = challengers;
        }
    }
    session.streak.owner = Some(winner_side);
    session.waiting = queue.into_iter().chain(losers).collect();
    session.awaiting_next_round = false;
    log::info!("Next round: {winner_side} defends a {}-win streak", session.streak.count);
    Ok(())
}

fn strongest_woman(players: &[Player]) -> Option<usize> {
    players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_female())
        .max_by(|(_, a), (_, b)| a.rating.total_cmp(&b.rating))
        .map(|(i, _)| i)
}
