//! Team formation: split a pool into two equal sides with close rating sums.
//!
//! Two strategies share one entry point ([`form_teams`]):
//! - `SimpleRole`: setters first, then everyone else, each sorted by rating and
//!   handed to the weaker side.
//! - `GenderAware`: reserve up to two women, fill the rest at random, then deal
//!   women alternately and balance everyone else by rating sum.
//!
//! Equal sums always favour team A. Seeded players are never moved.

use crate::models::{rating_sum, Player, PlayerId, Side};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Women pulled into an automatic selection before the random fill.
const RESERVED_WOMEN: usize = 2;

/// How a pool is turned into two teams.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BalanceStrategy {
    SimpleRole,
    GenderAware { priority: bool },
}

/// Result of a balancing pass. `bench` holds whoever did not fit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    pub team_a: Vec<Player>,
    pub team_b: Vec<Player>,
    pub bench: Vec<Player>,
}

impl Teams {
    /// Both sides reached `team_size`.
    pub fn is_complete(&self, team_size: usize) -> bool {
        self.team_a.len() == team_size && self.team_b.len() == team_size
    }

    /// Absolute difference of the two rating sums.
    pub fn rating_gap(&self) -> f64 {
        (rating_sum(&self.team_a) - rating_sum(&self.team_b)).abs()
    }
}

/// Form two teams of `team_size` from `pool`, keeping `seed_a`/`seed_b` in place.
///
/// Pool entries already present in a seed are ignored. With too few players the
/// teams are filled as far as possible and the result is not complete.
pub fn form_teams<R: Rng + ?Sized>(
    pool: &[Player],
    team_size: usize,
    seed_a: Vec<Player>,
    seed_b: Vec<Player>,
    strategy: BalanceStrategy,
    rng: &mut R,
) -> Teams {
    let seeded: HashSet<PlayerId> = seed_a.iter().chain(seed_b.iter()).map(|p| p.id).collect();
    let candidates: Vec<Player> = pool
        .iter()
        .filter(|p| !seeded.contains(&p.id))
        .cloned()
        .collect();

    match strategy {
        BalanceStrategy::SimpleRole => balance_by_role(candidates, team_size, seed_a, seed_b),
        BalanceStrategy::GenderAware { priority } => {
            let open_slots = (team_size * 2).saturating_sub(seed_a.len() + seed_b.len());
            let (selected, bench) = select_players(candidates, open_slots, priority, rng);
            let mut teams = balance_by_gender(selected, team_size, seed_a, seed_b);
            teams.bench.extend(bench);
            teams
        }
    }
}

/// Pick `slots` players: up to two women first when `priority` is set, then a
/// random fill. Returns `(selected, rest)`; `rest` keeps its shuffled order.
pub fn select_players<R: Rng + ?Sized>(
    mut pool: Vec<Player>,
    slots: usize,
    priority: bool,
    rng: &mut R,
) -> (Vec<Player>, Vec<Player>) {
    let mut selected = Vec::with_capacity(slots);
    if priority {
        let reserve = RESERVED_WOMEN.min(slots);
        let mut i = 0;
        while i < pool.len() && selected.len() < reserve {
            if pool[i].is_female() {
                selected.push(pool.remove(i));
            } else {
                i += 1;
            }
        }
    }

    pool.shuffle(rng);
    let fill = slots.saturating_sub(selected.len()).min(pool.len());
    selected.extend(pool.drain(..fill));
    (selected, pool)
}

/// Role-priority greedy split: setters first, then the rest, both by rating descending.
pub fn balance_by_role(
    pool: Vec<Player>,
    team_size: usize,
    seed_a: Vec<Player>,
    seed_b: Vec<Player>,
) -> Teams {
    let mut teams = Teams {
        team_a: seed_a,
        team_b: seed_b,
        bench: Vec::new(),
    };
    let (mut setters, mut others): (Vec<_>, Vec<_>) = pool.into_iter().partition(|p| p.is_setter);
    sort_by_rating_desc(&mut setters);
    sort_by_rating_desc(&mut others);

    for p in setters.into_iter().chain(others) {
        place_on_weaker(&mut teams, p, team_size);
    }
    teams
}

/// Deal women alternately (A first), then balance the rest by rating sum.
pub fn balance_by_gender(
    selected: Vec<Player>,
    team_size: usize,
    seed_a: Vec<Player>,
    seed_b: Vec<Player>,
) -> Teams {
    let mut teams = Teams {
        team_a: seed_a,
        team_b: seed_b,
        bench: Vec::new(),
    };
    let (mut women, mut rest): (Vec<_>, Vec<_>) = selected.into_iter().partition(|p| p.is_female());
    sort_by_rating_desc(&mut women);
    sort_by_rating_desc(&mut rest);

    for (i, p) in women.into_iter().enumerate() {
        let preferred = if i % 2 == 0 { Side::A } else { Side::B };
        place(&mut teams, p, team_size, preferred);
    }
    for p in rest {
        place_on_weaker(&mut teams, p, team_size);
    }
    teams
}

/// Fill seeded teams from `pool` in pool order.
///
/// With `gender_priority`, a side without a woman first takes the first woman
/// in the pool. Everyone else goes to the side with the lower running sum.
pub fn complete_teams(
    seed_a: Vec<Player>,
    seed_b: Vec<Player>,
    pool: Vec<Player>,
    team_size: usize,
    gender_priority: bool,
) -> Teams {
    let mut teams = Teams {
        team_a: seed_a,
        team_b: seed_b,
        bench: Vec::new(),
    };
    let mut available = pool;

    if gender_priority {
        for side in [Side::A, Side::B] {
            let team = side_mut(&mut teams, side);
            if team.len() < team_size && !team.iter().any(Player::is_female) {
                if let Some(idx) = available.iter().position(Player::is_female) {
                    team.push(available.remove(idx));
                }
            }
        }
    }

    for p in available {
        place_on_weaker(&mut teams, p, team_size);
    }
    teams
}

fn sort_by_rating_desc(players: &mut [Player]) {
    players.sort_by(|a, b| b.rating.total_cmp(&a.rating));
}

fn side_mut(teams: &mut Teams, side: Side) -> &mut Vec<Player> {
    match side {
        Side::A => &mut teams.team_a,
        Side::B => &mut teams.team_b,
    }
}

/// Put `player` on the side with the lower rating sum (ties to A).
fn place_on_weaker(teams: &mut Teams, player: Player, team_size: usize) {
    let preferred = if rating_sum(&teams.team_a) <= rating_sum(&teams.team_b) {
        Side::A
    } else {
        Side::B
    };
    place(teams, player, team_size, preferred);
}

/// Put `player` on `preferred` if both sides have room, otherwise on whichever
/// side still has room, otherwise on the bench.
fn place(teams: &mut Teams, player: Player, team_size: usize, preferred: Side) {
    let a_full = teams.team_a.len() >= team_size;
    let b_full = teams.team_b.len() >= team_size;
    match (a_full, b_full) {
        (false, false) => side_mut(teams, preferred).push(player),
        (false, true) => teams.team_a.push(player),
        (true, false) => teams.team_b.push(player),
        (true, true) => teams.bench.push(player),
    }
}
