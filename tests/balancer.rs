//! Integration tests for team formation over many generated pools.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use volley_manager::logic::balancer::complete_teams;
use volley_manager::logic::form_teams;
use volley_manager::{BalanceStrategy, Gender, Player};

fn random_pool(rng: &mut StdRng, n: usize) -> Vec<Player> {
    (0..n)
        .map(|i| {
            let mut p = Player::new(format!("P{i}"), "g")
                .with_rating(rng.gen_range(800.0..1600.0))
                .with_setter(rng.gen_bool(0.25));
            if rng.gen_bool(0.4) {
                p = p.with_gender(Gender::Female);
            } else if rng.gen_bool(0.8) {
                p = p.with_gender(Gender::Male);
            }
            p
        })
        .collect()
}

#[test]
fn teams_are_full_whenever_the_pool_is_large_enough() {
    let mut rng = StdRng::seed_from_u64(42);
    for team_size in 1..=6 {
        for extra in 0..4 {
            let pool = random_pool(&mut rng, team_size * 2 + extra);
            for strategy in [
                BalanceStrategy::SimpleRole,
                BalanceStrategy::GenderAware { priority: true },
                BalanceStrategy::GenderAware { priority: false },
            ] {
                let teams = form_teams(&pool, team_size, Vec::new(), Vec::new(), strategy, &mut rng);
                assert!(teams.is_complete(team_size), "{strategy:?} size {team_size}");
                assert_eq!(teams.bench.len(), extra);
            }
        }
    }
}

#[test]
fn role_split_gap_never_exceeds_the_best_rating() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..500 {
        let team_size = rng.gen_range(1..=6);
        let extra = rng.gen_range(0..3);
        let pool = random_pool(&mut rng, team_size * 2 + extra);
        let best = pool.iter().map(|p| p.rating).fold(f64::MIN, f64::max);
        let teams = form_teams(
            &pool,
            team_size,
            Vec::new(),
            Vec::new(),
            BalanceStrategy::SimpleRole,
            &mut rng,
        );
        assert!(teams.rating_gap() <= best, "gap {} > {best}", teams.rating_gap());
    }
}

#[test]
fn seeded_players_keep_their_side() {
    let mut rng = StdRng::seed_from_u64(9);
    let pool = random_pool(&mut rng, 8);
    let seed_a = vec![pool[0].clone()];
    let seed_b = vec![pool[1].clone()];
    let teams = form_teams(
        &pool,
        3,
        seed_a,
        seed_b,
        BalanceStrategy::GenderAware { priority: true },
        &mut rng,
    );
    assert!(teams.is_complete(3));
    assert_eq!(teams.team_a[0].id, pool[0].id);
    assert_eq!(teams.team_b[0].id, pool[1].id);
    let mut seen: Vec<_> = teams
        .team_a
        .iter()
        .chain(&teams.team_b)
        .chain(&teams.bench)
        .map(|p| p.id)
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), pool.len());
}

#[test]
fn gender_priority_puts_a_woman_on_each_side() {
    let women: Vec<Player> = (0..2)
        .map(|i| Player::new(format!("W{i}"), "g").with_gender(Gender::Female).with_rating(1000.0))
        .collect();
    let mut pool: Vec<Player> = (0..10)
        .map(|i| Player::new(format!("M{i}"), "g").with_gender(Gender::Male).with_rating(1300.0))
        .collect();
    pool.extend(women);

    let mut rng = StdRng::seed_from_u64(3);
    let teams = form_teams(
        &pool,
        4,
        Vec::new(),
        Vec::new(),
        BalanceStrategy::GenderAware { priority: true },
        &mut rng,
    );
    assert!(teams.team_a.iter().any(Player::is_female));
    assert!(teams.team_b.iter().any(Player::is_female));
}

#[test]
fn completion_fills_both_seeded_sides() {
    let seed_a = vec![Player::new("A", "g").with_rating(1400.0)];
    let seed_b = vec![Player::new("B", "g").with_rating(1350.0)];
    let pool: Vec<Player> = (0..4)
        .map(|i| Player::new(format!("P{i}"), "g").with_rating(1200.0 - i as f64 * 10.0))
        .collect();
    let teams = complete_teams(seed_a, seed_b, pool, 2, true);
    assert!(teams.is_complete(2));
    assert_eq!(teams.bench.len(), 2);
    // Team B starts weaker so it takes the first pool player.
    assert_eq!(teams.team_b[1].name, "P0");
    assert_eq!(teams.team_a[1].name, "P1");
}
