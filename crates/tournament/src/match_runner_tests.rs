use super::*;

#[test]
fn test_simulated_series() {
    let outcome = quick_match(8, 400, 7).unwrap();

    assert_eq!(outcome.engine.total_games(), 400);
    assert_eq!(outcome.engine.population(), 8);
    assert_eq!(outcome.hidden.len(), 8);
    assert_eq!(outcome.hidden[0], ("p01".to_string(), 1200.0));
    assert_eq!(outcome.hidden[7], ("p08".to_string(), 1800.0));
}

#[test]
fn test_strongest_player_overtakes_weakest() {
    let outcome = quick_match(8, 2000, 42).unwrap();

    let weakest = outcome.engine.rating(&"p01".to_string()).unwrap();
    let strongest = outcome.engine.rating(&"p08".to_string()).unwrap();
    assert!(strongest > weakest);
    assert!(outcome.ordering_agreement() > 0.5);
}

#[test]
fn test_same_seed_same_ratings() {
    let first = quick_match(6, 300, 3).unwrap();
    let second = quick_match(6, 300, 3).unwrap();

    assert_eq!(first.engine.leaderboard(), second.engine.leaderboard());
    assert_eq!(first.upsets, second.upsets);
}

#[test]
fn test_team_series() {
    let config = MatchConfig {
        num_games: 100,
        players: 6,
        team_size: 2,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(11);
    let outcome = MatchRunner::new(config).run(&mut rng).unwrap();

    assert_eq!(outcome.engine.total_games(), 100);
    let games: u32 = outcome
        .hidden
        .iter()
        .map(|(name, _)| outcome.engine.num_games(name))
        .sum();
    assert_eq!(games, 400);
}

#[test]
fn test_not_enough_players() {
    let config = MatchConfig {
        players: 3,
        team_size: 2,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(0);
    let err = MatchRunner::new(config).run(&mut rng).unwrap_err();
    assert!(matches!(
        err,
        MatchError::NotEnoughPlayers {
            players: 3,
            team_size: 2
        }
    ));
}

#[test]
fn test_wide_rating_gap_never_upsets() {
    let config = MatchConfig {
        num_games: 50,
        players: 2,
        weakest: -300_000.0,
        strongest: 300_000.0,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(5);
    let outcome = MatchRunner::new(config).run(&mut rng).unwrap();

    assert_eq!(outcome.upsets, 0);
    assert_eq!(outcome.engine.wins(&"p02".to_string()), 50);
    assert!(outcome.ordering_agreement() > 0.99);
}
