//! Tournament CLI
//!
//! Replay tournament scripts and simulate rated series.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::path::Path;
use tournament::{leaderboard_report, MatchConfig, MatchRunner, TournamentScript, SEPARATOR};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("Tournament ranking and bracket engine");
    println!();
    println!("Usage:");
    println!("  tournament rate <script.toml> [--json]");
    println!("  tournament bracket <script.toml>");
    println!("  tournament simulate [--players N] [--games G] [--team-size T] [--seed S]");
    println!();
    println!("Scripts:");
    println!("  [[game]]     - winners/losers as player lists or lists of teams");
    println!("  [[report]]   - labels reported for the next bracket match");
    println!("  [rating]     - positioning_games, adaptive, form_unit, initial_mean");
    println!("  [bracket]    - branching_factor, prune_depth, weighting, archive_policy");
    println!();
    println!("Examples:");
    println!("  tournament rate season.toml --json");
    println!("  tournament simulate --players 12 --games 2000 --seed 7");
    println!();
    println!("Set RUST_LOG=debug to trace every rating change.");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_script(args: &[String]) -> Result<TournamentScript> {
    let Some(path) = args.first() else {
        bail!("a script path is required");
    };
    let script = TournamentScript::load(Path::new(path))
        .with_context(|| format!("could not load script {}", path))?;
    info!(
        path = %path,
        games = script.games.len(),
        reports = script.reports.len(),
        "script loaded"
    );
    Ok(script)
}

fn run_rate(args: &[String]) -> Result<()> {
    let script = load_script(args)?;
    let json = args[1..].iter().any(|arg| arg == "--json");

    let engine = script.replay_ratings().context("rating replay failed")?;

    if json {
        let standings = serde_json::to_string_pretty(&engine.leaderboard())
            .context("could not serialize standings")?;
        println!("{}", standings);
    } else {
        print!("{}", leaderboard_report(&engine));
    }
    Ok(())
}

fn run_bracket(args: &[String]) -> Result<()> {
    let script = load_script(args)?;
    let bracket = script.replay_bracket().context("bracket replay failed")?;

    println!("=== Bracket ===");
    print!("{}", bracket);
    println!();
    match bracket.winner() {
        Some(labels) => println!("Winner: {}", labels.join(SEPARATOR.to_string().as_str())),
        None => println!("Winner: undecided"),
    }
    println!(
        "Nodes: {} ({} active), height {}",
        bracket.node_count(),
        bracket.active_count(),
        bracket.height()
    );
    Ok(())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(value) = args.get(i + 1) else {
        bail!("{} expects a value", flag);
    };
    value
        .parse()
        .with_context(|| format!("invalid value for {}: {}", flag, value))
}

fn run_simulate(args: &[String]) -> Result<()> {
    let mut config = MatchConfig::default();
    let mut seed: u64 = 1;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--players" | "-p" => {
                config.players = parse_flag(args, i, "--players")?;
                i += 1;
            }
            "--games" | "-g" => {
                config.num_games = parse_flag(args, i, "--games")?;
                i += 1;
            }
            "--team-size" | "-t" => {
                config.team_size = parse_flag(args, i, "--team-size")?;
                i += 1;
            }
            "--seed" | "-s" => {
                seed = parse_flag(args, i, "--seed")?;
                i += 1;
            }
            other => bail!("unknown option: {}", other),
        }
        i += 1;
    }

    println!(
        "=== Simulation: {} players, {} games, seed {} ===",
        config.players, config.num_games, seed
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let outcome = MatchRunner::new(config).run(&mut rng)?;

    print!("{}", leaderboard_report(&outcome.engine));
    println!();
    println!("{:<30} {:>8} {:>8}", "Player", "Hidden", "Rated");
    for (player, hidden) in outcome.hidden.iter().rev() {
        println!(
            "{:<30} {:>8.0} {:>8}",
            player,
            hidden,
            outcome.engine.score(player)
        );
    }
    println!();
    println!("Upsets: {}", outcome.upsets);
    println!(
        "Pairs in hidden order: {:.1}%",
        outcome.ordering_agreement() * 100.0
    );
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "rate" | "elo" => run_rate(&args[2..]),
        "bracket" => run_bracket(&args[2..]),
        "simulate" | "sim" => run_simulate(&args[2..]),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage();
            Ok(())
        }
    }
}
