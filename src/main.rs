//! Silo Defense headless runner
//!
//! Plays a seeded game on autopilot at a simulated 60 Hz display rate and
//! prints the final HUD as JSON.
//!
//! Usage: `silo-defense [--seed N] [--level N] [--frames N] [--tuning path.json]`

use std::path::{Path, PathBuf};

use clap::Parser;
use silo_defense::Game;
use silo_defense::sim::{GameEvent, GamePhase};
use silo_defense::tuning::Tuning;

/// Simulated display refresh interval (ms)
const FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Parser, Debug)]
#[command(name = "silo-defense")]
#[command(about = "Headless autopilot run of the missile-defense simulation")]
struct Args {
    /// RNG seed for the run
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Starting level (values below 1 start at 1)
    #[arg(long, default_value_t = 1)]
    level: u32,

    /// Display frames to simulate before stopping
    #[arg(long, default_value_t = 60 * 60 * 5)]
    frames: u32,

    /// JSON file with tuning overrides
    #[arg(long)]
    tuning: Option<PathBuf>,
}

fn load_tuning(path: Option<&Path>) -> Tuning {
    let Some(path) = path else {
        return Tuning::default();
    };
    match Tuning::load(path) {
        Ok(tuning) => {
            log::info!("Loaded tuning from {}", path.display());
            tuning
        }
        Err(e) => {
            log::warn!(
                "Failed to load tuning from {}: {} (using defaults)",
                path.display(),
                e
            );
            Tuning::default()
        }
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::ThreatDestroyed { kind, points, chain_depth, .. } => {
            log::debug!("{:?} threat destroyed: +{} (chain {})", kind, points, chain_depth);
        }
        GameEvent::InstallationDestroyed { installation } => {
            log::warn!("Installation {} lost", installation);
        }
        GameEvent::PickupCollected { kind } => log::info!("Pickup: {:?}", kind),
        GameEvent::LevelUp { level } => log::info!("Reached level {}", level),
        other => log::trace!("{:?}", other),
    }
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();

    let args = Args::parse();
    log::info!("Silo Defense (headless) starting: {:?}", args);

    let tuning = load_tuning(args.tuning.as_deref());
    let mut game = Game::new(args.seed, tuning);
    game.set_autopilot(true);
    game.start_game(args.level);

    let mut now = 0.0;
    for _ in 0..args.frames {
        game.frame(now);
        for event in game.drain_events() {
            log_event(&event);
        }
        if game.phase() == GamePhase::GameOver {
            break;
        }
        now += FRAME_MS;
    }

    let snapshot = game.snapshot();
    log::info!(
        "Finished after {:.1}s simulated: phase={:?}",
        snapshot.time,
        snapshot.phase
    );
    match serde_json::to_string_pretty(&snapshot.hud) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize HUD: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["silo-defense"]).unwrap();
        assert_eq!(args.seed, 12345);
        assert_eq!(args.level, 1);
        assert_eq!(args.frames, 18_000);
        assert!(args.tuning.is_none());
    }

    #[test]
    fn test_flags_parse_in_any_order() {
        let args = Args::try_parse_from([
            "silo-defense",
            "--frames",
            "5",
            "--tuning",
            "balance.json",
            "--seed",
            "7",
        ])
        .unwrap();
        assert_eq!(args.seed, 7);
        assert_eq!(args.frames, 5);
        assert_eq!(args.tuning, Some(PathBuf::from("balance.json")));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        // An unexpected flag must not swallow the values of the flags after it
        assert!(Args::try_parse_from(["silo-defense", "--verbose", "--seed", "7"]).is_err());
        assert!(Args::try_parse_from(["silo-defense", "--seed", "seven"]).is_err());
    }

    #[test]
    fn test_missing_tuning_file_falls_back() {
        let tuning = load_tuning(Some(Path::new("/nonexistent/silo-defense/tuning.json")));
        assert_eq!(tuning, Tuning::default());
    }
}
